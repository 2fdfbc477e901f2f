// Internal utilities for documentation tests
// This file contains helpers that generate demo recordings for doctests

use std::path::PathBuf;

use crate::SignalMatrix;

/// Returns a path under the system temp dir that does not exist yet
pub fn scratch_dir(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("brainvision_doc_{}_{}", name, std::process::id()));
    if path.exists() {
        std::fs::remove_dir_all(&path).ok();
    }
    path
}

/// `Ch1`, `Ch2`, ...
pub fn demo_channel_names(n_channels: usize) -> Vec<String> {
    (1..=n_channels).map(|i| format!("Ch{}", i)).collect()
}

/// Sine waves in volts, 50 µV amplitude, a different frequency per channel
pub fn demo_matrix(n_channels: usize, n_samples: usize) -> SignalMatrix {
    let rows: Vec<Vec<f64>> = (0..n_channels)
        .map(|ch| {
            let freq = 8.0 + 2.0 * ch as f64;
            (0..n_samples)
                .map(|i| {
                    let t = i as f64 / n_samples as f64;
                    50e-6 * (2.0 * std::f64::consts::PI * freq * t).sin()
                })
                .collect()
        })
        .collect();

    // 所有行长度一致，不会失败
    SignalMatrix::from_rows(&rows).unwrap_or_else(|_| SignalMatrix::zeros(n_channels, n_samples))
}
