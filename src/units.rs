use std::collections::BTreeSet;

use crate::types::{Diagnostic, SignalMatrix};
use crate::DEFAULT_UNIT;

/// Voltage unit spellings and their multipliers from volts.
///
/// Micro has three spellings: micro sign (U+00B5), Greek mu (U+03BC) and `u`.
const VOLTAGE_SCALINGS: [(&str, f64); 6] = [
    ("V", 1e0),
    ("mV", 1e3),
    ("µV", 1e6),
    ("μV", 1e6),
    ("uV", 1e6),
    ("nV", 1e9),
];

/// Multiplier converting volts into `unit`, `None` for non-voltage units
pub fn voltage_scaling(unit: &str) -> Option<f64> {
    VOLTAGE_SCALINGS
        .iter()
        .find(|(name, _)| *name == unit)
        .map(|(_, scale)| *scale)
}

/// Folds Greek mu and `u` spellings of microvolt to the micro sign.
///
/// Returns the folded units and, when anything was folded, one diagnostic
/// naming the original spellings.
pub fn fold_micro_sign(units: &[String]) -> (Vec<String>, Option<Diagnostic>) {
    let mut folded = BTreeSet::new();
    let units = units
        .iter()
        .map(|unit| {
            if unit == "μV" || unit == "uV" {
                folded.insert(unit.clone());
                DEFAULT_UNIT.to_string()
            } else {
                unit.clone()
            }
        })
        .collect();

    let diagnostic = if folded.is_empty() {
        None
    } else {
        Some(Diagnostic::MicroSignFolded(folded.into_iter().collect()))
    };
    (units, diagnostic)
}

/// Converts voltage channels from volts into their target unit.
///
/// Non-voltage channels pass through unscaled. Unit advisories are collected
/// once per scaler, not once per channel.
#[derive(Debug, Default)]
pub struct UnitScaler {
    non_default_voltage: BTreeSet<String>,
    non_voltage: BTreeSet<String>,
}

impl UnitScaler {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按通道单位缩放数据，返回新的矩阵
    pub fn scale(&mut self, data: &SignalMatrix, units: &[String]) -> SignalMatrix {
        let mut scaled = data.clone();

        for (idx, unit) in units.iter().enumerate().take(data.n_channels()) {
            let scale = match voltage_scaling(unit) {
                Some(scale) => {
                    if unit != DEFAULT_UNIT {
                        self.non_default_voltage.insert(unit.clone());
                    }
                    scale
                }
                None => {
                    // 非电压单位，原样写入
                    self.non_voltage.insert(unit.clone());
                    1.0
                }
            };

            if scale != 1.0 {
                for v in scaled.channel_mut(idx) {
                    *v *= scale;
                }
            }
        }

        scaled
    }

    /// Advisories gathered so far, voltage units first
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        if !self.non_default_voltage.is_empty() {
            out.push(Diagnostic::NonDefaultVoltageUnits(
                self.non_default_voltage.iter().cloned().collect(),
            ));
        }
        if !self.non_voltage.is_empty() {
            out.push(Diagnostic::NonVoltageUnits(self.non_voltage.iter().cloned().collect()));
        }
        out
    }
}
