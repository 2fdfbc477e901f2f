/// 将逗号编码为 "\1"（逗号是字段分隔符）
pub fn escape_commas(s: &str) -> String {
    s.replace(',', "\\1")
}

/// 还原 "\1" 为逗号
pub fn unescape_commas(s: &str) -> String {
    s.replace("\\1", ",")
}

/// Shortest positional decimal for a float, no exponent and no trailing zeros
/// (`0.1`, `1`, `0.0000001`).
pub fn format_decimal(value: f64) -> String {
    // Rust 的 Display 已经给出最短的十进制表示且不使用科学计数法
    format!("{}", value)
}

/// Number of decimal digits of a non-negative integer (0 has one digit)
pub fn digit_count(mut value: u64) -> usize {
    let mut digits = 1;
    while value >= 10 {
        value /= 10;
        digits += 1;
    }
    digits
}

/// 检查测量时间字符串：20 位数字 YYYYMMDDhhmmssuuuuuu
pub fn is_meas_date_digits(s: &str) -> bool {
    s.len() == 20 && s.bytes().all(|b| b.is_ascii_digit())
}

/// Sampling interval in microseconds as written to the header
pub fn sampling_interval(sfreq: f64) -> String {
    format!("{:?}", 1e6 / sfreq)
}
