//! Utility functions for pairq
//!
//! Provides environment file loading and coordinate rounding.

use std::path::Path;

/// Round `value` to the nearest multiple of `unit`, halves away from zero.
///
/// A `unit` of 1 (or less) returns `value` unchanged.
///
/// # Example
/// ```
/// use pairq_core::util::round_to_multiple;
///
/// assert_eq!(round_to_multiple(437, 10), 440);
/// assert_eq!(round_to_multiple(435, 10), 440);
/// assert_eq!(round_to_multiple(-435, 10), -440);
/// assert_eq!(round_to_multiple(437, 1), 437);
/// ```
#[inline]
pub fn round_to_multiple(value: i64, unit: i64) -> i64 {
    if unit <= 1 {
        return value;
    }
    let (value, unit) = (i128::from(value), i128::from(unit));
    let half = unit / 2;
    let rounded = if value >= 0 {
        (value + half) / unit
    } else {
        (value - half) / unit
    };
    let multiple = rounded * unit;
    i64::try_from(multiple).unwrap_or(if multiple > 0 { i64::MAX } else { i64::MIN })
}

/// Load environment variables from the pairq env file if not already set.
/// Searches standard locations in order:
/// 1. /usr/local/etc/pairq/pairq.env
/// 2. User's config directory/pairq/pairq.env
/// 3. ~/.config/pairq/pairq.env
pub fn load_env_file() {
    let env_paths = [
        "/usr/local/etc/pairq/pairq.env".to_string(),
        dirs::config_dir()
            .map(|p| p.join("pairq/pairq.env").to_string_lossy().to_string())
            .unwrap_or_default(),
        dirs::home_dir()
            .map(|p| p.join(".config/pairq/pairq.env").to_string_lossy().to_string())
            .unwrap_or_default(),
    ];

    for path in &env_paths {
        if path.is_empty() {
            continue;
        }
        if Path::new(path).exists() {
            if let Ok(contents) = std::fs::read_to_string(path) {
                parse_env_file(&contents);
            }
            break;
        }
    }
}

/// Parse env file contents and set environment variables (only if not already set).
/// Supports formats:
/// - `KEY=value`
/// - `export KEY=value`
/// - `KEY="quoted value"`
/// - `KEY='single quoted'`
/// - Comments starting with #
pub fn parse_env_file(contents: &str) {
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        if let Some((key, value)) = line.split_once('=') {
            let key = key.trim();
            let value = value.trim().trim_matches('"').trim_matches('\'');
            if std::env::var(key).is_err() {
                std::env::set_var(key, value);
            }
        }
    }
}
