use crate::parser::get_regex;
use regex::Regex;
use std::sync::OnceLock;

fn unit_factor(unit: &str) -> Option<f64> {
    let factor = match unit.to_uppercase().as_str() {
        "B" => 1.0,
        "KB" => 1000.0,
        "MB" => 1000.0 * 1000.0,
        "GB" => 1000.0 * 1000.0 * 1000.0,
        "TB" => 1000.0 * 1000.0 * 1000.0 * 1000.0,
        "KIB" => 1024.0,
        "MIB" => 1024.0 * 1024.0,
        "GIB" => 1024.0 * 1024.0 * 1024.0,
        "TIB" => 1024.0 * 1024.0 * 1024.0 * 1024.0,
        _ => return None,
    };
    Some(factor)
}

/// Parses `<number>[.<number>] [unit]` into bytes.
///
/// Decimal units (KB/MB/GB/TB) are powers of 1000, binary units
/// (KiB/MiB/GiB/TiB) powers of 1024. A bare number is bytes unless the
/// indexer definition forces a unit for unit-less captures.
#[must_use]
pub fn parse_size(size_str: &str, force_unit: Option<&str>) -> Option<u64> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = get_regex(
        &RE,
        r"(?i)^(\d+(?:[.,]\d+)?)\s*(B|KB|MB|GB|TB|KiB|MiB|GiB|TiB)?$",
    );

    let caps = re.captures(size_str.trim())?;
    let value: f64 = caps.get(1)?.as_str().replace(',', ".").parse().ok()?;

    let factor = match caps.get(2) {
        Some(unit) => unit_factor(unit.as_str())?,
        None => match force_unit {
            Some(unit) => unit_factor(unit)?,
            None => 1.0,
        },
    };

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Some((value * factor) as u64)
}

#[must_use]
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    const TB: u64 = GB * 1024;

    #[allow(clippy::cast_precision_loss)]
    if bytes >= TB {
        format!("{:.2} TiB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.2} GiB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MiB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KiB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}
