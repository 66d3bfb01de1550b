//! HH:MM:SS rendering and parsing

use crate::error::{AmenError, Result};

/// Render seconds as `HH:MM:SS`, truncating fractional seconds
pub fn format_timestamp(secs: f64) -> String {
    let total = secs.max(0.0) as u64;
    let h = total / 3600;
    let m = (total % 3600) / 60;
    let s = total % 60;
    format!("{:02}:{:02}:{:02}", h, m, s)
}

/// Parse `HH:MM:SS` or `MM:SS` into whole seconds
pub fn parse_timestamp(ts: &str) -> Result<u64> {
    let parts: Vec<&str> = ts.trim().split(':').collect();
    let fields = parts
        .iter()
        .map(|p| p.parse::<u64>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|_| invalid(ts))?;

    match fields.as_slice() {
        [h, m, s] if *m < 60 && *s < 60 => Ok(h * 3600 + m * 60 + s),
        [m, s] if *s < 60 => Ok(m * 60 + s),
        _ => Err(invalid(ts)),
    }
}

fn invalid(ts: &str) -> AmenError {
    AmenError::InvalidConfig(format!("Invalid timestamp format: {}", ts))
}
