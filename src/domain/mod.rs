pub mod types;

pub use types::*;

/// Parse a raw cell as a real number, the way the ingest and classifier
/// agree on "numeric": trimmed, plain `f64` syntax, finite.
pub fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let v = trimmed.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}
