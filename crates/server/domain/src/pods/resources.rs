// Resource requirements and Kubernetes quantities

use serde::{Deserialize, Serialize};
use tracing::warn;

/// CPU / memory request and limit pairs, each nullable when unset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRequirements {
    #[serde(default)]
    pub cpu_request: Option<String>,
    #[serde(default)]
    pub cpu_limit: Option<String>,
    #[serde(default)]
    pub memory_request: Option<String>,
    #[serde(default)]
    pub memory_limit: Option<String>,
}

impl ResourceRequirements {
    pub fn is_empty(&self) -> bool {
        self.cpu_request.is_none()
            && self.cpu_limit.is_none()
            && self.memory_request.is_none()
            && self.memory_limit.is_none()
    }

    /// Memory limit in bytes. Unset or unparseable limits count as 0.
    pub fn memory_limit_bytes(&self) -> i64 {
        match self.memory_limit.as_deref() {
            None => 0,
            Some(raw) => match parse_quantity(raw) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!("Ignoring memory limit '{}': {}", raw, e);
                    0
                }
            },
        }
    }
}

/// Error al parsear una cantidad de Kubernetes
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid quantity '{raw}': {reason}")]
pub struct QuantityParseError {
    pub raw: String,
    pub reason: &'static str,
}

/// Parse a Kubernetes quantity (`512Mi`, `2G`, `1e9`, `500m`) into an integer
/// value, rounding fractional results down.
pub fn parse_quantity(raw: &str) -> Result<i64, QuantityParseError> {
    let err = |reason| QuantityParseError {
        raw: raw.to_string(),
        reason,
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(err("empty"));
    }

    let split = trimmed
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-' || c == '+'))
        .unwrap_or(trimmed.len());
    let (number, suffix) = trimmed.split_at(split);

    let value: f64 = number.parse().map_err(|_| err("not a number"))?;

    let multiplier: f64 = match suffix {
        "" => 1.0,
        "Ki" => 1024.0,
        "Mi" => 1024f64.powi(2),
        "Gi" => 1024f64.powi(3),
        "Ti" => 1024f64.powi(4),
        "Pi" => 1024f64.powi(5),
        "Ei" => 1024f64.powi(6),
        "m" => 1e-3,
        "k" => 1e3,
        "M" => 1e6,
        "G" => 1e9,
        "T" => 1e12,
        "P" => 1e15,
        "E" => 1e18,
        s if s.starts_with(['e', 'E']) => {
            let exp: i32 = s[1..].parse().map_err(|_| err("bad exponent"))?;
            10f64.powi(exp)
        }
        _ => return Err(err("unknown suffix")),
    };

    Ok((value * multiplier).floor() as i64)
}
