use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Result, SimError};

/// Persistent tool state, stored at `~/.dronesim/config.json`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimConfig {
    pub version: u32,
    /// Workspace the flight stack and plugin were cloned into.
    pub workspace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub models_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_models_fetch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_setup: Option<String>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            version: 1,
            workspace: None,
            models_version: None,
            last_models_fetch: None,
            last_setup: None,
        }
    }
}

fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".dronesim").join("config.json"))
}

/// Load the config, or `None` when it is absent or unreadable.
/// A corrupt config is never fatal — callers fall back to defaults.
pub fn load_config() -> Option<SimConfig> {
    let path = config_path()?;
    let content = std::fs::read_to_string(&path).ok()?;
    serde_json::from_str(&content).ok()
}

/// Write the config, creating `~/.dronesim/` if needed.
pub fn save_config(config: &SimConfig) -> Result<()> {
    let path =
        config_path().ok_or_else(|| SimError::Custom("Cannot find home directory".into()))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json =
        serde_json::to_string_pretty(config).map_err(|e| SimError::Custom(e.to_string()))?;
    std::fs::write(&path, json)?;

    Ok(())
}

/// Parse an ISO 8601 UTC timestamp (e.g. "2025-06-15T10:30:00Z") into a Unix timestamp (seconds).
/// Only handles the exact format the session logger writes: YYYY-MM-DDTHH:MM:SSZ
/// (inverse of logs.rs::format_timestamp).
pub fn parse_iso8601_to_unix(s: &str) -> Option<i64> {
    let s = s.trim();
    if s.len() < 20 || !s.ends_with('Z') {
        return None;
    }
    let year: i64 = s[0..4].parse().ok()?;
    let month: i64 = s[5..7].parse().ok()?;
    let day: i64 = s[8..10].parse().ok()?;
    let hour: i64 = s[11..13].parse().ok()?;
    let min: i64 = s[14..16].parse().ok()?;
    let sec: i64 = s[17..19].parse().ok()?;

    // Days from year 0 to the start of the given year (handles leap years)
    fn days_from_year(y: i64) -> i64 {
        365 * y + y / 4 - y / 100 + y / 400
    }

    let month_days: [i64; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
    let is_leap = (year % 4 == 0 && year % 100 != 0) || year % 400 == 0;

    let mut day_of_year: i64 = day - 1;
    for i in 0..(month - 1) as usize {
        day_of_year += month_days[i];
    }
    if is_leap && month > 2 {
        day_of_year += 1;
    }

    let days = days_from_year(year) - days_from_year(1970) + day_of_year;
    Some(days * 86400 + hour * 3600 + min * 60 + sec)
}

/// Compare two version strings (e.g. "0.2.0" > "0.1.0").
/// Returns true if `remote` is newer than `local`.
pub fn is_newer_version(local: &str, remote: &str) -> bool {
    let parse = |s: &str| -> (u64, u64, u64) {
        let parts: Vec<u64> = s
            .trim_start_matches('v')
            .splitn(3, '.')
            .filter_map(|p| p.parse().ok())
            .collect();
        (
            parts.first().copied().unwrap_or(0),
            parts.get(1).copied().unwrap_or(0),
            parts.get(2).copied().unwrap_or(0),
        )
    };
    let l = parse(local);
    let r = parse(remote);
    r > l
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logs::format_timestamp;

    #[test]
    fn test_parse_iso8601() {
        let ts = parse_iso8601_to_unix("2025-01-01T00:00:00Z").unwrap();
        // 2025-01-01 00:00:00 UTC
        assert_eq!(ts, 1735689600);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(parse_iso8601_to_unix("2025-01-01").is_none());
        assert!(parse_iso8601_to_unix("2025-01-01T00:00:00").is_none());
        assert!(parse_iso8601_to_unix("").is_none());
    }

    #[test]
    fn test_format_parse_roundtrip() {
        for ts in [0i64, 951827696, 1735689600, 1709208000] {
            let formatted = format_timestamp(ts as u64);
            assert_eq!(parse_iso8601_to_unix(&formatted), Some(ts));
        }
    }

    #[test]
    fn test_version_comparison() {
        assert!(is_newer_version("0.1.0", "0.2.0"));
        assert!(is_newer_version("0.1.0", "1.0.0"));
        assert!(is_newer_version("1.0.0", "1.0.1"));
        assert!(!is_newer_version("0.2.0", "0.1.0"));
        assert!(!is_newer_version("0.1.0", "0.1.0"));
        assert!(is_newer_version("v0.1.0", "v0.2.0"));
    }

    #[test]
    fn test_config_json_roundtrip() {
        let config = SimConfig {
            version: 1,
            workspace: Some("/home/user/dronesim".into()),
            models_version: Some("1.1.0".into()),
            last_models_fetch: Some("2025-06-15T10:30:00Z".into()),
            last_setup: None,
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: SimConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.workspace.as_deref(), Some("/home/user/dronesim"));
        assert_eq!(back.models_version.as_deref(), Some("1.1.0"));
        // Skipped fields stay out of the serialized form
        assert!(!json.contains("lastSetup"));
    }
}
