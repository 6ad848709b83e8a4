use std::sync::Arc;

use serde_json::{json, Value};

use crate::db::{admindb::AdminExt, db::DBClient};

pub const DEFAULT_MAX_OPEN_TICKETS: i64 = 50;
pub const DEFAULT_AI_SENSITIVITY: f64 = 0.7;
pub const DEFAULT_MAX_ATTACHMENT_MB: i64 = 10;
pub const DEFAULT_AUTO_CLOSE_RESOLVED_DAYS: i64 = 7;

#[derive(Debug, Clone)]
pub struct ResourceLimits {
    pub max_size_mb: i64,
    pub allowed_types: Vec<String>,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        ResourceLimits {
            max_size_mb: DEFAULT_MAX_ATTACHMENT_MB,
            allowed_types: vec![
                "image/jpeg".to_string(),
                "image/png".to_string(),
                "application/pdf".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone)]
pub struct HousekeepingRules {
    pub enabled: bool,
    pub auto_close_resolved_days: i64,
}

impl Default for HousekeepingRules {
    fn default() -> Self {
        HousekeepingRules {
            enabled: true,
            auto_close_resolved_days: DEFAULT_AUTO_CLOSE_RESOLVED_DAYS,
        }
    }
}

/// Booleans in the settings table arrive either as JSON booleans or as the
/// strings "true"/"false" (an upstream quirk); both are treated as equivalent.
pub fn value_as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Numbers may likewise be JSON numbers or numeric strings.
pub fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

pub fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Typed read layer over the system_settings table. Reads for a single
/// decision are not snapshot-consistent across keys; settings change rarely
/// and staleness degrades UX, not correctness.
#[derive(Debug, Clone)]
pub struct SettingsService {
    db_client: Arc<DBClient>,
}

impl SettingsService {
    pub fn new(db_client: Arc<DBClient>) -> Self {
        Self { db_client }
    }

    async fn bool_setting(&self, key: &str, default: bool) -> Result<bool, sqlx::Error> {
        let value = self.db_client.get_setting(key).await?;
        Ok(value.as_ref().and_then(value_as_bool).unwrap_or(default))
    }

    pub async fn maintenance_mode(&self) -> Result<bool, sqlx::Error> {
        self.bool_setting("maintenance_mode", false).await
    }

    pub async fn submissions_locked(&self) -> Result<bool, sqlx::Error> {
        self.bool_setting("submissions_locked", false).await
    }

    pub async fn sla_peak_mode(&self) -> Result<bool, sqlx::Error> {
        self.bool_setting("sla_peak_mode", false).await
    }

    pub async fn sms_notifications_enabled(&self) -> Result<bool, sqlx::Error> {
        self.bool_setting("sms_notifications_enabled", false).await
    }

    pub async fn max_open_tickets(&self) -> Result<i64, sqlx::Error> {
        let value = self.db_client.get_setting("max_open_tickets").await?;
        Ok(value
            .as_ref()
            .and_then(value_as_i64)
            .unwrap_or(DEFAULT_MAX_OPEN_TICKETS))
    }

    pub async fn ai_sensitivity(&self) -> Result<f64, sqlx::Error> {
        let value = self.db_client.get_setting("ai_sensitivity").await?;
        Ok(value
            .as_ref()
            .and_then(value_as_f64)
            .unwrap_or(DEFAULT_AI_SENSITIVITY))
    }

    pub async fn announcement_banner(&self) -> Result<Option<String>, sqlx::Error> {
        let value = self.db_client.get_setting("announcement_banner").await?;
        Ok(value
            .as_ref()
            .and_then(|v| v.as_str().map(str::to_owned))
            .filter(|s| !s.is_empty()))
    }

    pub async fn resource_limits(&self) -> Result<ResourceLimits, sqlx::Error> {
        let value = self.db_client.get_setting("resource_limits").await?;
        let defaults = ResourceLimits::default();

        let Some(value) = value else {
            return Ok(defaults);
        };

        let max_size_mb = value
            .get("max_size_mb")
            .and_then(value_as_i64)
            .unwrap_or(defaults.max_size_mb);

        let allowed_types = value
            .get("allowed_types")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|t| t.as_str().map(str::to_owned))
                    .collect::<Vec<_>>()
            })
            .filter(|types| !types.is_empty())
            .unwrap_or(defaults.allowed_types);

        Ok(ResourceLimits {
            max_size_mb,
            allowed_types,
        })
    }

    pub async fn housekeeping_rules(&self) -> Result<HousekeepingRules, sqlx::Error> {
        let value = self.db_client.get_setting("housekeeping_rules").await?;
        let defaults = HousekeepingRules::default();

        let Some(value) = value else {
            return Ok(defaults);
        };

        let enabled = value
            .get("enabled")
            .and_then(value_as_bool)
            .unwrap_or(defaults.enabled);

        let auto_close_resolved_days = value
            .get("auto_close_resolved_days")
            .and_then(value_as_i64)
            .unwrap_or(defaults.auto_close_resolved_days);

        Ok(HousekeepingRules {
            enabled,
            auto_close_resolved_days,
        })
    }
}

/// Startup seed values; inserted with upsert-or-ignore so reruns are safe.
pub fn default_settings() -> Vec<(&'static str, Value)> {
    vec![
        ("maintenance_mode", json!(false)),
        ("submissions_locked", json!(false)),
        ("max_open_tickets", json!(DEFAULT_MAX_OPEN_TICKETS)),
        ("ai_sensitivity", json!(DEFAULT_AI_SENSITIVITY)),
        ("sla_peak_mode", json!(false)),
        (
            "resource_limits",
            json!({
                "max_size_mb": DEFAULT_MAX_ATTACHMENT_MB,
                "allowed_types": ["image/jpeg", "image/png", "application/pdf"],
            }),
        ),
        (
            "housekeeping_rules",
            json!({
                "enabled": true,
                "auto_close_resolved_days": DEFAULT_AUTO_CLOSE_RESOLVED_DAYS,
            }),
        ),
        ("sms_notifications_enabled", json!(false)),
        ("announcement_banner", json!("")),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_accepts_both_representations() {
        assert_eq!(value_as_bool(&json!(true)), Some(true));
        assert_eq!(value_as_bool(&json!(false)), Some(false));
        assert_eq!(value_as_bool(&json!("true")), Some(true));
        assert_eq!(value_as_bool(&json!("false")), Some(false));
        assert_eq!(value_as_bool(&json!("TRUE")), Some(true));
    }

    #[test]
    fn bool_rejects_everything_else() {
        assert_eq!(value_as_bool(&json!(1)), None);
        assert_eq!(value_as_bool(&json!("yes")), None);
        assert_eq!(value_as_bool(&json!(null)), None);
    }

    #[test]
    fn numbers_accept_strings() {
        assert_eq!(value_as_i64(&json!(25)), Some(25));
        assert_eq!(value_as_i64(&json!("25")), Some(25));
        assert_eq!(value_as_f64(&json!(0.7)), Some(0.7));
        assert_eq!(value_as_f64(&json!("0.7")), Some(0.7));
        assert_eq!(value_as_i64(&json!("not a number")), None);
    }

    #[test]
    fn default_seed_covers_load_bearing_keys() {
        let keys: Vec<&str> = default_settings().iter().map(|(k, _)| *k).collect();
        for key in [
            "maintenance_mode",
            "submissions_locked",
            "max_open_tickets",
            "ai_sensitivity",
            "sla_peak_mode",
            "resource_limits",
            "housekeeping_rules",
            "sms_notifications_enabled",
        ] {
            assert!(keys.contains(&key), "missing seed for {key}");
        }
    }
}
