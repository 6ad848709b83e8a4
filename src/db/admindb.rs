use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use super::db::DBClient;
use crate::models::adminmodel::{AuditLogEntry, SystemSetting};

#[async_trait]
pub trait AdminExt {
    async fn get_setting(&self, key: &str) -> Result<Option<Value>, sqlx::Error>;

    /// Upsert; last write wins.
    async fn set_setting(&self, key: &str, value: &Value) -> Result<SystemSetting, sqlx::Error>;

    async fn get_all_settings(&self) -> Result<Vec<SystemSetting>, sqlx::Error>;

    /// Seeds defaults with upsert-or-ignore semantics so rerunning at every
    /// startup is safe and never clobbers operator changes.
    async fn seed_settings(&self, defaults: &[(&str, Value)]) -> Result<(), sqlx::Error>;

    async fn insert_audit_log(
        &self,
        actor_id: Option<Uuid>,
        action: &str,
        target_type: Option<&str>,
        target_id: Option<&str>,
        detail: Option<Value>,
    ) -> Result<AuditLogEntry, sqlx::Error>;

    async fn get_audit_logs(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AuditLogEntry>, sqlx::Error>;
}

#[async_trait]
impl AdminExt for DBClient {
    async fn get_setting(&self, key: &str) -> Result<Option<Value>, sqlx::Error> {
        let row: Option<(Value,)> =
            sqlx::query_as("SELECT value FROM system_settings WHERE key = $1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(value,)| value))
    }

    async fn set_setting(&self, key: &str, value: &Value) -> Result<SystemSetting, sqlx::Error> {
        let setting = sqlx::query_as::<_, SystemSetting>(
            r#"
            INSERT INTO system_settings (key, value)
            VALUES ($1, $2)
            ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(key)
        .bind(value)
        .fetch_one(&self.pool)
        .await?;

        Ok(setting)
    }

    async fn get_all_settings(&self) -> Result<Vec<SystemSetting>, sqlx::Error> {
        let settings =
            sqlx::query_as::<_, SystemSetting>("SELECT * FROM system_settings ORDER BY key")
                .fetch_all(&self.pool)
                .await?;

        Ok(settings)
    }

    async fn seed_settings(&self, defaults: &[(&str, Value)]) -> Result<(), sqlx::Error> {
        for (key, value) in defaults {
            sqlx::query(
                r#"
                INSERT INTO system_settings (key, value)
                VALUES ($1, $2)
                ON CONFLICT (key) DO NOTHING
                "#,
            )
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await?;
        }

        Ok(())
    }

    async fn insert_audit_log(
        &self,
        actor_id: Option<Uuid>,
        action: &str,
        target_type: Option<&str>,
        target_id: Option<&str>,
        detail: Option<Value>,
    ) -> Result<AuditLogEntry, sqlx::Error> {
        let entry = sqlx::query_as::<_, AuditLogEntry>(
            r#"
            INSERT INTO audit_logs (actor_id, action, target_type, target_id, detail)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(actor_id)
        .bind(action)
        .bind(target_type)
        .bind(target_id)
        .bind(detail)
        .fetch_one(&self.pool)
        .await?;

        Ok(entry)
    }

    async fn get_audit_logs(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AuditLogEntry>, sqlx::Error> {
        let logs = sqlx::query_as::<_, AuditLogEntry>(
            r#"
            SELECT * FROM audit_logs
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(logs)
    }
}
