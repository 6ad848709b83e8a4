use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use crate::db::{admindb::AdminExt, db::DBClient};

/// Best-effort audit trail for privileged actions. A failed audit write is
/// logged and swallowed; it must never fail or roll back the primary action.
#[derive(Debug, Clone)]
pub struct AuditService {
    db_client: Arc<DBClient>,
}

impl AuditService {
    pub fn new(db_client: Arc<DBClient>) -> Self {
        Self { db_client }
    }

    async fn record(
        &self,
        actor_id: Option<Uuid>,
        action: &str,
        target_type: Option<&str>,
        target_id: Option<String>,
        detail: Option<Value>,
    ) {
        let result = self
            .db_client
            .insert_audit_log(actor_id, action, target_type, target_id.as_deref(), detail)
            .await;

        if let Err(e) = result {
            tracing::error!("audit write failed for action {}: {}", action, e);
        }
    }

    pub async fn log_settings_change(&self, actor_id: Uuid, changed: Value) {
        self.record(
            Some(actor_id),
            "update_settings",
            Some("system_setting"),
            None,
            Some(changed),
        )
        .await;
    }

    pub async fn log_moderation(&self, actor_id: Uuid, target_user_id: Uuid, detail: Value) {
        self.record(
            Some(actor_id),
            "moderate_user",
            Some("user"),
            Some(target_user_id.to_string()),
            Some(detail),
        )
        .await;
    }

    pub async fn log_role_change(&self, actor_id: Uuid, target_user_id: Uuid, detail: Value) {
        self.record(
            Some(actor_id),
            "update_role",
            Some("user"),
            Some(target_user_id.to_string()),
            Some(detail),
        )
        .await;
    }

    pub async fn log_ticket_delete(&self, actor_id: Uuid, ticket_id: Uuid, detail: Value) {
        self.record(
            Some(actor_id),
            "delete_ticket",
            Some("ticket"),
            Some(ticket_id.to_string()),
            Some(detail),
        )
        .await;
    }

    pub async fn log_cleanup(&self, actor_id: Uuid, closed: u64) {
        self.record(
            Some(actor_id),
            "housekeeping_sweep",
            Some("ticket"),
            None,
            Some(serde_json::json!({ "closed": closed })),
        )
        .await;
    }
}
