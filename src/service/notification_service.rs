use std::sync::Arc;

use rand::distr::Alphanumeric;
use rand::Rng;
use serde_json::json;

use crate::{
    config::Config,
    mail::mails::{send_ticket_received_email, send_ticket_resolved_email},
    models::ticketmodel::Ticket,
    service::settings_service::SettingsService,
    utils::phone::normalize_phone,
};

/// Fire-and-forget notifier. Every send happens on a spawned task; failures
/// are logged and never reach the caller, so the primary ticket mutation can
/// never be failed or rolled back by a provider outage.
#[derive(Debug, Clone)]
pub struct NotificationService {
    settings: Arc<SettingsService>,
    config: Config,
}

impl NotificationService {
    pub fn new(settings: Arc<SettingsService>, config: Config) -> Self {
        Self { settings, config }
    }

    pub async fn notify_ticket_created(&self, ticket: &Ticket) {
        let email = ticket.submitter_email.clone();
        let name = ticket.submitter_name.clone();
        let subject = ticket.subject.clone();
        let sla = ticket.sla_deadline;

        tokio::spawn(async move {
            if let Err(e) = send_ticket_received_email(&email, &name, &subject, sla).await {
                tracing::warn!("ticket-received email to {} failed: {}", email, e);
            }
        });

        self.maybe_send_sms(
            ticket,
            format!(
                "Helpdesk: we received your ticket \"{}\". We'll be in touch.",
                ticket.subject
            ),
        )
        .await;
    }

    pub async fn notify_ticket_resolved(&self, ticket: &Ticket) {
        let email = ticket.submitter_email.clone();
        let name = ticket.submitter_name.clone();
        let subject = ticket.subject.clone();

        tokio::spawn(async move {
            if let Err(e) = send_ticket_resolved_email(&email, &name, &subject).await {
                tracing::warn!("ticket-resolved email to {} failed: {}", email, e);
            }
        });

        self.maybe_send_sms(
            ticket,
            format!(
                "Helpdesk: your ticket \"{}\" has been resolved. You can now rate the support you received.",
                ticket.subject
            ),
        )
        .await;
    }

    async fn maybe_send_sms(&self, ticket: &Ticket, message: String) {
        let enabled = self
            .settings
            .sms_notifications_enabled()
            .await
            .unwrap_or(false);
        if !enabled {
            return;
        }

        let Some(raw_phone) = ticket.submitter_phone.clone() else {
            return;
        };

        let Some(to) = normalize_phone(&raw_phone) else {
            tracing::warn!("skipping SMS: could not normalize phone {:?}", raw_phone);
            return;
        };

        let config = self.config.clone();
        tokio::spawn(async move {
            if let Err(e) = send_sms(&config, &to, &message).await {
                tracing::warn!("SMS to {} failed: {}", to, e);
            }
        });
    }
}

async fn send_sms(config: &Config, to: &str, message: &str) -> Result<(), String> {
    if config.sms_api_key.is_empty() {
        return Err("SMS_API_KEY not configured".to_string());
    }

    let reference: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(char::from)
        .collect();

    let client = reqwest::Client::new();
    let response = client
        .post(&config.sms_api_url)
        .json(&json!({
            "api_key": config.sms_api_key,
            "to": to,
            "sms": message,
            "reference": reference,
            "channel": "generic",
        }))
        .send()
        .await
        .map_err(|e| format!("network error: {}", e))?;

    let status = response.status();
    if status.is_success() {
        tracing::info!("SMS dispatched to {} (reference {})", to, reference);
        Ok(())
    } else {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "no response body".to_string());
        Err(format!("SMS provider error ({}): {}", status.as_u16(), body))
    }
}
