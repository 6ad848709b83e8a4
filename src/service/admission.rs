use std::sync::Arc;

use axum::http::StatusCode;
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::{
    db::{db::DBClient, ticketdb::TicketExt},
    dtos::ticketdtos::AttachmentDto,
    error::HttpError,
    models::{ticketmodel::TicketPriority, usermodel::User},
    service::settings_service::SettingsService,
};

/// Keyword set for inline priority scoring. This heuristic is a coarse
/// stand-in for the AI collaborator; no provider call happens on this path.
pub const PRIORITY_KEYWORDS: [&str; 7] = [
    "urgent", "emergency", "broken", "cannot", "blocked", "fail", "error",
];

const URGENT_THRESHOLD: f64 = 1.5;
const HIGH_THRESHOLD: f64 = 0.8;

/// Scores subject + description against the keyword set. Each keyword counts
/// once regardless of how often it appears; hits x sensitivity maps to a
/// priority band.
pub fn score_priority(subject: &str, description: &str, sensitivity: f64) -> TicketPriority {
    let text = format!("{} {}", subject, description).to_lowercase();
    let hits = PRIORITY_KEYWORDS
        .iter()
        .filter(|keyword| text.contains(*keyword))
        .count();

    let score = hits as f64 * sensitivity;

    if score >= URGENT_THRESHOLD {
        TicketPriority::Urgent
    } else if score >= HIGH_THRESHOLD {
        TicketPriority::High
    } else {
        TicketPriority::Medium
    }
}

/// The open-ticket cap rejects at the threshold itself, not only above it.
pub fn capacity_reached(open: i64, cap: i64) -> bool {
    open >= cap
}

pub fn sla_hours(priority: TicketPriority) -> i64 {
    match priority {
        TicketPriority::Urgent => 4,
        TicketPriority::High => 24,
        TicketPriority::Low => 72,
        TicketPriority::Medium => 48,
    }
}

/// Pure function of (priority, peak mode) at computation time. Not preserved
/// historically if peak mode toggles later; recomputed only on explicit
/// priority change.
pub fn sla_deadline(
    created_at: DateTime<Utc>,
    priority: TicketPriority,
    peak_mode: bool,
) -> DateTime<Utc> {
    let mut hours = sla_hours(priority);
    if peak_mode {
        hours *= 2;
    }
    created_at + Duration::hours(hours)
}

#[derive(Error, Debug)]
pub enum AdmissionError {
    #[error("The helpdesk is under maintenance. Submissions are temporarily disabled.")]
    Maintenance,

    #[error("Ticket submissions are currently locked by an administrator.")]
    SubmissionsLocked,

    #[error("This account has been permanently revoked and cannot submit tickets.")]
    AccountRevoked,

    #[error("This account is banned and cannot submit tickets at this time.")]
    AccountBanned,

    #[error("The helpdesk is at capacity ({open} of {cap} open tickets). Please try again later.")]
    CapacityReached { open: i64, cap: i64 },

    #[error("Attachment is too large: {size_mb} MB exceeds the {max_mb} MB limit.")]
    FileTooLarge { size_mb: i64, max_mb: i64 },

    #[error("Attachment type {0} is not allowed.")]
    FileTypeNotAllowed(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<AdmissionError> for HttpError {
    fn from(error: AdmissionError) -> Self {
        let message = error.to_string();
        match error {
            AdmissionError::Maintenance => {
                HttpError::rejection("Maintenance Mode", message, StatusCode::SERVICE_UNAVAILABLE)
            }
            AdmissionError::SubmissionsLocked => {
                HttpError::rejection("Submissions Locked", message, StatusCode::FORBIDDEN)
            }
            AdmissionError::AccountRevoked => {
                HttpError::rejection("Account Revoked", message, StatusCode::FORBIDDEN)
            }
            AdmissionError::AccountBanned => {
                HttpError::rejection("Account Banned", message, StatusCode::FORBIDDEN)
            }
            AdmissionError::CapacityReached { .. } => {
                HttpError::rejection("Capacity", message, StatusCode::SERVICE_UNAVAILABLE)
            }
            AdmissionError::FileTooLarge { .. } | AdmissionError::FileTypeNotAllowed(_) => {
                HttpError::rejection("File Policy", message, StatusCode::BAD_REQUEST)
            }
            AdmissionError::Database(_) => HttpError::server_error(message),
        }
    }
}

/// Runs the pre-creation gates in their fixed order; each is a hard gate that
/// aborts with the specific rule tripped.
#[derive(Debug, Clone)]
pub struct AdmissionService {
    db_client: Arc<DBClient>,
    settings: Arc<SettingsService>,
}

impl AdmissionService {
    pub fn new(db_client: Arc<DBClient>, settings: Arc<SettingsService>) -> Self {
        Self {
            db_client,
            settings,
        }
    }

    pub async fn admit(
        &self,
        submitter: Option<&User>,
        attachment: Option<&AttachmentDto>,
    ) -> Result<(), AdmissionError> {
        // 1. Maintenance mode rejects everyone, identity notwithstanding.
        if self.settings.maintenance_mode().await? {
            return Err(AdmissionError::Maintenance);
        }

        // 2. Administrative blanket lock.
        if self.settings.submissions_locked().await? {
            return Err(AdmissionError::SubmissionsLocked);
        }

        // 3. Account standing, only for authenticated submitters.
        if let Some(user) = submitter {
            if user.is_revoked() {
                return Err(AdmissionError::AccountRevoked);
            }
            if user.is_ban_active(Utc::now()) {
                return Err(AdmissionError::AccountBanned);
            }
        }

        // 4. Soft cap: read-then-act with no reservation, so concurrent
        // submissions right at the threshold may overshoot. Accepted race.
        let cap = self.settings.max_open_tickets().await?;
        let open = self.db_client.count_open_tickets().await?;
        if capacity_reached(open, cap) {
            return Err(AdmissionError::CapacityReached { open, cap });
        }

        // 5. Attachment policy.
        if let Some(attachment) = attachment {
            let limits = self.settings.resource_limits().await?;
            let size_mb = attachment.size_bytes / (1024 * 1024);
            if attachment.size_bytes > limits.max_size_mb * 1024 * 1024 {
                return Err(AdmissionError::FileTooLarge {
                    size_mb,
                    max_mb: limits.max_size_mb,
                });
            }
            if !limits.allowed_types.iter().any(|t| t == &attachment.mime) {
                return Err(AdmissionError::FileTypeNotAllowed(attachment.mime.clone()));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn multiple_keyword_hits_score_urgent() {
        // "URGENT the system is completely broken and blocked": hits are
        // urgent, broken, blocked -> 3 x 0.7 = 2.1 >= 1.5.
        let priority = score_priority(
            "",
            "URGENT the system is completely broken and blocked",
            0.7,
        );
        assert_eq!(priority, TicketPriority::Urgent);
    }

    #[test]
    fn single_hit_maps_to_high_at_default_sensitivity() {
        // 1 x 0.7 = 0.7 < 0.8 -> Medium; 2 x 0.7 = 1.4 -> High.
        assert_eq!(
            score_priority("printer", "it is broken", 0.7),
            TicketPriority::Medium
        );
        assert_eq!(
            score_priority("error", "login is broken", 0.7),
            TicketPriority::High
        );
    }

    #[test]
    fn no_hits_default_to_medium() {
        assert_eq!(
            score_priority("Question", "How do I change my timetable?", 0.7),
            TicketPriority::Medium
        );
    }

    #[test]
    fn repeated_keyword_counts_once() {
        assert_eq!(
            score_priority("error error error", "error again", 0.7),
            TicketPriority::Medium
        );
    }

    #[test]
    fn sensitivity_scales_the_score() {
        // 2 hits at sensitivity 1.0 -> 2.0 -> Urgent.
        assert_eq!(
            score_priority("broken", "blocked", 1.0),
            TicketPriority::Urgent
        );
        // 2 hits at sensitivity 0.3 -> 0.6 -> Medium.
        assert_eq!(
            score_priority("broken", "blocked", 0.3),
            TicketPriority::Medium
        );
    }

    #[test]
    fn capacity_rejects_at_the_threshold() {
        assert!(capacity_reached(50, 50));
        assert!(capacity_reached(51, 50));
        assert!(!capacity_reached(49, 50));
        assert!(!capacity_reached(0, 1));
    }

    #[test]
    fn rejections_name_the_rule_tripped() {
        let err: HttpError = AdmissionError::Maintenance.into();
        assert_eq!(err.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.error_label.as_deref(), Some("Maintenance Mode"));

        let err: HttpError = AdmissionError::SubmissionsLocked.into();
        assert_eq!(err.status, StatusCode::FORBIDDEN);
        assert_eq!(err.error_label.as_deref(), Some("Submissions Locked"));

        let err: HttpError = AdmissionError::AccountRevoked.into();
        assert_eq!(err.status, StatusCode::FORBIDDEN);
        assert_eq!(err.error_label.as_deref(), Some("Account Revoked"));

        let err: HttpError = AdmissionError::AccountBanned.into();
        assert_eq!(err.status, StatusCode::FORBIDDEN);
        assert_eq!(err.error_label.as_deref(), Some("Account Banned"));

        let err: HttpError = AdmissionError::CapacityReached { open: 50, cap: 50 }.into();
        assert_eq!(err.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.error_label.as_deref(), Some("Capacity"));

        let err: HttpError = AdmissionError::FileTooLarge {
            size_mb: 25,
            max_mb: 10,
        }
        .into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.error_label.as_deref(), Some("File Policy"));

        let err: HttpError =
            AdmissionError::FileTypeNotAllowed("application/zip".to_string()).into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.error_label.as_deref(), Some("File Policy"));
    }

    #[test]
    fn sla_hours_table() {
        assert_eq!(sla_hours(TicketPriority::Urgent), 4);
        assert_eq!(sla_hours(TicketPriority::High), 24);
        assert_eq!(sla_hours(TicketPriority::Low), 72);
        assert_eq!(sla_hours(TicketPriority::Medium), 48);
    }

    #[test]
    fn sla_deadline_adds_hours() {
        let created = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        assert_eq!(
            sla_deadline(created, TicketPriority::Urgent, false),
            created + Duration::hours(4)
        );
        assert_eq!(
            sla_deadline(created, TicketPriority::Medium, false),
            created + Duration::hours(48)
        );
    }

    #[test]
    fn peak_mode_doubles_every_window() {
        let created = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        for priority in [
            TicketPriority::Low,
            TicketPriority::Medium,
            TicketPriority::High,
            TicketPriority::Urgent,
        ] {
            assert_eq!(
                sla_deadline(created, priority, true),
                created + Duration::hours(sla_hours(priority) * 2)
            );
        }
    }
}
