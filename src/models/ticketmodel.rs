use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Type;
use uuid::Uuid;

use crate::models::usermodel::{User, UserRole};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq)]
#[sqlx(type_name = "ticket_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq)]
#[sqlx(type_name = "ticket_priority", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TicketPriority {
    Low,
    Medium,
    High,
    Urgent,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq)]
#[sqlx(type_name = "ticket_category", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TicketCategory {
    Portal,
    Fees,
    Academic,
    Other,
}

/// Role a message was sent under. `Admin` survives from an older schema
/// revision whose CHECK list disagreed with the bootstrap list about
/// `super_admin`; all four values are accepted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq)]
#[sqlx(type_name = "sender_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SenderRole {
    Student,
    Admin,
    Agent,
    SuperAdmin,
}

impl SenderRole {
    pub fn to_str(&self) -> &str {
        match self {
            SenderRole::Student => "student",
            SenderRole::Admin => "admin",
            SenderRole::Agent => "agent",
            SenderRole::SuperAdmin => "super_admin",
        }
    }
}

impl From<UserRole> for SenderRole {
    fn from(role: UserRole) -> Self {
        match role {
            UserRole::Student => SenderRole::Student,
            UserRole::Agent => SenderRole::Agent,
            UserRole::SuperAdmin => SenderRole::SuperAdmin,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Ticket {
    pub id: Uuid,
    // Submitter identity is denormalized so anonymous submissions work too.
    pub user_id: Option<Uuid>,
    pub submitter_name: String,
    pub submitter_email: String,
    pub submitter_phone: Option<String>,

    pub subject: String,
    pub description: String,
    pub category: TicketCategory,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    pub sla_deadline: DateTime<Utc>,
    pub assigned_to_email: Option<String>,

    pub attachment_name: Option<String>,
    pub attachment_mime: Option<String>,
    pub attachment_size_bytes: Option<i64>,
    pub attachment_url: Option<String>,

    pub resolved_at: Option<DateTime<Utc>>,
    pub rating: Option<i16>,
    pub feedback: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ticket {
    /// The original submitter, matched by owning user id or account email.
    pub fn is_submitter(&self, user: &User) -> bool {
        self.user_id == Some(user.id) || self.submitter_email == user.email
    }

    /// Per-ticket detail access: submitter or any staff member.
    pub fn can_be_viewed_by(&self, user: &User) -> bool {
        user.role.is_staff() || self.is_submitter(user)
    }
}

/// Resolution stamp maintenance for a status write: entering `Resolved`
/// stamps `now`, any transition out of `Resolved` clears the stamp. The
/// housekeeping sweep closes resolved tickets in bulk through its own SQL
/// path and keeps the stamp.
pub fn next_resolved_at(
    current_status: TicketStatus,
    new_status: TicketStatus,
    current_resolved_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    match (current_status, new_status) {
        (TicketStatus::Resolved, TicketStatus::Resolved) => current_resolved_at,
        (_, TicketStatus::Resolved) => Some(now),
        (TicketStatus::Resolved, _) => None,
        _ => current_resolved_at,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TicketMessage {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub sender_id: Option<Uuid>,
    pub sender_name: Option<String>,
    pub sender_role: SenderRole,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketWithMessages {
    pub ticket: Ticket,
    pub messages: Vec<TicketMessage>,
}

#[derive(Debug, Deserialize)]
pub struct TicketQueryParams {
    pub page: Option<i32>,
    pub limit: Option<i32>,
    pub status: Option<TicketStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn ticket(user_id: Option<Uuid>, email: &str) -> Ticket {
        Ticket {
            id: Uuid::new_v4(),
            user_id,
            submitter_name: "Ada".to_string(),
            submitter_email: email.to_string(),
            submitter_phone: None,
            subject: "Portal down".to_string(),
            description: "Cannot log in".to_string(),
            category: TicketCategory::Portal,
            status: TicketStatus::Open,
            priority: TicketPriority::Medium,
            sla_deadline: Utc::now(),
            assigned_to_email: None,
            attachment_name: None,
            attachment_mime: None,
            attachment_size_bytes: None,
            attachment_url: None,
            resolved_at: None,
            rating: None,
            feedback: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn user(role: UserRole, email: &str) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Ada".to_string(),
            email: email.to_string(),
            password: "hash".to_string(),
            role,
            is_assigned: true,
            is_banned: false,
            ban_expires_at: None,
            revoked_at: None,
            revocation_reason: None,
            phone: None,
            programme: None,
            level: None,
            department: None,
            expertise: None,
            avatar_url: None,
            reset_token: None,
            token_expires_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn submitter_matches_by_user_id() {
        let owner = user(UserRole::Student, "a@uni.edu");
        let t = ticket(Some(owner.id), "someone-else@uni.edu");
        assert!(t.can_be_viewed_by(&owner));
    }

    #[test]
    fn submitter_matches_by_email() {
        let owner = user(UserRole::Student, "a@uni.edu");
        let t = ticket(None, "a@uni.edu");
        assert!(t.can_be_viewed_by(&owner));
    }

    #[test]
    fn other_student_is_denied() {
        let stranger = user(UserRole::Student, "b@uni.edu");
        let t = ticket(Some(Uuid::new_v4()), "a@uni.edu");
        assert!(!t.can_be_viewed_by(&stranger));
    }

    #[test]
    fn entering_resolved_stamps_now() {
        let now = Utc::now();
        assert_eq!(
            next_resolved_at(TicketStatus::Open, TicketStatus::Resolved, None, now),
            Some(now)
        );
        assert_eq!(
            next_resolved_at(TicketStatus::InProgress, TicketStatus::Resolved, None, now),
            Some(now)
        );
    }

    #[test]
    fn leaving_resolved_clears_the_stamp() {
        let now = Utc::now();
        let stamped = Some(now - chrono::Duration::hours(1));
        for new_status in [
            TicketStatus::Open,
            TicketStatus::InProgress,
            TicketStatus::Closed,
        ] {
            assert_eq!(
                next_resolved_at(TicketStatus::Resolved, new_status, stamped, now),
                None
            );
        }
    }

    #[test]
    fn staying_resolved_keeps_the_original_stamp() {
        let now = Utc::now();
        let stamped = Some(now - chrono::Duration::hours(1));
        assert_eq!(
            next_resolved_at(TicketStatus::Resolved, TicketStatus::Resolved, stamped, now),
            stamped
        );
    }

    #[test]
    fn unresolved_transitions_leave_the_stamp_alone() {
        let now = Utc::now();
        assert_eq!(
            next_resolved_at(TicketStatus::Open, TicketStatus::Closed, None, now),
            None
        );
    }

    #[test]
    fn staff_always_view() {
        let agent = user(UserRole::Agent, "agent@uni.edu");
        let admin = user(UserRole::SuperAdmin, "admin@uni.edu");
        let t = ticket(Some(Uuid::new_v4()), "a@uni.edu");
        assert!(t.can_be_viewed_by(&agent));
        assert!(t.can_be_viewed_by(&admin));
    }
}
