use chrono::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::ErrorMessage;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Student,
    Agent,
    SuperAdmin,
}

impl UserRole {
    pub fn to_str(&self) -> &str {
        match self {
            UserRole::Student => "student",
            UserRole::Agent => "agent",
            UserRole::SuperAdmin => "super_admin",
        }
    }

    /// Agents and super admins count as staff for ticket triage purposes.
    pub fn is_staff(&self) -> bool {
        matches!(self, UserRole::Agent | UserRole::SuperAdmin)
    }
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct User {
    pub id: uuid::Uuid,
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: UserRole,

    // Staff accounts must be explicitly assigned before they may log in.
    pub is_assigned: bool,

    // Moderation state. Revocation is terminal; a ban may carry an expiry.
    pub is_banned: bool,
    pub ban_expires_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub revocation_reason: Option<String>,

    // Profile fields
    pub phone: Option<String>,
    pub programme: Option<String>,
    pub level: Option<String>,
    pub department: Option<String>,
    pub expertise: Option<String>,
    pub avatar_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_token: Option<String>,
    pub token_expires_at: Option<DateTime<Utc>>,

    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,

    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    /// A ban with no expiry is indefinite; an expired ban no longer blocks.
    pub fn is_ban_active(&self, now: DateTime<Utc>) -> bool {
        if !self.is_banned {
            return false;
        }
        match self.ban_expires_at {
            Some(expires_at) => expires_at > now,
            None => true,
        }
    }

    /// Standing checks applied at login, in precedence order: revocation,
    /// then an active ban, then unassigned staff. `None` means clear to log in.
    pub fn login_refusal(&self, now: DateTime<Utc>) -> Option<ErrorMessage> {
        if self.is_revoked() {
            return Some(ErrorMessage::AccountRevoked);
        }
        if self.is_ban_active(now) {
            return Some(ErrorMessage::AccountBanned);
        }
        if self.role.is_staff() && !self.is_assigned {
            return Some(ErrorMessage::AccountNotAssigned);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn user_with_ban(is_banned: bool, expires: Option<DateTime<Utc>>) -> User {
        User {
            id: uuid::Uuid::new_v4(),
            name: "Ada".to_string(),
            email: "ada@uni.edu".to_string(),
            password: "hash".to_string(),
            role: UserRole::Student,
            is_assigned: false,
            is_banned,
            ban_expires_at: expires,
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
    fn ban_without_expiry_is_indefinite() {
        let user = user_with_ban(true, None);
        assert!(user.is_ban_active(Utc::now()));
    }

    #[test]
    fn expired_ban_does_not_block() {
        let user = user_with_ban(true, Some(Utc::now() - Duration::hours(1)));
        assert!(!user.is_ban_active(Utc::now()));
    }

    #[test]
    fn future_ban_blocks() {
        let user = user_with_ban(true, Some(Utc::now() + Duration::hours(1)));
        assert!(user.is_ban_active(Utc::now()));
    }

    #[test]
    fn unassigned_staff_cannot_log_in() {
        let mut user = user_with_ban(false, None);
        for role in [UserRole::Agent, UserRole::SuperAdmin] {
            user.role = role;
            user.is_assigned = false;
            assert_eq!(
                user.login_refusal(Utc::now()),
                Some(ErrorMessage::AccountNotAssigned)
            );
            user.is_assigned = true;
            assert_eq!(user.login_refusal(Utc::now()), None);
        }
    }

    #[test]
    fn students_log_in_without_assignment() {
        let user = user_with_ban(false, None);
        assert_eq!(user.login_refusal(Utc::now()), None);
    }

    #[test]
    fn revocation_outranks_ban_at_login() {
        let mut user = user_with_ban(true, None);
        user.revoked_at = Some(Utc::now());
        assert_eq!(
            user.login_refusal(Utc::now()),
            Some(ErrorMessage::AccountRevoked)
        );
    }

    #[test]
    fn active_ban_refuses_login() {
        let user = user_with_ban(true, Some(Utc::now() + Duration::hours(1)));
        assert_eq!(
            user.login_refusal(Utc::now()),
            Some(ErrorMessage::AccountBanned)
        );
    }

    #[test]
    fn staff_roles() {
        assert!(!UserRole::Student.is_staff());
        assert!(UserRole::Agent.is_staff());
        assert!(UserRole::SuperAdmin.is_staff());
    }
}
