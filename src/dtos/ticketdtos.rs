use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::ticketmodel::{TicketCategory, TicketPriority, TicketStatus};

/// Metadata for a file already uploaded to external storage; the admission
/// gate validates size and MIME type against the configured resource limits.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AttachmentDto {
    #[validate(length(min = 1, max = 255))]
    pub name: String,

    #[validate(length(min = 1, max = 100))]
    pub mime: String,

    #[validate(range(min = 1))]
    pub size_bytes: i64,

    #[validate(url(message = "Attachment URL must be a valid URL"))]
    pub url: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTicketDto {
    // Submitter identity; anonymous callers must supply name and email,
    // authenticated callers fall back to their account.
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,

    #[validate(email(message = "Email is invalid"))]
    pub email: Option<String>,

    #[validate(length(min = 10, max = 20))]
    pub phone: Option<String>,

    #[validate(length(min = 1, max = 200, message = "Subject must be between 1-200 characters"))]
    pub subject: String,

    #[validate(length(
        min = 1,
        max = 5000,
        message = "Description must be between 1-5000 characters"
    ))]
    pub description: String,

    pub category: TicketCategory,

    /// Honored verbatim when supplied; otherwise derived by the keyword
    /// heuristic.
    pub priority: Option<TicketPriority>,

    #[validate]
    pub attachment: Option<AttachmentDto>,
}

/// Tagged update: an explicit record of optional fields validated against a
/// fixed allow-list. Status, priority and assignment are staff-only.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateTicketDto {
    #[validate(length(min = 1, max = 200))]
    pub subject: Option<String>,

    #[validate(length(min = 1, max = 5000))]
    pub description: Option<String>,

    pub category: Option<TicketCategory>,

    pub status: Option<TicketStatus>,

    pub priority: Option<TicketPriority>,

    #[validate(email(message = "Assignee must be an email address"))]
    pub assigned_to_email: Option<String>,

    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: Option<i16>,

    #[validate(length(max = 2000))]
    pub feedback: Option<String>,
}

impl UpdateTicketDto {
    /// True when any staff-only field is present.
    pub fn touches_staff_fields(&self) -> bool {
        self.status.is_some() || self.priority.is_some() || self.assigned_to_email.is_some()
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateMessageDto {
    #[validate(length(min = 1, max = 5000, message = "Message body is required"))]
    pub body: String,

    /// Display name for anonymous senders; ignored for authenticated callers.
    #[validate(length(max = 100))]
    pub sender_name: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct DeflectRequestDto {
    #[validate(length(min = 1, max = 200))]
    pub subject: String,

    #[validate(length(min = 1, max = 5000))]
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staff_field_detection() {
        let student_update = UpdateTicketDto {
            rating: Some(5),
            feedback: Some("Great support".to_string()),
            ..Default::default()
        };
        assert!(!student_update.touches_staff_fields());

        let staff_update = UpdateTicketDto {
            status: Some(TicketStatus::Resolved),
            ..Default::default()
        };
        assert!(staff_update.touches_staff_fields());

        let assignment = UpdateTicketDto {
            assigned_to_email: Some("agent@uni.edu".to_string()),
            ..Default::default()
        };
        assert!(assignment.touches_staff_fields());
    }
}
