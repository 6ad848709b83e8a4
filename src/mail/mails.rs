use chrono::{DateTime, Utc};

use super::sendmail::send_email;

pub async fn send_ticket_received_email(
    to_email: &str,
    name: &str,
    ticket_subject: &str,
    sla_deadline: DateTime<Utc>,
) -> Result<(), Box<dyn std::error::Error>> {
    let subject = "We received your support ticket";
    let template_path = "src/mail/templates/Ticket-received.html";
    let placeholders = vec![
        ("{{name}}".to_string(), name.to_string()),
        ("{{ticket_subject}}".to_string(), ticket_subject.to_string()),
        (
            "{{sla_deadline}}".to_string(),
            sla_deadline.format("%Y-%m-%d %H:%M UTC").to_string(),
        ),
    ];

    send_email(to_email, subject, template_path, &placeholders).await
}

pub async fn send_ticket_resolved_email(
    to_email: &str,
    name: &str,
    ticket_subject: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let subject = "Your support ticket has been resolved";
    let template_path = "src/mail/templates/Ticket-resolved.html";
    let placeholders = vec![
        ("{{name}}".to_string(), name.to_string()),
        ("{{ticket_subject}}".to_string(), ticket_subject.to_string()),
    ];

    send_email(to_email, subject, template_path, &placeholders).await
}

pub async fn send_password_reset_email(
    to_email: &str,
    name: &str,
    reset_link: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let subject = "Reset your password";
    let template_path = "src/mail/templates/Reset-password.html";
    let placeholders = vec![
        ("{{name}}".to_string(), name.to_string()),
        ("{{reset_link}}".to_string(), reset_link.to_string()),
    ];

    send_email(to_email, subject, template_path, &placeholders).await
}
