use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::db::DBClient;
use crate::models::{ticketmodel::*, usermodel::User};

/// Insert payload for a new ticket. The handler has already run admission
/// control and derived priority and SLA deadline by the time this exists.
#[derive(Debug, Clone)]
pub struct NewTicket {
    pub user_id: Option<Uuid>,
    pub submitter_name: String,
    pub submitter_email: String,
    pub submitter_phone: Option<String>,
    pub subject: String,
    pub description: String,
    pub category: TicketCategory,
    pub priority: TicketPriority,
    pub sla_deadline: DateTime<Utc>,
    pub attachment_name: Option<String>,
    pub attachment_mime: Option<String>,
    pub attachment_size_bytes: Option<i64>,
    pub attachment_url: Option<String>,
}

/// Tagged row update. Whitelisted text fields and the assignment are
/// keep-if-None (an assignment can be replaced but not cleared through this
/// path); status, priority, sla_deadline and resolved_at are computed by the
/// handler and written verbatim.
#[derive(Debug, Clone)]
pub struct TicketRowUpdate {
    pub subject: Option<String>,
    pub description: Option<String>,
    pub category: Option<TicketCategory>,
    pub rating: Option<i16>,
    pub feedback: Option<String>,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    pub sla_deadline: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub assigned_to_email: Option<String>,
}

#[async_trait]
pub trait TicketExt {
    async fn create_ticket(&self, new_ticket: NewTicket) -> Result<Ticket, sqlx::Error>;

    async fn get_ticket(&self, ticket_id: Uuid) -> Result<Option<Ticket>, sqlx::Error>;

    /// Role-based row filtering: students see their own tickets, agents see
    /// tickets assigned to their email, super admins see everything.
    async fn get_tickets_for(
        &self,
        user: &User,
        limit: i64,
        offset: i64,
        status: Option<TicketStatus>,
    ) -> Result<Vec<Ticket>, sqlx::Error>;

    /// Tickets currently counting against the open-ticket cap. Read-then-act:
    /// the cap is soft, concurrent submissions at the threshold may overshoot.
    async fn count_open_tickets(&self) -> Result<i64, sqlx::Error>;

    async fn update_ticket(
        &self,
        ticket_id: Uuid,
        update: TicketRowUpdate,
    ) -> Result<Ticket, sqlx::Error>;

    /// Deletes child messages then the ticket inside one transaction.
    async fn delete_ticket(&self, ticket_id: Uuid) -> Result<(), sqlx::Error>;

    /// Housekeeping sweep: close resolved tickets older than the cutoff.
    /// Returns the number of tickets closed; idempotent.
    async fn close_stale_resolved(&self, cutoff: DateTime<Utc>) -> Result<u64, sqlx::Error>;

    async fn add_ticket_message(
        &self,
        ticket_id: Uuid,
        sender_id: Option<Uuid>,
        sender_name: Option<String>,
        sender_role: SenderRole,
        body: String,
    ) -> Result<TicketMessage, sqlx::Error>;

    async fn get_ticket_messages(
        &self,
        ticket_id: Uuid,
    ) -> Result<Vec<TicketMessage>, sqlx::Error>;
}

#[async_trait]
impl TicketExt for DBClient {
    async fn create_ticket(&self, new_ticket: NewTicket) -> Result<Ticket, sqlx::Error> {
        let ticket = sqlx::query_as::<_, Ticket>(
            r#"
            INSERT INTO tickets (
                user_id, submitter_name, submitter_email, submitter_phone,
                subject, description, category, status, priority, sla_deadline,
                attachment_name, attachment_mime, attachment_size_bytes, attachment_url
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING *
            "#,
        )
        .bind(new_ticket.user_id)
        .bind(new_ticket.submitter_name)
        .bind(new_ticket.submitter_email)
        .bind(new_ticket.submitter_phone)
        .bind(new_ticket.subject)
        .bind(new_ticket.description)
        .bind(new_ticket.category)
        .bind(TicketStatus::Open)
        .bind(new_ticket.priority)
        .bind(new_ticket.sla_deadline)
        .bind(new_ticket.attachment_name)
        .bind(new_ticket.attachment_mime)
        .bind(new_ticket.attachment_size_bytes)
        .bind(new_ticket.attachment_url)
        .fetch_one(&self.pool)
        .await?;

        Ok(ticket)
    }

    async fn get_ticket(&self, ticket_id: Uuid) -> Result<Option<Ticket>, sqlx::Error> {
        let ticket = sqlx::query_as::<_, Ticket>("SELECT * FROM tickets WHERE id = $1")
            .bind(ticket_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(ticket)
    }

    async fn get_tickets_for(
        &self,
        user: &User,
        limit: i64,
        offset: i64,
        status: Option<TicketStatus>,
    ) -> Result<Vec<Ticket>, sqlx::Error> {
        let tickets = sqlx::query_as::<_, Ticket>(
            r#"
            SELECT * FROM tickets
            WHERE ($1::ticket_status IS NULL OR status = $1)
              AND (
                CASE
                    WHEN $2 = 'super_admin' THEN TRUE
                    WHEN $2 = 'agent' THEN assigned_to_email = $3
                    ELSE (user_id = $4 OR submitter_email = $3)
                END
              )
            ORDER BY created_at DESC
            LIMIT $5 OFFSET $6
            "#,
        )
        .bind(status)
        .bind(user.role.to_str())
        .bind(&user.email)
        .bind(user.id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(tickets)
    }

    async fn count_open_tickets(&self) -> Result<i64, sqlx::Error> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM tickets WHERE status IN ('open', 'in_progress')",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(count.0)
    }

    async fn update_ticket(
        &self,
        ticket_id: Uuid,
        update: TicketRowUpdate,
    ) -> Result<Ticket, sqlx::Error> {
        let ticket = sqlx::query_as::<_, Ticket>(
            r#"
            UPDATE tickets
            SET subject = COALESCE($2, subject),
                description = COALESCE($3, description),
                category = COALESCE($4, category),
                rating = COALESCE($5, rating),
                feedback = COALESCE($6, feedback),
                status = $7,
                priority = $8,
                sla_deadline = $9,
                resolved_at = $10,
                assigned_to_email = COALESCE($11, assigned_to_email),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(ticket_id)
        .bind(update.subject)
        .bind(update.description)
        .bind(update.category)
        .bind(update.rating)
        .bind(update.feedback)
        .bind(update.status)
        .bind(update.priority)
        .bind(update.sla_deadline)
        .bind(update.resolved_at)
        .bind(update.assigned_to_email)
        .fetch_one(&self.pool)
        .await?;

        Ok(ticket)
    }

    async fn delete_ticket(&self, ticket_id: Uuid) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        // Children first so a failure never leaves orphaned messages.
        sqlx::query("DELETE FROM ticket_messages WHERE ticket_id = $1")
            .bind(ticket_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM tickets WHERE id = $1")
            .bind(ticket_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }

    async fn close_stale_resolved(&self, cutoff: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE tickets
            SET status = 'closed', updated_at = NOW()
            WHERE status = 'resolved'
              AND resolved_at IS NOT NULL
              AND resolved_at < $1
            "#,
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn add_ticket_message(
        &self,
        ticket_id: Uuid,
        sender_id: Option<Uuid>,
        sender_name: Option<String>,
        sender_role: SenderRole,
        body: String,
    ) -> Result<TicketMessage, sqlx::Error> {
        let message = sqlx::query_as::<_, TicketMessage>(
            r#"
            INSERT INTO ticket_messages (ticket_id, sender_id, sender_name, sender_role, body)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(ticket_id)
        .bind(sender_id)
        .bind(sender_name)
        .bind(sender_role)
        .bind(body)
        .fetch_one(&self.pool)
        .await?;

        Ok(message)
    }

    async fn get_ticket_messages(
        &self,
        ticket_id: Uuid,
    ) -> Result<Vec<TicketMessage>, sqlx::Error> {
        let messages = sqlx::query_as::<_, TicketMessage>(
            r#"
            SELECT * FROM ticket_messages
            WHERE ticket_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(ticket_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(messages)
    }
}
