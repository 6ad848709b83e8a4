use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::ticketdb::{NewTicket, TicketExt, TicketRowUpdate},
    dtos::ticketdtos::{CreateMessageDto, CreateTicketDto, DeflectRequestDto, UpdateTicketDto},
    error::{ErrorMessage, HttpError},
    middleware::{require_user, resolve_user},
    models::ticketmodel::{
        next_resolved_at, SenderRole, TicketQueryParams, TicketStatus, TicketWithMessages,
    },
    service::admission::{score_priority, sla_deadline},
    AppState,
};

// Submission and messaging accept anonymous callers, so this router carries
// no auth layer; each handler resolves the caller itself.
pub fn tickets_handler() -> Router {
    Router::new()
        .route("/", post(create_ticket).get(list_tickets))
        .route("/deflect", post(deflect))
        .route(
            "/:ticket_id",
            get(get_ticket).put(update_ticket).delete(delete_ticket),
        )
        .route(
            "/:ticket_id/messages",
            get(get_ticket_messages).post(add_message),
        )
        .route("/:ticket_id/analyze", post(analyze_ticket))
        .route("/:ticket_id/smart-reply", post(smart_reply))
}

pub async fn create_ticket(
    Extension(app_state): Extension<Arc<AppState>>,
    cookie_jar: CookieJar,
    headers: HeaderMap,
    Json(body): Json<CreateTicketDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let user = resolve_user(&app_state, &cookie_jar, &headers).await?;

    app_state
        .admission_service
        .admit(user.as_ref(), body.attachment.as_ref())
        .await?;

    let (user_id, submitter_name, submitter_email, submitter_phone) = match &user {
        Some(user) => (
            Some(user.id),
            body.name.clone().unwrap_or_else(|| user.name.clone()),
            user.email.clone(),
            body.phone.clone().or_else(|| user.phone.clone()),
        ),
        None => {
            let name = body.name.clone().ok_or_else(|| {
                HttpError::bad_request("Name is required for anonymous submissions".to_string())
            })?;
            let email = body.email.clone().ok_or_else(|| {
                HttpError::bad_request("Email is required for anonymous submissions".to_string())
            })?;
            (None, name, email, body.phone.clone())
        }
    };

    // An explicit priority is honored; otherwise the keyword heuristic
    // scores the text at the configured sensitivity.
    let priority = match body.priority {
        Some(priority) => priority,
        None => {
            let sensitivity = app_state
                .settings_service
                .ai_sensitivity()
                .await
                .map_err(|e| HttpError::server_error(e.to_string()))?;
            score_priority(&body.subject, &body.description, sensitivity)
        }
    };

    let peak_mode = app_state
        .settings_service
        .sla_peak_mode()
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;
    let created_at = Utc::now();

    let new_ticket = NewTicket {
        user_id,
        submitter_name,
        submitter_email,
        submitter_phone,
        subject: body.subject,
        description: body.description,
        category: body.category,
        priority,
        sla_deadline: sla_deadline(created_at, priority, peak_mode),
        attachment_name: body.attachment.as_ref().map(|a| a.name.clone()),
        attachment_mime: body.attachment.as_ref().map(|a| a.mime.clone()),
        attachment_size_bytes: body.attachment.as_ref().map(|a| a.size_bytes),
        attachment_url: body.attachment.as_ref().map(|a| a.url.clone()),
    };

    let ticket = app_state
        .db_client
        .create_ticket(new_ticket)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    app_state.notification_service.notify_ticket_created(&ticket).await;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "data": ticket
        })),
    ))
}

pub async fn list_tickets(
    Extension(app_state): Extension<Arc<AppState>>,
    cookie_jar: CookieJar,
    headers: HeaderMap,
    Query(params): Query<TicketQueryParams>,
) -> Result<impl IntoResponse, HttpError> {
    let user = require_user(&app_state, &cookie_jar, &headers).await?;

    let page = params.page.unwrap_or(1).max(1);
    let limit = params.limit.unwrap_or(20).clamp(1, 100) as i64;
    let offset = ((page - 1) as i64) * limit;

    let tickets = app_state
        .db_client
        .get_tickets_for(&user, limit, offset, params.status)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(json!({
        "status": "success",
        "data": {
            "tickets": tickets,
            "page": page,
            "limit": limit
        }
    })))
}

pub async fn get_ticket(
    Extension(app_state): Extension<Arc<AppState>>,
    cookie_jar: CookieJar,
    headers: HeaderMap,
    Path(ticket_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let user = require_user(&app_state, &cookie_jar, &headers).await?;

    let ticket = app_state
        .db_client
        .get_ticket(ticket_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or_else(|| HttpError::not_found("Ticket not found".to_string()))?;

    if !ticket.can_be_viewed_by(&user) {
        return Err(HttpError::forbidden(
            ErrorMessage::PermissionDenied.to_string(),
        ));
    }

    let messages = app_state
        .db_client
        .get_ticket_messages(ticket_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(json!({
        "status": "success",
        "data": TicketWithMessages { ticket, messages }
    })))
}

pub async fn update_ticket(
    Extension(app_state): Extension<Arc<AppState>>,
    cookie_jar: CookieJar,
    headers: HeaderMap,
    Path(ticket_id): Path<Uuid>,
    Json(body): Json<UpdateTicketDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let user = require_user(&app_state, &cookie_jar, &headers).await?;

    let current = app_state
        .db_client
        .get_ticket(ticket_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or_else(|| HttpError::not_found("Ticket not found".to_string()))?;

    let is_staff = user.role.is_staff();
    let is_submitter = current.is_submitter(&user);

    if !is_staff && !is_submitter {
        return Err(HttpError::forbidden(
            ErrorMessage::PermissionDenied.to_string(),
        ));
    }

    if !is_staff && body.touches_staff_fields() {
        return Err(HttpError::forbidden(
            "Only staff can change status, priority or assignment".to_string(),
        ));
    }

    if body.rating.is_some() || body.feedback.is_some() {
        if !is_submitter {
            return Err(HttpError::forbidden(
                "Only the submitter can rate a ticket".to_string(),
            ));
        }
        if !matches!(current.status, TicketStatus::Resolved | TicketStatus::Closed) {
            return Err(HttpError::bad_request(
                "A ticket can only be rated after it has been resolved".to_string(),
            ));
        }
    }

    let new_status = body.status.unwrap_or(current.status);
    let new_priority = body.priority.unwrap_or(current.priority);

    let resolved_at =
        next_resolved_at(current.status, new_status, current.resolved_at, Utc::now());

    // The SLA window is recomputed on an explicit priority write, anchored
    // at the original creation time.
    let sla = if body.priority.is_some() {
        let peak_mode = app_state
            .settings_service
            .sla_peak_mode()
            .await
            .map_err(|e| HttpError::server_error(e.to_string()))?;
        sla_deadline(current.created_at, new_priority, peak_mode)
    } else {
        current.sla_deadline
    };

    let update = TicketRowUpdate {
        subject: body.subject,
        description: body.description,
        category: body.category,
        rating: body.rating,
        feedback: body.feedback,
        status: new_status,
        priority: new_priority,
        sla_deadline: sla,
        resolved_at,
        assigned_to_email: body.assigned_to_email,
    };

    let ticket = app_state
        .db_client
        .update_ticket(ticket_id, update)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    if new_status == TicketStatus::Resolved && current.status != TicketStatus::Resolved {
        app_state
            .notification_service
            .notify_ticket_resolved(&ticket)
            .await;
    }

    Ok(Json(json!({
        "status": "success",
        "data": ticket
    })))
}

pub async fn delete_ticket(
    Extension(app_state): Extension<Arc<AppState>>,
    cookie_jar: CookieJar,
    headers: HeaderMap,
    Path(ticket_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let user = require_user(&app_state, &cookie_jar, &headers).await?;

    if !user.role.is_staff() {
        return Err(HttpError::forbidden(
            ErrorMessage::PermissionDenied.to_string(),
        ));
    }

    let ticket = app_state
        .db_client
        .get_ticket(ticket_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or_else(|| HttpError::not_found("Ticket not found".to_string()))?;

    app_state
        .db_client
        .delete_ticket(ticket_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    app_state
        .audit_service
        .log_ticket_delete(
            user.id,
            ticket_id,
            json!({
                "subject": ticket.subject,
                "submitter_email": ticket.submitter_email,
            }),
        )
        .await;

    Ok(Json(json!({
        "status": "success",
        "message": "Ticket and its messages have been deleted"
    })))
}

pub async fn get_ticket_messages(
    Extension(app_state): Extension<Arc<AppState>>,
    cookie_jar: CookieJar,
    headers: HeaderMap,
    Path(ticket_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let user = require_user(&app_state, &cookie_jar, &headers).await?;

    let ticket = app_state
        .db_client
        .get_ticket(ticket_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or_else(|| HttpError::not_found("Ticket not found".to_string()))?;

    if !ticket.can_be_viewed_by(&user) {
        return Err(HttpError::forbidden(
            ErrorMessage::PermissionDenied.to_string(),
        ));
    }

    let messages = app_state
        .db_client
        .get_ticket_messages(ticket_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(json!({
        "status": "success",
        "data": messages
    })))
}

pub async fn add_message(
    Extension(app_state): Extension<Arc<AppState>>,
    cookie_jar: CookieJar,
    headers: HeaderMap,
    Path(ticket_id): Path<Uuid>,
    Json(body): Json<CreateMessageDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let user = resolve_user(&app_state, &cookie_jar, &headers).await?;

    let ticket = app_state
        .db_client
        .get_ticket(ticket_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or_else(|| HttpError::not_found("Ticket not found".to_string()))?;

    // Authenticated callers must be staff or the submitter. An anonymous
    // caller holding the ticket id posts as the submitter.
    let (sender_id, sender_name, sender_role) = match &user {
        Some(user) => {
            if !ticket.can_be_viewed_by(user) {
                return Err(HttpError::forbidden(
                    ErrorMessage::PermissionDenied.to_string(),
                ));
            }
            (
                Some(user.id),
                Some(user.name.clone()),
                SenderRole::from(user.role),
            )
        }
        None => (
            None,
            body.sender_name
                .clone()
                .or_else(|| Some(ticket.submitter_name.clone())),
            SenderRole::Student,
        ),
    };

    let message = app_state
        .db_client
        .add_ticket_message(ticket_id, sender_id, sender_name, sender_role, body.body)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    // A staff reply on a fresh ticket moves it into triage.
    let staff_reply = user.as_ref().map_or(false, |u| u.role.is_staff());
    if staff_reply && ticket.status == TicketStatus::Open {
        let update = TicketRowUpdate {
            subject: None,
            description: None,
            category: None,
            rating: None,
            feedback: None,
            status: TicketStatus::InProgress,
            priority: ticket.priority,
            sla_deadline: ticket.sla_deadline,
            resolved_at: ticket.resolved_at,
            assigned_to_email: None,
        };
        app_state
            .db_client
            .update_ticket(ticket_id, update)
            .await
            .map_err(|e| HttpError::server_error(e.to_string()))?;
    }

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "data": message
        })),
    ))
}

pub async fn analyze_ticket(
    Extension(app_state): Extension<Arc<AppState>>,
    cookie_jar: CookieJar,
    headers: HeaderMap,
    Path(ticket_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let user = require_user(&app_state, &cookie_jar, &headers).await?;

    if !user.role.is_staff() {
        return Err(HttpError::forbidden(
            ErrorMessage::PermissionDenied.to_string(),
        ));
    }

    let ticket = app_state
        .db_client
        .get_ticket(ticket_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or_else(|| HttpError::not_found("Ticket not found".to_string()))?;

    let analysis = app_state
        .ai_service
        .analyze_ticket(&ticket.subject, &ticket.description)
        .await?;

    Ok(Json(json!({
        "status": "success",
        "data": analysis
    })))
}

pub async fn smart_reply(
    Extension(app_state): Extension<Arc<AppState>>,
    cookie_jar: CookieJar,
    headers: HeaderMap,
    Path(ticket_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let user = require_user(&app_state, &cookie_jar, &headers).await?;

    if !user.role.is_staff() {
        return Err(HttpError::forbidden(
            ErrorMessage::PermissionDenied.to_string(),
        ));
    }

    let ticket = app_state
        .db_client
        .get_ticket(ticket_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or_else(|| HttpError::not_found("Ticket not found".to_string()))?;

    let messages = app_state
        .db_client
        .get_ticket_messages(ticket_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    let reply = app_state.ai_service.smart_reply(&ticket, &messages).await?;

    Ok(Json(json!({
        "status": "success",
        "data": { "reply": reply }
    })))
}

// Pre-submission FAQ check; open to anonymous callers drafting a ticket.
pub async fn deflect(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<DeflectRequestDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let suggestion = app_state
        .ai_service
        .suggest_deflection(&body.subject, &body.description)
        .await?;

    Ok(Json(json!({
        "status": "success",
        "data": suggestion
    })))
}
