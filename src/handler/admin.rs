use std::sync::Arc;

use axum::{
    extract::Query,
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{Duration, Utc};
use serde_json::{json, Map, Value};
use validator::Validate;

use crate::{
    db::{admindb::AdminExt, ticketdb::TicketExt},
    dtos::{
        admindtos::{CleanupResponseDto, PublicSettingsDto, UpdateSettingsDto},
        userdtos::RequestQueryDto,
    },
    error::{ErrorMessage, HttpError},
    middleware::{role_check, JWTAuthMiddeware},
    models::usermodel::UserRole,
    AppState,
};

pub fn admin_handler() -> Router {
    Router::new()
        // Reads are open to all staff; writes are re-checked in the handler.
        .route(
            "/settings",
            get(get_settings)
                .post(update_settings)
                .layer(middleware::from_fn(|state, req, next| {
                    role_check(state, req, next, vec![UserRole::Agent, UserRole::SuperAdmin])
                })),
        )
        .route(
            "/audit-logs",
            get(get_audit_logs).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, vec![UserRole::SuperAdmin])
            })),
        )
        .route(
            "/system/cleanup",
            post(run_cleanup).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, vec![UserRole::SuperAdmin])
            })),
        )
}

pub fn public_handler() -> Router {
    Router::new().route("/settings", get(public_settings))
}

pub async fn get_settings(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let settings = app_state
        .db_client
        .get_all_settings()
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    let mut data = Map::new();
    for setting in settings {
        data.insert(setting.key, setting.value);
    }

    Ok(Json(json!({
        "status": "success",
        "data": Value::Object(data)
    })))
}

pub async fn update_settings(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<UpdateSettingsDto>,
) -> Result<impl IntoResponse, HttpError> {
    if auth.user.role != UserRole::SuperAdmin {
        return Err(HttpError::forbidden(
            ErrorMessage::PermissionDenied.to_string(),
        ));
    }

    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    for (key, value) in &body.settings {
        app_state
            .db_client
            .set_setting(key, value)
            .await
            .map_err(|e| HttpError::server_error(e.to_string()))?;
    }

    app_state
        .audit_service
        .log_settings_change(auth.user.id, json!(body.settings))
        .await;

    let settings = app_state
        .db_client
        .get_all_settings()
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    let mut data = Map::new();
    for setting in settings {
        data.insert(setting.key, setting.value);
    }

    Ok(Json(json!({
        "status": "success",
        "data": Value::Object(data)
    })))
}

pub async fn get_audit_logs(
    Extension(app_state): Extension<Arc<AppState>>,
    Query(query_params): Query<RequestQueryDto>,
) -> Result<impl IntoResponse, HttpError> {
    query_params
        .validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let page = query_params.page.unwrap_or(1);
    let limit = query_params.limit.unwrap_or(50);
    let offset = ((page - 1) * limit) as i64;

    let logs = app_state
        .db_client
        .get_audit_logs(limit as i64, offset)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(json!({
        "status": "success",
        "data": {
            "logs": logs,
            "page": page,
            "limit": limit
        }
    })))
}

/// Closes resolved tickets older than the configured window. Safe to run
/// repeatedly; a second sweep finds nothing left to close.
pub async fn run_cleanup(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let rules = app_state
        .settings_service
        .housekeeping_rules()
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    if !rules.enabled {
        return Err(HttpError::bad_request("Housekeeping is disabled".to_string()));
    }

    let cutoff = Utc::now() - Duration::days(rules.auto_close_resolved_days);

    let closed = app_state
        .db_client
        .close_stale_resolved(cutoff)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    app_state.audit_service.log_cleanup(auth.user.id, closed).await;

    Ok(Json(CleanupResponseDto {
        status: "success".to_string(),
        closed,
    }))
}

/// Unauthenticated snapshot for the landing page: the announcement banner,
/// availability flags and the live open-ticket count.
pub async fn public_settings(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let announcement_banner = app_state
        .settings_service
        .announcement_banner()
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    let maintenance_mode = app_state
        .settings_service
        .maintenance_mode()
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    let submissions_locked = app_state
        .settings_service
        .submissions_locked()
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    let open_tickets = app_state
        .db_client
        .count_open_tickets()
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(json!({
        "status": "success",
        "data": PublicSettingsDto {
            announcement_banner,
            maintenance_mode,
            submissions_locked,
            open_tickets,
        }
    })))
}
