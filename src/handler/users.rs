use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::userdb::UserExt,
    dtos::userdtos::{
        FilterUserDto, ModerateUserDto, ModerationAction, RequestQueryDto, RoleUpdateDto,
        UpdateProfileDto, UserData, UserListResponseDto, UserResponseDto,
    },
    error::{ErrorMessage, HttpError},
    middleware::{role_check, JWTAuthMiddeware},
    models::usermodel::UserRole,
    AppState,
};

pub fn users_handler() -> Router {
    Router::new()
        // Listing is super_admin only, checked in the handler so the same
        // path can carry the self-service profile update.
        .route("/", get(get_users).put(update_profile))
        .route(
            "/role",
            put(update_role).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, vec![UserRole::SuperAdmin])
            })),
        )
        .route(
            "/:user_id/moderate",
            post(moderate_user).layer(middleware::from_fn(|state, req, next| {
                role_check(state, req, next, vec![UserRole::Agent, UserRole::SuperAdmin])
            })),
        )
}

pub async fn update_profile(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<UpdateProfileDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let user = app_state
        .db_client
        .update_user_profile(auth.user.id, body)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(UserResponseDto {
        status: "success".to_string(),
        data: UserData {
            user: FilterUserDto::filter_user(&user),
        },
    }))
}

pub async fn get_users(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Query(query_params): Query<RequestQueryDto>,
) -> Result<impl IntoResponse, HttpError> {
    if auth.user.role != UserRole::SuperAdmin {
        return Err(HttpError::forbidden(
            ErrorMessage::PermissionDenied.to_string(),
        ));
    }

    query_params
        .validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let page = query_params.page.unwrap_or(1);
    let limit = query_params.limit.unwrap_or(10);

    let users = app_state
        .db_client
        .get_users(page as u32, limit)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    let user_count = app_state
        .db_client
        .get_user_count()
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(UserListResponseDto {
        status: "success".to_string(),
        users: FilterUserDto::filter_users(&users),
        results: user_count,
    }))
}

pub async fn update_role(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<RoleUpdateDto>,
) -> Result<impl IntoResponse, HttpError> {
    if body.target_user_id == auth.user.id {
        return Err(HttpError::bad_request(
            "You cannot change your own role".to_string(),
        ));
    }

    let is_assigned = body.is_assigned.unwrap_or(true);

    let user = app_state
        .db_client
        .update_user_role(body.target_user_id, body.role, is_assigned)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => HttpError::not_found("User not found".to_string()),
            _ => HttpError::server_error(e.to_string()),
        })?;

    app_state
        .audit_service
        .log_role_change(
            auth.user.id,
            body.target_user_id,
            json!({ "role": body.role, "is_assigned": is_assigned }),
        )
        .await;

    Ok(Json(UserResponseDto {
        status: "success".to_string(),
        data: UserData {
            user: FilterUserDto::filter_user(&user),
        },
    }))
}

pub async fn moderate_user(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(user_id): Path<Uuid>,
    Json(body): Json<ModerateUserDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    if user_id == auth.user.id {
        return Err(HttpError::bad_request(
            "You cannot moderate your own account".to_string(),
        ));
    }

    let target = app_state
        .db_client
        .get_user(Some(user_id), None, None)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or_else(|| HttpError::not_found("User not found".to_string()))?;

    // Agents moderate students; moderating another staff account takes a
    // super admin.
    if target.role.is_staff() && auth.user.role != UserRole::SuperAdmin {
        return Err(HttpError::forbidden(
            ErrorMessage::PermissionDenied.to_string(),
        ));
    }

    let user = match body.action {
        ModerationAction::Ban => app_state
            .db_client
            .set_user_ban(user_id, true, body.ban_expires_at)
            .await
            .map_err(|e| HttpError::server_error(e.to_string()))?,
        ModerationAction::Unban => app_state
            .db_client
            .set_user_ban(user_id, false, None)
            .await
            .map_err(|e| HttpError::server_error(e.to_string()))?,
        ModerationAction::Revoke => {
            let reason = body.reason.as_deref().unwrap_or_default();
            app_state
                .db_client
                .revoke_user(user_id, reason)
                .await
                .map_err(|e| HttpError::server_error(e.to_string()))?
        }
    };

    app_state
        .audit_service
        .log_moderation(
            auth.user.id,
            user_id,
            json!({
                "action": body.action,
                "reason": body.reason,
                "ban_expires_at": body.ban_expires_at,
            }),
        )
        .await;

    Ok(Json(UserResponseDto {
        status: "success".to_string(),
        data: UserData {
            user: FilterUserDto::filter_user(&user),
        },
    }))
}
