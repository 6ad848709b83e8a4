use std::sync::Arc;

use axum::{
    http::{header, HeaderMap, StatusCode},
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::Cookie;
use chrono::{Duration, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::userdb::UserExt,
    dtos::userdtos::{
        FilterUserDto, ForgotPasswordRequestDto, LoginUserDto, RegisterUserDto,
        ResetPasswordRequestDto, Response, UserData, UserLoginResponseDto, UserResponseDto,
    },
    error::{ErrorMessage, HttpError},
    mail::mails::send_password_reset_email,
    middleware::{auth, JWTAuthMiddeware},
    models::usermodel::UserRole,
    utils::{password, token},
    AppState,
};

pub fn auth_handler() -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
        .route("/me", get(get_me).layer(middleware::from_fn(auth)))
}

pub async fn get_me(
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    Ok(Json(UserResponseDto {
        status: "success".to_string(),
        data: UserData {
            user: FilterUserDto::filter_user(&auth.user),
        },
    }))
}

pub async fn register(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<RegisterUserDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let role = body.role.unwrap_or(UserRole::Student);

    let hashed_password =
        password::hash(&body.password).map_err(|e| HttpError::bad_request(e.to_string()))?;

    let result = app_state
        .db_client
        .save_user(body.name, body.email, hashed_password, role)
        .await;

    match result {
        Ok(user) => Ok((
            StatusCode::CREATED,
            Json(UserResponseDto {
                status: "success".to_string(),
                data: UserData {
                    user: FilterUserDto::filter_user(&user),
                },
            }),
        )),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            Err(HttpError::bad_request(ErrorMessage::EmailExist.to_string()))
        }
        Err(e) => Err(HttpError::server_error(e.to_string())),
    }
}

pub async fn login(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<LoginUserDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let user = app_state
        .db_client
        .get_user(None, Some(&body.email), None)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or_else(|| HttpError::bad_request(ErrorMessage::WrongCredentials.to_string()))?;

    // Account standing is checked before the password so a revoked or banned
    // account fails the same way regardless of what was typed.
    if let Some(refusal) = user.login_refusal(Utc::now()) {
        return Err(HttpError::forbidden(refusal.to_string()));
    }

    let password_matched = password::compare(&body.password, &user.password)
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    if !password_matched {
        return Err(HttpError::bad_request(
            ErrorMessage::WrongCredentials.to_string(),
        ));
    }

    let token = token::create_token(
        &user.id.to_string(),
        user.role.to_str(),
        app_state.env.jwt_secret.as_bytes(),
        app_state.env.jwt_maxage,
    )
    .map_err(|e| HttpError::server_error(e.to_string()))?;

    let cookie = Cookie::build(("token", token.clone()))
        .path("/")
        .max_age(time::Duration::minutes(app_state.env.jwt_maxage))
        .http_only(true)
        .build();

    let mut headers = HeaderMap::new();
    headers.append(
        header::SET_COOKIE,
        cookie
            .to_string()
            .parse()
            .map_err(|_| HttpError::server_error("Failed to build auth cookie".to_string()))?,
    );

    let response = Json(UserLoginResponseDto {
        status: "success".to_string(),
        token,
    });

    Ok((headers, response))
}

pub async fn forgot_password(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<ForgotPasswordRequestDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let user = app_state
        .db_client
        .get_user(None, Some(&body.email), None)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    // The response is identical whether or not the account exists.
    if let Some(user) = user {
        let reset_token = Uuid::new_v4().to_string();
        let expires_at = Utc::now() + Duration::minutes(30);

        app_state
            .db_client
            .add_reset_token(user.id, &reset_token, expires_at)
            .await
            .map_err(|e| HttpError::server_error(e.to_string()))?;

        let reset_link = format!("{}/reset-password?token={}", app_state.env.app_url, reset_token);
        let email = user.email.clone();
        let name = user.name.clone();

        tokio::spawn(async move {
            if let Err(e) = send_password_reset_email(&email, &name, &reset_link).await {
                tracing::warn!("password reset email to {} failed: {}", email, e);
            }
        });
    }

    Ok(Json(Response {
        status: "success",
        message: "If that email is registered, a password reset link has been sent".to_string(),
    }))
}

pub async fn reset_password(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<ResetPasswordRequestDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let user = app_state
        .db_client
        .get_user(None, None, Some(&body.token))
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or_else(|| HttpError::bad_request("Invalid or expired reset token".to_string()))?;

    let still_valid = user
        .token_expires_at
        .map_or(false, |expires_at| expires_at > Utc::now());
    if !still_valid {
        return Err(HttpError::bad_request(
            "Invalid or expired reset token".to_string(),
        ));
    }

    let hashed_password =
        password::hash(&body.new_password).map_err(|e| HttpError::bad_request(e.to_string()))?;

    app_state
        .db_client
        .update_user_password(user.id, hashed_password)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    app_state
        .db_client
        .clear_reset_token(&body.token)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(Response {
        status: "success",
        message: "Password has been reset. You can now log in.".to_string(),
    }))
}
