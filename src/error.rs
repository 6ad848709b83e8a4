use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, PartialEq)]
pub enum ErrorMessage {
    EmptyPassword,
    ExceededMaxPasswordLength(usize),
    HashingError,
    InvalidHashFormat,
    InvalidToken,
    WrongCredentials,
    EmailExist,
    UserNoLongerExist,
    TokenNotProvided,
    PermissionDenied,
    UserNotAuthenticated,
    AccountNotAssigned,
    AccountRevoked,
    AccountBanned,
}

impl ToString for ErrorMessage {
    fn to_string(&self) -> String {
        self.to_str().to_owned()
    }
}

impl ErrorMessage {
    fn to_str(&self) -> String {
        match self {
            ErrorMessage::WrongCredentials => "Email or password is wrong".to_string(),
            ErrorMessage::EmailExist => "A user with this email already exists".to_string(),
            ErrorMessage::UserNoLongerExist => {
                "User belonging to this token no longer exists".to_string()
            }
            ErrorMessage::EmptyPassword => "Password cannot be empty".to_string(),
            ErrorMessage::HashingError => "Error while hashing password".to_string(),
            ErrorMessage::InvalidHashFormat => "Invalid password hash format".to_string(),
            ErrorMessage::ExceededMaxPasswordLength(max_length) => {
                format!("Password must not be more than {} characters", max_length)
            }
            ErrorMessage::InvalidToken => "Authentication token is invalid or expired".to_string(),
            ErrorMessage::TokenNotProvided => "You are not logged in, please provide a token".to_string(),
            ErrorMessage::PermissionDenied => "You are not allowed to perform this action".to_string(),
            ErrorMessage::UserNotAuthenticated => "Authentication required. Please log in.".to_string(),
            ErrorMessage::AccountNotAssigned => {
                "This staff account has not been assigned yet".to_string()
            }
            ErrorMessage::AccountRevoked => "This account has been permanently revoked".to_string(),
            ErrorMessage::AccountBanned => "This account is currently banned".to_string(),
        }
    }
}

/// Response body for rejections that name the specific rule tripped,
/// e.g. `{"error": "Maintenance Mode", "message": "..."}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct RejectionResponse {
    pub error: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct HttpError {
    pub message: String,
    pub status: StatusCode,
    /// Set only for admission rejections; carried into the response body.
    pub error_label: Option<String>,
}

impl HttpError {
    pub fn new(message: impl Into<String>, status: StatusCode) -> Self {
        HttpError {
            message: message.into(),
            status,
            error_label: None,
        }
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        HttpError::new(message, StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        HttpError::new(message, StatusCode::BAD_REQUEST)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        HttpError::new(message, StatusCode::UNAUTHORIZED)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        HttpError::new(message, StatusCode::FORBIDDEN)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        HttpError::new(message, StatusCode::NOT_FOUND)
    }

    /// Admission rejection with a named rule.
    pub fn rejection(
        label: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        HttpError {
            message: message.into(),
            status,
            error_label: Some(label.into()),
        }
    }

    pub fn into_http_response(self) -> axum::response::Response {
        if let Some(label) = self.error_label {
            return (
                self.status,
                Json(RejectionResponse {
                    error: label,
                    message: self.message,
                }),
            )
                .into_response();
        }

        let status_text = if self.status.is_client_error() {
            "fail"
        } else {
            "error"
        };

        (
            self.status,
            Json(ErrorResponse {
                status: status_text.to_string(),
                message: self.message,
            }),
        )
            .into_response()
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "HttpError: message: {}, status: {}",
            self.message, self.status
        )
    }
}

impl std::error::Error for HttpError {}

impl IntoResponse for HttpError {
    fn into_response(self) -> axum::response::Response {
        // Server-side detail stays in the logs; the client sees a generic message.
        if self.status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("internal error: {}", self.message);
            return HttpError::new("Something went wrong", StatusCode::INTERNAL_SERVER_ERROR)
                .into_http_response();
        }
        self.into_http_response()
    }
}
