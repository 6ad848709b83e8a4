use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

/// Upserts one or more settings keys in a single request.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateSettingsDto {
    #[validate(length(min = 1, message = "At least one setting is required"))]
    pub settings: HashMap<String, Value>,
}

/// Unauthenticated snapshot served to the landing page.
#[derive(Debug, Serialize, Deserialize)]
pub struct PublicSettingsDto {
    pub announcement_banner: Option<String>,
    pub maintenance_mode: bool,
    pub submissions_locked: bool,
    pub open_tickets: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CleanupResponseDto {
    pub status: String,
    pub closed: u64,
}
