pub mod admission;
pub mod ai_service;
pub mod audit_service;
pub mod notification_service;
pub mod settings_service;
