pub mod activity_log;
pub mod auth_service;
pub mod key_service;
pub mod page_store;
pub mod rate_limiter;
pub mod settings_service;
pub mod webhook_service;
