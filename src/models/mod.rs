pub mod activity;
pub mod api_key;
pub mod page;
pub mod settings;
pub mod webhook;
