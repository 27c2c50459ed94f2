pub mod health;
pub mod keys;
pub mod logs;
pub mod pages;
pub mod settings;
