pub mod auth;
pub mod backup_exchange;
pub mod core;
pub mod files;
pub mod setup;
pub mod students;
pub mod teachers;
