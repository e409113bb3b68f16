pub mod auth;
pub mod config;
pub mod db;
pub mod dictionary;
pub mod error;
pub mod metrics;
pub mod providers;
pub mod recorder;
pub mod records;
pub mod retry;
pub mod routes;
pub mod scheduler;
pub mod server;
pub mod state;
pub mod translation;
