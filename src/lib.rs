pub mod config;
pub mod download;
pub mod error;
pub mod fetch;
pub mod guard;
pub mod handlers;
pub mod models;
pub mod og;
pub mod state;
