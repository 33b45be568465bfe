//! formchat-core: client library for the formchat assistant backend
//!
//! This crate provides the typed data model, the HTTP client, display
//! formatting and the view state machines shared by the formchat terminal
//! UI and command-line client.

pub mod client;
pub mod config;
pub mod display;
pub mod error;
pub mod models;
pub mod paths;
pub mod route;
pub mod views;

pub use client::{Api, ApiClient};
pub use config::Config;
pub use error::Error;
pub use error::Result;
pub use route::Route;

/// Application name used for config directories and paths.
pub const APP_NAME: &str = "formchat";

/// Returns the environment variable prefix for this application.
pub fn env_prefix() -> String {
    "FORMCHAT".to_string()
}
