// Public API for integration tests and potential library usage

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod feed;
pub mod protocol;
pub mod scoring;
pub mod state;
pub mod store;
pub mod types;
pub mod words;
pub mod ws;
