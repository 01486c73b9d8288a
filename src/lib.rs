//! vidhub - video sharing backend
//!
//! Videos with remote media assets, comments, tweets, playlists, likes and
//! channel subscriptions, served as a JSON API over axum.

pub mod account;
pub mod api;
pub mod asset_store;
pub mod auth;
pub mod config;
pub mod content;
pub mod context;
pub mod db;
pub mod error;
pub mod guard;
pub mod jobs;
pub mod media;
pub mod metrics;
pub mod pagination;
pub mod rate_limit;
pub mod relations;
pub mod server;

pub use config::ServerConfig;
pub use context::AppContext;
pub use error::{HubError, HubResult};
