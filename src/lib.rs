//! Tokyo Map Agent
//!
//! Turns free-text geospatial requests into geodata queries, map layers and
//! multi-day itineraries. It includes:
//! - HTTP handlers (axum) for queries, trips, reviews and GeoJSON export
//! - the orchestration chain, dispatcher and validation-retry loop
//! - taxonomy, geodata and result-store services
//! - configuration models and the application error type

pub mod commands;
pub mod models;
pub mod services;
pub mod state;
pub mod utils;

pub use commands::router;
pub use models::response::*;
pub use models::settings::{AppConfig, SettingsUpdate};
pub use state::{AgentParts, AppState, SharedState};
pub use utils::error::{AppError, AppResult};
