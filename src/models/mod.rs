//! Data Models
//!
//! HTTP bodies and service configuration.

pub mod response;
pub mod settings;

pub use response::*;
pub use settings::*;
