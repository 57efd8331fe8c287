//! Mentor - a curriculum-aware learning companion

pub mod backend;
pub mod config;
pub mod curriculum;
pub mod dashboard;
pub mod error;
pub mod id;
pub mod progress;
pub mod prompt;
pub mod server;
pub mod session;
pub mod tutor;

pub use error::{Error, Result};
