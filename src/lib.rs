pub mod api;
pub mod config;
pub mod database;
pub mod error;
pub mod export;
pub mod models;

pub use error::{Error, Result, ValidationError};
pub use models::{ReviewQuality, ReviewRecord, ReviewSession, ReviewState, ScheduledReview};
