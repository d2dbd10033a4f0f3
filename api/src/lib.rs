//! Bakery demand prediction API.
//!
//! Serves a pre-trained regression model that predicts how many units of a
//! menu item to bake, given the previous day's sales and the day of week.

pub mod app;
pub mod config;
pub mod error;
pub mod handler;
pub mod model;
pub mod prediction;
pub mod schema;

pub use error::{PredictError, PredictErrorKind};
