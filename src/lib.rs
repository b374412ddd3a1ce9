//! Exam performance analytics.
//!
//! Every analysis is a pure function of a [`Dataset`] snapshot plus static
//! tables; nothing is cached or persisted. The only randomness is the rank
//! forecast, which draws from a caller-supplied `rand::Rng`.

pub mod aggregator;
pub mod analytics;
pub mod api;
pub mod config;
pub mod data;
pub mod dependency;
pub mod error;
pub mod guess;
pub mod model;
pub mod roi;
pub mod sequence;
pub mod simulation;
pub mod tables;
pub mod trends;

pub use analytics::{AnalyticsEngine, AnalyticsReport};
pub use config::EngineConfig;
pub use data::Dataset;
pub use error::{EngineError, Result};
