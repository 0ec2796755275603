//! doorstep — home-service appointment scheduling.
//!
//! The core is the availability engine in [`engine`]: interval algebra,
//! free-interval computation, route-constrained filtering, and preference
//! resolution. Collaborators (calendar store, route estimator, intent
//! extractor) sit behind trait seams with reference implementations.

pub mod calendar;
pub mod config;
pub mod engine;
pub mod intent;
pub mod model;
pub mod observability;
pub mod route;
pub mod wire;
