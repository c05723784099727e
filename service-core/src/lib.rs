//! service-core: Shared infrastructure for the recipe workspace services.
pub mod config;
pub mod error;
pub mod middleware;
pub mod observability;

