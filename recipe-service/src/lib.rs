//! recipe-service: photo in, recipe out.
//!
//! The HTTP layer stores the upload, asks the food classifier what is in it and,
//! when something was found, asks the recipe generator how to cook it.

pub mod config;
pub mod dtos;
pub mod handlers;
pub mod services;
pub mod startup;
