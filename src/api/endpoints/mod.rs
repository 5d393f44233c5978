//! HTTP endpoint handlers.

pub mod health;
pub mod upload;
