//! Service layer orchestration for store use-cases.
//!
//! # Responsibility
//! - Coordinate validation, hashing and transaction scope above repositories.
//! - Keep storage details behind repository and resource-manager traits.

pub mod catalog_service;
pub mod user_service;
