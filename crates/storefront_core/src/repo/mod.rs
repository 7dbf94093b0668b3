//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Define transaction-scoped creators used by multi-entity orchestration.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Write paths validate entities before SQL mutations.
//! - Creators never open, commit or roll back; the scope belongs to the caller.

pub mod address_repo;
pub mod category_repo;
pub mod contact_repo;
pub mod error;
pub mod product_repo;
pub mod store;
pub mod tx_guard;
pub mod user_repo;
