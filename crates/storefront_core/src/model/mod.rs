//! Store domain model.
//!
//! # Responsibility
//! - Define the records persisted by the store backend.
//! - Keep structural validation next to the data it guards.
//!
//! # Invariants
//! - Generated identifiers are `0` until a row is persisted.
//! - Timestamps are epoch milliseconds assigned by storage.

pub mod account;
pub mod address;
pub mod aggregate;
pub mod category;
pub mod contact;
pub mod product;
pub mod validation;
