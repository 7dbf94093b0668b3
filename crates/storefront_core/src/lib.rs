//! Core domain logic for the storefront backend.
//! This crate is the single source of truth for store business invariants.

pub mod context;
pub mod db;
pub mod hashing;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use context::{CallContext, CancelHandle, ContextState};
pub use hashing::{BcryptSecretHasher, HashError, SecretHasher};
pub use logging::{default_log_level, init_logging, init_logging_with, logging_status, LogTarget};
pub use model::account::{Account, EntityId};
pub use model::address::Address;
pub use model::aggregate::{validate_aggregate, CreateFullRequest, UserAggregate};
pub use model::category::{Category, CategoryMembership};
pub use model::contact::ContactInfo;
pub use model::product::Product;
pub use model::validation::ValidationError;
pub use repo::address_repo::{
    AddressCreator, AddressRepository, SqliteAddressCreator, SqliteAddressRepository,
};
pub use repo::category_repo::{
    CategoryRepository, MembershipCreator, SqliteCategoryRepository, SqliteMembershipCreator,
};
pub use repo::contact_repo::{
    ContactCreator, ContactRepository, SqliteContactCreator, SqliteContactRepository,
};
pub use repo::error::{RepoError, RepoResult};
pub use repo::product_repo::{ProductListQuery, ProductRepository, SqliteProductRepository};
pub use repo::store::{ResourceManager, SqliteStore, SqliteTx, TxHandle};
pub use repo::tx_guard::TxGuard;
pub use repo::user_repo::{
    AccountCreator, SqliteAccountCreator, SqliteUserRepository, UserRepository,
};
pub use service::catalog_service::CatalogService;
pub use service::user_service::{CreateFullError, CreateStep, UserCreators, UserService};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
