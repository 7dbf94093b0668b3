//! Password hashing capability.
//!
//! # Responsibility
//! - Define the hashing capability injected into account registration.
//! - Provide the bcrypt implementation used for stored account passwords.
//!
//! # Invariants
//! - Encoded hashes are modular-crypt bcrypt strings (`$2b$<cost>$...`) that
//!   carry their own salt and cost.
//! - Secrets bcrypt would silently truncate are rejected instead.
//! - Plaintext secrets are never logged or stored.

use std::error::Error;
use std::fmt::{Display, Formatter};

const MIN_COST: u32 = 4;
const MAX_COST: u32 = 31;
/// bcrypt only reads this many bytes of input.
pub const MAX_SECRET_BYTES: usize = 72;

/// Converts a plaintext secret into a storable representation.
pub trait SecretHasher {
    fn hash(&self, secret: &str) -> Result<String, HashError>;
}

impl<H: SecretHasher + ?Sized> SecretHasher for &H {
    fn hash(&self, secret: &str) -> Result<String, HashError> {
        (**self).hash(secret)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HashError {
    EmptySecret,
    SecretTooLong { max_bytes: usize },
    InvalidCost(u32),
    /// Stored value is not an encoded hash this hasher understands.
    MalformedHash,
    /// Backend-specific failure (e.g. an external KDF service).
    Backend(String),
}

impl Display for HashError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptySecret => write!(f, "secret must not be empty"),
            Self::SecretTooLong { max_bytes } => {
                write!(f, "secret must be at most {max_bytes} bytes")
            }
            Self::InvalidCost(value) => write!(
                f,
                "bcrypt cost must be between {MIN_COST} and {MAX_COST}, got {value}"
            ),
            Self::MalformedHash => write!(f, "stored hash is malformed"),
            Self::Backend(message) => write!(f, "{message}"),
        }
    }
}

impl Error for HashError {}

/// bcrypt hasher with a configurable cost.
#[derive(Debug, Clone, Copy)]
pub struct BcryptSecretHasher {
    cost: u32,
}

impl BcryptSecretHasher {
    pub fn new() -> Self {
        Self {
            cost: bcrypt::DEFAULT_COST,
        }
    }

    /// Overrides the work factor; tests use the minimum to stay fast.
    pub fn with_cost(cost: u32) -> Result<Self, HashError> {
        if !(MIN_COST..=MAX_COST).contains(&cost) {
            return Err(HashError::InvalidCost(cost));
        }
        Ok(Self { cost })
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Checks `secret` against a hash produced by [`SecretHasher::hash`].
    ///
    /// The cost and salt are read from `encoded`, not from `self`.
    pub fn verify(&self, secret: &str, encoded: &str) -> Result<bool, HashError> {
        if secret.len() > MAX_SECRET_BYTES {
            return Ok(false);
        }
        bcrypt::verify(secret, encoded).map_err(|_| HashError::MalformedHash)
    }
}

impl Default for BcryptSecretHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl SecretHasher for BcryptSecretHasher {
    fn hash(&self, secret: &str) -> Result<String, HashError> {
        if secret.is_empty() {
            return Err(HashError::EmptySecret);
        }
        if secret.len() > MAX_SECRET_BYTES {
            return Err(HashError::SecretTooLong {
                max_bytes: MAX_SECRET_BYTES,
            });
        }
        bcrypt::hash(secret, self.cost).map_err(|err| HashError::Backend(err.to_string()))
    }
}
