//! # atlas-secrets
//!
//! [`CredentialStore`](atlas_core::CredentialStore) implementation over AWS
//! Secrets Manager. Records are stored as JSON secret strings, optionally
//! encrypted with a customer-managed KMS key that is validated before use.

mod error;
mod store;

pub use store::{RECOVERY_WINDOW_DAYS, SecretsManagerStore, SecretsStoreConfig};
