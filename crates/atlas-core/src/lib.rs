//! # atlas-core
//!
//! Shared vocabulary for the Atlas organization provider.
//!
//! This crate defines the data model, the error taxonomy and classifier, and
//! the collaborator traits that backend clients implement. It does not talk
//! to any remote system itself; clients live in separate crates.
//!
//! ## Overview
//!
//! - [`OrganizationApi`] and [`CredentialStore`] are the two remote systems.
//! - [`ProviderError`] is the only error crossing that boundary; its
//!   [`ErrorKind`] decides between retry and persistent failure.
//! - [`SecretNamer`] derives credential-store keys.
//! - [`Outcome`] carries a primary result together with best-effort cleanup.

pub mod classify;
mod error;
pub mod naming;
mod outcome;
mod traits;
mod types;

pub use classify::{ApiErrorBody, classify_response, classify_status, classify_transport, error_for_status};
pub use error::{Backend, ErrorKind, ProviderError};
pub use naming::{DEFAULT_SECRET_NAMESPACE, SecretNamer};
pub use outcome::{CleanupAction, Outcome, SecondaryOutcome};
pub use traits::{CredentialStore, OrganizationApi};
pub use types::{
    ApiCredentials, ApiKeyDescriptor, CreateOrganizationInput, CreatedOrganization,
    CredentialRecord, Organization, OrganizationPatch, SecretMetadata,
};

/// Type alias for a provider result.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Type alias for a shareable organization API client.
pub type DynOrganizationApi = std::sync::Arc<dyn OrganizationApi>;

/// Type alias for a shareable credential store client.
pub type DynCredentialStore = std::sync::Arc<dyn CredentialStore>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use atlas_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{Backend, ErrorKind, ProviderError};
    pub use crate::outcome::{CleanupAction, Outcome, SecondaryOutcome};
    pub use crate::traits::{CredentialStore, OrganizationApi};
    pub use crate::types::{
        ApiCredentials, ApiKeyDescriptor, CreateOrganizationInput, CreatedOrganization,
        CredentialRecord, Organization, OrganizationPatch, SecretMetadata,
    };
    pub use crate::{DynCredentialStore, DynOrganizationApi, ProviderResult, SecretNamer};
}
