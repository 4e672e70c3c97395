//! In-memory backends for the Atlas organization provider.
//!
//! [`InMemoryOrganizationApi`] and [`InMemoryCredentialStore`] implement the
//! collaborator traits from `atlas-core` on top of papaya lock-free maps.
//! Each carries a [`Recorder`] for injecting faults into specific operations
//! and inspecting the calls that were made.
//!
//! # Example
//!
//! ```ignore
//! use atlas_core::{Backend, ProviderError};
//! use atlas_memory::{InMemoryCredentialStore, Operation};
//!
//! let store = InMemoryCredentialStore::new();
//! store
//!     .recorder()
//!     .fail_next(Operation::PutCredential, ProviderError::server(Backend::CredentialStore, 500, "boom"));
//! ```

mod credentials;
pub mod faults;
mod organizations;

pub use credentials::InMemoryCredentialStore;
pub use faults::{Call, Operation, Recorder};
pub use organizations::InMemoryOrganizationApi;
