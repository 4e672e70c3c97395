//! # atlas-reconciler
//!
//! Reconciles a declared [`OrganizationResource`] against two independently
//! failing systems: the organization API and the credential store holding the
//! organization's API key.
//!
//! The engine is stateless between calls. Each operation reads the declared
//! spec and the status persisted by the driver, performs its remote calls in
//! strict order through a [`ReconcileContext`], and writes the refreshed
//! status back onto the resource.
//!
//! - [`OrganizationExternal`] implements Observe / Create / Update / Delete.
//! - [`finalizer`] gates remote deletion behind a recorded token.
//! - [`Connector`] resolves provider configuration into bound clients.
//! - [`reconcile`] runs one pass for any [`ExternalClient`].

pub mod conditions;
mod connector;
mod context;
mod driver;
mod external;
pub mod finalizer;
mod organization;
mod resource;

pub use conditions::{Condition, ConditionReason, ConditionType, Conditions};
pub use connector::{
    ClientFactory, Connector, CredentialSource, ProviderConfig, ProviderConfigSource,
    SecretsManagerRef,
};
pub use context::ReconcileContext;
pub use driver::{ReconcileAction, reconcile};
pub use external::{
    ConnectionDetails, DeletionProgress, ExternalClient, ExternalCreation, ExternalObservation,
    ExternalUpdate, ManagedResource,
};
pub use finalizer::{FINALIZER, FinalizerState};
pub use organization::OrganizationExternal;
pub use resource::{
    CredentialPlacement, DeletionPolicy, LifecycleState, ObjectMeta, ObservedStatus,
    OrganizationParameters, OrganizationResource, OrganizationSpec, OrganizationStatus,
};
