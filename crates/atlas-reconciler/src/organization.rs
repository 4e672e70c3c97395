//! External client for the Organization kind.
//!
//! Keeps an organization and its API key record eventually consistent with
//! the declared spec. Every step is a single remote call wrapped in the
//! pass's [`ReconcileContext`]; steps within one operation run strictly in
//! order, which is what the compensation logic relies on.

use async_trait::async_trait;
use time::OffsetDateTime;

use atlas_core::{
    Backend, CleanupAction, CreateOrganizationInput, CredentialRecord, DynCredentialStore,
    DynOrganizationApi, Outcome, ProviderError, SecondaryOutcome, SecretNamer,
};

use crate::conditions::{Condition, Conditions};
use crate::context::ReconcileContext;
use crate::external::{
    ConnectionDetails, DeletionProgress, ExternalClient, ExternalCreation, ExternalObservation,
    ExternalUpdate, ManagedResource,
};
use crate::finalizer::{self, FinalizerState};
use crate::resource::{DeletionPolicy, LifecycleState, OrganizationParameters, OrganizationResource};

impl ManagedResource for OrganizationResource {
    fn name(&self) -> &str {
        &self.metadata.name
    }

    fn is_deletion_requested(&self) -> bool {
        OrganizationResource::is_deletion_requested(self)
    }

    fn conditions_mut(&mut self) -> &mut Conditions {
        &mut self.status.conditions
    }
}

/// Reconciles [`OrganizationResource`]s against an organization API and a
/// credential store.
pub struct OrganizationExternal {
    api: DynOrganizationApi,
    store: DynCredentialStore,
    namer: SecretNamer,
    force_delete: bool,
}

impl OrganizationExternal {
    /// Creates a client. Credential deletes are immediate by default.
    #[must_use]
    pub fn new(api: DynOrganizationApi, store: DynCredentialStore, namer: SecretNamer) -> Self {
        Self {
            api,
            store,
            namer,
            force_delete: true,
        }
    }

    /// Uses the store's recovery window instead of immediate deletion.
    #[must_use]
    pub fn with_force_delete(mut self, force_delete: bool) -> Self {
        self.force_delete = force_delete;
        self
    }

    /// Credential-store key for `resource`: the recorded one, else resolved.
    fn credential_name(&self, resource: &OrganizationResource) -> String {
        let observed = resource.observed();
        if !observed.credential_name.is_empty() {
            return observed.credential_name.clone();
        }
        let params = &resource.spec.for_provider;
        self.namer.resolve(
            params.credential.secret_name.as_deref(),
            logical_name(resource),
            Some(observed.external_id.as_str()),
        )
    }

    /// The organization is gone: drop its credential and forget both.
    async fn forget_missing(
        &self,
        ctx: &ReconcileContext,
        resource: &mut OrganizationResource,
    ) -> Outcome<ExternalObservation> {
        let secret_name = self.credential_name(resource);
        tracing::info!(
            org_id = %resource.observed().external_id,
            secret_name = %secret_name,
            "organization no longer exists, removing its credential"
        );

        let mut outcome = Outcome::ok(ExternalObservation::absent());
        let result = ctx
            .run(Backend::CredentialStore, self.store.delete(&secret_name, self.force_delete))
            .await;
        match ignore_not_found(result) {
            Err(err) if err.is_cancelled() => return Outcome::err(err),
            result => outcome.record(SecondaryOutcome::from_result(
                CleanupAction::DeleteCredential,
                secret_name,
                result,
            )),
        }

        let status = &mut resource.status;
        status.at_provider.clear_remote_identity();
        status.at_provider.lifecycle_state = LifecycleState::Absent;
        status.conditions.set(Condition::unavailable());
        outcome
    }

    /// An organization is recorded without a credential: a create stopped
    /// between the organization and the Put, or its compensation failed.
    ///
    /// A credential found under the resolved name is adopted and `None` is
    /// returned so Observe continues. Otherwise the organization is deleted
    /// and reported absent so the next Create starts over.
    async fn resume_incomplete_create(
        &self,
        ctx: &ReconcileContext,
        resource: &mut OrganizationResource,
    ) -> Option<Outcome<ExternalObservation>> {
        let org_id = resource.observed().external_id.clone();
        let secret_name = self.credential_name(resource);

        match ctx.run(Backend::CredentialStore, self.store.describe(&secret_name)).await {
            Ok(metadata) => {
                tracing::info!(org_id = %org_id, secret_name = %secret_name, "adopting stored credential");
                let observed = &mut resource.status.at_provider;
                observed.credential_name = secret_name;
                observed.credential_location = metadata.location;
                return None;
            }
            Err(err) if err.is_not_found() => {}
            Err(err) => return Some(Outcome::err(err)),
        }

        tracing::warn!(
            org_id = %org_id,
            secret_name = %secret_name,
            "organization has no stored credential, deleting it"
        );
        if let Err(err) = ignore_not_found(ctx.run(Backend::OrganizationApi, self.api.delete(&org_id)).await) {
            return Some(Outcome::err(err));
        }

        let mut outcome = Outcome::ok(ExternalObservation::absent());
        outcome.record(SecondaryOutcome::from_result(
            CleanupAction::DeleteOrganization,
            org_id,
            Ok(()),
        ));
        let status = &mut resource.status;
        status.at_provider.clear_remote_identity();
        status.at_provider.lifecycle_state = LifecycleState::Absent;
        status.conditions.set(Condition::unavailable());
        Some(outcome)
    }
}

fn logical_name(resource: &OrganizationResource) -> &str {
    if resource.metadata.name.is_empty() {
        &resource.spec.for_provider.name
    } else {
        &resource.metadata.name
    }
}

fn validate(params: &OrganizationParameters) -> Result<(), ProviderError> {
    if params.name.trim().is_empty() {
        return Err(ProviderError::configuration("spec.forProvider.name is required"));
    }
    if params.owner_id.trim().is_empty() {
        return Err(ProviderError::configuration("spec.forProvider.ownerId is required"));
    }
    Ok(())
}

fn ignore_not_found(result: Result<(), ProviderError>) -> Result<(), ProviderError> {
    match result {
        Err(err) if err.is_not_found() => Ok(()),
        other => other,
    }
}

#[async_trait]
impl ExternalClient<OrganizationResource> for OrganizationExternal {
    async fn observe(
        &self,
        ctx: &ReconcileContext,
        resource: &mut OrganizationResource,
    ) -> Outcome<ExternalObservation> {
        let external_id = resource.observed().external_id.clone();
        if external_id.is_empty() {
            return Outcome::ok(ExternalObservation::absent());
        }

        if resource.is_deletion_requested() {
            let status = &mut resource.status;
            status.at_provider.lifecycle_state = LifecycleState::Deleting;
            status.conditions.set(Condition::deleting());
            return Outcome::ok(ExternalObservation::present(true));
        }

        if resource.observed().credential_name.is_empty() {
            if let Some(outcome) = self.resume_incomplete_create(ctx, resource).await {
                return outcome;
            }
        }

        let organization = match ctx.run(Backend::OrganizationApi, self.api.get(&external_id)).await {
            Ok(organization) if organization.is_deleted => {
                tracing::debug!(org_id = %external_id, "organization is soft-deleted");
                return self.forget_missing(ctx, resource).await;
            }
            Ok(organization) => organization,
            Err(err) if err.is_not_found() => return self.forget_missing(ctx, resource).await,
            Err(err) => return Outcome::err(err),
        };

        let secret_name = self.credential_name(resource);
        let up_to_date = match ctx
            .run(Backend::CredentialStore, self.store.describe(&secret_name))
            .await
        {
            Ok(metadata) => {
                if metadata.location != resource.observed().credential_location {
                    tracing::debug!(secret_name = %secret_name, location = %metadata.location, "credential location refreshed");
                    resource.status.at_provider.credential_location = metadata.location;
                }
                resource.observed().applied_credential.as_ref() == Some(&resource.spec.for_provider.api_key)
            }
            Err(err) if err.is_not_found() => {
                tracing::debug!(org_id = %external_id, secret_name = %secret_name, "credential missing");
                false
            }
            Err(err) if err.is_cancelled() => return Outcome::err(err),
            Err(err) => {
                tracing::warn!(
                    org_id = %external_id,
                    secret_name = %secret_name,
                    error = %err,
                    "credential check failed, assuming up to date"
                );
                true
            }
        };

        let status = &mut resource.status;
        status.at_provider.organization_name = organization.name;
        status.at_provider.lifecycle_state = LifecycleState::Available;
        status.conditions.set(Condition::available());

        Outcome::ok(ExternalObservation::present(up_to_date))
    }

    async fn create(
        &self,
        ctx: &ReconcileContext,
        resource: &mut OrganizationResource,
    ) -> Outcome<ExternalCreation> {
        let params = resource.spec.for_provider.clone();
        if let Err(err) = validate(&params) {
            return Outcome::err(err);
        }

        let kms_key = params
            .credential
            .kms_key_id
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_string);
        if let Some(key) = &kms_key {
            if let Err(err) = ctx.run(Backend::CredentialStore, self.store.validate_key(key)).await {
                return Outcome::err(err);
            }
        }

        resource.status.at_provider.lifecycle_state = LifecycleState::Creating;
        resource.status.conditions.set(Condition::creating());

        let input = CreateOrganizationInput {
            name: params.name.clone(),
            owner_id: params.owner_id.clone(),
            api_key: params.api_key.clone(),
        };
        let created = match ctx.run(Backend::OrganizationApi, self.api.create(&input)).await {
            Ok(created) => created,
            Err(err) => return Outcome::err(err),
        };

        let org_id = created.organization.id.clone();
        resource.status.at_provider.external_id.clone_from(&org_id);
        resource.status.at_provider.organization_name = created.organization.name;

        let secret_name = self.namer.resolve(
            params.credential.secret_name.as_deref(),
            logical_name(resource),
            Some(&org_id),
        );
        let record = CredentialRecord::issued(&org_id, &created.api_key, &params.api_key);

        let location = match ctx
            .run(
                Backend::CredentialStore,
                self.store.put(&secret_name, &record, kms_key.as_deref()),
            )
            .await
        {
            Ok(location) => location,
            Err(err) => {
                tracing::warn!(
                    org_id = %org_id,
                    secret_name = %secret_name,
                    error = %err,
                    "storing credential failed, deleting organization"
                );
                let mut outcome = Outcome::err(err);
                let cleanup = ignore_not_found(
                    ctx.run(Backend::OrganizationApi, self.api.delete(&org_id)).await,
                );
                let compensated = cleanup.is_ok();
                outcome.record(SecondaryOutcome::from_result(
                    CleanupAction::DeleteOrganization,
                    org_id,
                    cleanup,
                ));
                if compensated {
                    resource.status.at_provider.clear_remote_identity();
                    resource.status.at_provider.lifecycle_state = LifecycleState::Absent;
                    resource.status.conditions.set(Condition::unavailable());
                }
                return outcome;
            }
        };

        let observed = &mut resource.status.at_provider;
        observed.credential_name.clone_from(&secret_name);
        observed.credential_location.clone_from(&location);
        observed.encryption_key_ref = kms_key;
        observed.applied_credential = Some(params.api_key);
        observed.created_at = Some(OffsetDateTime::now_utc());

        tracing::info!(org_id = %org_id, secret_name = %secret_name, "organization and credential created");

        Outcome::ok(ExternalCreation {
            external_id: org_id,
            connection_details: ConnectionDetails {
                public_key: created.api_key.public_key,
                private_key: created.api_key.private_key,
                location,
            },
        })
    }

    async fn update(
        &self,
        ctx: &ReconcileContext,
        resource: &mut OrganizationResource,
    ) -> Result<ExternalUpdate, ProviderError> {
        if !resource.observed().has_external_id() {
            return Err(ProviderError::configuration(
                "cannot update an organization that has not been created",
            ));
        }

        let desired = resource.spec.for_provider.api_key.clone();
        let secret_name = self.credential_name(resource);

        let mut record = match ctx.run(Backend::CredentialStore, self.store.get(&secret_name)).await {
            Ok(record) => record,
            Err(err) if err.is_not_found() => return Err(ProviderError::credential_lost(secret_name)),
            Err(err) => return Err(err),
        };

        // Unconditional read-modify-write: overlapping passes race and the last write wins.
        let credential_rewritten = !record.matches(&desired);
        if credential_rewritten {
            record.merge(&desired);
            let key_ref = resource.observed().encryption_key_ref.clone();
            let location = ctx
                .run(
                    Backend::CredentialStore,
                    self.store.put(&secret_name, &record, key_ref.as_deref()),
                )
                .await?;
            resource.status.at_provider.credential_location = location;
            tracing::info!(
                org_id = %resource.observed().external_id,
                secret_name = %secret_name,
                "credential descriptor updated"
            );
        }

        let observed = &mut resource.status.at_provider;
        observed.credential_name = secret_name;
        observed.applied_credential = Some(desired);

        Ok(ExternalUpdate { credential_rewritten })
    }

    async fn delete(
        &self,
        ctx: &ReconcileContext,
        resource: &mut OrganizationResource,
    ) -> Outcome<DeletionProgress> {
        if finalizer::state(resource.observed()) == FinalizerState::Removed {
            tracing::debug!(resource = %resource.metadata.name, "remote cleanup already completed");
            return Outcome::ok(DeletionProgress::Completed);
        }

        if finalizer::add_finalizer(&mut resource.status.at_provider) {
            tracing::debug!(org_id = %resource.observed().external_id, "finalizer recorded");
            return Outcome::ok(DeletionProgress::FinalizerRecorded);
        }

        let observed = &mut resource.status.at_provider;
        if observed.deleted_at.is_none() {
            observed.deleted_at = Some(OffsetDateTime::now_utc());
        }
        observed.lifecycle_state = LifecycleState::Deleting;
        resource.status.conditions.set(Condition::deleting());

        let mut outcome = Outcome::ok(DeletionProgress::Completed);
        let external_id = resource.observed().external_id.clone();

        if resource.spec.deletion_policy == DeletionPolicy::Orphan {
            tracing::info!(org_id = %external_id, "deletion policy is Orphan, leaving remote objects");
        } else {
            if !external_id.is_empty() {
                match ctx.run(Backend::OrganizationApi, self.api.delete(&external_id)).await {
                    Ok(()) => tracing::info!(org_id = %external_id, "organization deleted"),
                    Err(err) if err.is_not_found() => {
                        tracing::debug!(org_id = %external_id, "organization already deleted");
                    }
                    Err(err) => return Outcome::err(err),
                }
            }

            let recorded = !resource.observed().credential_name.is_empty();
            if recorded || !external_id.is_empty() {
                let secret_name = self.credential_name(resource);
                let result = ctx
                    .run(Backend::CredentialStore, self.store.delete(&secret_name, self.force_delete))
                    .await;
                match ignore_not_found(result) {
                    Err(err) if err.is_cancelled() => return Outcome::err(err),
                    result => outcome.record(SecondaryOutcome::from_result(
                        CleanupAction::DeleteCredential,
                        secret_name,
                        result,
                    )),
                }
            }
        }

        let observed = &mut resource.status.at_provider;
        observed.clear_remote_identity();
        finalizer::remove_finalizer(observed);
        observed.lifecycle_state = LifecycleState::Deleted;

        outcome
    }
}
