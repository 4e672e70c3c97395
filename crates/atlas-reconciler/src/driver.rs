//! One reconciliation pass over any [`ExternalClient`].
//!
//! Scheduling, requeue and backoff belong to the caller: a retryable error
//! means "call again later", a terminal one means "surface to the operator".

use atlas_core::ProviderError;

use crate::conditions::Condition;
use crate::context::ReconcileContext;
use crate::external::{ConnectionDetails, DeletionProgress, ExternalClient, ManagedResource};

/// What a pass did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileAction {
    /// Remote state already matched; nothing was changed.
    UpToDate,
    /// Remote objects were created. Connection details are returned only here.
    Created(ConnectionDetails),
    Updated,
    /// First deletion phase: the finalizer token was recorded.
    FinalizerRecorded,
    /// Remote cleanup finished; the resource may be released.
    Deleted,
}

/// Runs Observe followed by the Create, Update or Delete it calls for, and
/// records the pass result in the `Synced` condition.
///
/// # Errors
///
/// Returns the primary error of the failing step. Failed best-effort cleanups
/// are logged by the client and never surface here.
pub async fn reconcile<R, C>(
    client: &C,
    ctx: &ReconcileContext,
    resource: &mut R,
) -> Result<ReconcileAction, ProviderError>
where
    R: ManagedResource,
    C: ExternalClient<R> + ?Sized,
{
    let result = run_pass(client, ctx, resource).await;
    match &result {
        Ok(action) => {
            tracing::debug!(resource = resource.name(), ?action, "reconciled");
            resource.conditions_mut().set(Condition::reconcile_success());
        }
        Err(err) => {
            tracing::warn!(
                resource = resource.name(),
                kind = %err.kind(),
                retryable = err.is_retryable(),
                error = %err,
                "reconcile failed"
            );
            resource.conditions_mut().set(Condition::reconcile_error(err.to_string()));
        }
    }
    result
}

async fn run_pass<R, C>(
    client: &C,
    ctx: &ReconcileContext,
    resource: &mut R,
) -> Result<ReconcileAction, ProviderError>
where
    R: ManagedResource,
    C: ExternalClient<R> + ?Sized,
{
    let observation = client.observe(ctx, resource).await.into_result()?;

    if resource.is_deletion_requested() {
        return match client.delete(ctx, resource).await.into_result()? {
            DeletionProgress::FinalizerRecorded => Ok(ReconcileAction::FinalizerRecorded),
            DeletionProgress::Completed => Ok(ReconcileAction::Deleted),
        };
    }

    if !observation.resource_exists {
        let creation = client.create(ctx, resource).await.into_result()?;
        return Ok(ReconcileAction::Created(creation.connection_details));
    }

    if !observation.resource_up_to_date {
        client.update(ctx, resource).await?;
        return Ok(ReconcileAction::Updated);
    }

    Ok(ReconcileAction::UpToDate)
}
