// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::kubernetes_api_objects::{
    api_method::{ActionKind, KubeAPIRequest, KubeAPIResponse},
    dynamic::{KubeObjectRef, Marshal},
    error::{APIError, ParseDynamicObjectError},
    owner_reference::OwnershipError,
};
use std::fmt::Debug;
use thiserror::Error;

/// Reconciler is the interface between a controller and the shim layer.
///
/// reconcile_core is a pure state transition: given the custom resource, the response
/// to the previous request (if any) and the current local state, it returns the next
/// local state and the next request for the shim layer to send. The shim layer keeps
/// calling it until reconcile_done, reconcile_requeue or reconcile_error holds.
pub trait Reconciler {
    /// The custom resource type this reconciler drives.
    type K: Marshal + Clone + Debug + Send + Sync + 'static;
    /// The local state carried between calls to reconcile_core.
    type S: Send;

    fn reconcile_init_state() -> Self::S;

    fn reconcile_core(
        cr: &Self::K,
        resp_o: Option<KubeAPIResponse>,
        state: Self::S,
    ) -> (Self::S, Option<KubeAPIRequest>);

    fn reconcile_done(state: &Self::S) -> bool;

    fn reconcile_requeue(state: &Self::S) -> bool;

    fn reconcile_error(state: &Self::S) -> Option<&ReconcileFailure>;
}

/// The result of one successful reconcile round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Every managed resource has been checked and nothing is left to do.
    Success,
    /// The round exited early by design; run again shortly with fresh state.
    Requeue,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailureCause {
    #[error("API server returned {0}")]
    Api(APIError),
    #[error(transparent)]
    Ownership(#[from] OwnershipError),
    #[error(transparent)]
    Parse(#[from] ParseDynamicObjectError),
    #[error("custom resource is not well formed: {0}")]
    InvalidCustomResource(&'static str),
    #[error("no matching response")]
    UnexpectedResponse,
}

/// ReconcileFailure records which operation on which object made reconcile_core give up.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{action} {key} failed: {cause}")]
pub struct ReconcileFailure {
    pub action: ActionKind,
    pub key: KubeObjectRef,
    pub cause: FailureCause,
}

impl ReconcileFailure {
    pub fn new(action: ActionKind, key: KubeObjectRef, cause: impl Into<FailureCause>) -> ReconcileFailure {
        ReconcileFailure {
            action,
            key,
            cause: cause.into(),
        }
    }
}
