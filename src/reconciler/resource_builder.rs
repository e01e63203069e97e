// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::kubernetes_api_objects::api_method::KubeGetRequest;
use crate::reconciler::reconciler::FailureCause;
use kube::api::{ApiResource, DynamicObject};

/// ResourceBuilder describes how one kind of managed resource is reconciled.
///
/// A controller keeps one builder per managed kind in a table and drives each of them
/// with the same get, then create-or-update protocol: `get_request` names the object,
/// `make` produces the object to create when it is absent, and `update` decides whether
/// an existing object has drifted. Adding a managed kind only needs a new builder.
pub trait ResourceBuilder<K>: Sync {
    fn api_resource(&self) -> ApiResource;

    fn get_request(&self, cr: &K) -> KubeGetRequest;

    /// The object to create, already linked to its owner.
    fn make(&self, cr: &K) -> Result<DynamicObject, FailureCause>;

    /// Returns the object to write back when `found` has drifted from the desired
    /// state, or None when it is already converged.
    fn update(&self, cr: &K, found: DynamicObject) -> Result<Option<DynamicObject>, FailureCause>;

    /// Whether a successful create ends the current round with a requeue.
    fn requeue_after_create(&self) -> bool {
        false
    }
}
