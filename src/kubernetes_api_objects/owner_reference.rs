// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use kube::api::Resource;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OwnershipError {
    #[error("owner misses {0}")]
    MissingOwnerKey(&'static str),
    #[error("owner lives in namespace {owner_namespace} but the object lives in {object_namespace}")]
    CrossNamespace {
        owner_namespace: String,
        object_namespace: String,
    },
    #[error("object is already controlled by {kind} {name}")]
    AlreadyOwned { kind: String, name: String },
}

/// Stamps `object` with a controller owner reference pointing at `owner`,
/// so that the garbage collector deletes the object together with its owner.
///
/// The owner must carry a name, a namespace and a uid, and it must live in the
/// object's namespace (an unset namespace on the object is filled in with the
/// owner's). Attaching the same owner twice is a no-op. An object that is
/// already controlled by a different owner is rejected.
pub fn attach_owner<K>(object: &mut ObjectMeta, owner: &K) -> Result<(), OwnershipError>
where
    K: Resource<DynamicType = ()>,
{
    let owner_meta = owner.meta();
    if owner_meta.name.is_none() {
        return Err(OwnershipError::MissingOwnerKey(".metadata.name"));
    }
    let owner_namespace = owner_meta
        .namespace
        .as_ref()
        .ok_or(OwnershipError::MissingOwnerKey(".metadata.namespace"))?;
    if owner_meta.uid.is_none() {
        return Err(OwnershipError::MissingOwnerKey(".metadata.uid"));
    }
    match object.namespace.as_ref() {
        Some(ns) if ns != owner_namespace => {
            return Err(OwnershipError::CrossNamespace {
                owner_namespace: owner_namespace.clone(),
                object_namespace: ns.clone(),
            })
        }
        Some(_) => {}
        None => object.namespace = Some(owner_namespace.clone()),
    }
    let owner_ref = OwnerReference {
        block_owner_deletion: Some(true),
        ..owner
            .controller_owner_ref(&())
            .ok_or(OwnershipError::MissingOwnerKey(".metadata.uid"))?
    };

    let owner_references = object.owner_references.get_or_insert_with(Vec::new);
    if let Some(existing) = owner_references
        .iter()
        .find(|r| r.controller == Some(true) && r.uid != owner_ref.uid)
    {
        return Err(OwnershipError::AlreadyOwned {
            kind: existing.kind.clone(),
            name: existing.name.clone(),
        });
    }
    owner_references.retain(|r| r.uid != owner_ref.uid);
    owner_references.push(owner_ref);
    Ok(())
}

/// Returns the controller owner reference of the object, if any.
pub fn controller_owner(object: &ObjectMeta) -> Option<&OwnerReference> {
    object
        .owner_references
        .as_ref()?
        .iter()
        .find(|r| r.controller == Some(true))
}

pub fn is_controlled_by<K>(object: &ObjectMeta, owner: &K) -> bool
where
    K: Resource<DynamicType = ()>,
{
    match (controller_owner(object), owner.meta().uid.as_ref()) {
        (Some(owner_ref), Some(uid)) => &owner_ref.uid == uid,
        _ => false,
    }
}
