// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::kubernetes_api_objects::dynamic::KubeObjectRef;
use kube::api::DynamicObject;
use std::collections::{BTreeMap, BTreeSet};

/// ObjectMap is the object store of the executable model, keyed by kind, namespace and name.
#[derive(Debug, Clone, Default)]
pub struct ObjectMap {
    inner: BTreeMap<KubeObjectRef, DynamicObject>,
}

impl ObjectMap {
    pub fn new() -> ObjectMap {
        ObjectMap::default()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn contains_key(&self, key: &KubeObjectRef) -> bool {
        self.inner.contains_key(key)
    }

    pub fn get(&self, key: &KubeObjectRef) -> Option<&DynamicObject> {
        self.inner.get(key)
    }

    pub fn insert(&mut self, key: KubeObjectRef, value: DynamicObject) -> Option<DynamicObject> {
        self.inner.insert(key, value)
    }

    pub fn remove(&mut self, key: &KubeObjectRef) -> Option<DynamicObject> {
        self.inner.remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &KubeObjectRef> {
        self.inner.keys()
    }

    /// Keys of the objects that carry an owner reference to any of the given uids.
    pub fn dependents_of(&self, owner_uids: &BTreeSet<String>) -> Vec<KubeObjectRef> {
        self.inner
            .iter()
            .filter(|(_, obj)| {
                obj.metadata
                    .owner_references
                    .iter()
                    .flatten()
                    .any(|owner_ref| owner_uids.contains(&owner_ref.uid))
            })
            .map(|(key, _)| key.clone())
            .collect()
    }
}
