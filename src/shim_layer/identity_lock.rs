// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::kubernetes_api_objects::dynamic::KubeObjectRef;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// IdentityLocks serializes reconciles of the same object.
///
/// kube-rs never runs two reconciles for one object at a time, but reconcile_with can be
/// called from elsewhere (tests, other dispatchers), so the contract is enforced here.
/// Reconciles of different objects never wait on each other.
#[derive(Default)]
pub struct IdentityLocks {
    locks: Mutex<HashMap<KubeObjectRef, Arc<AsyncMutex<()>>>>,
}

impl IdentityLocks {
    pub async fn lock(&self, key: KubeObjectRef) -> IdentityGuard<'_> {
        let lock = self
            .locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key.clone())
            .or_default()
            .clone();
        let guard = lock.lock_owned().await;
        IdentityGuard {
            locks: self,
            key,
            guard: Some(guard),
        }
    }

    /// Number of objects that currently have a reconcile running or waiting.
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct IdentityGuard<'a> {
    locks: &'a IdentityLocks,
    key: KubeObjectRef,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for IdentityGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut locks = self.locks.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // Only the map holds the lock now: nobody is running or waiting.
        if locks.get(&self.key).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(&self.key);
        }
    }
}
