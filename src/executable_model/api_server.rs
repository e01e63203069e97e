// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::executable_model::api_server_state::ApiServerState;
use crate::kubernetes_api_objects::{
    api_method::*,
    dynamic::{KubeObjectRef, Marshal},
    error::APIError,
};
use crate::shim_layer::api_server::ApiServer;
use async_trait::async_trait;
use kube::api::{ApiResource, DynamicObject, Resource};
use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

// ExecutableApiServerModel is an executable version of the API server's storage semantics:
// uid and resourceVersion assignment, AlreadyExists on duplicate creation, Conflict on stale
// resourceVersions, and owner reference validation.
// The handlers are pure functions over ApiServerState so they can be tested without a cluster.
pub struct ExecutableApiServerModel;

impl ExecutableApiServerModel {
    // An object is unmarshallable if it claims the kind and version the request addresses.
    fn unmarshallable_object(api_resource: &ApiResource, obj: &DynamicObject) -> bool {
        match obj.types.as_ref() {
            Some(types) => types.kind == api_resource.kind && types.api_version == api_resource.api_version,
            None => false,
        }
    }

    fn metadata_validity_check(obj: &DynamicObject) -> Option<APIError> {
        let controller_refs = obj
            .metadata
            .owner_references
            .iter()
            .flatten()
            .filter(|owner_ref| owner_ref.controller == Some(true))
            .count();
        if controller_refs > 1 {
            Some(APIError::Invalid)
        } else {
            None
        }
    }

    // Built-in kinds accept updates without a resourceVersion; custom resources do not.
    fn allow_unconditional_update(api_resource: &ApiResource) -> bool {
        !api_resource.group.contains('.') || api_resource.group.ends_with(".k8s.io")
    }

    pub fn handle_get_request(req: &KubeGetRequest, s: &ApiServerState) -> KubeGetResponse {
        match s.resources.get(&req.key()) {
            Some(obj) => KubeGetResponse { res: Ok(obj.clone()) },
            None => KubeGetResponse {
                res: Err(APIError::ObjectNotFound),
            },
        }
    }

    fn create_request_admission_check(req: &KubeCreateRequest, s: &ApiServerState) -> Option<APIError> {
        if req.obj.metadata.name.is_none() {
            Some(APIError::Invalid)
        } else if req
            .obj
            .metadata
            .namespace
            .as_ref()
            .is_some_and(|namespace| namespace != &req.namespace)
        {
            Some(APIError::BadRequest)
        } else if !Self::unmarshallable_object(&req.api_resource, &req.obj) {
            Some(APIError::BadRequest)
        } else if s.resources.contains_key(&req.key()) {
            Some(APIError::ObjectAlreadyExists)
        } else {
            None
        }
    }

    pub fn handle_create_request(req: &KubeCreateRequest, s: &mut ApiServerState) -> KubeCreateResponse {
        if let Some(err) = Self::create_request_admission_check(req, s) {
            return KubeCreateResponse { res: Err(err) };
        }
        let mut created_obj = req.obj.clone();
        created_obj.metadata.namespace = Some(req.namespace.clone());
        created_obj.metadata.resource_version = Some(s.resource_version_counter.to_string());
        created_obj.metadata.uid = Some(s.uid_counter.to_string());
        created_obj.metadata.deletion_timestamp = None;
        if let Some(err) = Self::metadata_validity_check(&created_obj) {
            return KubeCreateResponse { res: Err(err) };
        }
        s.resources.insert(req.key(), created_obj.clone());
        s.uid_counter += 1;
        s.resource_version_counter += 1;
        KubeCreateResponse { res: Ok(created_obj) }
    }

    fn update_request_admission_check(req: &KubeUpdateRequest, s: &ApiServerState) -> Option<APIError> {
        let stored = s.resources.get(&req.key());
        let metadata = &req.obj.metadata;
        if metadata.name.as_ref() != Some(&req.name) {
            Some(APIError::BadRequest)
        } else if metadata
            .namespace
            .as_ref()
            .is_some_and(|namespace| namespace != &req.namespace)
        {
            Some(APIError::BadRequest)
        } else if !Self::unmarshallable_object(&req.api_resource, &req.obj) {
            Some(APIError::BadRequest)
        } else if let Some(stored) = stored {
            if metadata.resource_version.is_none() && !Self::allow_unconditional_update(&req.api_resource) {
                Some(APIError::Invalid)
            } else if metadata.resource_version.is_some()
                && metadata.resource_version != stored.metadata.resource_version
            {
                Some(APIError::Conflict)
            } else if metadata.uid.is_some() && metadata.uid != stored.metadata.uid {
                Some(APIError::InternalError)
            } else {
                None
            }
        } else {
            Some(APIError::ObjectNotFound)
        }
    }

    // The server owns identity, versioning and status; the request can only change the rest.
    fn updated_object(req: &KubeUpdateRequest, old_obj: &DynamicObject) -> DynamicObject {
        let mut updated_obj = req.obj.clone();
        updated_obj.metadata.namespace = Some(req.namespace.clone());
        updated_obj.metadata.resource_version = old_obj.metadata.resource_version.clone();
        updated_obj.metadata.uid = old_obj.metadata.uid.clone();
        updated_obj.metadata.creation_timestamp = old_obj.metadata.creation_timestamp.clone();
        updated_obj.metadata.deletion_timestamp = old_obj.metadata.deletion_timestamp.clone();
        match (updated_obj.data.as_object_mut(), old_obj.data.get("status")) {
            (Some(data), Some(status)) => {
                data.insert("status".to_string(), status.clone());
            }
            (Some(data), None) => {
                data.remove("status");
            }
            _ => {}
        }
        updated_obj
    }

    pub fn handle_update_request(req: &KubeUpdateRequest, s: &mut ApiServerState) -> KubeUpdateResponse {
        if let Some(err) = Self::update_request_admission_check(req, s) {
            return KubeUpdateResponse { res: Err(err) };
        }
        let req_key = req.key();
        let Some(old_obj) = s.resources.get(&req_key).cloned() else {
            return KubeUpdateResponse {
                res: Err(APIError::ObjectNotFound),
            };
        };
        let mut updated_obj = Self::updated_object(req, &old_obj);
        if updated_obj == old_obj {
            return KubeUpdateResponse { res: Ok(old_obj) };
        }
        updated_obj.metadata.resource_version = Some(s.resource_version_counter.to_string());
        if let Some(err) = Self::metadata_validity_check(&updated_obj) {
            return KubeUpdateResponse { res: Err(err) };
        }
        s.resources.insert(req_key, updated_obj.clone());
        s.resource_version_counter += 1;
        KubeUpdateResponse { res: Ok(updated_obj) }
    }

    // Deleting an object also deletes, transitively, every object that names it as an owner,
    // which is what the garbage collector eventually does in a real cluster.
    pub fn handle_delete_request(key: &KubeObjectRef, s: &mut ApiServerState) -> Result<Vec<KubeObjectRef>, APIError> {
        let Some(obj) = s.resources.remove(key) else {
            return Err(APIError::ObjectNotFound);
        };
        let mut deleted = vec![key.clone()];
        let mut owner_uids: BTreeSet<String> = obj.metadata.uid.into_iter().collect();
        while !owner_uids.is_empty() {
            let dependents = s.resources.dependents_of(&owner_uids);
            owner_uids = dependents
                .iter()
                .filter_map(|dependent| s.resources.remove(dependent))
                .filter_map(|dependent| dependent.metadata.uid)
                .collect();
            deleted.extend(dependents);
        }
        s.resource_version_counter += 1;
        Ok(deleted)
    }
}

/// A request the executable API server has answered, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandledRequest {
    pub action: ActionKind,
    pub key: KubeObjectRef,
    pub res: Result<(), APIError>,
}

struct InjectedFailure {
    action: ActionKind,
    kind: String,
    error: APIError,
}

#[derive(Default)]
struct Inner {
    state: ApiServerState,
    requests: Vec<HandledRequest>,
    injected: Vec<InjectedFailure>,
}

/// ExecutableApiServer serves reconcile requests from ExecutableApiServerModel instead of a cluster.
/// It records every request and can fail chosen requests on demand.
#[derive(Default)]
pub struct ExecutableApiServer {
    inner: Mutex<Inner>,
}

impl ExecutableApiServer {
    pub fn new() -> ExecutableApiServer {
        ExecutableApiServer::default()
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes the next request with this action on this kind fail with error, without touching the store.
    pub fn inject_failure(&self, action: ActionKind, kind: &str, error: APIError) {
        self.inner().injected.push(InjectedFailure {
            action,
            kind: kind.to_string(),
            error,
        });
    }

    pub fn requests(&self) -> Vec<HandledRequest> {
        self.inner().requests.clone()
    }

    /// Successful creates and updates, in order.
    pub fn writes(&self) -> Vec<(ActionKind, KubeObjectRef)> {
        self.inner()
            .requests
            .iter()
            .filter(|req| req.action != ActionKind::Get && req.res.is_ok())
            .map(|req| (req.action, req.key.clone()))
            .collect()
    }

    pub fn clear_requests(&self) {
        self.inner().requests.clear();
    }

    pub fn len(&self) -> usize {
        self.inner().state.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains<K: Marshal>(&self, namespace: &str, name: &str) -> bool {
        let key = KubeObjectRef::new(&K::api_resource(), namespace, name);
        self.inner().state.resources.contains_key(&key)
    }

    /// Typed read that bypasses the request log.
    pub fn get_object<K: Marshal>(&self, namespace: &str, name: &str) -> Option<K> {
        let key = KubeObjectRef::new(&K::api_resource(), namespace, name);
        let obj = self.inner().state.resources.get(&key).cloned()?;
        K::unmarshal(obj).ok()
    }

    /// Typed create that bypasses the request log, for seeding the store.
    pub fn create_object<K: Marshal>(&self, obj: &K) -> Result<K, APIError> {
        let req = KubeCreateRequest {
            api_resource: K::api_resource(),
            namespace: obj.meta().namespace.clone().unwrap_or_else(|| "default".to_string()),
            obj: obj.marshal().map_err(|_| APIError::BadRequest)?,
        };
        let created = ExecutableApiServerModel::handle_create_request(&req, &mut self.inner().state).res?;
        K::unmarshal(created).map_err(|_| APIError::InternalError)
    }

    /// Typed update that bypasses the request log, standing in for another writer.
    pub fn update_object<K: Marshal>(&self, obj: &K) -> Result<K, APIError> {
        let namespace = obj.meta().namespace.clone().unwrap_or_else(|| "default".to_string());
        let req = KubeUpdateRequest {
            api_resource: K::api_resource(),
            name: obj.meta().name.clone().unwrap_or_default(),
            namespace,
            obj: obj.marshal().map_err(|_| APIError::BadRequest)?,
        };
        let updated = ExecutableApiServerModel::handle_update_request(&req, &mut self.inner().state).res?;
        K::unmarshal(updated).map_err(|_| APIError::InternalError)
    }

    /// Deletes the object and garbage-collects its dependents; returns every deleted key.
    pub fn delete_object<K: Marshal>(&self, namespace: &str, name: &str) -> Result<Vec<KubeObjectRef>, APIError> {
        let key = KubeObjectRef::new(&K::api_resource(), namespace, name);
        ExecutableApiServerModel::handle_delete_request(&key, &mut self.inner().state)
    }

    fn take_injected(inner: &mut Inner, action: ActionKind, key: &KubeObjectRef) -> Option<APIError> {
        let pos = inner
            .injected
            .iter()
            .position(|failure| failure.action == action && failure.kind == key.kind)?;
        Some(inner.injected.remove(pos).error)
    }

    fn serve(
        &self,
        action: ActionKind,
        key: KubeObjectRef,
        handle: impl FnOnce(&mut ApiServerState) -> Result<DynamicObject, APIError>,
    ) -> Result<DynamicObject, APIError> {
        let mut inner = self.inner();
        let res = match Self::take_injected(&mut inner, action, &key) {
            Some(err) => Err(err),
            None => handle(&mut inner.state),
        };
        inner.requests.push(HandledRequest {
            action,
            key,
            res: res.as_ref().map(|_| ()).map_err(|err| *err),
        });
        res
    }
}

#[async_trait]
impl ApiServer for ExecutableApiServer {
    async fn get(&self, req: &KubeGetRequest) -> Result<DynamicObject, APIError> {
        self.serve(ActionKind::Get, req.key(), |s| {
            ExecutableApiServerModel::handle_get_request(req, s).res
        })
    }

    async fn create(&self, req: &KubeCreateRequest) -> Result<DynamicObject, APIError> {
        self.serve(ActionKind::Create, req.key(), |s| {
            ExecutableApiServerModel::handle_create_request(req, s).res
        })
    }

    async fn update(&self, req: &KubeUpdateRequest) -> Result<DynamicObject, APIError> {
        self.serve(ActionKind::Update, req.key(), |s| {
            ExecutableApiServerModel::handle_update_request(req, s).res
        })
    }
}
