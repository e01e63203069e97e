// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::kubernetes_api_objects::{dynamic::KubeObjectRef, error::APIError};
use kube::api::{ApiResource, DynamicObject};
use std::fmt;

// KubeAPIRequest represents the API requests that reconcile_core asks the shim layer to send.
//
// kube-rs uses a generic type kube::api::Api as an api handle to send requests to the
// Kubernetes API, so each request carries the ApiResource needed to instantiate an
// Api<DynamicObject> together with the arguments of the Api method.
// Only get, create and update are needed to drive a site to convergence.

#[derive(Debug, Clone)]
pub enum KubeAPIRequest {
    GetRequest(KubeGetRequest),
    CreateRequest(KubeCreateRequest),
    UpdateRequest(KubeUpdateRequest),
}

impl KubeAPIRequest {
    pub fn action(&self) -> ActionKind {
        match self {
            KubeAPIRequest::GetRequest(_) => ActionKind::Get,
            KubeAPIRequest::CreateRequest(_) => ActionKind::Create,
            KubeAPIRequest::UpdateRequest(_) => ActionKind::Update,
        }
    }

    pub fn key(&self) -> KubeObjectRef {
        match self {
            KubeAPIRequest::GetRequest(req) => req.key(),
            KubeAPIRequest::CreateRequest(req) => req.key(),
            KubeAPIRequest::UpdateRequest(req) => req.key(),
        }
    }
}

// KubeGetRequest has the name as the parameter of Api.get(), and namespace to instantiate an Api.

#[derive(Debug, Clone)]
pub struct KubeGetRequest {
    pub api_resource: ApiResource,
    pub name: String,
    pub namespace: String,
}

impl KubeGetRequest {
    pub fn key(&self) -> KubeObjectRef {
        KubeObjectRef::new(&self.api_resource, &self.namespace, &self.name)
    }
}

// KubeCreateRequest has the obj as the parameter of Api.create().

#[derive(Debug, Clone)]
pub struct KubeCreateRequest {
    pub api_resource: ApiResource,
    pub namespace: String,
    pub obj: DynamicObject,
}

impl KubeCreateRequest {
    pub fn key(&self) -> KubeObjectRef {
        let name = self.obj.metadata.name.as_deref().unwrap_or_default();
        KubeObjectRef::new(&self.api_resource, &self.namespace, name)
    }
}

// KubeUpdateRequest has the obj as the parameter of Api.replace().

#[derive(Debug, Clone)]
pub struct KubeUpdateRequest {
    pub api_resource: ApiResource,
    pub name: String,
    pub namespace: String,
    pub obj: DynamicObject,
}

impl KubeUpdateRequest {
    pub fn key(&self) -> KubeObjectRef {
        KubeObjectRef::new(&self.api_resource, &self.namespace, &self.name)
    }
}

// KubeAPIResponse represents API results returned by the shim layer to reconcile_core.

#[derive(Debug, Clone)]
pub enum KubeAPIResponse {
    GetResponse(KubeGetResponse),
    CreateResponse(KubeCreateResponse),
    UpdateResponse(KubeUpdateResponse),
}

#[derive(Debug, Clone)]
pub struct KubeGetResponse {
    pub res: Result<DynamicObject, APIError>,
}

#[derive(Debug, Clone)]
pub struct KubeCreateResponse {
    pub res: Result<DynamicObject, APIError>,
}

#[derive(Debug, Clone)]
pub struct KubeUpdateResponse {
    pub res: Result<DynamicObject, APIError>,
}

impl KubeAPIResponse {
    pub fn into_get_response(self) -> Option<KubeGetResponse> {
        match self {
            KubeAPIResponse::GetResponse(resp) => Some(resp),
            _ => None,
        }
    }

    pub fn into_create_response(self) -> Option<KubeCreateResponse> {
        match self {
            KubeAPIResponse::CreateResponse(resp) => Some(resp),
            _ => None,
        }
    }

    pub fn into_update_response(self) -> Option<KubeUpdateResponse> {
        match self {
            KubeAPIResponse::UpdateResponse(resp) => Some(resp),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Get,
    Create,
    Update,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Get => write!(f, "Get"),
            ActionKind::Create => write!(f, "Create"),
            ActionKind::Update => write!(f, "Update"),
        }
    }
}
