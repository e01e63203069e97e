// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::kubernetes_api_objects::error::ParseDynamicObjectError;
use kube::api::{ApiResource, DynamicObject, Resource};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt;

/// DynamicObject is used to pass requests/responses between reconcile_core and the shim layer
/// so that they can carry every kind of resource object without exhaustive pattern matching.
/// Marshal converts typed objects into and out of that representation.
pub trait Marshal: Resource<DynamicType = ()> + Serialize + DeserializeOwned + Sized {
    fn api_resource() -> ApiResource {
        ApiResource::erase::<Self>(&())
    }

    fn marshal(&self) -> Result<DynamicObject, ParseDynamicObjectError> {
        serde_json::to_value(self)
            .and_then(serde_json::from_value)
            .map_err(|e| ParseDynamicObjectError::MarshalError(e.to_string()))
    }

    fn unmarshal(obj: DynamicObject) -> Result<Self, ParseDynamicObjectError> {
        let expected = Self::kind(&()).to_string();
        match obj.types.as_ref() {
            None => return Err(ParseDynamicObjectError::MissingTypeMeta),
            Some(types) if types.kind != expected => {
                return Err(ParseDynamicObjectError::KindMismatch {
                    expected,
                    found: types.kind.clone(),
                })
            }
            _ => {}
        }
        serde_json::to_value(obj)
            .and_then(serde_json::from_value)
            .map_err(|e| ParseDynamicObjectError::UnmarshalError(e.to_string()))
    }
}

impl<K> Marshal for K where K: Resource<DynamicType = ()> + Serialize + DeserializeOwned {}

/// KubeObjectRef identifies one object in the API server by kind, namespace and name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KubeObjectRef {
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

impl KubeObjectRef {
    pub fn new(api_resource: &ApiResource, namespace: &str, name: &str) -> KubeObjectRef {
        KubeObjectRef {
            kind: api_resource.kind.clone(),
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }
}

impl fmt::Display for KubeObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.kind, self.namespace, self.name)
    }
}
