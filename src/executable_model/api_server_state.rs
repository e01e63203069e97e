// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::executable_model::object_map::ObjectMap;

// ApiServerState is the "state" of the executable API server model.
#[derive(Debug, Clone)]
pub struct ApiServerState {
    pub resources: ObjectMap,
    pub uid_counter: u64,
    pub resource_version_counter: u64,
}

impl ApiServerState {
    pub fn new() -> ApiServerState {
        ApiServerState {
            resources: ObjectMap::new(),
            uid_counter: 0,
            resource_version_counter: 0,
        }
    }
}

impl Default for ApiServerState {
    fn default() -> ApiServerState {
        ApiServerState::new()
    }
}
