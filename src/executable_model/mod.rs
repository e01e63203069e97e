// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
pub mod api_server;
pub mod api_server_state;
pub mod object_map;

pub use api_server::{ExecutableApiServer, ExecutableApiServerModel};
pub use api_server_state::ApiServerState;
pub use object_map::ObjectMap;
