// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
pub mod api_server;
pub mod controller_runtime;
pub mod identity_lock;
