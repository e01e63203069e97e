// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
pub mod api_method;
pub mod dynamic;
pub mod error;
pub mod owner_reference;
