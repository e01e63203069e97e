// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
pub mod common;
pub mod deployment;
pub mod ingress;
pub mod service;

pub use common::*;
pub use deployment::*;
pub use ingress::*;
pub use service::*;

use crate::reconciler::resource_builder::ResourceBuilder;
use crate::staticsite_controller::trusted::{spec_types::StaticSite, step::SubResource};

/// Looks up the builder that reconciles the given managed resource.
pub fn builder_of(resource: SubResource) -> &'static dyn ResourceBuilder<StaticSite> {
    match resource {
        SubResource::Deployment => &DeploymentBuilder,
        SubResource::Service => &ServiceBuilder,
        SubResource::Ingress => &IngressBuilder,
    }
}
