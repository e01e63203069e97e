// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::kubernetes_api_objects::api_method::ActionKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaticSiteReconcileStep {
    Init,
    AfterKRequestStep(ActionKind, SubResource),
    Done,
    Requeue,
    Error,
}

/// The managed resources of a StaticSite, in the order they are reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubResource {
    Deployment,
    Service,
    Ingress,
}

impl SubResource {
    pub const ORDER: [SubResource; 3] = [
        SubResource::Deployment,
        SubResource::Service,
        SubResource::Ingress,
    ];

    pub fn first() -> SubResource {
        SubResource::ORDER[0]
    }

    pub fn next(self) -> Option<SubResource> {
        let idx = SubResource::ORDER.iter().position(|r| *r == self)?;
        SubResource::ORDER.get(idx + 1).copied()
    }
}
