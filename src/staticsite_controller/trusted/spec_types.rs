// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// StaticSite declares a site served from a git repository by a fixed number of replicas.
#[derive(CustomResource, Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(group = "web.mydomain.com", version = "v1", kind = "StaticSite")]
#[kube(shortname = "ss", namespaced, derive = "PartialEq")]
#[kube(printcolumn = r#"{"name":"Repo", "type":"string", "jsonPath":".spec.gitRepo"}"#)]
#[kube(printcolumn = r#"{"name":"Replicas", "type":"integer", "jsonPath":".spec.replicas"}"#)]
#[serde(rename_all = "camelCase")]
pub struct StaticSiteSpec {
    /// URL of the repository cloned into the serving volume.
    pub git_repo: String,
    #[schemars(range(min = 0))]
    pub replicas: i32,
}

impl StaticSite {
    /// A StaticSite can only be reconciled once the API server has assigned its
    /// identity and its replica count is non-negative.
    pub fn well_formed(&self) -> Result<(), &'static str> {
        if self.metadata.name.is_none() {
            return Err(".metadata.name is missing");
        }
        if self.metadata.namespace.is_none() {
            return Err(".metadata.namespace is missing");
        }
        if self.metadata.uid.is_none() {
            return Err(".metadata.uid is missing");
        }
        if self.spec.replicas < 0 {
            return Err(".spec.replicas is negative");
        }
        Ok(())
    }
}
