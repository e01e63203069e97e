// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::kubernetes_api_objects::{
    api_method::KubeGetRequest,
    dynamic::Marshal,
    owner_reference::attach_owner,
};
use crate::reconciler::reconciler::FailureCause;
use crate::staticsite_controller::trusted::spec_types::StaticSite;
use kube::api::{DynamicObject, ObjectMeta, Resource, ResourceExt};
use std::collections::BTreeMap;

pub const SITE_DATA_VOLUME: &str = "site-data";
pub const HTTP_PORT: i32 = 80;

/// The labels shared by the pod template, the deployment selector and the service
/// selector. They only depend on the StaticSite name so they never change for the
/// life of the site.
pub fn make_labels(site: &StaticSite) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("app".to_string(), "staticsite".to_string()),
        ("staticsite_cr".to_string(), site.name_any()),
    ])
}

/// Every managed resource takes the name and namespace of its StaticSite.
pub fn make_metadata(site: &StaticSite) -> ObjectMeta {
    ObjectMeta {
        name: Some(site.name_any()),
        namespace: site.namespace(),
        ..ObjectMeta::default()
    }
}

pub fn make_host(site: &StaticSite) -> String {
    format!("{}.local", site.name_any())
}

pub fn make_get_request<T: Marshal>(site: &StaticSite) -> KubeGetRequest {
    KubeGetRequest {
        api_resource: T::api_resource(),
        name: site.name_any(),
        namespace: site.namespace().unwrap_or_default(),
    }
}

/// Links a freshly built object to its StaticSite and marshals it for creation.
pub fn make_owned<T: Marshal>(site: &StaticSite, mut obj: T) -> Result<DynamicObject, FailureCause> {
    attach_owner(obj.meta_mut(), site)?;
    Ok(obj.marshal()?)
}
