// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::kubernetes_api_objects::{dynamic::*, error::ParseDynamicObjectError};
use crate::staticsite_controller::trusted::spec_types::StaticSite;
use crate::unit_tests::common::*;
use k8s_openapi::api::{apps::v1::Deployment, core::v1::Service};
use kube::api::{DynamicObject, ObjectMeta};

#[test]
pub fn test_api_resource() {
    let api_resource = StaticSite::api_resource();
    assert_eq!("web.mydomain.com", api_resource.group);
    assert_eq!("web.mydomain.com/v1", api_resource.api_version);
    assert_eq!("StaticSite", api_resource.kind);
    assert_eq!("staticsites", api_resource.plural);

    let api_resource = Deployment::api_resource();
    assert_eq!("apps/v1", api_resource.api_version);
    assert_eq!("deployments", api_resource.plural);
}

#[test]
pub fn test_marshal_and_unmarshal_custom_resource() {
    let site = make_site("blog", 2);
    let obj = site.marshal().unwrap();
    let types = obj.types.clone().unwrap();
    assert_eq!("StaticSite", types.kind);
    assert_eq!("web.mydomain.com/v1", types.api_version);
    assert_eq!(2, obj.data["spec"]["replicas"]);
    assert_eq!(GIT_REPO, obj.data["spec"]["gitRepo"]);
    assert_eq!(site, StaticSite::unmarshal(obj).unwrap());
}

#[test]
pub fn test_unmarshal_kind_mismatch() {
    let obj = make_site("blog", 2).marshal().unwrap();
    assert_eq!(
        ParseDynamicObjectError::KindMismatch {
            expected: "Service".to_string(),
            found: "StaticSite".to_string(),
        },
        Service::unmarshal(obj).unwrap_err()
    );
}

#[test]
pub fn test_unmarshal_missing_type_meta() {
    let obj = DynamicObject {
        types: None,
        metadata: ObjectMeta::default(),
        data: serde_json::json!({}),
    };
    assert_eq!(ParseDynamicObjectError::MissingTypeMeta, Deployment::unmarshal(obj).unwrap_err());
}

#[test]
pub fn test_unmarshal_bad_data() {
    let mut obj = make_site("blog", 2).marshal().unwrap();
    obj.data["spec"]["replicas"] = serde_json::json!("two");
    assert!(matches!(
        StaticSite::unmarshal(obj),
        Err(ParseDynamicObjectError::UnmarshalError(_))
    ));
}

#[test]
pub fn test_object_ref_display() {
    let key = KubeObjectRef::new(&Deployment::api_resource(), "default", "blog");
    assert_eq!("Deployment/default/blog", key.to_string());
}
