// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::executable_model::{api_server::HandledRequest, *};
use crate::kubernetes_api_objects::{
    api_method::*,
    dynamic::{KubeObjectRef, Marshal},
    error::APIError,
    owner_reference::attach_owner,
};
use crate::shim_layer::api_server::ApiServer;
use crate::staticsite_controller::exec::resource::*;
use crate::staticsite_controller::trusted::{spec_types::StaticSite, step::SubResource};
use crate::unit_tests::common::*;
use k8s_openapi::api::{apps::v1::Deployment, core::v1::Service, networking::v1::Ingress};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;

fn create_request<K: Marshal>(obj: &K) -> KubeCreateRequest {
    KubeCreateRequest {
        api_resource: K::api_resource(),
        namespace: NAMESPACE.to_string(),
        obj: obj.marshal().unwrap(),
    }
}

fn update_request<K: Marshal>(name: &str, obj: &K) -> KubeUpdateRequest {
    KubeUpdateRequest {
        api_resource: K::api_resource(),
        name: name.to_string(),
        namespace: NAMESPACE.to_string(),
        obj: obj.marshal().unwrap(),
    }
}

#[test]
pub fn test_create_assigns_identity() {
    let mut s = ApiServerState::new();
    let site = make_unsaved_site("blog", 1);
    let created = ExecutableApiServerModel::handle_create_request(&create_request(&site), &mut s)
        .res
        .unwrap();
    assert_eq!(Some("0".to_string()), created.metadata.uid);
    assert_eq!(Some("0".to_string()), created.metadata.resource_version);
    assert_eq!(1, s.resources.len());

    let docs = ExecutableApiServerModel::handle_create_request(&create_request(&make_unsaved_site("docs", 1)), &mut s)
        .res
        .unwrap();
    assert_eq!(Some("1".to_string()), docs.metadata.uid);
    assert_eq!(2, s.uid_counter);
    assert_eq!(2, s.resource_version_counter);
}

#[test]
pub fn test_create_rejects_duplicates() {
    let mut s = ApiServerState::new();
    let req = create_request(&make_unsaved_site("blog", 1));
    assert!(ExecutableApiServerModel::handle_create_request(&req, &mut s).res.is_ok());
    assert_eq!(
        Err(APIError::ObjectAlreadyExists),
        ExecutableApiServerModel::handle_create_request(&req, &mut s).res.map(|_| ())
    );
}

#[test]
pub fn test_create_rejects_malformed_requests() {
    let mut s = ApiServerState::new();
    let mut unnamed = make_service(&make_site("blog", 1));
    unnamed.metadata.name = None;
    assert_eq!(
        Err(APIError::Invalid),
        ExecutableApiServerModel::handle_create_request(&create_request(&unnamed), &mut s).res.map(|_| ())
    );

    let mut elsewhere = make_service(&make_site("blog", 1));
    elsewhere.metadata.namespace = Some("other".to_string());
    assert_eq!(
        Err(APIError::BadRequest),
        ExecutableApiServerModel::handle_create_request(&create_request(&elsewhere), &mut s).res.map(|_| ())
    );

    let mut wrong_kind = create_request(&make_service(&make_site("blog", 1)));
    wrong_kind.api_resource = Deployment::api_resource();
    assert_eq!(
        Err(APIError::BadRequest),
        ExecutableApiServerModel::handle_create_request(&wrong_kind, &mut s).res.map(|_| ())
    );
    assert!(s.resources.is_empty());
}

#[test]
pub fn test_create_rejects_two_controllers() {
    let mut s = ApiServerState::new();
    let mut service = make_service(&make_site("blog", 1));
    attach_owner(&mut service.metadata, &make_site("blog", 1)).unwrap();
    service.metadata.owner_references.as_mut().unwrap().push(OwnerReference {
        api_version: "web.mydomain.com/v1".to_string(),
        kind: "StaticSite".to_string(),
        name: "docs".to_string(),
        uid: "docs-uid".to_string(),
        controller: Some(true),
        block_owner_deletion: Some(true),
    });
    assert_eq!(
        Err(APIError::Invalid),
        ExecutableApiServerModel::handle_create_request(&create_request(&service), &mut s).res.map(|_| ())
    );
}

#[test]
pub fn test_update_checks_resource_version() {
    let mut s = ApiServerState::new();
    let created = ExecutableApiServerModel::handle_create_request(&create_request(&make_deployment(&make_site("blog", 1))), &mut s)
        .res
        .unwrap();
    let mut deployment = Deployment::unmarshal(created).unwrap();
    deployment.spec.as_mut().unwrap().replicas = Some(3);

    let updated = ExecutableApiServerModel::handle_update_request(&update_request("blog", &deployment), &mut s)
        .res
        .unwrap();
    assert_eq!(Some("1".to_string()), updated.metadata.resource_version);
    assert_eq!(Some("0".to_string()), updated.metadata.uid);

    // deployment still carries resourceVersion 0
    deployment.spec.as_mut().unwrap().replicas = Some(4);
    assert_eq!(
        Err(APIError::Conflict),
        ExecutableApiServerModel::handle_update_request(&update_request("blog", &deployment), &mut s).res.map(|_| ())
    );

    // built-in kinds accept unconditional updates
    deployment.metadata.resource_version = None;
    let updated = ExecutableApiServerModel::handle_update_request(&update_request("blog", &deployment), &mut s)
        .res
        .unwrap();
    assert_eq!(4, Deployment::unmarshal(updated).unwrap().spec.unwrap().replicas.unwrap());
}

#[test]
pub fn test_update_custom_resource_needs_resource_version() {
    let mut s = ApiServerState::new();
    let created = ExecutableApiServerModel::handle_create_request(&create_request(&make_unsaved_site("blog", 1)), &mut s)
        .res
        .unwrap();
    let mut site = StaticSite::unmarshal(created).unwrap();
    site.spec.replicas = 2;
    site.metadata.resource_version = None;
    assert_eq!(
        Err(APIError::Invalid),
        ExecutableApiServerModel::handle_update_request(&update_request("blog", &site), &mut s).res.map(|_| ())
    );
}

#[test]
pub fn test_update_missing_object() {
    let mut s = ApiServerState::new();
    let service = make_service(&make_site("blog", 1));
    assert_eq!(
        Err(APIError::ObjectNotFound),
        ExecutableApiServerModel::handle_update_request(&update_request("blog", &service), &mut s).res.map(|_| ())
    );
    assert_eq!(
        Err(APIError::BadRequest),
        ExecutableApiServerModel::handle_update_request(&update_request("docs", &service), &mut s).res.map(|_| ())
    );
}

#[test]
pub fn test_noop_update_keeps_resource_version() {
    let mut s = ApiServerState::new();
    let created = ExecutableApiServerModel::handle_create_request(&create_request(&make_service(&make_site("blog", 1))), &mut s)
        .res
        .unwrap();
    let service = Service::unmarshal(created.clone()).unwrap();
    let res = ExecutableApiServerModel::handle_update_request(&update_request("blog", &service), &mut s)
        .res
        .unwrap();
    assert_eq!(created, res);
    assert_eq!(1, s.resource_version_counter);
}

#[tokio::test]
pub async fn test_delete_collects_dependents() {
    let api_server = ExecutableApiServer::new();
    let site = seed_site(&api_server, "blog", 1);
    let other = seed_site(&api_server, "docs", 1);
    for resource in SubResource::ORDER {
        let req = KubeCreateRequest {
            api_resource: builder_of(resource).api_resource(),
            namespace: NAMESPACE.to_string(),
            obj: builder_of(resource).make(&site).unwrap(),
        };
        assert!(api_server.create(&req).await.is_ok());
    }
    api_server.create_object(&make_service(&other)).unwrap();
    assert_eq!(6, api_server.len());

    let deleted = api_server.delete_object::<StaticSite>(NAMESPACE, "blog").unwrap();
    assert_eq!(
        vec![
            KubeObjectRef::new(&StaticSite::api_resource(), NAMESPACE, "blog"),
            KubeObjectRef::new(&Deployment::api_resource(), NAMESPACE, "blog"),
            KubeObjectRef::new(&Ingress::api_resource(), NAMESPACE, "blog"),
            KubeObjectRef::new(&Service::api_resource(), NAMESPACE, "blog"),
        ],
        deleted
    );
    assert_eq!(2, api_server.len());
    assert!(api_server.contains::<StaticSite>(NAMESPACE, "docs"));
    assert!(api_server.contains::<Service>(NAMESPACE, "docs"));
    assert_eq!(
        Err(APIError::ObjectNotFound),
        api_server.delete_object::<StaticSite>(NAMESPACE, "blog")
    );
}

#[tokio::test]
pub async fn test_injected_failure_fires_once() {
    let api_server = ExecutableApiServer::new();
    api_server.inject_failure(ActionKind::Create, "Service", APIError::Timeout);
    let req = create_request(&make_service(&make_site("blog", 1)));
    let key = req.key();

    assert_eq!(Err(APIError::Timeout), api_server.create(&req).await.map(|_| ()));
    assert!(!api_server.contains::<Service>(NAMESPACE, "blog"));
    assert!(api_server.create(&req).await.is_ok());
    assert_eq!(
        vec![
            HandledRequest {
                action: ActionKind::Create,
                key: key.clone(),
                res: Err(APIError::Timeout),
            },
            HandledRequest {
                action: ActionKind::Create,
                key: key.clone(),
                res: Ok(()),
            },
        ],
        api_server.requests()
    );
    assert_eq!(vec![(ActionKind::Create, key)], api_server.writes());
}

#[tokio::test]
pub async fn test_handle_dispatches_by_request() {
    let api_server = ExecutableApiServer::new();
    let site = seed_site(&api_server, "blog", 1);
    let resp = api_server
        .handle(KubeAPIRequest::GetRequest(KubeGetRequest {
            api_resource: StaticSite::api_resource(),
            name: "blog".to_string(),
            namespace: NAMESPACE.to_string(),
        }))
        .await;
    let found = resp.into_get_response().unwrap().res.unwrap();
    assert_eq!(site, StaticSite::unmarshal(found).unwrap());

    let resp = api_server
        .handle(KubeAPIRequest::CreateRequest(create_request(&make_ingress(&site))))
        .await;
    assert!(resp.clone().into_get_response().is_none());
    assert!(resp.into_create_response().unwrap().res.is_ok());
}
