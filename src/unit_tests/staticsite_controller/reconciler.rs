// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::kubernetes_api_objects::{
    api_method::*,
    dynamic::{KubeObjectRef, Marshal},
    error::APIError,
    owner_reference::is_controlled_by,
};
use crate::reconciler::reconciler::{FailureCause, Reconciler};
use crate::staticsite_controller::exec::{reconciler::*, resource::*};
use crate::staticsite_controller::trusted::{spec_types::StaticSite, step::*};
use crate::unit_tests::common::*;
use k8s_openapi::api::{apps::v1::Deployment, core::v1::Service, networking::v1::Ingress};
use kube::api::DynamicObject;

fn at(action: ActionKind, resource: SubResource) -> StaticSiteReconcileState {
    StaticSiteReconcileState {
        reconcile_step: StaticSiteReconcileStep::AfterKRequestStep(action, resource),
        failure: None,
    }
}

fn get_response(res: Result<DynamicObject, APIError>) -> Option<KubeAPIResponse> {
    Some(KubeAPIResponse::GetResponse(KubeGetResponse { res }))
}

fn create_response(res: Result<DynamicObject, APIError>) -> Option<KubeAPIResponse> {
    Some(KubeAPIResponse::CreateResponse(KubeCreateResponse { res }))
}

fn update_response(res: Result<DynamicObject, APIError>) -> Option<KubeAPIResponse> {
    Some(KubeAPIResponse::UpdateResponse(KubeUpdateResponse { res }))
}

fn expect_get(req: Option<KubeAPIRequest>) -> KubeGetRequest {
    match req {
        Some(KubeAPIRequest::GetRequest(req)) => req,
        other => panic!("expected a get request, got {:?}", other),
    }
}

fn expect_create(req: Option<KubeAPIRequest>) -> KubeCreateRequest {
    match req {
        Some(KubeAPIRequest::CreateRequest(req)) => req,
        other => panic!("expected a create request, got {:?}", other),
    }
}

fn expect_update(req: Option<KubeAPIRequest>) -> KubeUpdateRequest {
    match req {
        Some(KubeAPIRequest::UpdateRequest(req)) => req,
        other => panic!("expected an update request, got {:?}", other),
    }
}

fn key_of<K: Marshal>(name: &str) -> KubeObjectRef {
    KubeObjectRef::new(&K::api_resource(), NAMESPACE, name)
}

#[test]
pub fn test_init_gets_deployment() {
    let site = make_site("blog", 2);
    let (state, req) = reconcile_core(&site, None, reconcile_init_state());
    assert_eq!(at(ActionKind::Get, SubResource::Deployment), state);
    let req = expect_get(req);
    assert_eq!(key_of::<Deployment>("blog"), req.key());
}

#[test]
pub fn test_init_rejects_ill_formed_site() {
    let site = make_site("blog", -1);
    let (state, req) = reconcile_core(&site, None, reconcile_init_state());
    assert!(req.is_none());
    assert_eq!(StaticSiteReconcileStep::Error, state.reconcile_step);
    let failure = StaticSiteReconciler::reconcile_error(&state).unwrap();
    assert_eq!(key_of::<StaticSite>("blog"), failure.key);
    assert_eq!(FailureCause::InvalidCustomResource(".spec.replicas is negative"), failure.cause);
}

#[test]
pub fn test_missing_deployment_is_created_then_requeued() {
    let site = make_site("blog", 2);
    let (state, req) = reconcile_core(
        &site,
        get_response(Err(APIError::ObjectNotFound)),
        at(ActionKind::Get, SubResource::Deployment),
    );
    assert_eq!(at(ActionKind::Create, SubResource::Deployment), state);
    let req = expect_create(req);
    assert_eq!("default", req.namespace);
    assert!(is_controlled_by(&req.obj.metadata, &site));
    let deployment = Deployment::unmarshal(req.obj.clone()).unwrap();
    assert_eq!(Some(2), deployment.spec.unwrap().replicas);

    let (state, req) = reconcile_core(&site, create_response(Ok(req.obj)), state);
    assert!(req.is_none());
    assert!(StaticSiteReconciler::reconcile_requeue(&state));
    assert!(!StaticSiteReconciler::reconcile_done(&state));
    assert!(StaticSiteReconciler::reconcile_error(&state).is_none());
}

#[test]
pub fn test_converged_deployment_moves_to_service() {
    let site = make_site("blog", 2);
    let found = make_deployment(&site).marshal().unwrap();
    let (state, req) = reconcile_core(&site, get_response(Ok(found)), at(ActionKind::Get, SubResource::Deployment));
    assert_eq!(at(ActionKind::Get, SubResource::Service), state);
    assert_eq!(key_of::<Service>("blog"), expect_get(req).key());
}

#[test]
pub fn test_drifted_deployment_is_updated() {
    let site = make_site("blog", 2);
    let mut found = make_deployment(&make_site("blog", 7));
    found.metadata.resource_version = Some("42".to_string());
    let (state, req) = reconcile_core(
        &site,
        get_response(Ok(found.marshal().unwrap())),
        at(ActionKind::Get, SubResource::Deployment),
    );
    assert_eq!(at(ActionKind::Update, SubResource::Deployment), state);
    let req = expect_update(req);
    assert_eq!("blog", req.name);
    let updated = Deployment::unmarshal(req.obj.clone()).unwrap();
    assert_eq!(Some("42".to_string()), updated.metadata.resource_version);
    assert_eq!(Some(2), updated.spec.unwrap().replicas);

    let (state, req) = reconcile_core(&site, update_response(Ok(req.obj)), state);
    assert_eq!(at(ActionKind::Get, SubResource::Service), state);
    assert_eq!(key_of::<Service>("blog"), expect_get(req).key());
}

#[test]
pub fn test_service_and_ingress_are_created() {
    let site = make_site("blog", 2);
    let (state, req) = reconcile_core(
        &site,
        get_response(Err(APIError::ObjectNotFound)),
        at(ActionKind::Get, SubResource::Service),
    );
    let req = expect_create(req);
    assert!(is_controlled_by(&req.obj.metadata, &site));

    let (state, req) = reconcile_core(&site, create_response(Ok(req.obj)), state);
    assert_eq!(at(ActionKind::Get, SubResource::Ingress), state);
    assert_eq!(key_of::<Ingress>("blog"), expect_get(req).key());

    let (state, req) = reconcile_core(&site, get_response(Err(APIError::ObjectNotFound)), state);
    let req = expect_create(req);
    let (state, req) = reconcile_core(&site, create_response(Ok(req.obj)), state);
    assert!(req.is_none());
    assert!(StaticSiteReconciler::reconcile_done(&state));
}

#[test]
pub fn test_existing_ingress_finishes() {
    let site = make_site("blog", 2);
    let found = make_ingress(&site).marshal().unwrap();
    let (state, req) = reconcile_core(&site, get_response(Ok(found)), at(ActionKind::Get, SubResource::Ingress));
    assert!(req.is_none());
    assert!(StaticSiteReconciler::reconcile_done(&state));
}

#[test]
pub fn test_get_error_aborts() {
    let site = make_site("blog", 2);
    let (state, req) = reconcile_core(
        &site,
        get_response(Err(APIError::InternalError)),
        at(ActionKind::Get, SubResource::Service),
    );
    assert!(req.is_none());
    let failure = StaticSiteReconciler::reconcile_error(&state).unwrap();
    assert_eq!(ActionKind::Get, failure.action);
    assert_eq!(key_of::<Service>("blog"), failure.key);
    assert_eq!(FailureCause::Api(APIError::InternalError), failure.cause);
    assert_eq!(
        "Get Service/default/blog failed: API server returned InternalError",
        failure.to_string()
    );
}

#[test]
pub fn test_create_error_aborts() {
    let site = make_site("blog", 2);
    let (state, _) = reconcile_core(
        &site,
        create_response(Err(APIError::Forbidden)),
        at(ActionKind::Create, SubResource::Ingress),
    );
    let failure = StaticSiteReconciler::reconcile_error(&state).unwrap();
    assert_eq!(ActionKind::Create, failure.action);
    assert_eq!(key_of::<Ingress>("blog"), failure.key);
}

#[test]
pub fn test_races_requeue() {
    let site = make_site("blog", 2);
    let (state, req) = reconcile_core(
        &site,
        create_response(Err(APIError::ObjectAlreadyExists)),
        at(ActionKind::Create, SubResource::Service),
    );
    assert!(req.is_none());
    assert!(StaticSiteReconciler::reconcile_requeue(&state));

    let (state, req) = reconcile_core(
        &site,
        update_response(Err(APIError::Conflict)),
        at(ActionKind::Update, SubResource::Deployment),
    );
    assert!(req.is_none());
    assert!(StaticSiteReconciler::reconcile_requeue(&state));
}

#[test]
pub fn test_unexpected_response() {
    let site = make_site("blog", 2);
    let (state, req) = reconcile_core(&site, None, at(ActionKind::Get, SubResource::Deployment));
    assert!(req.is_none());
    assert_eq!(
        FailureCause::UnexpectedResponse,
        StaticSiteReconciler::reconcile_error(&state).unwrap().cause
    );

    let (state, _) = reconcile_core(
        &site,
        get_response(Err(APIError::ObjectNotFound)),
        at(ActionKind::Create, SubResource::Deployment),
    );
    assert_eq!(
        FailureCause::UnexpectedResponse,
        StaticSiteReconciler::reconcile_error(&state).unwrap().cause
    );
}

#[test]
pub fn test_found_object_of_wrong_kind() {
    let site = make_site("blog", 2);
    let service = make_service(&site).marshal().unwrap();
    let (state, _) = reconcile_core(&site, get_response(Ok(service)), at(ActionKind::Get, SubResource::Deployment));
    let failure = StaticSiteReconciler::reconcile_error(&state).unwrap();
    assert!(matches!(failure.cause, FailureCause::Parse(_)));
}

#[test]
pub fn test_terminal_states_issue_nothing() {
    let site = make_site("blog", 2);
    for step in [
        StaticSiteReconcileStep::Done,
        StaticSiteReconcileStep::Requeue,
        StaticSiteReconcileStep::Error,
    ] {
        let state = StaticSiteReconcileState {
            reconcile_step: step,
            failure: None,
        };
        let (next, req) = reconcile_core(&site, None, state.clone());
        assert_eq!(state, next);
        assert!(req.is_none());
    }
}

#[test]
pub fn test_sub_resource_order() {
    assert_eq!(SubResource::Deployment, SubResource::first());
    assert_eq!(Some(SubResource::Service), SubResource::Deployment.next());
    assert_eq!(Some(SubResource::Ingress), SubResource::Service.next());
    assert_eq!(None, SubResource::Ingress.next());
}
