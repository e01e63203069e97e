// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::kubernetes_api_objects::{
    api_method::*,
    dynamic::{KubeObjectRef, Marshal},
    error::APIError,
};
use crate::reconciler::reconciler::{FailureCause, ReconcileFailure, Reconciler};
use crate::staticsite_controller::exec::resource::builder_of;
use crate::staticsite_controller::trusted::{spec_types::StaticSite, step::*};
use kube::api::{DynamicObject, ResourceExt};

// StaticSiteReconcileState describes the local state with which reconcile_core makes decisions.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticSiteReconcileState {
    // reconcile_step, like a program counter, tracks the progress of reconcile_core
    // across the requests it hands to the shim layer.
    pub reconcile_step: StaticSiteReconcileStep,
    pub failure: Option<ReconcileFailure>,
}

pub struct StaticSiteReconciler {}

impl Reconciler for StaticSiteReconciler {
    type K = StaticSite;
    type S = StaticSiteReconcileState;

    fn reconcile_init_state() -> StaticSiteReconcileState {
        reconcile_init_state()
    }

    fn reconcile_core(
        site: &StaticSite,
        resp_o: Option<KubeAPIResponse>,
        state: StaticSiteReconcileState,
    ) -> (StaticSiteReconcileState, Option<KubeAPIRequest>) {
        reconcile_core(site, resp_o, state)
    }

    fn reconcile_done(state: &StaticSiteReconcileState) -> bool {
        state.reconcile_step == StaticSiteReconcileStep::Done
    }

    fn reconcile_requeue(state: &StaticSiteReconcileState) -> bool {
        state.reconcile_step == StaticSiteReconcileStep::Requeue
    }

    fn reconcile_error(state: &StaticSiteReconcileState) -> Option<&ReconcileFailure> {
        match state.reconcile_step {
            StaticSiteReconcileStep::Error => state.failure.as_ref(),
            _ => None,
        }
    }
}

pub fn reconcile_init_state() -> StaticSiteReconcileState {
    StaticSiteReconcileState {
        reconcile_step: StaticSiteReconcileStep::Init,
        failure: None,
    }
}

pub fn reconcile_core(
    site: &StaticSite,
    resp_o: Option<KubeAPIResponse>,
    state: StaticSiteReconcileState,
) -> (StaticSiteReconcileState, Option<KubeAPIRequest>) {
    match state.reconcile_step {
        StaticSiteReconcileStep::Init => {
            if let Err(reason) = site.well_formed() {
                let key = KubeObjectRef::new(&StaticSite::api_resource(), &site.namespace().unwrap_or_default(), &site.name_any());
                let failure = ReconcileFailure::new(ActionKind::Get, key, FailureCause::InvalidCustomResource(reason));
                return (error_state(state, failure), None);
            }
            get_resource(site, SubResource::first(), state)
        }
        StaticSiteReconcileStep::AfterKRequestStep(action, resource) => {
            reconcile_helper(site, resp_o, state, action, resource)
        }
        _ => (state, None),
    }
}

// reconcile_helper runs the get, then create-or-update protocol for one managed resource.
// Which resource is handled is decided by the step; how it is built comes from its builder.
fn reconcile_helper(
    site: &StaticSite,
    resp_o: Option<KubeAPIResponse>,
    state: StaticSiteReconcileState,
    action: ActionKind,
    resource: SubResource,
) -> (StaticSiteReconcileState, Option<KubeAPIRequest>) {
    let builder = builder_of(resource);
    let key = builder.get_request(site).key();
    match action {
        ActionKind::Get => {
            let get_resp = match resp_o.and_then(KubeAPIResponse::into_get_response) {
                Some(resp) => resp.res,
                None => return (error_state(state, ReconcileFailure::new(action, key, FailureCause::UnexpectedResponse)), None),
            };
            match get_resp {
                Ok(found) => match builder.update(site, found) {
                    Ok(Some(updated)) => {
                        let req = KubeAPIRequest::UpdateRequest(KubeUpdateRequest {
                            api_resource: builder.api_resource(),
                            name: key.name.clone(),
                            namespace: key.namespace.clone(),
                            obj: updated,
                        });
                        (after_request(state, ActionKind::Update, resource), Some(req))
                    }
                    Ok(None) => next_resource(site, resource, state),
                    Err(cause) => (error_state(state, ReconcileFailure::new(ActionKind::Update, key, cause)), None),
                },
                Err(APIError::ObjectNotFound) => match builder.make(site) {
                    Ok(obj) => create_request(state, resource, builder.api_resource(), key, obj),
                    Err(cause) => (error_state(state, ReconcileFailure::new(ActionKind::Create, key, cause)), None),
                },
                Err(err) => (error_state(state, ReconcileFailure::new(action, key, FailureCause::Api(err))), None),
            }
        }
        ActionKind::Create => {
            let create_resp = match resp_o.and_then(KubeAPIResponse::into_create_response) {
                Some(resp) => resp.res,
                None => return (error_state(state, ReconcileFailure::new(action, key, FailureCause::UnexpectedResponse)), None),
            };
            match create_resp {
                Ok(_) if builder.requeue_after_create() => (requeue_state(state), None),
                Ok(_) => next_resource(site, resource, state),
                // Someone else created it since our get; look again on the next round.
                Err(APIError::ObjectAlreadyExists) => (requeue_state(state), None),
                Err(err) => (error_state(state, ReconcileFailure::new(action, key, FailureCause::Api(err))), None),
            }
        }
        ActionKind::Update => {
            let update_resp = match resp_o.and_then(KubeAPIResponse::into_update_response) {
                Some(resp) => resp.res,
                None => return (error_state(state, ReconcileFailure::new(action, key, FailureCause::UnexpectedResponse)), None),
            };
            match update_resp {
                Ok(_) => next_resource(site, resource, state),
                // The object changed since our get; re-read and re-diff on the next round.
                Err(APIError::Conflict) => (requeue_state(state), None),
                Err(err) => (error_state(state, ReconcileFailure::new(action, key, FailureCause::Api(err))), None),
            }
        }
    }
}

fn get_resource(
    site: &StaticSite,
    resource: SubResource,
    state: StaticSiteReconcileState,
) -> (StaticSiteReconcileState, Option<KubeAPIRequest>) {
    let req = KubeAPIRequest::GetRequest(builder_of(resource).get_request(site));
    (after_request(state, ActionKind::Get, resource), Some(req))
}

fn create_request(
    state: StaticSiteReconcileState,
    resource: SubResource,
    api_resource: kube::api::ApiResource,
    key: KubeObjectRef,
    obj: DynamicObject,
) -> (StaticSiteReconcileState, Option<KubeAPIRequest>) {
    let req = KubeAPIRequest::CreateRequest(KubeCreateRequest {
        api_resource,
        namespace: key.namespace,
        obj,
    });
    (after_request(state, ActionKind::Create, resource), Some(req))
}

fn next_resource(
    site: &StaticSite,
    resource: SubResource,
    state: StaticSiteReconcileState,
) -> (StaticSiteReconcileState, Option<KubeAPIRequest>) {
    match resource.next() {
        Some(next) => get_resource(site, next, state),
        None => (done_state(state), None),
    }
}

fn after_request(state: StaticSiteReconcileState, action: ActionKind, resource: SubResource) -> StaticSiteReconcileState {
    StaticSiteReconcileState {
        reconcile_step: StaticSiteReconcileStep::AfterKRequestStep(action, resource),
        ..state
    }
}

fn done_state(state: StaticSiteReconcileState) -> StaticSiteReconcileState {
    StaticSiteReconcileState {
        reconcile_step: StaticSiteReconcileStep::Done,
        ..state
    }
}

fn requeue_state(state: StaticSiteReconcileState) -> StaticSiteReconcileState {
    StaticSiteReconcileState {
        reconcile_step: StaticSiteReconcileStep::Requeue,
        ..state
    }
}

pub fn error_state(mut state: StaticSiteReconcileState, failure: ReconcileFailure) -> StaticSiteReconcileState {
    state.reconcile_step = StaticSiteReconcileStep::Error;
    state.failure = Some(failure);
    state
}
