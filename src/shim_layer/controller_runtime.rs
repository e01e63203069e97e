// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::config::ControllerConfig;
use crate::kubernetes_api_objects::{
    api_method::{KubeAPIResponse, KubeGetRequest},
    dynamic::{KubeObjectRef, Marshal},
    error::{APIError, ParseDynamicObjectError},
};
use crate::reconciler::reconciler::{ReconcileFailure, ReconcileOutcome, Reconciler};
use crate::shim_layer::{
    api_server::{ApiServer, KubeApiServer},
    identity_lock::IdentityLocks,
};
use futures::StreamExt;
use kube::{
    api::{Api, Resource},
    runtime::{
        controller::{Action, Controller},
        watcher,
    },
    Client,
};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

// The shim layer connects reconcile_core to the API server.
// kube-rs's Controller decides when a custom resource needs reconciling and calls reconcile,
// which is built on top of reconcile_with and the reconcile_core provided by the developer.

#[derive(Debug, Error)]
pub enum Error {
    #[error("custom resource misses .metadata.{0}")]
    MissingObjectKey(&'static str),
    #[error("get {key} failed: {source}")]
    CRGetFailed { key: KubeObjectRef, source: APIError },
    #[error("parse {key} failed: {source}")]
    CRParseFailed {
        key: KubeObjectRef,
        source: ParseDynamicObjectError,
    },
    #[error(transparent)]
    ReconcileCoreError(#[from] ReconcileFailure),
    #[error("reconcile of {0} cancelled")]
    Cancelled(KubeObjectRef),
}

/// Data is the context shared by every reconcile the controller runs.
pub struct Data<A: ApiServer> {
    pub api_server: A,
    pub config: ControllerConfig,
    pub locks: IdentityLocks,
    pub cancel: CancellationToken,
}

impl<A: ApiServer> Data<A> {
    pub fn new(api_server: A, config: ControllerConfig) -> Data<A> {
        Data {
            api_server,
            config,
            locks: IdentityLocks::default(),
            cancel: CancellationToken::new(),
        }
    }
}

// run_controller prepares and runs the controller for the custom resource R::K.
// configure receives the controller before it starts so the caller can register
// the kinds it owns.
pub async fn run_controller<R>(
    config: ControllerConfig,
    configure: impl FnOnce(Controller<R::K>, &Client) -> Controller<R::K>,
) -> anyhow::Result<()>
where
    R: Reconciler + 'static,
{
    let client = Client::try_default().await?;
    let crs = Api::<R::K>::all(client.clone());
    let data = Arc::new(Data::new(KubeApiServer::new(client.clone()), config));

    let cancel = data.cancel.clone();
    tokio::spawn(shutdown_signal(cancel.clone()));

    info!("starting controller");
    configure(Controller::new(crs, watcher::Config::default()), &client)
        .graceful_shutdown_on(async move { cancel.cancelled().await })
        .run(reconcile::<R, KubeApiServer>, error_policy::<R::K, KubeApiServer>, data)
        .for_each(|res| async move {
            match res {
                Ok((obj, action)) => debug!(object = %obj, ?action, "reconciled"),
                Err(err) => warn!(error = %err, "reconcile failed"),
            }
        })
        .await;
    info!("controller terminated");
    Ok(())
}

// reconcile is what kube-rs calls whenever its watchers see a relevant event
// or a previously returned Action fires.
pub async fn reconcile<R, A>(cr: Arc<R::K>, ctx: Arc<Data<A>>) -> Result<Action, Error>
where
    R: Reconciler,
    A: ApiServer,
{
    let name = cr.meta().name.as_deref().ok_or(Error::MissingObjectKey("name"))?;
    let namespace = cr
        .meta()
        .namespace
        .as_deref()
        .ok_or(Error::MissingObjectKey("namespace"))?;
    let outcome = reconcile_with::<R, A>(&ctx.api_server, &ctx.locks, namespace, name, &ctx.cancel).await?;
    Ok(ctx.config.action_for(outcome))
}

pub fn error_policy<K, A: ApiServer>(_cr: Arc<K>, err: &Error, ctx: Arc<Data<A>>) -> Action {
    warn!(error = %err, "reconcile will be retried");
    ctx.config.error_action()
}

// reconcile_with drives one reconcile of the custom resource namespace/name.
//
// It gets the custom resource with a fresh read and then invokes R::reconcile_core in a loop:
// it starts with R::reconcile_init_state, and in each iteration it sends the request returned
// by the previous invocation to api_server and feeds the response back together with the new state.
// The loop ends when reconcile_core reports done, requeue or error,
// or when cancel fires between two iterations.
pub async fn reconcile_with<R, A>(
    api_server: &A,
    locks: &IdentityLocks,
    namespace: &str,
    name: &str,
    cancel: &CancellationToken,
) -> Result<ReconcileOutcome, Error>
where
    R: Reconciler,
    A: ApiServer + ?Sized,
{
    let cr_get = KubeGetRequest {
        api_resource: R::K::api_resource(),
        name: name.to_string(),
        namespace: namespace.to_string(),
    };
    let cr_key = cr_get.key();
    let log_header = format!("Reconciling {}:", cr_key);

    let _guard = locks.lock(cr_key.clone()).await;
    if cancel.is_cancelled() {
        return Err(Error::Cancelled(cr_key));
    }

    let cr = match api_server.get(&cr_get).await {
        Ok(obj) => obj,
        Err(APIError::ObjectNotFound) => {
            info!("{} custom resource not found, nothing to do", log_header);
            return Ok(ReconcileOutcome::Success);
        }
        Err(err) => {
            warn!("{} get custom resource failed: {}", log_header, err);
            return Err(Error::CRGetFailed { key: cr_key, source: err });
        }
    };
    let cr = R::K::unmarshal(cr).map_err(|source| Error::CRParseFailed {
        key: cr_key.clone(),
        source,
    })?;

    let mut state = R::reconcile_init_state();
    let mut resp_o: Option<KubeAPIResponse> = None;
    loop {
        if R::reconcile_done(&state) {
            info!("{} done", log_header);
            return Ok(ReconcileOutcome::Success);
        }
        if R::reconcile_requeue(&state) {
            info!("{} requeue", log_header);
            return Ok(ReconcileOutcome::Requeue);
        }
        if let Some(failure) = R::reconcile_error(&state) {
            error!(action = %failure.action, key = %failure.key, "{} {}", log_header, failure);
            return Err(Error::ReconcileCoreError(failure.clone()));
        }
        if cancel.is_cancelled() {
            warn!("{} cancelled", log_header);
            return Err(Error::Cancelled(cr_key));
        }
        let (state_prime, req_o) = R::reconcile_core(&cr, resp_o, state);
        state = state_prime;
        resp_o = match req_o {
            Some(req) => {
                info!(action = %req.action(), key = %req.key(), "{} {} {}", log_header, req.action(), req.key());
                Some(api_server.handle(req).await)
            }
            None => None,
        };
    }
}

async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C, shutting down"),
        _ = terminate => info!("received terminate signal, shutting down"),
    }
    cancel.cancel();
}
