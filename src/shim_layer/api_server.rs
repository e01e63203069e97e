// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::kubernetes_api_objects::{api_method::*, error::APIError};
use async_trait::async_trait;
use kube::{
    api::{Api, ApiResource, DynamicObject, PostParams},
    Client,
};
use tracing::debug;

/// ApiServer is the store the shim layer sends reconcile_core's requests to.
/// Every request addresses one object by kind, namespace and name.
#[async_trait]
pub trait ApiServer: Send + Sync {
    async fn get(&self, req: &KubeGetRequest) -> Result<DynamicObject, APIError>;

    async fn create(&self, req: &KubeCreateRequest) -> Result<DynamicObject, APIError>;

    async fn update(&self, req: &KubeUpdateRequest) -> Result<DynamicObject, APIError>;

    async fn handle(&self, req: KubeAPIRequest) -> KubeAPIResponse {
        match req {
            KubeAPIRequest::GetRequest(get_req) => KubeAPIResponse::GetResponse(KubeGetResponse {
                res: self.get(&get_req).await,
            }),
            KubeAPIRequest::CreateRequest(create_req) => KubeAPIResponse::CreateResponse(KubeCreateResponse {
                res: self.create(&create_req).await,
            }),
            KubeAPIRequest::UpdateRequest(update_req) => KubeAPIResponse::UpdateResponse(KubeUpdateResponse {
                res: self.update(&update_req).await,
            }),
        }
    }
}

/// KubeApiServer sends requests to a live cluster through kube-rs.
#[derive(Clone)]
pub struct KubeApiServer {
    client: Client,
}

impl KubeApiServer {
    pub fn new(client: Client) -> KubeApiServer {
        KubeApiServer { client }
    }

    fn api(&self, api_resource: &ApiResource, namespace: &str) -> Api<DynamicObject> {
        Api::namespaced_with(self.client.clone(), namespace, api_resource)
    }
}

#[async_trait]
impl ApiServer for KubeApiServer {
    async fn get(&self, req: &KubeGetRequest) -> Result<DynamicObject, APIError> {
        self.api(&req.api_resource, &req.namespace)
            .get(&req.name)
            .await
            .map_err(|err| {
                debug!(key = %req.key(), error = %err, "get failed");
                APIError::from(&err)
            })
    }

    async fn create(&self, req: &KubeCreateRequest) -> Result<DynamicObject, APIError> {
        self.api(&req.api_resource, &req.namespace)
            .create(&PostParams::default(), &req.obj)
            .await
            .map_err(|err| {
                debug!(key = %req.key(), error = %err, "create failed");
                APIError::from(&err)
            })
    }

    async fn update(&self, req: &KubeUpdateRequest) -> Result<DynamicObject, APIError> {
        self.api(&req.api_resource, &req.namespace)
            .replace(&req.name, &PostParams::default(), &req.obj)
            .await
            .map_err(|err| {
                debug!(key = %req.key(), error = %err, "update failed");
                APIError::from(&err)
            })
    }
}
