// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use super::common::*;
use crate::kubernetes_api_objects::{api_method::KubeGetRequest, dynamic::Marshal};
use crate::reconciler::{reconciler::FailureCause, resource_builder::ResourceBuilder};
use crate::staticsite_controller::trusted::spec_types::StaticSite;
use k8s_openapi::api::networking::v1 as networkingv1;
use kube::api::{ApiResource, DynamicObject, ResourceExt};

pub struct IngressBuilder;

impl ResourceBuilder<StaticSite> for IngressBuilder {
    fn api_resource(&self) -> ApiResource {
        networkingv1::Ingress::api_resource()
    }

    fn get_request(&self, site: &StaticSite) -> KubeGetRequest {
        make_get_request::<networkingv1::Ingress>(site)
    }

    fn make(&self, site: &StaticSite) -> Result<DynamicObject, FailureCause> {
        make_owned(site, make_ingress(site))
    }

    // An existing ingress is left as it is.
    fn update(&self, _site: &StaticSite, _found: DynamicObject) -> Result<Option<DynamicObject>, FailureCause> {
        Ok(None)
    }
}

/// Routes `<name>.local/` to port 80 of the site's service.
pub fn make_ingress(site: &StaticSite) -> networkingv1::Ingress {
    let mut metadata = make_metadata(site);
    metadata.labels = Some(make_labels(site));
    networkingv1::Ingress {
        metadata,
        spec: Some(networkingv1::IngressSpec {
            rules: Some(vec![networkingv1::IngressRule {
                host: Some(make_host(site)),
                http: Some(networkingv1::HTTPIngressRuleValue {
                    paths: vec![networkingv1::HTTPIngressPath {
                        path: Some("/".to_string()),
                        path_type: "Prefix".to_string(),
                        backend: networkingv1::IngressBackend {
                            service: Some(networkingv1::IngressServiceBackend {
                                name: site.name_any(),
                                port: Some(networkingv1::ServiceBackendPort {
                                    number: Some(HTTP_PORT),
                                    ..networkingv1::ServiceBackendPort::default()
                                }),
                            }),
                            ..networkingv1::IngressBackend::default()
                        },
                    }],
                }),
            }]),
            ..networkingv1::IngressSpec::default()
        }),
        ..networkingv1::Ingress::default()
    }
}
