// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use super::common::*;
use crate::kubernetes_api_objects::{api_method::KubeGetRequest, dynamic::Marshal};
use crate::reconciler::{reconciler::FailureCause, resource_builder::ResourceBuilder};
use crate::staticsite_controller::trusted::spec_types::StaticSite;
use k8s_openapi::api::core::v1 as corev1;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::api::{ApiResource, DynamicObject};

pub struct ServiceBuilder;

impl ResourceBuilder<StaticSite> for ServiceBuilder {
    fn api_resource(&self) -> ApiResource {
        corev1::Service::api_resource()
    }

    fn get_request(&self, site: &StaticSite) -> KubeGetRequest {
        make_get_request::<corev1::Service>(site)
    }

    fn make(&self, site: &StaticSite) -> Result<DynamicObject, FailureCause> {
        make_owned(site, make_service(site))
    }

    // An existing service is left as it is.
    fn update(&self, _site: &StaticSite, _found: DynamicObject) -> Result<Option<DynamicObject>, FailureCause> {
        Ok(None)
    }
}

pub fn make_service(site: &StaticSite) -> corev1::Service {
    corev1::Service {
        metadata: make_metadata(site),
        spec: Some(corev1::ServiceSpec {
            type_: Some("ClusterIP".to_string()),
            selector: Some(make_labels(site)),
            ports: Some(vec![corev1::ServicePort {
                port: HTTP_PORT,
                target_port: Some(IntOrString::Int(HTTP_PORT)),
                protocol: Some("TCP".to_string()),
                ..corev1::ServicePort::default()
            }]),
            ..corev1::ServiceSpec::default()
        }),
        ..corev1::Service::default()
    }
}
