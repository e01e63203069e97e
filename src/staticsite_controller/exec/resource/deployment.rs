// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use super::common::*;
use crate::kubernetes_api_objects::{api_method::KubeGetRequest, dynamic::Marshal};
use crate::reconciler::{reconciler::FailureCause, resource_builder::ResourceBuilder};
use crate::staticsite_controller::trusted::spec_types::StaticSite;
use k8s_openapi::api::apps::v1 as appsv1;
use k8s_openapi::api::core::v1 as corev1;
use k8s_openapi::apimachinery::pkg::apis::meta::v1 as metav1;
use kube::api::{ApiResource, DynamicObject};

pub struct DeploymentBuilder;

impl ResourceBuilder<StaticSite> for DeploymentBuilder {
    fn api_resource(&self) -> ApiResource {
        appsv1::Deployment::api_resource()
    }

    fn get_request(&self, site: &StaticSite) -> KubeGetRequest {
        make_get_request::<appsv1::Deployment>(site)
    }

    fn make(&self, site: &StaticSite) -> Result<DynamicObject, FailureCause> {
        make_owned(site, make_deployment(site))
    }

    fn update(&self, site: &StaticSite, found: DynamicObject) -> Result<Option<DynamicObject>, FailureCause> {
        let found_deployment = appsv1::Deployment::unmarshal(found)?;
        match update_deployment(site, found_deployment) {
            Some(deployment) => Ok(Some(deployment.marshal()?)),
            None => Ok(None),
        }
    }

    // A new deployment ends the round; the next round sees it and moves on.
    fn requeue_after_create(&self) -> bool {
        true
    }
}

/// Returns the found deployment with its replicas set to the desired count, or None if
/// it already has them. Only the replica count is reconciled on an existing deployment,
/// everything else (including the resource version used for optimistic concurrency)
/// is written back as found.
pub fn update_deployment(site: &StaticSite, found_deployment: appsv1::Deployment) -> Option<appsv1::Deployment> {
    let desired = site.spec.replicas;
    if found_deployment.spec.as_ref().and_then(|spec| spec.replicas) == Some(desired) {
        return None;
    }
    let mut deployment = found_deployment;
    deployment.spec.get_or_insert_with(appsv1::DeploymentSpec::default).replicas = Some(desired);
    Some(deployment)
}

pub fn make_deployment(site: &StaticSite) -> appsv1::Deployment {
    let labels = make_labels(site);
    appsv1::Deployment {
        metadata: make_metadata(site),
        spec: Some(appsv1::DeploymentSpec {
            replicas: Some(site.spec.replicas),
            selector: metav1::LabelSelector {
                match_labels: Some(labels.clone()),
                ..metav1::LabelSelector::default()
            },
            template: corev1::PodTemplateSpec {
                metadata: Some(metav1::ObjectMeta {
                    labels: Some(labels),
                    ..metav1::ObjectMeta::default()
                }),
                spec: Some(make_pod_spec(site)),
            },
            ..appsv1::DeploymentSpec::default()
        }),
        ..appsv1::Deployment::default()
    }
}

fn make_pod_spec(site: &StaticSite) -> corev1::PodSpec {
    corev1::PodSpec {
        volumes: Some(vec![corev1::Volume {
            name: SITE_DATA_VOLUME.to_string(),
            empty_dir: Some(corev1::EmptyDirVolumeSource::default()),
            ..corev1::Volume::default()
        }]),
        init_containers: Some(vec![make_git_cloner_container(site)]),
        containers: vec![corev1::Container {
            name: "nginx".to_string(),
            image: Some("nginx:alpine".to_string()),
            ports: Some(vec![corev1::ContainerPort {
                name: Some("http".to_string()),
                container_port: HTTP_PORT,
                ..corev1::ContainerPort::default()
            }]),
            volume_mounts: Some(vec![corev1::VolumeMount {
                name: SITE_DATA_VOLUME.to_string(),
                mount_path: "/usr/share/nginx/html".to_string(),
                ..corev1::VolumeMount::default()
            }]),
            ..corev1::Container::default()
        }],
        ..corev1::PodSpec::default()
    }
}

// The cloner wipes the volume before cloning so a restarted pod never serves a mix of
// old and new content.
fn make_git_cloner_container(site: &StaticSite) -> corev1::Container {
    corev1::Container {
        name: "git-cloner".to_string(),
        image: Some("alpine/git".to_string()),
        command: Some(vec!["/bin/sh".to_string(), "-c".to_string()]),
        args: Some(make_clone_args(&site.spec.git_repo)),
        volume_mounts: Some(vec![corev1::VolumeMount {
            name: SITE_DATA_VOLUME.to_string(),
            mount_path: "/repo".to_string(),
            ..corev1::VolumeMount::default()
        }]),
        ..corev1::Container::default()
    }
}

pub const CLONE_SCRIPT: &str = r#"rm -rf /repo/* && git clone --single-branch -- "$1" /repo"#;

// The repo is handed to the script as $1 and never becomes part of the script text.
pub fn make_clone_args(git_repo: &str) -> Vec<String> {
    vec![CLONE_SCRIPT.to_string(), "git-cloner".to_string(), git_repo.to_string()]
}
