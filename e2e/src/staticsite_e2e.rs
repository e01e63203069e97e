use k8s_openapi::api::{apps::v1::Deployment, core::v1::Service, networking::v1::Ingress};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::{api::Api, discovery::Discovery, Client};
use staticsite_controller::kubernetes_api_objects::owner_reference::is_controlled_by;
use staticsite_controller::staticsite_controller::trusted::spec_types::StaticSite;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::*;

use crate::common::*;

pub fn static_site() -> String {
    "
    apiVersion: web.mydomain.com/v1
    kind: StaticSite
    metadata:
      name: blog
      namespace: default
    spec:
      gitRepo: https://github.com/octocat/Spoon-Knife.git
      replicas: 2
    "
    .to_string()
}

fn replicas_of(deployment: &Deployment) -> Option<i32> {
    deployment.spec.as_ref().and_then(|spec| spec.replicas)
}

pub async fn desired_state_test(client: Client, site_name: &str) -> Result<(), Error> {
    let timeout = Duration::from_secs(120);
    let start = Instant::now();
    let site_api: Api<StaticSite> = Api::default_namespaced(client.clone());
    let deployment_api: Api<Deployment> = Api::default_namespaced(client.clone());
    let service_api: Api<Service> = Api::default_namespaced(client.clone());
    let ingress_api: Api<Ingress> = Api::default_namespaced(client.clone());
    loop {
        sleep(Duration::from_secs(5)).await;
        if start.elapsed() > timeout {
            error!("Time out on desired state test");
            return Err(Error::Timeout);
        }
        let site = site_api.get(site_name).await?;

        let deployment = match deployment_api.get_opt(site_name).await? {
            Some(deployment) => deployment,
            None => {
                info!("Deployment {} not created yet.", site_name);
                continue;
            }
        };
        if replicas_of(&deployment) != Some(site.spec.replicas) {
            return Err(Error::DeploymentFailed(format!("replicas are {:?}", replicas_of(&deployment))));
        }
        if !is_controlled_by(&deployment.metadata, &site) {
            return Err(Error::DeploymentFailed("not owned by the StaticSite".to_string()));
        }

        let service = match service_api.get_opt(site_name).await? {
            Some(service) => service,
            None => {
                info!("Service {} not created yet.", site_name);
                continue;
            }
        };
        let service_spec = service.spec.clone().unwrap_or_default();
        if service_spec.type_.as_deref() != Some("ClusterIP")
            || service_spec.ports.unwrap_or_default().iter().all(|port| port.port != 80)
        {
            return Err(Error::ServiceFailed(format!("{:?}", service.spec)));
        }
        if !is_controlled_by(&service.metadata, &site) {
            return Err(Error::ServiceFailed("not owned by the StaticSite".to_string()));
        }

        let ingress = match ingress_api.get_opt(site_name).await? {
            Some(ingress) => ingress,
            None => {
                info!("Ingress {} not created yet.", site_name);
                continue;
            }
        };
        let host = ingress
            .spec
            .as_ref()
            .and_then(|spec| spec.rules.as_ref())
            .and_then(|rules| rules.first())
            .and_then(|rule| rule.host.clone());
        if host != Some(format!("{}.local", site_name)) {
            return Err(Error::IngressFailed(format!("host is {:?}", host)));
        }
        if !is_controlled_by(&ingress.metadata, &site) {
            return Err(Error::IngressFailed("not owned by the StaticSite".to_string()));
        }
        break;
    }
    info!("Desired state test passed.");
    Ok(())
}

async fn wait_for_replicas(client: Client, site_name: &str, desired_replicas: i32, test: &str) -> Result<(), Error> {
    let timeout = Duration::from_secs(120);
    let start = Instant::now();
    let deployment_api: Api<Deployment> = Api::default_namespaced(client);
    loop {
        sleep(Duration::from_secs(5)).await;
        if start.elapsed() > timeout {
            error!("Time out on {} test", test);
            return Err(Error::Timeout);
        }
        let deployment = deployment_api.get(site_name).await?;
        if replicas_of(&deployment) == Some(desired_replicas) {
            info!("Deployment {} has {} replicas now.", site_name, desired_replicas);
            return Ok(());
        }
        info!(
            "Deployment {} has {:?} replicas, waiting for {}.",
            site_name,
            replicas_of(&deployment),
            desired_replicas
        );
    }
}

pub async fn scaling_test(client: Client, site_name: &str) -> Result<(), Error> {
    let desired_replicas = 3;
    run_command(
        "kubectl",
        vec![
            "patch",
            "ss",
            site_name,
            "--type=json",
            "-p",
            &format!("[{{\"op\": \"replace\", \"path\": \"/spec/replicas\", \"value\": {}}}]", desired_replicas),
        ],
    )?;
    wait_for_replicas(client, site_name, desired_replicas, "scaling").await?;
    info!("Scaling test passed.");
    Ok(())
}

pub async fn drift_test(client: Client, site_name: &str) -> Result<(), Error> {
    let site_api: Api<StaticSite> = Api::default_namespaced(client.clone());
    let desired_replicas = site_api.get(site_name).await?.spec.replicas;
    run_command(
        "kubectl",
        vec!["scale", "deployment", site_name, "--replicas=7"],
    )?;
    wait_for_replicas(client, site_name, desired_replicas, "drift").await?;
    info!("Drift test passed.");
    Ok(())
}

pub async fn deletion_test(client: Client, site_name: &str) -> Result<(), Error> {
    let timeout = Duration::from_secs(120);
    let start = Instant::now();
    let deployment_api: Api<Deployment> = Api::default_namespaced(client.clone());
    let service_api: Api<Service> = Api::default_namespaced(client.clone());
    let ingress_api: Api<Ingress> = Api::default_namespaced(client.clone());
    run_command("kubectl", vec!["delete", "ss", site_name])?;
    loop {
        sleep(Duration::from_secs(5)).await;
        if start.elapsed() > timeout {
            error!("Time out on deletion test");
            return Err(Error::GarbageCollectionFailed);
        }
        let remaining = [
            deployment_api.get_opt(site_name).await?.is_some(),
            service_api.get_opt(site_name).await?.is_some(),
            ingress_api.get_opt(site_name).await?.is_some(),
        ];
        if remaining.iter().any(|exists| *exists) {
            info!("Waiting for garbage collection, still present (deployment, service, ingress): {:?}", remaining);
            continue;
        }
        break;
    }
    info!("Deletion test passed.");
    Ok(())
}

pub async fn staticsite_e2e_test() -> Result<(), Error> {
    // check if the CRD is already registered
    let client = Client::try_default().await?;
    let crd_api: Api<CustomResourceDefinition> = Api::all(client.clone());
    match crd_api.get("staticsites.web.mydomain.com").await {
        Err(e) => {
            error!("StaticSite CRD not found, create one before run the e2e test.");
            return Err(Error::CRDGetFailed(e));
        }
        Ok(_) => {
            info!("StaticSite CRD found, continue to run the e2e test.");
        }
    }

    let discovery = Discovery::new(client.clone()).run().await?;
    let site_name = apply(static_site(), client.clone(), &discovery).await?;

    desired_state_test(client.clone(), &site_name).await?;
    scaling_test(client.clone(), &site_name).await?;
    drift_test(client.clone(), &site_name).await?;
    deletion_test(client.clone(), &site_name).await?;

    info!("E2e test passed.");
    Ok(())
}
