use kube::{
    api::{Api, DynamicObject, Patch, PatchParams, ResourceExt},
    core::GroupVersionKind,
    discovery::{ApiCapabilities, ApiResource, Discovery, Scope},
    Client,
};
use std::process::Command;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to get kube client: {0}")]
    ClientGetFailed(#[from] kube::Error),

    #[error("Failed to apply yaml file!")]
    ApplyFailed,

    #[error("Failed to parse the yaml file!")]
    ParseYamlFailed(#[from] serde_yaml::Error),

    #[error("Failed to parse the json format!")]
    ParseJsonFailed(#[from] serde_json::Error),

    #[error("Failed to run command: {0}")]
    CommandFailed(#[from] std::io::Error),

    #[error("Failed to get CRD: {0}")]
    CRDGetFailed(#[source] kube::Error),

    #[error("Timeout, e2e test failed!")]
    Timeout,

    #[error("Deployment is not consistent with the StaticSite spec: {0}")]
    DeploymentFailed(String),

    #[error("Service is not consistent with the StaticSite spec: {0}")]
    ServiceFailed(String),

    #[error("Ingress is not consistent with the StaticSite spec: {0}")]
    IngressFailed(String),

    #[error("Managed objects survived the deletion of their StaticSite")]
    GarbageCollectionFailed,
}

pub async fn apply(yaml: String, client: Client, discovery: &Discovery) -> Result<String, Error> {
    let ssapply = PatchParams::apply("kubectl-light").force();
    let obj: DynamicObject = serde_yaml::from_str(&yaml)?;
    let namespace = obj.metadata.namespace.as_deref();
    let gvk = match obj.types.as_ref().map(GroupVersionKind::try_from) {
        Some(Ok(gvk)) => gvk,
        _ => {
            info!("cannot apply object without valid TypeMeta {:?}", obj);
            return Err(Error::ApplyFailed);
        }
    };
    let name = obj.name_any();
    if let Some((ar, caps)) = discovery.resolve_gvk(&gvk) {
        let api = dynamic_api(ar, caps, client.clone(), namespace);
        info!("Applying {}: \n{}", gvk.kind, serde_yaml::to_string(&obj)?);
        let data: serde_json::Value = serde_json::to_value(&obj)?;
        api.patch(&name, &ssapply, &Patch::Apply(data)).await?;
        info!("applied {} {}", gvk.kind, name);
    } else {
        info!("Cannot apply document for unknown {:?}", gvk);
        return Err(Error::ApplyFailed);
    }

    Ok(name)
}

fn dynamic_api(ar: ApiResource, caps: ApiCapabilities, client: Client, ns: Option<&str>) -> Api<DynamicObject> {
    if caps.scope == Scope::Cluster {
        Api::all_with(client, &ar)
    } else if let Some(namespace) = ns {
        Api::namespaced_with(client, namespace, &ar)
    } else {
        Api::default_namespaced_with(client, &ar)
    }
}

pub fn run_command(program: &str, args: Vec<&str>) -> Result<(String, String), Error> {
    info!("{} {}", program, args.join(" "));
    let cmd = Command::new(program).args(args).output()?;
    info!("cmd output: {}", String::from_utf8_lossy(&cmd.stdout));
    info!("cmd error: {}", String::from_utf8_lossy(&cmd.stderr));
    Ok((
        String::from_utf8_lossy(&cmd.stdout).to_string(),
        String::from_utf8_lossy(&cmd.stderr).to_string(),
    ))
}
