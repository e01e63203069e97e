// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use anyhow::Result;
use clap::Parser;
use k8s_openapi::api::{apps::v1::Deployment, core::v1::Service, networking::v1::Ingress};
use kube::{api::Api, runtime::watcher, CustomResourceExt};
use staticsite_controller::config::{Cli, Command, LogFormat};
use staticsite_controller::shim_layer::controller_runtime::run_controller;
use staticsite_controller::staticsite_controller::{exec::reconciler::StaticSiteReconciler, trusted::spec_types::StaticSite};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    match Cli::parse().command {
        Command::Export => {
            print!("{}", serde_yaml::to_string(&StaticSite::crd())?);
        }
        Command::Run(config) => {
            init_tracing(config.log_format);
            info!(?config, "running staticsite-controller");
            run_controller::<StaticSiteReconciler>(config, |controller, client| {
                controller
                    .owns(Api::<Deployment>::all(client.clone()), watcher::Config::default())
                    .owns(Api::<Service>::all(client.clone()), watcher::Config::default())
                    .owns(Api::<Ingress>::all(client.clone()), watcher::Config::default())
            })
            .await?;
        }
    }
    Ok(())
}
