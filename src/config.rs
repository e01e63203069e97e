// Copyright 2022 VMware, Inc.
// SPDX-License-Identifier: MIT
use crate::reconciler::reconciler::ReconcileOutcome;
use clap::{Args, Parser, Subcommand, ValueEnum};
use kube::runtime::controller::Action;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "staticsite-controller", version, about = "Serves git-sourced static sites on Kubernetes")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the StaticSite CustomResourceDefinition as YAML
    Export,
    /// Run the controller against the cluster of the current kube context
    Run(ControllerConfig),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Args)]
pub struct ControllerConfig {
    /// Delay before the round that follows the creation of a deployment
    #[arg(long, env = "STATICSITE_REQUEUE_AFTER_CREATE_SECS", default_value_t = 1)]
    pub requeue_after_create_secs: u64,

    /// Period of the resync that follows a converged round
    #[arg(long, env = "STATICSITE_RESYNC_SECS", default_value_t = 300)]
    pub resync_secs: u64,

    /// Delay before retrying a failed round
    #[arg(long, env = "STATICSITE_ERROR_BACKOFF_SECS", default_value_t = 10)]
    pub error_backoff_secs: u64,

    #[arg(long, env = "STATICSITE_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Default for ControllerConfig {
    fn default() -> ControllerConfig {
        ControllerConfig {
            requeue_after_create_secs: 1,
            resync_secs: 300,
            error_backoff_secs: 10,
            log_format: LogFormat::Text,
        }
    }
}

impl ControllerConfig {
    /// Translates the outcome of a round into the next scheduling decision.
    pub fn action_for(&self, outcome: ReconcileOutcome) -> Action {
        match outcome {
            ReconcileOutcome::Success => Action::requeue(Duration::from_secs(self.resync_secs)),
            ReconcileOutcome::Requeue => Action::requeue(Duration::from_secs(self.requeue_after_create_secs)),
        }
    }

    pub fn error_action(&self) -> Action {
        Action::requeue(Duration::from_secs(self.error_backoff_secs))
    }
}
