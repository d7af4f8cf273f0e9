//! kube-runtime controller wiring for AvalancheCluster resources.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use kube::runtime::controller::{Action, Controller};
use kube::runtime::watcher;
use kube::{Api, Client, ResourceExt};
use tracing::{debug, error, info};

use super::Reconciler;
use crate::cluster::KubeClusterApi;
use crate::config::OperatorConfig;
use crate::error::ReconcileError;
use crate::k8s::AvalancheCluster;
use crate::rollout::RolloutSynchronizer;

/// Shared state handed to every reconcile call.
pub struct Context {
    pub reconciler: Reconciler,
    pub config: OperatorConfig,
}

impl Context {
    pub fn new(reconciler: Reconciler, config: OperatorConfig) -> Self {
        Self { reconciler, config }
    }
}

/// Watch AvalancheCluster resources until a shutdown signal arrives.
pub async fn run(config: OperatorConfig) -> Result<(), kube::Error> {
    let client = Client::try_default().await?;
    let clusters: Api<AvalancheCluster> = match &config.watch_namespace {
        Some(namespace) => Api::namespaced(client.clone(), namespace),
        None => Api::all(client.clone()),
    };

    let reconciler = Reconciler::new(
        Arc::new(KubeClusterApi::new(client)),
        RolloutSynchronizer::new(config.rollout_timeout),
    );
    info!(
        namespace = config.watch_namespace.as_deref().unwrap_or("<all>"),
        rollout_timeout_secs = config.rollout_timeout.as_secs(),
        "starting AvalancheCluster controller"
    );
    let context = Arc::new(Context::new(reconciler, config));

    Controller::new(clusters, watcher::Config::default())
        .shutdown_on_signal()
        .run(reconcile, error_policy, context)
        .for_each(|result| async move {
            match result {
                Ok((object, _)) => debug!(name = %object.name, "reconcile success"),
                Err(err) => error!(error = %err, "reconcile error"),
            }
        })
        .await;

    info!("controller stopped");
    Ok(())
}

async fn reconcile(cluster: Arc<AvalancheCluster>, cx: Arc<Context>) -> Result<Action, ReconcileError> {
    metrics::counter!("avago_operator_reconciles_total").increment(1);
    debug!(name = %cluster.name_any(), "reconciling");
    cx.reconciler.reconcile(&cluster).await?;
    Ok(Action::await_change())
}

fn error_policy(_cluster: Arc<AvalancheCluster>, error: &ReconcileError, cx: Arc<Context>) -> Action {
    metrics::counter!("avago_operator_reconcile_errors_total", "kind" => error.kind()).increment(1);
    Action::requeue(requeue_delay(error, &cx.config))
}

/// User errors wait for an edit; everything else retries soon.
pub fn requeue_delay(error: &ReconcileError, config: &OperatorConfig) -> Duration {
    if error.is_user_error() {
        config.invalid_requeue_after
    } else {
        config.requeue_after
    }
}
