//! The per-activation worker set.

use super::packer::Packer;
use super::queue::{self, QueueSender};
use super::stage_advancer::StageAdvancer;
use super::vote_ingress::VoteIngress;
use super::ConsensusContext;
use crate::domain::{Round, RoundMember, VoteMessage};
use crate::metrics::QueueKind;
use crate::ports::PackingRequest;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// Run `worker` until it finishes or `shutdown` fires.
pub(crate) fn spawn_worker<F>(
    name: &'static str,
    worker: F,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        tokio::select! {
            _ = worker => {}
            _ = shutdown.changed() => {
                debug!(worker = name, "[poc] shutdown signal received");
            }
        }
    })
}

/// Tasks that only run while this node is a member of the active round.
pub(crate) struct ActiveWorkers {
    pub round: Round,
    pub local_member: RoundMember,
    pub vote_tx: QueueSender<VoteMessage>,
    pub packing_tx: QueueSender<PackingRequest>,
    shutdown_tx: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl ActiveWorkers {
    pub fn spawn(ctx: &Arc<ConsensusContext>, round: Round, local_member: RoundMember) -> Self {
        let config = &ctx.config;
        let (vote_tx, vote_rx) =
            queue::bounded(QueueKind::Vote, config.vote_queue_capacity, &ctx.metrics);
        let (stage_one_tx, stage_one_rx) = queue::bounded(
            QueueKind::StageOne,
            config.stage_one_queue_capacity,
            &ctx.metrics,
        );
        let (packing_tx, packing_rx) = queue::bounded(
            QueueKind::Packing,
            config.packing_queue_capacity,
            &ctx.metrics,
        );
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handles = vec![
            spawn_worker(
                "vote-ingress",
                VoteIngress::new(Arc::clone(ctx), stage_one_tx).run(vote_rx),
                shutdown_rx.clone(),
            ),
            spawn_worker(
                "stage-advancer",
                StageAdvancer::new(Arc::clone(ctx)).run(stage_one_rx),
                shutdown_rx.clone(),
            ),
            spawn_worker(
                "packer",
                Packer::new(Arc::clone(ctx)).run(packing_rx),
                shutdown_rx,
            ),
        ];

        Self {
            round,
            local_member,
            vote_tx,
            packing_tx,
            shutdown_tx,
            handles,
        }
    }

    /// Signal every task and wait for them to exit.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(true);
        for handle in self.handles {
            let _ = handle.await;
        }
    }
}
