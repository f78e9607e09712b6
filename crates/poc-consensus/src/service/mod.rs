//! Consensus Service
//!
//! Wires the worker tasks together and exposes [`ConsensusApi`].
//!
//! # Tasks
//!
//! Started once by [`ConsensusService::start`]:
//! - `ResultIngress`: verifies `voteResult` messages
//! - `Committer`: broadcasts local quorums, reports verified results
//! - `ConsensusDriver`: polls chain status and manages participation
//!
//! Started per activation (while this node is a round member):
//! - `VoteIngress`: validates and tallies votes
//! - `StageAdvancer`: turns pre-vote quorums into pre-commits
//! - `Packer`: assembles this node's blocks
//!
//! Queues between tasks are bounded and never block the producer.

mod committer;
mod driver;
mod packer;
mod queue;
mod result_ingress;
mod stage_advancer;
mod vote_ingress;
mod voter;
mod workers;


pub use driver::DriverState;

use crate::config::ConsensusConfig;
use crate::domain::{
    decode_result_request, short_hash, CandidateBoard, DuplicateGuard, ResultCache,
    ResultMessage, Round, RoundMember, VoteMessage, VoteStage, VotingTarget, CMD_VOTE_RESULT,
};
use crate::error::{ConsensusError, ConsensusResult, Rejection};
use crate::metrics::{Metrics, MetricsSnapshot, QueueKind};
use crate::ports::{
    BlockAssembler, BlockPipeline, ChainStatus, ConsensusApi, NetworkGateway, PackingRequest,
    RoundProvider, VoteSigner,
};
use async_trait::async_trait;
use committer::{Committer, StageTwoResult};
use driver::ConsensusDriver;
use parking_lot::{Mutex, RwLock};
use queue::QueueSender;
use result_ingress::ResultIngress;
use shared_crypto::Secp256k1PublicKey;
use shared_types::{Address, BlockHeader, Hash, PeerId};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use workers::ActiveWorkers;

/// Collaborators of the consensus core.
#[derive(Clone)]
pub struct ConsensusDependencies {
    pub round_provider: Arc<dyn RoundProvider>,
    pub block_assembler: Arc<dyn BlockAssembler>,
    pub network: Arc<dyn NetworkGateway>,
    pub block_pipeline: Arc<dyn BlockPipeline>,
    pub chain_status: Arc<dyn ChainStatus>,
    pub signer: Arc<dyn VoteSigner>,
}

/// State shared by every worker task.
pub(crate) struct ConsensusContext {
    pub config: ConsensusConfig,
    pub seed_public_keys: Vec<Secp256k1PublicKey>,
    pub deps: ConsensusDependencies,
    pub metrics: Arc<Metrics>,
    pub board: CandidateBoard,
    pub results: ResultCache,
    /// `(height, vote_round_index)` pairs that reached a pre-vote quorum.
    pub stage_one_confirmed: DuplicateGuard<(u64, u64)>,
    /// Block hashes of verified results, released again if the commit fails.
    pub confirmed_results: DuplicateGuard<Hash>,
    pub stage_two_tx: QueueSender<StageTwoResult>,
    pub result_tx: QueueSender<ResultMessage>,
    workers: RwLock<Option<ActiveWorkers>>,
    state: RwLock<DriverState>,
}

impl ConsensusContext {
    pub fn is_participant(&self) -> bool {
        self.workers.read().is_some()
    }

    pub fn active_round(&self) -> Option<Round> {
        self.workers.read().as_ref().map(|w| w.round.clone())
    }

    pub fn refresh_active_round(&self, round: Round, local_member: RoundMember) {
        if let Some(workers) = self.workers.write().as_mut() {
            workers.round = round;
            workers.local_member = local_member;
        }
    }

    pub fn local_member(&self) -> Option<RoundMember> {
        self.workers.read().as_ref().map(|w| w.local_member.clone())
    }

    pub fn install_workers(&self, workers: ActiveWorkers) {
        *self.workers.write() = Some(workers);
    }

    pub fn take_workers(&self) -> Option<ActiveWorkers> {
        self.workers.write().take()
    }

    pub fn driver_state(&self) -> DriverState {
        *self.state.read()
    }

    pub fn transition(&self, next: DriverState) {
        let previous = std::mem::replace(&mut *self.state.write(), next);
        if previous != next {
            self.metrics.record_driver_transition();
            info!(from = ?previous, to = ?next, "[poc] driver state changed");
        }
    }

    /// Hand a vote to the active `VoteIngress`. Dropped when not
    /// participating or when the vote queue is full.
    pub fn submit_vote(&self, vote: VoteMessage) -> bool {
        let sender = self.workers.read().as_ref().map(|w| w.vote_tx.clone());
        match sender {
            Some(tx) => tx.offer(vote),
            None => {
                self.metrics.record_rejection(Rejection::NotParticipant);
                false
            }
        }
    }

    pub fn submit_packing(&self, request: PackingRequest) -> bool {
        let sender = self.workers.read().as_ref().map(|w| w.packing_tx.clone());
        match sender {
            Some(tx) => tx.offer(request),
            None => {
                self.metrics.record_rejection(Rejection::NotParticipant);
                false
            }
        }
    }

    /// Build a local vote signed by `address`.
    pub fn sign_vote(
        &self,
        target: VotingTarget,
        stage: VoteStage,
        address: &Address,
    ) -> ConsensusResult<VoteMessage> {
        let vote = VoteMessage::new(target, stage);
        let signature = self.deps.signer.sign(address, &vote.signing_hash())?;
        Ok(vote.with_signature(signature))
    }

    pub async fn round_of(&self, target: &VotingTarget) -> ConsensusResult<Round> {
        self.deps
            .round_provider
            .get_round(target.round_index, target.round_start_time)
            .await
    }

    /// Count and log the outcome of one worker iteration.
    pub fn log_outcome(&self, worker: &'static str, outcome: ConsensusResult<()>) {
        match outcome {
            Ok(()) => {}
            Err(ConsensusError::Rejected(reason)) => {
                self.metrics.record_rejection(reason);
                debug!(worker, %reason, "[poc] message rejected");
            }
            Err(e) => {
                warn!(worker, error = %e, "[poc] worker iteration failed");
            }
        }
    }
}

/// Receivers of the permanent queues, held until `start`.
struct PendingQueues {
    stage_two_rx: mpsc::Receiver<StageTwoResult>,
    result_rx: mpsc::Receiver<ResultMessage>,
}

/// The consensus core of one node.
pub struct ConsensusService {
    ctx: Arc<ConsensusContext>,
    pending: Mutex<Option<PendingQueues>>,
    shutdown_tx: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl ConsensusService {
    /// Validate `config` and build the service. No task runs until
    /// [`ConsensusService::start`].
    pub fn new(config: ConsensusConfig, deps: ConsensusDependencies) -> ConsensusResult<Self> {
        config.validate()?;
        let seed_public_keys = config.parsed_seed_public_keys()?;
        let metrics = Arc::new(Metrics::new());

        let (stage_two_tx, stage_two_rx) = queue::bounded(
            QueueKind::StageTwo,
            config.stage_two_queue_capacity,
            &metrics,
        );
        let (result_tx, result_rx) =
            queue::bounded(QueueKind::Result, config.result_queue_capacity, &metrics);
        let (shutdown_tx, _) = watch::channel(false);

        let ctx = ConsensusContext {
            seed_public_keys,
            deps,
            metrics,
            board: CandidateBoard::new(),
            results: ResultCache::new(config.result_cache_capacity),
            stage_one_confirmed: DuplicateGuard::new(config.confirmed_guard_size),
            confirmed_results: DuplicateGuard::new(config.result_guard_size),
            stage_two_tx,
            result_tx,
            workers: RwLock::new(None),
            state: RwLock::new(DriverState::Idle),
            config,
        };

        Ok(Self {
            ctx: Arc::new(ctx),
            pending: Mutex::new(Some(PendingQueues {
                stage_two_rx,
                result_rx,
            })),
            shutdown_tx,
            tasks: Mutex::new(Vec::new()),
        })
    }

    /// Spawn the permanent tasks. Must run inside a tokio runtime. Calling
    /// it twice is a no-op.
    pub fn start(&self) {
        let Some(queues) = self.pending.lock().take() else {
            warn!("[poc] consensus service already started");
            return;
        };

        let handles = vec![
            workers::spawn_worker(
                "result-ingress",
                ResultIngress::new(Arc::clone(&self.ctx)).run(queues.result_rx),
                self.shutdown_tx.subscribe(),
            ),
            workers::spawn_worker(
                "committer",
                Committer::new(Arc::clone(&self.ctx)).run(queues.stage_two_rx),
                self.shutdown_tx.subscribe(),
            ),
            workers::spawn_worker(
                "driver",
                ConsensusDriver::new(Arc::clone(&self.ctx)).run(),
                self.shutdown_tx.subscribe(),
            ),
        ];
        self.tasks.lock().extend(handles);
        info!(
            chain_id = self.ctx.config.chain_id,
            rate = self.ctx.config.byzantine_rate_percent,
            "[poc] consensus service started"
        );
    }

    /// Stop every task and leave the consensus subnet if participating.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
        let handles: Vec<_> = self.tasks.lock().drain(..).collect();
        for handle in handles {
            let _ = handle.await;
        }
        driver::deactivate(&self.ctx, DriverState::Idle).await;
        info!("[poc] consensus service stopped");
    }

    pub fn driver_state(&self) -> DriverState {
        self.ctx.driver_state()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.ctx.metrics.snapshot()
    }

    /// This node's slot in the active round, if participating.
    pub fn local_member(&self) -> Option<RoundMember> {
        self.ctx.local_member()
    }

    pub fn candidate_board(&self) -> &CandidateBoard {
        &self.ctx.board
    }

    pub fn config(&self) -> &ConsensusConfig {
        &self.ctx.config
    }
}

#[async_trait]
impl ConsensusApi for ConsensusService {
    fn on_vote_message(&self, peer: PeerId, payload: &[u8]) {
        match VoteMessage::decode(payload, peer.clone()) {
            Ok(vote) => {
                self.ctx.submit_vote(vote);
            }
            Err(e) => {
                self.ctx.metrics.record_rejection(Rejection::Malformed);
                debug!(%peer, error = %e, "[poc] undecodable vote dropped");
            }
        }
    }

    fn on_result_message(&self, peer: PeerId, payload: &[u8]) {
        match ResultMessage::decode(payload) {
            Ok(result) => {
                self.ctx.result_tx.offer(result);
            }
            Err(e) => {
                self.ctx.metrics.record_rejection(Rejection::Malformed);
                debug!(%peer, error = %e, "[poc] undecodable result dropped");
            }
        }
    }

    async fn on_result_request(&self, peer: PeerId, payload: &[u8]) {
        let block_hash = match decode_result_request(payload) {
            Ok(hash) => hash,
            Err(e) => {
                self.ctx.metrics.record_rejection(Rejection::Malformed);
                debug!(%peer, error = %e, "[poc] undecodable result request dropped");
                return;
            }
        };
        let Some(result) = self.ctx.results.get(&block_hash) else {
            debug!(%peer, block = %short_hash(&block_hash), "[poc] no cached result for request");
            return;
        };
        let sent = match result.encode() {
            Ok(payload) => {
                self.ctx
                    .deps
                    .network
                    .send_to_node(self.ctx.config.chain_id, &peer, CMD_VOTE_RESULT, payload)
                    .await
            }
            Err(e) => Err(e),
        };
        if let Err(e) = sent {
            warn!(%peer, error = %e, "[poc] failed to answer result request");
        }
    }

    async fn on_new_block(&self, header: BlockHeader) {
        let outcome = voter::accept_block(&self.ctx, header).await;
        self.ctx.log_outcome("voter", outcome);
    }

    fn schedule_packing(&self, request: PackingRequest) -> bool {
        self.ctx.submit_packing(request)
    }

    fn is_stage_one_confirmed(&self, height: u64, vote_round_index: u64) -> bool {
        self.ctx
            .stage_one_confirmed
            .contains(&(height, vote_round_index))
    }

    fn active_round(&self) -> Option<Round> {
        self.ctx.active_round()
    }
}
