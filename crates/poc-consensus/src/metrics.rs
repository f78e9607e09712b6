//! # Consensus Metrics
//!
//! Lock-free counters for the voting pipeline, readable at any time through
//! [`Metrics::snapshot`].
//!
//! ## Prometheus
//!
//! Enable the `metrics` feature to mirror every counter into the default
//! prometheus registry:
//! ```toml
//! poc-consensus = { path = "...", features = ["metrics"] }
//! ```
//!
//! - `poc_votes_accepted_total`
//! - `poc_votes_rejected_total{reason}`
//! - `poc_queue_dropped_total{queue}`
//! - `poc_quorums_total{stage}`
//! - `poc_blocks_committed_total`

use crate::error::Rejection;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// The bounded hand-off queues between worker tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueKind {
    Vote,
    StageOne,
    StageTwo,
    Result,
    Packing,
}

impl QueueKind {
    pub const ALL: [QueueKind; 5] = [
        QueueKind::Vote,
        QueueKind::StageOne,
        QueueKind::StageTwo,
        QueueKind::Result,
        QueueKind::Packing,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            QueueKind::Vote => "vote",
            QueueKind::StageOne => "stage_one",
            QueueKind::StageTwo => "stage_two",
            QueueKind::Result => "result",
            QueueKind::Packing => "packing",
        }
    }
}

impl fmt::Display for QueueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metrics collector for the consensus pipeline
#[derive(Default)]
pub struct Metrics {
    /// Votes that passed validation and were tallied
    pub votes_accepted: AtomicU64,
    /// Votes forwarded to peers (local broadcasts and relays)
    pub votes_relayed: AtomicU64,
    /// Pre-vote quorums reached
    pub pre_vote_quorums: AtomicU64,
    /// Pre-commit quorums reached
    pub pre_commit_quorums: AtomicU64,
    /// Result messages that passed verification
    pub results_accepted: AtomicU64,
    /// Blocks handed to the block pipeline as byzantine-confirmed
    pub blocks_committed: AtomicU64,
    /// Blocks assembled by the packer
    pub blocks_packed: AtomicU64,
    /// Packing requests that failed assembly
    pub packing_failures: AtomicU64,
    /// Driver state changes
    pub driver_transitions: AtomicU64,
    rejections: [AtomicU64; Rejection::ALL.len()],
    queue_drops: [AtomicU64; QueueKind::ALL.len()],
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_vote_accepted(&self) {
        self.votes_accepted.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "metrics")]
        prom::VOTES_ACCEPTED.inc();
    }

    pub fn record_vote_relayed(&self) {
        self.votes_relayed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejection(&self, reason: Rejection) {
        self.rejections[reason.index()].fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "metrics")]
        prom::VOTES_REJECTED
            .with_label_values(&[reason.as_str()])
            .inc();
    }

    pub fn record_queue_drop(&self, queue: QueueKind) {
        self.queue_drops[queue as usize].fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "metrics")]
        prom::QUEUE_DROPPED
            .with_label_values(&[queue.as_str()])
            .inc();
    }

    pub fn record_pre_vote_quorum(&self) {
        self.pre_vote_quorums.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "metrics")]
        prom::QUORUMS.with_label_values(&["pre_vote"]).inc();
    }

    pub fn record_pre_commit_quorum(&self) {
        self.pre_commit_quorums.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "metrics")]
        prom::QUORUMS.with_label_values(&["pre_commit"]).inc();
    }

    pub fn record_result_accepted(&self) {
        self.results_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_block_committed(&self) {
        self.blocks_committed.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "metrics")]
        prom::BLOCKS_COMMITTED.inc();
    }

    pub fn record_block_packed(&self) {
        self.blocks_packed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_packing_failure(&self) {
        self.packing_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_driver_transition(&self) {
        self.driver_transitions.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            votes_accepted: self.votes_accepted.load(Ordering::Relaxed),
            votes_relayed: self.votes_relayed.load(Ordering::Relaxed),
            pre_vote_quorums: self.pre_vote_quorums.load(Ordering::Relaxed),
            pre_commit_quorums: self.pre_commit_quorums.load(Ordering::Relaxed),
            results_accepted: self.results_accepted.load(Ordering::Relaxed),
            blocks_committed: self.blocks_committed.load(Ordering::Relaxed),
            blocks_packed: self.blocks_packed.load(Ordering::Relaxed),
            packing_failures: self.packing_failures.load(Ordering::Relaxed),
            driver_transitions: self.driver_transitions.load(Ordering::Relaxed),
            rejections: Rejection::ALL
                .iter()
                .map(|r| (*r, self.rejections[r.index()].load(Ordering::Relaxed)))
                .filter(|(_, n)| *n > 0)
                .collect(),
            queue_drops: QueueKind::ALL
                .iter()
                .map(|q| (*q, self.queue_drops[*q as usize].load(Ordering::Relaxed)))
                .filter(|(_, n)| *n > 0)
                .collect(),
        }
    }
}

/// Point-in-time metrics snapshot
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub votes_accepted: u64,
    pub votes_relayed: u64,
    pub pre_vote_quorums: u64,
    pub pre_commit_quorums: u64,
    pub results_accepted: u64,
    pub blocks_committed: u64,
    pub blocks_packed: u64,
    pub packing_failures: u64,
    pub driver_transitions: u64,
    pub rejections: HashMap<Rejection, u64>,
    pub queue_drops: HashMap<QueueKind, u64>,
}

impl MetricsSnapshot {
    /// Rejections counted for one reason.
    pub fn rejected(&self, reason: Rejection) -> u64 {
        self.rejections.get(&reason).copied().unwrap_or(0)
    }

    /// Items dropped by one queue.
    pub fn dropped(&self, queue: QueueKind) -> u64 {
        self.queue_drops.get(&queue).copied().unwrap_or(0)
    }
}

#[cfg(feature = "metrics")]
mod prom {
    use lazy_static::lazy_static;
    use prometheus::{
        register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec,
    };

    lazy_static! {
        pub static ref VOTES_ACCEPTED: IntCounter = register_int_counter!(
            "poc_votes_accepted_total",
            "Total number of votes tallied"
        )
        .expect("Failed to create VOTES_ACCEPTED metric");

        pub static ref VOTES_REJECTED: IntCounterVec = register_int_counter_vec!(
            "poc_votes_rejected_total",
            "Total number of votes and results rejected",
            &["reason"]
        )
        .expect("Failed to create VOTES_REJECTED metric");

        pub static ref QUEUE_DROPPED: IntCounterVec = register_int_counter_vec!(
            "poc_queue_dropped_total",
            "Items dropped because a worker queue was full",
            &["queue"]
        )
        .expect("Failed to create QUEUE_DROPPED metric");

        pub static ref QUORUMS: IntCounterVec = register_int_counter_vec!(
            "poc_quorums_total",
            "Stage quorums reached",
            &["stage"]
        )
        .expect("Failed to create QUORUMS metric");

        pub static ref BLOCKS_COMMITTED: IntCounter = register_int_counter!(
            "poc_blocks_committed_total",
            "Blocks reported byzantine-confirmed"
        )
        .expect("Failed to create BLOCKS_COMMITTED metric");
    }
}
