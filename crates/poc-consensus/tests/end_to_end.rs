//! Multi-node consensus over an in-process loopback network.

use async_trait::async_trait;
use parking_lot::RwLock;
use poc_consensus::adapters::{InMemoryBlockPipeline, InMemoryKeystore, SharedChainStatus};
use poc_consensus::domain::{CMD_VOTE, CMD_VOTE_RESULT, FIRST_VOTE_ROUND};
use poc_consensus::{
    BlockAssembler, ConsensusApi, ConsensusConfig, ConsensusDependencies, ConsensusError,
    ConsensusResult, ConsensusService, DriverState, NetworkGateway, Rejection, Round,
    RoundMember, RoundProvider, SubnetJoinRequest, VoteMessage, VoteStage, VotingTarget,
};
use shared_crypto::Secp256k1KeyPair;
use shared_types::{BlockHeader, ChainId, PeerId, RoundData};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

const ROUND_INDEX: u64 = 1;
const ROUND_START: u64 = 1_000;
const BEST_HEIGHT: u64 = 99;

#[derive(Default)]
struct Registry {
    nodes: RwLock<HashMap<PeerId, Arc<ConsensusService>>>,
}

struct LoopbackNetwork {
    me: PeerId,
    registry: Arc<Registry>,
}

impl LoopbackNetwork {
    fn deliver(&self, node: &ConsensusService, cmd: &str, payload: &[u8]) {
        match cmd {
            CMD_VOTE => node.on_vote_message(self.me.clone(), payload),
            CMD_VOTE_RESULT => node.on_result_message(self.me.clone(), payload),
            _ => {}
        }
    }
}

#[async_trait]
impl NetworkGateway for LoopbackNetwork {
    async fn broadcast(
        &self,
        _chain_id: ChainId,
        cmd: &str,
        payload: Vec<u8>,
        exclude: Option<&PeerId>,
    ) -> ConsensusResult<()> {
        let peers: Vec<_> = self
            .registry
            .nodes
            .read()
            .iter()
            .filter(|(id, _)| **id != self.me && Some(*id) != exclude)
            .map(|(_, node)| Arc::clone(node))
            .collect();
        for node in peers {
            self.deliver(&node, cmd, &payload);
        }
        Ok(())
    }

    async fn send_to_node(
        &self,
        _chain_id: ChainId,
        peer: &PeerId,
        cmd: &str,
        payload: Vec<u8>,
    ) -> ConsensusResult<()> {
        let node = self.registry.nodes.read().get(peer).cloned();
        match node {
            Some(node) => {
                self.deliver(&node, cmd, &payload);
                Ok(())
            }
            None => Err(ConsensusError::Network(format!("unknown peer {peer}"))),
        }
    }

    async fn join_consensus_subnet(&self, _request: SubnetJoinRequest) -> ConsensusResult<()> {
        Ok(())
    }

    async fn leave_consensus_subnet(&self, _chain_id: ChainId) -> ConsensusResult<()> {
        Ok(())
    }
}

struct FixedRound {
    round: Round,
}

#[async_trait]
impl RoundProvider for FixedRound {
    async fn get_round(&self, _round_index: u64, _round_start_time: u64) -> ConsensusResult<Round> {
        Ok(self.round.clone())
    }

    async fn temp_round(&self) -> ConsensusResult<Round> {
        Ok(self.round.clone())
    }

    async fn switch_round(&self, _round: Round, _persist: bool) -> ConsensusResult<()> {
        Ok(())
    }
}

struct IdleAssembler;

#[async_trait]
impl BlockAssembler for IdleAssembler {
    async fn assemble(
        &self,
        _member: &RoundMember,
        _round: &Round,
        _pack_start_time: u64,
        _settle_award: bool,
    ) -> ConsensusResult<BlockHeader> {
        Err(ConsensusError::AssemblyFailed("not packing in tests".to_string()))
    }
}

struct Node {
    id: PeerId,
    service: Arc<ConsensusService>,
    pipeline: Arc<InMemoryBlockPipeline>,
}

struct Cluster {
    members: Vec<Node>,
    observer: Node,
    addresses: Vec<[u8; 20]>,
}

fn member_key(i: usize) -> Secp256k1KeyPair {
    Secp256k1KeyPair::from_bytes([0x10 + i as u8; 32]).unwrap()
}

fn spawn_node(
    id: PeerId,
    round: Round,
    keypair: Option<Secp256k1KeyPair>,
    registry: &Arc<Registry>,
) -> Node {
    let keystore = Arc::new(InMemoryKeystore::new());
    if let Some(keypair) = keypair {
        keystore.insert(keypair);
    }
    let pipeline = Arc::new(InMemoryBlockPipeline::new());
    let deps = ConsensusDependencies {
        round_provider: Arc::new(FixedRound { round }),
        block_assembler: Arc::new(IdleAssembler),
        network: Arc::new(LoopbackNetwork {
            me: id.clone(),
            registry: Arc::clone(registry),
        }),
        block_pipeline: pipeline.clone(),
        chain_status: Arc::new(SharedChainStatus::synced_at(BEST_HEIGHT)),
        signer: keystore,
    };
    let config = ConsensusConfig::default().with_poll_interval(Duration::from_millis(10));
    let service = Arc::new(ConsensusService::new(config, deps).unwrap());
    registry
        .nodes
        .write()
        .insert(id.clone(), Arc::clone(&service));
    service.start();
    Node {
        id,
        service,
        pipeline,
    }
}

/// Four round members plus one synced observer outside the round.
fn cluster() -> Cluster {
    let registry = Arc::new(Registry::default());
    let addresses: Vec<_> = (0..4).map(|i| member_key(i).address()).collect();
    let members: Vec<_> = addresses
        .iter()
        .enumerate()
        .map(|(i, a)| RoundMember::new(*a, i as u32 + 1))
        .collect();
    let round_for = |local: Option<RoundMember>| Round {
        index: ROUND_INDEX,
        start_time: ROUND_START,
        members: members.clone(),
        local_member: local,
    };

    let nodes = (0..4)
        .map(|i| {
            spawn_node(
                PeerId::new(format!("10.0.0.{}:8001", i + 1)),
                round_for(Some(members[i].clone())),
                Some(member_key(i)),
                &registry,
            )
        })
        .collect();
    let observer = spawn_node(PeerId::new("10.0.0.99:8001"), round_for(None), None, &registry);

    Cluster {
        members: nodes,
        observer,
        addresses,
    }
}

fn header(cluster: &Cluster, height: u64, packer: usize, salt: u8) -> BlockHeader {
    BlockHeader {
        height,
        parent_hash: [salt; 32],
        merkle_root: [0xCD; 32],
        timestamp: ROUND_START + 1_000 * packer as u64,
        packer: cluster.addresses[packer],
        round: RoundData {
            round_index: ROUND_INDEX,
            round_start_time: ROUND_START,
            packing_index_of_round: packer as u32 + 1,
            consensus_member_count: 4,
        },
    }
}

async fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..500 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

async fn wait_all_active(cluster: &Cluster) {
    let members: Vec<_> = cluster.members.iter().map(|n| Arc::clone(&n.service)).collect();
    assert!(
        wait_for(|| members
            .iter()
            .all(|s| s.driver_state() == DriverState::Active))
        .await,
        "members never became active"
    );
    let observer = Arc::clone(&cluster.observer.service);
    assert!(wait_for(|| observer.driver_state() == DriverState::NonParticipant).await);
}

async fn shutdown(cluster: Cluster) {
    for node in cluster.members.iter().chain(std::iter::once(&cluster.observer)) {
        node.service.shutdown().await;
        assert_eq!(node.service.driver_state(), DriverState::Idle);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_four_members_finalize_block() {
    poc_telemetry::init_test_tracing();
    let cluster = cluster();
    wait_all_active(&cluster).await;

    let block = header(&cluster, 100, 1, 0);
    for node in &cluster.members {
        node.service.on_new_block(block.clone()).await;
    }

    let pipelines: Vec<_> = cluster
        .members
        .iter()
        .chain(std::iter::once(&cluster.observer))
        .map(|n| Arc::clone(&n.pipeline))
        .collect();
    assert!(
        wait_for(|| pipelines.iter().all(|p| p.confirmed_count() >= 1)).await,
        "not every node confirmed the block"
    );
    tokio::time::sleep(Duration::from_millis(200)).await;

    for node in cluster.members.iter().chain(std::iter::once(&cluster.observer)) {
        let confirmed = node.pipeline.confirmed();
        assert_eq!(confirmed.len(), 1, "node {} confirmed twice", node.id);
        assert_eq!(confirmed[0].height, 100);
        assert_eq!(confirmed[0].block_hash, block.hash());

        let proof = &confirmed[0].proof;
        assert_eq!(proof.stage, VoteStage::PreCommit);
        assert_eq!(proof.signatures.len(), 3);
        for signature in &proof.signatures {
            assert!(signature.verify(&proof.signing_hash()).is_ok());
            assert!(cluster.addresses.contains(&signature.signer_address()));
        }
    }

    // Every pre-commit signer saw a pre-vote quorum first.
    let confirmed_stage_one = cluster
        .members
        .iter()
        .filter(|n| n.service.is_stage_one_confirmed(100, FIRST_VOTE_ROUND))
        .count();
    assert!(confirmed_stage_one >= 3);
    for node in &cluster.members {
        let metrics = node.service.metrics();
        assert!(metrics.pre_vote_quorums <= 1);
        assert!(metrics.pre_commit_quorums <= 1);
        assert_eq!(metrics.blocks_committed, 1);
    }
    assert!(cluster.observer.service.metrics().rejected(Rejection::NotParticipant) > 0);

    shutdown(cluster).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_outsider_votes_never_reach_quorum() {
    poc_telemetry::init_test_tracing();
    let cluster = cluster();
    wait_all_active(&cluster).await;

    let block = header(&cluster, 100, 0, 0);
    let target = VotingTarget::for_block(&block, FIRST_VOTE_ROUND);
    let target_node = &cluster.members[0];
    for i in 0..3 {
        let outsider = Secp256k1KeyPair::from_bytes([0x70 + i; 32]).unwrap();
        let vote = VoteMessage::new(target, VoteStage::PreVote);
        let signature = outsider.sign_p2pk(&vote.signing_hash()).unwrap();
        let payload = vote.with_signature(signature).encode().unwrap();
        target_node
            .service
            .on_vote_message(PeerId::new(format!("10.9.9.{i}:8001")), &payload);
    }

    let service = Arc::clone(&target_node.service);
    assert!(wait_for(|| service.metrics().rejected(Rejection::UnknownSigner) == 3).await);
    assert_eq!(service.metrics().pre_vote_quorums, 0);
    assert!(!service.is_stage_one_confirmed(100, FIRST_VOTE_ROUND));

    shutdown(cluster).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_higher_block_resets_candidates() {
    poc_telemetry::init_test_tracing();
    let cluster = cluster();
    wait_all_active(&cluster).await;
    let node = &cluster.members[0];

    node.service.on_new_block(header(&cluster, 100, 1, 0)).await;
    node.service.on_new_block(header(&cluster, 100, 1, 1)).await;
    assert_eq!(node.service.candidate_board().len(), 2);

    let next = header(&cluster, 101, 2, 0);
    node.service.on_new_block(next.clone()).await;

    let board = node.service.candidate_board();
    assert_eq!(board.current_height(), 101);
    assert_eq!(board.len(), 1);
    assert_eq!(board.voted_block_hash(), Some(next.hash()));

    shutdown(cluster).await;
}
