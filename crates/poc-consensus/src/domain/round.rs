//! Packing rounds as seen by the voting core.

use shared_types::Address;
use std::collections::HashSet;

/// One slot holder of a round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundMember {
    pub address: Address,
    /// 1-based packing slot within the round.
    pub packing_index: u32,
    /// Set once the member's agent is stopped. A deregistered member keeps its
    /// slot for the rest of the round but no longer votes.
    pub deregistered: bool,
}

impl RoundMember {
    pub fn new(address: Address, packing_index: u32) -> Self {
        Self {
            address,
            packing_index,
            deregistered: false,
        }
    }
}

/// A packing round: ordered members plus this node's own slot, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Round {
    pub index: u64,
    /// Unix millis.
    pub start_time: u64,
    pub members: Vec<RoundMember>,
    pub local_member: Option<RoundMember>,
}

impl Round {
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn member(&self, address: &Address) -> Option<&RoundMember> {
        self.members.iter().find(|m| &m.address == address)
    }

    /// True if the address holds a slot and has not deregistered.
    pub fn is_active_member(&self, address: &Address) -> bool {
        self.member(address).is_some_and(|m| !m.deregistered)
    }

    pub fn member_addresses(&self) -> HashSet<Address> {
        self.members.iter().map(|m| m.address).collect()
    }

    pub fn packing_index_of(&self, address: &Address) -> Option<u32> {
        self.member(address).map(|m| m.packing_index)
    }

    /// True if `member` holds the last packing slot of this round.
    pub fn is_last_slot(&self, member: &RoundMember) -> bool {
        member.packing_index as usize == self.member_count()
    }
}
