// Copyright 2024-2026 GG-CORE Contributors
// SPDX-License-Identifier: Apache-2.0

//! Genesis document model.
//!
//! Field names and layout follow the node's `genesis.json` configuration
//! format. Addresses are kept as their bech32 strings.

mod template;

use serde::{Deserialize, Serialize};

pub use template::{default_genesis, DEFAULT_GENESIS_JSON};

/// Delegation fee assigned to generated initial stakers.
pub const INITIAL_STAKER_DELEGATION_FEE: u32 = 5000;

/// Ledger genesis document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisDocument {
    #[serde(rename = "networkID")]
    pub network_id: u32,
    pub allocations: Vec<Allocation>,
    #[serde(rename = "startTime")]
    pub start_time: u64,
    #[serde(rename = "initialStakeDuration")]
    pub initial_stake_duration: u64,
    #[serde(rename = "initialStakeDurationOffset")]
    pub initial_stake_duration_offset: u64,
    #[serde(rename = "initialStakedFunds")]
    pub initial_staked_funds: Vec<String>,
    #[serde(rename = "initialStakers")]
    pub initial_stakers: Vec<InitialStaker>,
    /// Opaque C-chain genesis, embedded as a JSON string.
    #[serde(rename = "cChainGenesis")]
    pub c_chain_genesis: String,
    pub message: String,
}

/// Token allocation with its unlock schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    #[serde(rename = "ethAddr")]
    pub eth_addr: String,
    #[serde(rename = "djtxAddr")]
    pub djtx_addr: String,
    #[serde(rename = "initialAmount")]
    pub initial_amount: u64,
    #[serde(rename = "unlockSchedule")]
    pub unlock_schedule: Vec<UnlockSchedule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockSchedule {
    pub amount: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locktime: Option<u64>,
}

/// Validator present from the first block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitialStaker {
    #[serde(rename = "nodeID")]
    pub node_id: String,
    #[serde(rename = "rewardAddress")]
    pub reward_address: String,
    #[serde(rename = "delegationFee")]
    pub delegation_fee: u32,
}

impl GenesisDocument {
    /// Reward address used for generated initial stakers.
    ///
    /// This is the address of the second allocation in the document.
    pub fn staker_reward_address(&self) -> Option<&str> {
        self.allocations.get(1).map(|a| a.djtx_addr.as_str())
    }

    /// Serialize to the canonical compact JSON text stored in secrets and status.
    pub fn to_canonical_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
#[path = "genesis_tests.rs"]
mod tests;
