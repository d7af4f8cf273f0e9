// Copyright 2024-2026 GG-CORE Contributors
// SPDX-License-Identifier: Apache-2.0

//! Tests for the genesis model and default template.

use super::*;

#[test]
fn test_default_template_parses() {
    let genesis = default_genesis().unwrap();
    assert_eq!(genesis.network_id, 12346);
    assert_eq!(genesis.allocations.len(), 3);
    assert!(genesis.initial_stakers.is_empty());
    assert_eq!(genesis.message, "Make time for fun");
}

#[test]
fn test_staker_reward_address_is_second_allocation() {
    let genesis = default_genesis().unwrap();
    assert_eq!(
        genesis.staker_reward_address(),
        Some("X-custom18jma8ppw3nhx5r4ap8clazz0dps7rv5u9xde7p")
    );
}

#[test]
fn test_missing_locktime_is_omitted() {
    let genesis = default_genesis().unwrap();
    let schedule = &genesis.allocations[1].unlock_schedule;
    assert_eq!(schedule[0].locktime, None);
    assert_eq!(schedule[1].locktime, Some(1633824000));

    let json = serde_json::to_string(&schedule[0]).unwrap();
    assert_eq!(json, r#"{"amount":20000000000000000}"#);
}

#[test]
fn test_canonical_json_keeps_wire_names() {
    let mut genesis = default_genesis().unwrap();
    genesis.initial_stakers.push(InitialStaker {
        node_id: "NodeID-test".to_string(),
        reward_address: "X-custom1".to_string(),
        delegation_fee: INITIAL_STAKER_DELEGATION_FEE,
    });

    let json = genesis.to_canonical_json().unwrap();
    assert!(json.starts_with(r#"{"networkID":12346,"allocations":"#));
    assert!(json.contains(r#""initialStakers":[{"nodeID":"NodeID-test","rewardAddress":"X-custom1","delegationFee":5000}]"#));
    assert!(!json.contains('\n'));

    let parsed: GenesisDocument = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, genesis);
}

#[test]
fn test_c_chain_genesis_stays_opaque_string() {
    let genesis = default_genesis().unwrap();
    let inner: serde_json::Value = serde_json::from_str(&genesis.c_chain_genesis).unwrap();
    assert_eq!(inner["config"]["chainId"], 43112);
}
