//! Default allocation template for self-hosted networks.

use super::GenesisDocument;

/// Allocation template merged with freshly generated initial stakers.
///
/// Network id 12346 is a custom network id, so nodes are always pointed at
/// an explicit genesis file.
pub const DEFAULT_GENESIS_JSON: &str = r#"{
    "networkID": 12346,
    "allocations": [
        {
            "ethAddr": "0xb3d82b1367d362de99ab59a658165aff520cbd4d",
            "djtxAddr": "X-custom1g65uqn6t77p656w64023nh8nd9updzmxwd59gh",
            "initialAmount": 0,
            "unlockSchedule": [
                {
                    "amount": 10000000000000000,
                    "locktime": 1633824000
                }
            ]
        },
        {
            "ethAddr": "0xb3d82b1367d362de99ab59a658165aff520cbd4d",
            "djtxAddr": "X-custom18jma8ppw3nhx5r4ap8clazz0dps7rv5u9xde7p",
            "initialAmount": 300000000000000000,
            "unlockSchedule": [
                {
                    "amount": 20000000000000000
                },
                {
                    "amount": 10000000000000000,
                    "locktime": 1633824000
                }
            ]
        },
        {
            "ethAddr": "0xb3d82b1367d362de99ab59a658165aff520cbd4d",
            "djtxAddr": "X-custom1ur873jhz9qnaqv5qthk5sn3e8nj3e0kmzpjrhp",
            "initialAmount": 10000000000000000,
            "unlockSchedule": [
                {
                    "amount": 10000000000000000,
                    "locktime": 1633824000
                }
            ]
        }
    ],
    "startTime": 1630987200,
    "initialStakeDuration": 31536000,
    "initialStakeDurationOffset": 5400,
    "initialStakedFunds": [
        "X-custom1g65uqn6t77p656w64023nh8nd9updzmxwd59gh"
    ],
    "initialStakers": [],
    "cChainGenesis": "{\"config\":{\"chainId\":43112,\"homesteadBlock\":0,\"daoForkBlock\":0,\"daoForkSupport\":true,\"eip150Block\":0,\"eip150Hash\":\"0x2086799aeebeae135c246c65021c82b4e15a2c451340993aacfd2751886514f0\",\"eip155Block\":0,\"eip158Block\":0,\"byzantiumBlock\":0,\"constantinopleBlock\":0,\"petersburgBlock\":0,\"istanbulBlock\":0,\"muirGlacierBlock\":0,\"apricotPhase1BlockTimestamp\":0,\"apricotPhase2BlockTimestamp\":0},\"nonce\":\"0x0\",\"timestamp\":\"0x0\",\"extraData\":\"0x00\",\"gasLimit\":\"0x5f5e100\",\"difficulty\":\"0x0\",\"mixHash\":\"0x0000000000000000000000000000000000000000000000000000000000000000\",\"coinbase\":\"0x0000000000000000000000000000000000000000\",\"alloc\":{\"8db97C7cEcE249c2b98bDC0226Cc4C2A57BF52FC\":{\"balance\":\"0x295BE96E64066972000000\"}},\"number\":\"0x0\",\"gasUsed\":\"0x0\",\"parentHash\":\"0x0000000000000000000000000000000000000000000000000000000000000000\"}",
    "message": "Make time for fun"
}"#;

/// Parse the embedded template.
pub fn default_genesis() -> Result<GenesisDocument, serde_json::Error> {
    serde_json::from_str(DEFAULT_GENESIS_JSON)
}
