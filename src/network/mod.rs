//! Network bootstrap: staking identities and genesis for new networks.

pub mod bootstrap;
pub mod node_id;

pub use bootstrap::{
    generate_network, generate_network_blocking, BootstrapError, BootstrappedNetwork,
    NodeIdentity, PrivateKeyPem,
};
pub use node_id::{NodeId, NODE_ID_PREFIX};
