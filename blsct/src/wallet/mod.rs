//! Key management, output recovery, and transaction building.
//!
//! [KeyMan] derives a wallet's keys from a seed, recognizes outputs paid to any of its
//! registered sub-addresses, and recovers their amounts and one-time spend keys. [TxFactory]
//! spends recovered coins to new destinations, returning change to the wallet.

mod keyman;
mod tx_factory;

pub use keyman::{KeyMan, RecoveredOutput, LOOKAHEAD};
pub use tx_factory::TxFactory;

/// Fee charged per input and output by default.
pub const DEFAULT_FEE_PER_COMPONENT: u64 = 200_000;

/// Configuration for [TxFactory].
#[derive(Clone, Debug)]
pub struct Config {
    /// Fee charged for every input and every output (including change).
    pub fee_per_component: u64,

    /// Memo attached to change outputs.
    pub change_memo: Vec<u8>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fee_per_component: DEFAULT_FEE_PER_COMPONENT,
            change_memo: b"Change".to_vec(),
        }
    }
}
