//! The bridge history node: command line arguments and the wiring of the providers, the
//! store and the reconciliation engine.

mod args;
pub use args::*;

mod constants;

mod node;
pub use node::{BridgeHistoryNode, NodeEngine};
