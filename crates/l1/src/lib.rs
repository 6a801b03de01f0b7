//! Contract bindings and addresses required to claim bridge withdrawals on L1.

pub mod abi;

mod constants;
pub use constants::*;
