//! ABI bindings of the L1 bridge contracts.

pub mod calls;
