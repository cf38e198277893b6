//! Wire protocols spoken by the bridge.

pub mod econ;
