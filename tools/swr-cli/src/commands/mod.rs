//! CLI command implementations.

pub mod key;
pub mod simulate;

pub use key::KeyArgs;
pub use simulate::SimulateArgs;
