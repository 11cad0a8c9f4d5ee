pub mod evm;
pub mod providers;
pub mod simulated;
