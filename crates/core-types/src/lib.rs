pub mod structs;

// Re-export the core types to provide a clean public API.
pub use structs::{
    add_trade_pins, remove_trade_pins, BadgeCounts, ChallengeWave, PinCollection, TradePin,
};
