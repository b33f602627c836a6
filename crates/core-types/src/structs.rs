use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A player's pin collection, keyed brawler name -> pin name -> copies owned.
///
/// `BTreeMap` keeps keys sorted, so the serialized form stored in the
/// `brawlers` text column is canonical: rewriting unchanged data produces
/// byte-identical text.
pub type PinCollection = BTreeMap<String, BTreeMap<String, u32>>;

/// Accolade badges earned from mini-games, keyed badge name -> count.
pub type BadgeCounts = BTreeMap<String, u32>;

/// One pin offered or requested in a trade, as stored in the trade's
/// `offer`/`request` text columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradePin {
    pub brawler: String,
    pub pin: String,
    pub amount: u32,
}

/// Adds every pin in `pins` to `collection`, creating brawler and pin
/// entries as needed.
pub fn add_trade_pins(collection: &mut PinCollection, pins: &[TradePin]) {
    for pin in pins {
        let counts = collection.entry(pin.brawler.clone()).or_default();
        *counts.entry(pin.pin.clone()).or_insert(0) += pin.amount;
    }
}

/// Removes every pin in `pins` from `collection`. Returns `false` as soon
/// as any pin is missing or owned in insufficient quantity; the caller is
/// expected to discard the collection in that case (trade transactions
/// roll back, so partial removal is never observable).
pub fn remove_trade_pins(collection: &mut PinCollection, pins: &[TradePin]) -> bool {
    for pin in pins {
        let Some(counts) = collection.get_mut(&pin.brawler) else {
            return false;
        };
        let Some(owned) = counts.get_mut(&pin.pin) else {
            return false;
        };
        if *owned < pin.amount {
            return false;
        }
        *owned -= pin.amount;
        if *owned == 0 {
            counts.remove(&pin.pin);
        }
    }
    true
}

/// One enemy wave of a challenge, as stored in the challenge's `waves`
/// text column. `delay` and `max_enemies` are optional tuning knobs and
/// are omitted from the serialized form when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeWave {
    pub level: u32,
    pub enemies: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_enemies: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pin(brawler: &str, name: &str, amount: u32) -> TradePin {
        TradePin {
            brawler: brawler.to_string(),
            pin: name.to_string(),
            amount,
        }
    }

    #[test]
    fn adding_pins_merges_counts() {
        let mut collection = PinCollection::new();
        add_trade_pins(&mut collection, &[pin("bull", "angry", 2)]);
        add_trade_pins(&mut collection, &[pin("bull", "angry", 1), pin("colt", "happy", 1)]);
        assert_eq!(collection["bull"]["angry"], 3);
        assert_eq!(collection["colt"]["happy"], 1);
    }

    #[test]
    fn removing_more_than_owned_fails() {
        let mut collection = PinCollection::new();
        add_trade_pins(&mut collection, &[pin("bull", "angry", 1)]);
        assert!(!remove_trade_pins(&mut collection, &[pin("bull", "angry", 2)]));
        assert!(!remove_trade_pins(&mut collection, &[pin("shelly", "sad", 1)]));
    }

    #[test]
    fn removing_the_last_copy_clears_the_entry() {
        let mut collection = PinCollection::new();
        add_trade_pins(&mut collection, &[pin("bull", "angry", 2)]);
        assert!(remove_trade_pins(&mut collection, &[pin("bull", "angry", 2)]));
        assert!(!collection["bull"].contains_key("angry"));
    }
}
