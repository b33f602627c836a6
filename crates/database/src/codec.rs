//! Parsing and serialization of JSON-encoded text columns.
//!
//! Every parse is "decode JSON, then project": a failed decode or a
//! structurally wrong top level rejects the whole column with a
//! shape-specific [`DbError::MalformedData`], while individual wrong-typed
//! elements are silently dropped. The one exception is the challenge-wave
//! list, which is all-or-nothing: silently dropping a bad wave would
//! understate the challenge's difficulty.

use crate::error::DbError;
use core_types::{BadgeCounts, ChallengeWave, PinCollection, TradePin};
use serde_json::Value;
use std::collections::BTreeMap;

fn decode(raw: &str, shape: &'static str) -> Result<Value, DbError> {
    serde_json::from_str(raw).map_err(|_| DbError::MalformedData(shape))
}

/// Parses a string-list column (unlocked avatars, themes, scenes).
pub fn parse_string_list(raw: &str) -> Result<Vec<String>, DbError> {
    const SHAPE: &str = "String list";
    let Value::Array(items) = decode(raw, SHAPE)? else {
        return Err(DbError::MalformedData(SHAPE));
    };
    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(text) => Some(text),
            _ => None,
        })
        .collect())
}

/// Parses a number-list column (wild card pin counts per rarity).
pub fn parse_number_list(raw: &str) -> Result<Vec<u32>, DbError> {
    const SHAPE: &str = "Number list";
    let Value::Array(items) = decode(raw, SHAPE)? else {
        return Err(DbError::MalformedData(SHAPE));
    };
    Ok(items
        .into_iter()
        .filter_map(|item| item.as_u64().and_then(|n| u32::try_from(n).ok()))
        .collect())
}

/// Parses the brawler -> pin -> count collection column.
pub fn parse_pin_collection(raw: &str) -> Result<PinCollection, DbError> {
    const SHAPE: &str = "Pin collection";
    let Value::Object(entries) = decode(raw, SHAPE)? else {
        return Err(DbError::MalformedData(SHAPE));
    };
    let mut collection = PinCollection::new();
    for (brawler, pins) in entries {
        let Value::Object(pins) = pins else {
            continue;
        };
        let mut counts = BTreeMap::new();
        for (pin, count) in pins {
            if let Some(count) = count.as_u64().and_then(|n| u32::try_from(n).ok()) {
                counts.insert(pin, count);
            }
        }
        collection.insert(brawler, counts);
    }
    Ok(collection)
}

/// Serializes a pin collection back to its column form.
///
/// `PinCollection` is a `BTreeMap`, so keys come out lexicographically
/// sorted: rewriting unchanged data yields byte-identical text.
pub fn serialize_pin_collection(collection: &PinCollection) -> Result<String, DbError> {
    serde_json::to_string(collection).map_err(|_| DbError::MalformedData("Pin collection"))
}

/// Parses a trade's offer/request pin list column.
pub fn parse_trade_pins(raw: &str) -> Result<Vec<TradePin>, DbError> {
    const SHAPE: &str = "Trade pins";
    let Value::Array(items) = decode(raw, SHAPE)? else {
        return Err(DbError::MalformedData(SHAPE));
    };
    Ok(items
        .into_iter()
        .filter_map(|item| {
            let entry = item.as_object()?;
            Some(TradePin {
                brawler: entry.get("brawler")?.as_str()?.to_string(),
                pin: entry.get("pin")?.as_str()?.to_string(),
                amount: u32::try_from(entry.get("amount")?.as_u64()?).ok()?,
            })
        })
        .collect())
}

/// Serializes a trade pin list to its column form.
pub fn serialize_trade_pins(pins: &[TradePin]) -> Result<String, DbError> {
    serde_json::to_string(pins).map_err(|_| DbError::MalformedData("Trade pins"))
}

/// Parses the badge -> count accolades column.
pub fn parse_badge_counts(raw: &str) -> Result<BadgeCounts, DbError> {
    const SHAPE: &str = "Badge counts";
    let Value::Object(entries) = decode(raw, SHAPE)? else {
        return Err(DbError::MalformedData(SHAPE));
    };
    let mut badges = BadgeCounts::new();
    for (badge, count) in entries {
        if let Some(count) = count.as_u64().and_then(|n| u32::try_from(n).ok()) {
            badges.insert(badge, count);
        }
    }
    Ok(badges)
}

/// Parses a challenge's wave list column. All-or-nothing: any wave with a
/// wrong `level` type, a non-list `enemies`, or a non-string enemy rejects
/// the entire column. The optional `delay` and `maxEnemies` fields are
/// kept only when present and correctly typed; a malformed optional field
/// is dropped without rejecting its wave.
pub fn parse_challenge_waves(raw: &str) -> Result<Vec<ChallengeWave>, DbError> {
    const SHAPE: &str = "Challenge waves";
    let Value::Array(items) = decode(raw, SHAPE)? else {
        return Err(DbError::MalformedData(SHAPE));
    };
    let mut waves = Vec::with_capacity(items.len());
    for item in items {
        let Some(entry) = item.as_object() else {
            return Err(DbError::MalformedData(SHAPE));
        };
        let Some(level) = entry
            .get("level")
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok())
        else {
            return Err(DbError::MalformedData(SHAPE));
        };
        let Some(enemy_items) = entry.get("enemies").and_then(Value::as_array) else {
            return Err(DbError::MalformedData(SHAPE));
        };
        let mut enemies = Vec::with_capacity(enemy_items.len());
        for enemy in enemy_items {
            let Some(name) = enemy.as_str() else {
                return Err(DbError::MalformedData(SHAPE));
            };
            enemies.push(name.to_string());
        }
        let delay = entry
            .get("delay")
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok());
        let max_enemies = entry
            .get("maxEnemies")
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok());
        waves.push(ChallengeWave {
            level,
            enemies,
            delay,
            max_enemies,
        });
    }
    Ok(waves)
}

/// Serializes a challenge wave list to its column form.
pub fn serialize_challenge_waves(waves: &[ChallengeWave]) -> Result<String, DbError> {
    serde_json::to_string(waves).map_err(|_| DbError::MalformedData("Challenge waves"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_list_drops_wrong_typed_elements() {
        let parsed = parse_string_list(r#"["shelly", 3, "colt", null]"#).unwrap();
        assert_eq!(parsed, vec!["shelly".to_string(), "colt".to_string()]);
    }

    #[test]
    fn number_list_drops_wrong_typed_elements() {
        let parsed = parse_number_list(r#"[1, "two", 3, -4, 5.5]"#).unwrap();
        assert_eq!(parsed, vec![1, 3]);
    }

    #[test]
    fn every_shape_rejects_invalid_json() {
        let garbage = "{not json";
        assert!(matches!(
            parse_string_list(garbage),
            Err(DbError::MalformedData(_))
        ));
        assert!(matches!(
            parse_number_list(garbage),
            Err(DbError::MalformedData(_))
        ));
        assert!(matches!(
            parse_pin_collection(garbage),
            Err(DbError::MalformedData(_))
        ));
        assert!(matches!(
            parse_trade_pins(garbage),
            Err(DbError::MalformedData(_))
        ));
        assert!(matches!(
            parse_badge_counts(garbage),
            Err(DbError::MalformedData(_))
        ));
        assert!(matches!(
            parse_challenge_waves(garbage),
            Err(DbError::MalformedData(_))
        ));
    }

    #[test]
    fn wrong_top_level_shape_is_rejected() {
        assert!(parse_string_list("{}").is_err());
        assert!(parse_pin_collection("[]").is_err());
        assert!(parse_challenge_waves("{}").is_err());
    }

    #[test]
    fn pin_collection_round_trips_with_sorted_keys() {
        let parsed =
            parse_pin_collection(r#"{"shelly":{"sad":2,"happy":1},"bull":{"angry":4}}"#).unwrap();
        let serialized = serialize_pin_collection(&parsed).unwrap();
        assert_eq!(
            serialized,
            r#"{"bull":{"angry":4},"shelly":{"happy":1,"sad":2}}"#
        );
        assert_eq!(parse_pin_collection(&serialized).unwrap(), parsed);
        // Rewriting unchanged data is byte-stable.
        assert_eq!(
            serialize_pin_collection(&parse_pin_collection(&serialized).unwrap()).unwrap(),
            serialized
        );
    }

    #[test]
    fn pin_collection_drops_wrong_typed_entries() {
        let parsed =
            parse_pin_collection(r#"{"shelly":{"sad":"two","happy":1},"bull":7}"#).unwrap();
        assert_eq!(parsed.get("shelly").unwrap().get("happy"), Some(&1));
        assert!(!parsed.get("shelly").unwrap().contains_key("sad"));
        assert!(!parsed.contains_key("bull"));
    }

    #[test]
    fn trade_pins_drop_structurally_invalid_entries() {
        let raw = r#"[
            {"brawler":"bull","pin":"angry","amount":2},
            {"brawler":"colt","pin":"happy"},
            {"brawler":"colt","pin":"happy","amount":"three"},
            "not an object"
        ]"#;
        let parsed = parse_trade_pins(raw).unwrap();
        assert_eq!(
            parsed,
            vec![TradePin {
                brawler: "bull".to_string(),
                pin: "angry".to_string(),
                amount: 2,
            }]
        );
    }

    #[test]
    fn badge_counts_drop_wrong_typed_counts() {
        let parsed = parse_badge_counts(r#"{"wins":10,"streak":"long"}"#).unwrap();
        assert_eq!(parsed.get("wins"), Some(&10));
        assert!(!parsed.contains_key("streak"));
    }

    #[test]
    fn challenge_wave_with_all_fields_parses() {
        let parsed =
            parse_challenge_waves(r#"[{"level":0,"enemies":["bull"],"delay":0,"maxEnemies":0}]"#)
                .unwrap();
        assert_eq!(
            parsed,
            vec![ChallengeWave {
                level: 0,
                enemies: vec!["bull".to_string()],
                delay: Some(0),
                max_enemies: Some(0),
            }]
        );
    }

    #[test]
    fn malformed_optional_wave_fields_are_dropped_not_fatal() {
        let parsed =
            parse_challenge_waves(r#"[{"level":0,"enemies":[],"delay":true,"maxEnemies":false}]"#)
                .unwrap();
        assert_eq!(
            parsed,
            vec![ChallengeWave {
                level: 0,
                enemies: vec![],
                delay: None,
                max_enemies: None,
            }]
        );
    }

    #[test]
    fn one_invalid_wave_rejects_the_whole_list() {
        // Second wave has a string level; the first being valid must not help.
        let raw = r#"[
            {"level":1,"enemies":["bull"]},
            {"level":"two","enemies":["colt"]}
        ]"#;
        assert!(matches!(
            parse_challenge_waves(raw),
            Err(DbError::MalformedData("Challenge waves"))
        ));

        // Non-string enemy is just as fatal.
        assert!(parse_challenge_waves(r#"[{"level":1,"enemies":["bull",2]}]"#).is_err());
        // Missing enemies list is fatal.
        assert!(parse_challenge_waves(r#"[{"level":1}]"#).is_err());
    }

    #[test]
    fn challenge_waves_round_trip_without_optional_noise() {
        let waves = vec![ChallengeWave {
            level: 3,
            enemies: vec!["bull".to_string(), "boss".to_string()],
            delay: None,
            max_enemies: Some(8),
        }];
        let serialized = serialize_challenge_waves(&waves).unwrap();
        // Absent optional fields are omitted, not written as null.
        assert!(!serialized.contains("delay"));
        assert_eq!(parse_challenge_waves(&serialized).unwrap(), waves);
    }
}
