//! Lenient numeric deserializers
//!
//! Subgraphs encode `BigInt`/`BigDecimal` as strings while the Morpho API
//! mostly uses JSON numbers; both shapes are accepted.

use alloy::primitives::Address;
use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::{Number, Value};

#[derive(Deserialize)]
#[serde(untagged)]
enum NumOrStr {
    Num(Number),
    Str(String),
}

fn parse_f64<E: de::Error>(value: NumOrStr) -> Result<f64, E> {
    match value {
        NumOrStr::Num(n) => n
            .as_f64()
            .ok_or_else(|| E::custom(format!("number out of range: {}", n))),
        NumOrStr::Str(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| E::custom(format!("invalid decimal: {:?}", s))),
    }
}

pub(crate) fn f64_from_any<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    parse_f64(NumOrStr::deserialize(deserializer)?)
}

pub(crate) fn opt_f64_from_any<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<NumOrStr>::deserialize(deserializer)?
        .map(parse_f64)
        .transpose()
}

pub(crate) fn u64_from_any<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match NumOrStr::deserialize(deserializer)? {
        NumOrStr::Num(n) => n
            .as_u64()
            .ok_or_else(|| de::Error::custom(format!("expected unsigned integer: {}", n))),
        NumOrStr::Str(s) => s
            .trim()
            .parse::<u64>()
            .map_err(|_| de::Error::custom(format!("invalid integer: {:?}", s))),
    }
}

pub(crate) fn i64_from_any<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match NumOrStr::deserialize(deserializer)? {
        NumOrStr::Num(n) => n
            .as_i64()
            .ok_or_else(|| de::Error::custom(format!("expected integer: {}", n))),
        NumOrStr::Str(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| de::Error::custom(format!("invalid integer: {:?}", s))),
    }
}

/// Big integers are kept as their decimal string
pub(crate) fn string_from_any<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match NumOrStr::deserialize(deserializer)? {
        NumOrStr::Num(n) => n.to_string(),
        NumOrStr::Str(s) => s,
    })
}

/// Read an address straight from a raw item without decoding the rest of it
pub(crate) fn raw_address(item: &Value, field: &str) -> Option<Address> {
    item.get(field)?.as_str()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Sample {
        #[serde(deserialize_with = "f64_from_any")]
        amount: f64,
        #[serde(default, deserialize_with = "opt_f64_from_any")]
        price: Option<f64>,
        #[serde(deserialize_with = "u64_from_any")]
        count: u64,
        #[serde(deserialize_with = "string_from_any")]
        supply: String,
    }

    #[test]
    fn accepts_strings_and_numbers() {
        let a: Sample = serde_json::from_value(json!({
            "amount": "1234.5",
            "price": null,
            "count": "42",
            "supply": 1000000
        }))
        .unwrap();
        assert!((a.amount - 1234.5).abs() < f64::EPSILON);
        assert_eq!(a.price, None);
        assert_eq!(a.count, 42);
        assert_eq!(a.supply, "1000000");

        let b: Sample = serde_json::from_value(json!({
            "amount": 7,
            "price": "0.99",
            "count": 3,
            "supply": "115792089237316195423570985008687907853269984665640564039457"
        }))
        .unwrap();
        assert!((b.amount - 7.0).abs() < f64::EPSILON);
        assert_eq!(b.price, Some(0.99));
        assert_eq!(b.count, 3);
        assert!(b.supply.starts_with("1157920892"));
    }

    #[test]
    fn raw_address_ignores_case_and_bad_values() {
        let item = json!({
            "id": "0xbaa5cc21fd487b8fcc2f632f3f4e8d37262a0842",
            "address": "not-an-address",
            "totalSupply": null
        });
        assert_eq!(
            raw_address(&item, "id"),
            Some(crate::tokens::addresses::MORPHO_BASE)
        );
        assert_eq!(raw_address(&item, "address"), None);
        assert_eq!(raw_address(&item, "totalSupply"), None);
        assert_eq!(raw_address(&item, "missing"), None);
    }

    #[test]
    fn missing_optional_is_none() {
        let s: Sample =
            serde_json::from_value(json!({ "amount": 1, "count": 1, "supply": "1" })).unwrap();
        assert_eq!(s.price, None);
    }

    #[test]
    fn rejects_garbage() {
        let res: Result<Sample, _> = serde_json::from_value(json!({
            "amount": "abc", "count": 1, "supply": "1"
        }));
        assert!(res.is_err());

        let res: Result<Sample, _> = serde_json::from_value(json!({
            "amount": 1, "count": "-5", "supply": "1"
        }));
        assert!(res.is_err());
    }
}
