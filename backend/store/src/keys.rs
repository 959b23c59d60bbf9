//! `page_{n}` / `line_{n}` record keys.
//!
//! On disk they are plain strings. In memory they are numbers, so pages and
//! lines sort 1, 2, 10 instead of 1, 10, 2.

use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use bendline_core::BendlineError;

macro_rules! numbered_key {
    ($name:ident, $prefix:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub u32);

        impl $name {
            pub fn number(self) -> u32 {
                self.0
            }
        }

        impl From<u32> for $name {
            fn from(n: u32) -> Self {
                Self(n)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "_{}"), self.0)
            }
        }

        impl FromStr for $name {
            type Err = BendlineError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.strip_prefix(concat!($prefix, "_"))
                    .and_then(|n| n.parse().ok())
                    .map(Self)
                    .ok_or_else(|| {
                        BendlineError::Store(format!(
                            "invalid key '{s}', expected {}_<number>",
                            $prefix
                        ))
                    })
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(de::Error::custom)
            }
        }
    };
}

numbered_key!(PageKey, "page");
numbered_key!(LineKey, "line");

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn keys_render_with_prefix() {
        assert_eq!(PageKey(3).to_string(), "page_3");
        assert_eq!(LineKey(12).to_string(), "line_12");
        assert_eq!("line_7".parse::<LineKey>().unwrap(), LineKey(7));
    }

    #[test]
    fn wrong_prefix_or_number_is_rejected() {
        assert!("line_1".parse::<PageKey>().is_err());
        assert!("page_x".parse::<PageKey>().is_err());
        assert!("page_".parse::<PageKey>().is_err());
    }

    #[test]
    fn map_keys_sort_numerically() {
        let raw = r#"{"line_10": 0, "line_2": 0, "line_1": 0}"#;
        let map: BTreeMap<LineKey, u8> = serde_json::from_str(raw).unwrap();
        let order: Vec<u32> = map.keys().map(|k| k.number()).collect();
        assert_eq!(order, vec![1, 2, 10]);

        let back = serde_json::to_string(&map).unwrap();
        assert_eq!(back, r#"{"line_1":0,"line_2":0,"line_10":0}"#);
    }
}
