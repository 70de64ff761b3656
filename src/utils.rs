use chrono::{DateTime, FixedOffset};

use serde::{
    de::{self, Visitor},
    Deserializer,
};

use std::fmt;

/// Timestamp format used throughout the API, e.g. `2010/05/21 16:31:21 -0400`.
const API_TIME_FORMAT: &str = "%Y/%m/%d %H:%M:%S %z";

pub fn api_time<'de, D>(de: D) -> Result<DateTime<FixedOffset>, D::Error>
where
    D: Deserializer<'de>,
{
    struct ApiTimeVisitor;

    impl<'de> Visitor<'de> for ApiTimeVisitor {
        type Value = DateTime<FixedOffset>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a timestamp formatted as \"YYYY/MM/DD hh:mm:ss +zzzz\"")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            DateTime::parse_from_str(v, API_TIME_FORMAT).map_err(E::custom)
        }
    }

    de.deserialize_str(ApiTimeVisitor)
}

/// Page counters come back either as numbers or as strings holding numbers.
pub fn lenient_u64<'de, D>(de: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    struct LenientVisitor;

    impl<'de> Visitor<'de> for LenientVisitor {
        type Value = u64;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("an unsigned integer or a string holding one")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<u64, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<u64, E> {
            u64::try_from(v).map_err(|_| E::invalid_value(de::Unexpected::Signed(v), &self))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<u64, E> {
            v.trim()
                .parse()
                .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
        }
    }

    de.deserialize_any(LenientVisitor)
}
