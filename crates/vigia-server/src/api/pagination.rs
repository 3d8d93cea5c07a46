use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::{IntoParams, ToSchema};

const DEFAULT_PAGE_LIMIT: usize = 20;
const MAX_PAGE_LIMIT: usize = 1000;

/// `?limit=&offset=` query shared by every list endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct PaginationParams {
    /// Page size (default 20, max 1000)
    #[param(required = false)]
    #[serde(default, deserialize_with = "lenient_count")]
    pub limit: Option<u64>,
    /// Items to skip (default 0)
    #[param(required = false)]
    #[serde(default, deserialize_with = "lenient_count")]
    pub offset: Option<u64>,
}

impl PaginationParams {
    pub fn limit(&self) -> usize {
        self.limit
            .map_or(DEFAULT_PAGE_LIMIT, |l| usize::try_from(l).unwrap_or(MAX_PAGE_LIMIT))
            .min(MAX_PAGE_LIMIT)
    }

    pub fn offset(&self) -> usize {
        self.offset
            .map_or(0, |o| usize::try_from(o).unwrap_or(usize::MAX))
    }
}

/// Accepts a count as a number or as text; blank text means absent.
fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    struct CountVisitor;

    impl<'de> Visitor<'de> for CountVisitor {
        type Value = Option<u64>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a non-negative integer")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            Ok(Some(v))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            u64::try_from(v).map(Some).map_err(E::custom)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            let v = v.trim();
            if v.is_empty() {
                return Ok(None);
            }
            v.parse().map(Some).map_err(E::custom)
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Self::Value, D::Error> {
            d.deserialize_any(self)
        }
    }

    deserializer.deserialize_any(CountVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_cap() {
        let p = PaginationParams::default();
        assert_eq!((p.limit(), p.offset()), (20, 0));

        let p = PaginationParams {
            limit: Some(5000),
            offset: Some(40),
        };
        assert_eq!((p.limit(), p.offset()), (1000, 40));
    }

    #[test]
    fn numbers_may_arrive_as_text() {
        let p: PaginationParams =
            serde_json::from_str(r#"{"limit": " 15 ", "offset": ""}"#).unwrap();
        assert_eq!(p.limit, Some(15));
        assert_eq!(p.offset, None);
        assert!(serde_json::from_str::<PaginationParams>(r#"{"limit": "ten"}"#).is_err());
        assert!(serde_json::from_str::<PaginationParams>(r#"{"limit": -1}"#).is_err());
    }
}
