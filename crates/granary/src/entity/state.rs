// Tagged lifecycle states that serialize to a timestamp attribute.
//
// The store keeps `DeletedOn` and `AuthorizedOn` as plain timestamp strings
// so they can serve as index range keys; the epoch is the reserved "state
// not entered" value. In memory the states are explicit enums, so no code
// outside this module compares against a magic timestamp.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The wire value meaning "state not entered" for both attributes below.
pub(crate) const EPOCH_SENTINEL: &str = "1970-01-01T00:00:00Z";

fn serialize_state<S: Serializer>(at: Option<&DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error> {
    match at {
        None => serializer.serialize_str(EPOCH_SENTINEL),
        Some(at) => serializer.serialize_str(&at.to_rfc3339_opts(SecondsFormat::Micros, true)),
    }
}

fn deserialize_state<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    let at = DateTime::parse_from_rfc3339(&raw)
        .map_err(serde::de::Error::custom)?
        .with_timezone(&Utc);
    if at.timestamp() == 0 && at.timestamp_subsec_nanos() == 0 {
        Ok(None)
    } else {
        Ok(Some(at))
    }
}

/// Soft-delete state of an application row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Deletion {
    #[default]
    Active,
    Deleted(DateTime<Utc>),
}

impl Deletion {
    /// The `DeletedOn` wire value carried by every live row. Index queries
    /// for live applications key on this exact string.
    pub const NOT_DELETED: &'static str = EPOCH_SENTINEL;

    pub fn is_deleted(&self) -> bool {
        matches!(self, Self::Deleted(_))
    }
}

impl Serialize for Deletion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Active => serialize_state(None, serializer),
            Self::Deleted(at) => serialize_state(Some(at), serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Deletion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match deserialize_state(deserializer)? {
            None => Self::Active,
            Some(at) => Self::Deleted(at),
        })
    }
}

/// Authorization state of a device-code row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Activation {
    #[default]
    Pending,
    Authorized(DateTime<Utc>),
}

impl Activation {
    /// The `AuthorizedOn` wire value carried by every pending row. The
    /// accept path guards its write on this exact string.
    pub const NOT_AUTHORIZED: &'static str = EPOCH_SENTINEL;

    pub fn is_authorized(&self) -> bool {
        matches!(self, Self::Authorized(_))
    }
}

impl Serialize for Activation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Pending => serialize_state(None, serializer),
            Self::Authorized(at) => serialize_state(Some(at), serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Activation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match deserialize_state(deserializer)? {
            None => Self::Pending,
            Some(at) => Self::Authorized(at),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_active_serializes_to_sentinel() {
        let json = serde_json::to_string(&Deletion::Active).unwrap();
        assert_eq!(json, format!("\"{EPOCH_SENTINEL}\""));

        let back: Deletion = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Deletion::Active);
    }

    #[test]
    fn test_deleted_round_trip() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        let json = serde_json::to_string(&Deletion::Deleted(at)).unwrap();
        let back: Deletion = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Deletion::Deleted(at));
        assert!(back.is_deleted());
    }

    #[test]
    fn test_pending_and_authorized() {
        let json = serde_json::to_string(&Activation::Pending).unwrap();
        assert_eq!(json, format!("\"{EPOCH_SENTINEL}\""));

        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        let back: Activation =
            serde_json::from_str(&serde_json::to_string(&Activation::Authorized(at)).unwrap())
                .unwrap();
        assert!(back.is_authorized());
    }
}
