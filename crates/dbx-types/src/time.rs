use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, SecondsFormat};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// Millisecond-resolution modification timestamp.
///
/// Sync descriptors carry the time of the last synchronization as either
/// epoch milliseconds or an RFC 3339 string. Both forms are accepted on
/// input; the value is always written back as epoch milliseconds.
///
/// Comparison is on milliseconds only. Filesystem timestamps with a finer
/// resolution are truncated before they are compared.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModifiedTime {
    epoch_ms: i64,
}

impl ModifiedTime {
    /// The UNIX epoch.
    pub const EPOCH: Self = Self { epoch_ms: 0 };

    pub const fn from_epoch_ms(epoch_ms: i64) -> Self {
        Self { epoch_ms }
    }

    pub fn epoch_ms(&self) -> i64 {
        self.epoch_ms
    }

    /// The current wall-clock time.
    pub fn now() -> Self {
        Self::from_system_time(SystemTime::now())
    }

    /// Truncate a `SystemTime` to milliseconds.
    pub fn from_system_time(time: SystemTime) -> Self {
        let epoch_ms = match time.duration_since(UNIX_EPOCH) {
            Ok(after) => after.as_millis() as i64,
            Err(before) => -(before.duration().as_millis() as i64),
        };
        Self { epoch_ms }
    }

    /// Shift by a signed number of milliseconds.
    pub fn offset_ms(&self, delta: i64) -> Self {
        Self {
            epoch_ms: self.epoch_ms.saturating_add(delta),
        }
    }

    /// Parse epoch milliseconds (`"1700000000000"`) or RFC 3339
    /// (`"2023-11-14T22:13:20.000Z"`).
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let s = s.trim();
        if let Ok(ms) = s.parse::<i64>() {
            return Ok(Self::from_epoch_ms(ms));
        }
        if let Ok(ms) = s.parse::<f64>() {
            if ms.is_finite() {
                return Ok(Self::from_epoch_ms(ms as i64));
            }
        }
        DateTime::parse_from_rfc3339(s)
            .map(|dt| Self::from_epoch_ms(dt.timestamp_millis()))
            .map_err(|e| TypeError::InvalidTimestamp(format!("{s:?}: {e}")))
    }

    /// RFC 3339 rendering, if the value is within chrono's range.
    pub fn to_rfc3339(&self) -> Option<String> {
        DateTime::from_timestamp_millis(self.epoch_ms)
            .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}

impl From<SystemTime> for ModifiedTime {
    fn from(time: SystemTime) -> Self {
        Self::from_system_time(time)
    }
}

impl fmt::Debug for ModifiedTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ModifiedTime({}ms)", self.epoch_ms)
    }
}

impl fmt::Display for ModifiedTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_rfc3339() {
            Some(s) => write!(f, "{s}"),
            None => write!(f, "{}ms", self.epoch_ms),
        }
    }
}

impl Serialize for ModifiedTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.epoch_ms)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTime {
    Millis(i64),
    Fractional(f64),
    Text(String),
}

impl<'de> Deserialize<'de> for ModifiedTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match RawTime::deserialize(deserializer)? {
            RawTime::Millis(ms) => Ok(Self::from_epoch_ms(ms)),
            RawTime::Fractional(ms) if ms.is_finite() => Ok(Self::from_epoch_ms(ms as i64)),
            RawTime::Fractional(ms) => Err(serde::de::Error::custom(format!(
                "non-finite timestamp {ms}"
            ))),
            RawTime::Text(s) => Self::parse(&s).map_err(serde::de::Error::custom),
        }
    }
}
