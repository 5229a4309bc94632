//! External dataset reference types.
//!
//! The hosting application supplies a read-only dataset indexed by row
//! (1-based: the record for row `n` lives at array index `n - 1`). Each
//! record carries a plate label and a set of named signal readings.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Channel name used when seeding placeholder records.
pub const PLACEHOLDER_CHANNEL: &str = "default";

/// Signal reading used when seeding placeholder records.
pub const PLACEHOLDER_SIGNAL: f64 = 0.0;

/// Ordered mapping from channel name to numeric reading.
///
/// Channels are iterated in insertion order (the order they appear in the
/// source JSON document). No schema is assumed beyond "some channels exist".
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignalMap {
    entries: Vec<(String, f64)>,
}

impl SignalMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a reading, replacing any existing reading for the channel
    /// without disturbing its position.
    pub fn insert(&mut self, channel: impl Into<String>, value: f64) {
        let channel = channel.into();
        if let Some(entry) = self.entries.iter_mut().find(|(c, _)| *c == channel) {
            entry.1 = value;
        } else {
            self.entries.push((channel, value));
        }
    }

    /// Get the reading for a channel.
    pub fn get(&self, channel: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(c, _)| c == channel)
            .map(|(_, v)| *v)
    }

    /// Iterate channels and readings in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(c, v)| (c.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, f64)> for SignalMap {
    fn from_iter<T: IntoIterator<Item = (String, f64)>>(iter: T) -> Self {
        let mut map = SignalMap::new();
        for (channel, value) in iter {
            map.insert(channel, value);
        }
        map
    }
}

impl Serialize for SignalMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (channel, value) in &self.entries {
            map.serialize_entry(channel, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for SignalMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SignalMapVisitor;

        impl<'de> Visitor<'de> for SignalMapVisitor {
            type Value = SignalMap;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a map of channel names to numeric readings")
            }

            // MapAccess yields entries in document order, which is exactly
            // the insertion order the map must preserve.
            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut map = SignalMap::new();
                while let Some((channel, value)) = access.next_entry::<String, f64>()? {
                    map.insert(channel, value);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(SignalMapVisitor)
    }
}

/// One external dataset record, correlated to a point by row number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetRecord {
    /// Plate label for display.
    pub plate: String,
    /// Named signal readings.
    #[serde(default)]
    pub signals: SignalMap,
}

impl DatasetRecord {
    pub fn new(plate: impl Into<String>) -> Self {
        Self {
            plate: plate.into(),
            signals: SignalMap::new(),
        }
    }

    /// Placeholder record used when no dataset file is available.
    pub fn placeholder(row: u32) -> Self {
        let mut record = Self::new(format!("P{row:03}"));
        record.signals.insert(PLACEHOLDER_CHANNEL, PLACEHOLDER_SIGNAL);
        record
    }
}

/// Seed placeholder records covering rows 1..=max_row.
pub fn placeholder_records(max_row: u32) -> Vec<DatasetRecord> {
    (1..=max_row).map(DatasetRecord::placeholder).collect()
}
