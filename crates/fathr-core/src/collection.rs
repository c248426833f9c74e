use serde::{Deserialize, Serialize, Serializer};

use crate::error::CollectionError;
use crate::record::{MeasurementRecord, RecordId};
use crate::score::{aggregate, trend, Aggregate, Recency, Trend};

/// One user's records in chronological order, oldest first. Ids are unique,
/// including when loaded from JSON.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "Vec<MeasurementRecord>")]
pub struct MeasurementCollection {
    records: Vec<MeasurementRecord>,
}

impl Serialize for MeasurementCollection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.records.serialize(serializer)
    }
}

impl TryFrom<Vec<MeasurementRecord>> for MeasurementCollection {
    type Error = CollectionError;

    fn try_from(records: Vec<MeasurementRecord>) -> Result<Self, Self::Error> {
        Self::from_records(records)
    }
}

impl MeasurementCollection {
    pub const fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    pub fn from_records(
        records: impl IntoIterator<Item = MeasurementRecord>,
    ) -> Result<Self, CollectionError> {
        let mut collection = Self::new();
        for record in records {
            collection.push(record)?;
        }
        Ok(collection)
    }

    pub fn push(&mut self, record: MeasurementRecord) -> Result<(), CollectionError> {
        if self.get(&record.id).is_some() {
            return Err(CollectionError::DuplicateId(record.id));
        }
        self.records.push(record);
        Ok(())
    }

    pub fn remove(&mut self, id: &RecordId) -> Option<MeasurementRecord> {
        let idx = self.records.iter().position(|r| r.id == *id)?;
        Some(self.records.remove(idx))
    }

    pub fn get(&self, id: &RecordId) -> Option<&MeasurementRecord> {
        self.records.iter().find(|r| r.id == *id)
    }

    /// Snapshot in chronological order.
    pub fn records(&self) -> &[MeasurementRecord] {
        &self.records
    }

    pub fn newest_first(&self) -> Vec<MeasurementRecord> {
        self.records.iter().rev().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn aggregate(&self) -> Aggregate {
        aggregate(&self.records)
    }

    pub fn trend(&self) -> Trend {
        trend(&self.records, Recency::NewestLast)
    }
}
