use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::RecordError;
use crate::risk::{RiskCategory, RiskEstimate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Appearance {
    Normal,
    Abnormal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Liquefaction {
    Normal,
    Abnormal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Consistency {
    Thin,
    Medium,
    Thick,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Agglutination {
    Mild,
    Moderate,
    Severe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Uuid);

impl RecordId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for RecordId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// Raw values captured by the intake screens for one test.
///
/// Units follow the lab report: volumes in mL, concentrations in million/mL,
/// travel speed in mm/sec, everything else in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measurements {
    pub appearance: Appearance,
    pub liquefaction: Liquefaction,
    pub consistency: Consistency,
    pub semen_quantity: f64,
    #[serde(rename = "pH")]
    pub ph: f64,

    pub total_mobility: f64,
    pub progressive_mobility: f64,
    pub non_progressive_mobility: f64,
    pub travel_speed: f64,
    pub mobility_index: f64,
    pub still: f64,
    pub agglutination: Agglutination,

    pub sperm_concentration: f64,
    pub total_spermatozoa: f64,
    pub functional_spermatozoa: f64,
    pub round_cells: f64,
    pub leukocytes: f64,
    pub live_spermatozoa: f64,

    pub morphology_rate: f64,
    pub pathology: f64,
    pub head_defect: f64,
    pub neck_defect: f64,
    pub tail_defect: f64,
}

/// One stored test submission.
///
/// Built once through [`MeasurementRecord::create`] and never edited
/// afterwards. The DNA fragmentation estimate is either absent or carries a
/// category derived from its percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RecordWire", into = "RecordWire")]
pub struct MeasurementRecord {
    pub id: RecordId,
    pub timestamp_ms: u64,
    pub measurements: Measurements,
    pub dna_fragmentation: Option<RiskEstimate>,
}

impl MeasurementRecord {
    /// Reassembles a record from already-validated parts, e.g. when a
    /// collaborator hands back stored data.
    pub const fn from_parts(
        id: RecordId,
        timestamp_ms: u64,
        measurements: Measurements,
        dna_fragmentation: Option<RiskEstimate>,
    ) -> Self {
        Self {
            id,
            timestamp_ms,
            measurements,
            dna_fragmentation,
        }
    }

    pub const fn dna_fragmentation_risk(&self) -> Option<u8> {
        match self.dna_fragmentation {
            Some(estimate) => Some(estimate.percent()),
            None => None,
        }
    }

    pub const fn dna_risk_category(&self) -> Option<RiskCategory> {
        match self.dna_fragmentation {
            Some(estimate) => Some(estimate.category()),
            None => None,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordWire {
    id: RecordId,
    timestamp_ms: u64,
    #[serde(flatten)]
    measurements: Measurements,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    dna_fragmentation_risk: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    dna_risk_category: Option<RiskCategory>,
}

impl TryFrom<RecordWire> for MeasurementRecord {
    type Error = RecordError;

    fn try_from(wire: RecordWire) -> Result<Self, Self::Error> {
        let dna_fragmentation = match (wire.dna_fragmentation_risk, wire.dna_risk_category) {
            (None, None) => None,
            (None, Some(category)) => {
                return Err(RecordError::CategoryWithoutPercent(category.to_string()))
            }
            (Some(percent), category) => {
                let estimate = RiskEstimate::from_percent(percent)?;
                if let Some(category) = category {
                    if category != estimate.category() {
                        return Err(RecordError::InconsistentRisk {
                            percent,
                            category: category.to_string(),
                        });
                    }
                }
                Some(estimate)
            }
        };

        Ok(Self {
            id: wire.id,
            timestamp_ms: wire.timestamp_ms,
            measurements: wire.measurements,
            dna_fragmentation,
        })
    }
}

impl From<MeasurementRecord> for RecordWire {
    fn from(record: MeasurementRecord) -> Self {
        Self {
            id: record.id,
            timestamp_ms: record.timestamp_ms,
            dna_fragmentation_risk: record.dna_fragmentation_risk(),
            dna_risk_category: record.dna_risk_category(),
            measurements: record.measurements,
        }
    }
}

pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Values the intake screens start from.
    pub fn baseline() -> Measurements {
        Measurements {
            appearance: Appearance::Normal,
            liquefaction: Liquefaction::Normal,
            consistency: Consistency::Medium,
            semen_quantity: 2.0,
            ph: 7.4,
            total_mobility: 50.0,
            progressive_mobility: 40.0,
            non_progressive_mobility: 10.0,
            travel_speed: 0.1,
            mobility_index: 60.0,
            still: 30.0,
            agglutination: Agglutination::Mild,
            sperm_concentration: 20.0,
            total_spermatozoa: 40.0,
            functional_spermatozoa: 15.0,
            round_cells: 0.5,
            leukocytes: 0.2,
            live_spermatozoa: 70.0,
            morphology_rate: 5.0,
            pathology: 10.0,
            head_defect: 3.0,
            neck_defect: 2.0,
            tail_defect: 1.0,
        }
    }

    pub fn record(measurements: Measurements, dna_risk: Option<u8>) -> MeasurementRecord {
        MeasurementRecord::from_parts(
            RecordId::generate(),
            now_ms(),
            measurements,
            dna_risk.map(|p| RiskEstimate::from_percent(p).expect("valid percent")),
        )
    }
}
