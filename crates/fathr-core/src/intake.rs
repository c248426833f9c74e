use serde::{Deserialize, Serialize};

use crate::error::RecordError;
use crate::record::{now_ms, MeasurementRecord, Measurements, RecordId};
use crate::risk::estimate_risk;

const PERCENT: (f64, f64) = (0.0, 100.0);
const NON_NEGATIVE: (f64, f64) = (0.0, f64::MAX);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntakeOptions {
    /// Run the DNA fragmentation estimator before the record is stored.
    pub estimate_dna: bool,
}

impl Default for IntakeOptions {
    fn default() -> Self {
        Self { estimate_dna: true }
    }
}

impl Measurements {
    /// Checks the bounds the input screens enforce.
    pub fn validate(&self) -> Result<(), RecordError> {
        let checks: [(&'static str, f64, (f64, f64)); 19] = [
            ("semenQuantity", self.semen_quantity, (0.0, 10.0)),
            ("pH", self.ph, (0.0, 14.0)),
            ("totalMobility", self.total_mobility, PERCENT),
            ("progressiveMobility", self.progressive_mobility, PERCENT),
            ("nonProgressiveMobility", self.non_progressive_mobility, PERCENT),
            ("travelSpeed", self.travel_speed, (0.0, 1.0)),
            ("mobilityIndex", self.mobility_index, PERCENT),
            ("still", self.still, PERCENT),
            ("spermConcentration", self.sperm_concentration, NON_NEGATIVE),
            ("totalSpermatozoa", self.total_spermatozoa, NON_NEGATIVE),
            ("functionalSpermatozoa", self.functional_spermatozoa, NON_NEGATIVE),
            ("roundCells", self.round_cells, NON_NEGATIVE),
            ("leukocytes", self.leukocytes, NON_NEGATIVE),
            ("liveSpermatozoa", self.live_spermatozoa, PERCENT),
            ("morphologyRate", self.morphology_rate, PERCENT),
            ("pathology", self.pathology, PERCENT),
            ("headDefect", self.head_defect, PERCENT),
            ("neckDefect", self.neck_defect, PERCENT),
            ("tailDefect", self.tail_defect, PERCENT),
        ];

        for (field, value, (min, max)) in checks {
            if !value.is_finite() {
                return Err(RecordError::NotFinite { field });
            }
            if value < min || value > max {
                return Err(RecordError::OutOfRange {
                    field,
                    value,
                    min,
                    max,
                });
            }
        }
        Ok(())
    }
}

impl MeasurementRecord {
    /// Turns a submitted form into a stored-ready record.
    ///
    /// The DNA estimate is filled here or never; nothing back-fills it later.
    pub fn create(measurements: Measurements, options: IntakeOptions) -> Result<Self, RecordError> {
        measurements.validate()?;
        let dna_fragmentation = options
            .estimate_dna
            .then(|| estimate_risk(&measurements).estimate);

        Ok(Self::from_parts(
            RecordId::generate(),
            now_ms(),
            measurements,
            dna_fragmentation,
        ))
    }
}
