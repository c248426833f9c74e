use thiserror::Error;

use crate::record::RecordId;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RecordError {
    #[error("{field} must be a finite number")]
    NotFinite { field: &'static str },

    #[error("{field}={value} is outside [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("dna risk category {category} does not match percent {percent}")]
    InconsistentRisk { percent: u8, category: String },

    #[error("dna risk category {0} present without a percent")]
    CategoryWithoutPercent(String),

    #[error("dna risk percent {0} exceeds 100")]
    RiskOutOfRange(u8),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CollectionError {
    #[error("record {0} is already present")]
    DuplicateId(RecordId),
}
