use serde::{Deserialize, Serialize};

use crate::record::MeasurementRecord;
use crate::status::{classify_analysis, AnalysisStatus};

/// DNA sub-score used when a record was stored without an estimate.
pub const DEFAULT_DNA_SUB_SCORE: u8 = 80;

const SUB_SCORE_COUNT: u64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Flat,
}

/// Which end of a record slice holds the most recent test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recency {
    NewestFirst,
    NewestLast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SubScores {
    pub motility: u8,
    pub concentration: u8,
    pub morphology: u8,
    pub dna_fragmentation: u8,
    pub analysis: u8,
}

impl SubScores {
    const fn values(&self) -> [u64; 5] {
        [
            self.motility as u64,
            self.concentration as u64,
            self.morphology as u64,
            self.dna_fragmentation as u64,
            self.analysis as u64,
        ]
    }

    fn total(&self) -> u64 {
        self.values().iter().sum()
    }

    /// Mean of the five sub-scores, truncated.
    pub fn composite(&self) -> u8 {
        narrow(self.total() / SUB_SCORE_COUNT)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CategoryAverages {
    pub motility: u8,
    pub concentration: u8,
    pub morphology: u8,
    pub dna_fragmentation: Option<u8>,
    pub analysis: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Aggregate {
    pub overall_score: u8,
    pub averages: CategoryAverages,
}

pub const fn analysis_sub_score(status: AnalysisStatus) -> u8 {
    match status {
        AnalysisStatus::Typical => 80,
        AnalysisStatus::Atypical => 40,
    }
}

pub fn per_record_score(record: &MeasurementRecord) -> SubScores {
    let m = &record.measurements;
    SubScores {
        motility: percent_score(m.total_mobility),
        concentration: percent_score(m.sperm_concentration),
        morphology: percent_score(m.morphology_rate),
        dna_fragmentation: record
            .dna_fragmentation_risk()
            .map_or(DEFAULT_DNA_SUB_SCORE, |risk| 100_u8.saturating_sub(risk)),
        analysis: analysis_sub_score(classify_analysis(m)),
    }
}

pub fn composite_score(record: &MeasurementRecord) -> u8 {
    per_record_score(record).composite()
}

/// Averages each sub-score across the records (truncating each average),
/// then averages the five truncated averages.
pub fn aggregate(records: &[MeasurementRecord]) -> Aggregate {
    let count = records.len() as u64;
    if count == 0 {
        return Aggregate {
            overall_score: 0,
            averages: CategoryAverages {
                motility: 0,
                concentration: 0,
                morphology: 0,
                dna_fragmentation: None,
                analysis: 0,
            },
        };
    }

    let mut sums = [0_u64; 5];
    for scores in records.iter().map(per_record_score) {
        for (sum, value) in sums.iter_mut().zip(scores.values()) {
            *sum += value;
        }
    }
    let [motility, concentration, morphology, dna_fragmentation, analysis] =
        sums.map(|sum| narrow(sum / count));
    let averages = SubScores {
        motility,
        concentration,
        morphology,
        dna_fragmentation,
        analysis,
    };

    Aggregate {
        overall_score: averages.composite(),
        averages: CategoryAverages {
            motility,
            concentration,
            morphology,
            dna_fragmentation: Some(dna_fragmentation),
            analysis,
        },
    }
}

/// Compares the most recent record's composite against all older records.
///
/// The older side is pooled: every sub-score of every older record is
/// summed and divided once by `count * 5`, while the current side truncates
/// its own five-way mean. Keep both roundings as they are.
pub fn trend(records: &[MeasurementRecord], recency: Recency) -> Trend {
    if records.len() < 2 {
        return Trend::Flat;
    }

    let split = match recency {
        Recency::NewestFirst => records.split_first(),
        Recency::NewestLast => records.split_last(),
    };
    let Some((current, previous)) = split else {
        return Trend::Flat;
    };

    let current_score = u64::from(composite_score(current));
    let previous_total: u64 = previous.iter().map(|r| per_record_score(r).total()).sum();
    let previous_score = previous_total / (previous.len() as u64 * SUB_SCORE_COUNT);

    match current_score.cmp(&previous_score) {
        std::cmp::Ordering::Greater => Trend::Up,
        std::cmp::Ordering::Less => Trend::Down,
        std::cmp::Ordering::Equal => Trend::Flat,
    }
}

fn percent_score(value: f64) -> u8 {
    // NaN saturates to 0 in the cast.
    value.clamp(0.0, 100.0) as u8
}

fn narrow(value: u64) -> u8 {
    u8::try_from(value.min(100)).unwrap_or(100)
}
