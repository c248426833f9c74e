//! Response shapes for the presentation layer.
//!
//! Scores are computed in full before anything here runs. Entitlement only
//! decides which already-computed morphology and DNA values are revealed.

use fathr_core::{
    classify, per_record_score, Aggregate, AnalysisStatus, CategoryFeedback, ConcentrationStatus,
    MeasurementRecord, MorphologyStatus, MotilityStatus, OverallStatus, RecordId, RiskEstimate,
    ScoreBand, StatusReport, Trend, Zone,
};
use serde::Serialize;
use serde_json::Value;

/// Record wire fields shown only to entitled users.
pub const PREMIUM_RECORD_FIELDS: [&str; 7] = [
    "morphologyRate",
    "pathology",
    "headDefect",
    "neckDefect",
    "tailDefect",
    "dnaFragmentationRisk",
    "dnaRiskCategory",
];

/// One stored record as the results screen shows it. Without entitlement the
/// morphology block and the DNA pair are `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordView {
    pub record: Value,
    pub statuses: GatedStatuses,
}

impl RecordView {
    pub fn build(record: &MeasurementRecord, entitled: bool) -> Result<Self, serde_json::Error> {
        let mut fields = serde_json::to_value(record)?;
        if !entitled {
            if let Some(map) = fields.as_object_mut() {
                for key in PREMIUM_RECORD_FIELDS {
                    map.insert(key.to_string(), Value::Null);
                }
            }
        }

        Ok(Self {
            record: fields,
            statuses: GatedStatuses::new(&classify(&record.measurements), entitled),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CategoryRow {
    pub score: u8,
    pub feedback: CategoryFeedback,
}

impl CategoryRow {
    pub const fn new(score: u8) -> Self {
        Self {
            score,
            feedback: CategoryFeedback::from_score(score),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CategoryRows {
    pub analysis: CategoryRow,
    pub motility: CategoryRow,
    pub concentration: CategoryRow,
    pub morphology: Option<CategoryRow>,
    pub dna_fragmentation: Option<CategoryRow>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RecentEntry {
    pub id: RecordId,
    pub timestamp_ms: u64,
    pub overall: OverallStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    pub record_count: usize,
    pub overall_score: u8,
    pub zone: Zone,
    pub trend: Trend,
    /// Absent when there are no records yet.
    pub categories: Option<CategoryRows>,
    pub recent: Vec<RecentEntry>,
}

impl DashboardSummary {
    /// `newest_first` must be the same snapshot `aggregate` and `trend` saw.
    pub fn build(
        newest_first: &[MeasurementRecord],
        aggregate: &Aggregate,
        trend: Trend,
        recent_limit: usize,
        entitled: bool,
    ) -> Self {
        let averages = &aggregate.averages;
        let categories = (!newest_first.is_empty()).then(|| CategoryRows {
            analysis: CategoryRow::new(averages.analysis),
            motility: CategoryRow::new(averages.motility),
            concentration: CategoryRow::new(averages.concentration),
            morphology: gate(entitled, Some(CategoryRow::new(averages.morphology))),
            dna_fragmentation: gate(entitled, averages.dna_fragmentation.map(CategoryRow::new)),
        });
        let recent = newest_first
            .iter()
            .take(recent_limit)
            .map(|record| RecentEntry {
                id: record.id,
                timestamp_ms: record.timestamp_ms,
                overall: classify(&record.measurements).overall,
            })
            .collect();

        Self {
            record_count: newest_first.len(),
            overall_score: aggregate.overall_score,
            zone: Zone::from_score(aggregate.overall_score),
            trend,
            categories,
            recent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GatedStatuses {
    pub analysis: AnalysisStatus,
    pub motility: MotilityStatus,
    pub concentration: ConcentrationStatus,
    pub morphology: Option<MorphologyStatus>,
    pub overall: OverallStatus,
}

impl GatedStatuses {
    pub fn new(report: &StatusReport, entitled: bool) -> Self {
        Self {
            analysis: report.analysis,
            motility: report.motility,
            concentration: report.concentration,
            morphology: gate(entitled, Some(report.morphology)),
            overall: report.overall,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub id: RecordId,
    pub timestamp_ms: u64,
    pub composite: u8,
    pub band: ScoreBand,
    pub categories: CategoryRows,
    pub statuses: GatedStatuses,
    pub dna_risk: Option<RiskEstimate>,
}

impl HistoryEntry {
    pub fn build(record: &MeasurementRecord, entitled: bool) -> Self {
        let scores = per_record_score(record);
        let composite = scores.composite();
        let statuses = classify(&record.measurements);

        Self {
            id: record.id,
            timestamp_ms: record.timestamp_ms,
            composite,
            band: ScoreBand::from_score(composite),
            categories: CategoryRows {
                analysis: CategoryRow::new(scores.analysis),
                motility: CategoryRow::new(scores.motility),
                concentration: CategoryRow::new(scores.concentration),
                morphology: gate(entitled, Some(CategoryRow::new(scores.morphology))),
                // Only shown for records that were actually estimated.
                dna_fragmentation: gate(
                    entitled,
                    record
                        .dna_fragmentation
                        .map(|_| CategoryRow::new(scores.dna_fragmentation)),
                ),
            },
            statuses: GatedStatuses::new(&statuses, entitled),
            dna_risk: gate(entitled, record.dna_fragmentation),
        }
    }
}

fn gate<T>(entitled: bool, value: Option<T>) -> Option<T> {
    value.filter(|_| entitled)
}
