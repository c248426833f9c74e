use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::RecordError;
use crate::record::Measurements;
use crate::status::{ph_in_range, MIN_MORPHOLOGY_RATE, MIN_SEMEN_QUANTITY_ML, MIN_TOTAL_MOBILITY};

pub const MAX_LEUKOCYTES: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskCategory {
    Low,
    Moderate,
    High,
}

impl RiskCategory {
    pub const fn from_percent(percent: u8) -> Self {
        if percent < 20 {
            Self::Low
        } else if percent < 40 {
            Self::Moderate
        } else {
            Self::High
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Moderate => "Moderate",
            Self::High => "High",
        }
    }
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Heuristic DNA fragmentation proxy. Not a clinical measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RiskEstimate {
    percent: u8,
    category: RiskCategory,
}

impl RiskEstimate {
    pub fn from_percent(percent: u8) -> Result<Self, RecordError> {
        if percent > 100 {
            return Err(RecordError::RiskOutOfRange(percent));
        }
        Ok(Self {
            percent,
            category: RiskCategory::from_percent(percent),
        })
    }

    pub const fn percent(&self) -> u8 {
        self.percent
    }

    pub const fn category(&self) -> RiskCategory {
        self.category
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskFlag {
    LowMotility,
    AbnormalMorphology,
    HighLeukocytes,
    LowSemenVolume,
    AbnormalPh,
}

impl RiskFlag {
    pub const ALL: [Self; 5] = [
        Self::LowMotility,
        Self::AbnormalMorphology,
        Self::HighLeukocytes,
        Self::LowSemenVolume,
        Self::AbnormalPh,
    ];

    /// Fraction of the full risk this flag contributes; the five sum to 1.0.
    pub const fn weight(self) -> f64 {
        match self {
            Self::LowMotility => 0.30,
            Self::AbnormalMorphology => 0.25,
            Self::HighLeukocytes => 0.20,
            Self::LowSemenVolume => 0.15,
            Self::AbnormalPh => 0.10,
        }
    }

    pub fn is_triggered(self, m: &Measurements) -> bool {
        match self {
            Self::LowMotility => m.total_mobility < MIN_TOTAL_MOBILITY,
            Self::AbnormalMorphology => m.morphology_rate < MIN_MORPHOLOGY_RATE,
            Self::HighLeukocytes => m.leukocytes > MAX_LEUKOCYTES,
            Self::LowSemenVolume => m.semen_quantity < MIN_SEMEN_QUANTITY_ML,
            Self::AbnormalPh => !ph_in_range(m.ph),
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::LowMotility => "low motility",
            Self::AbnormalMorphology => "abnormal morphology",
            Self::HighLeukocytes => "high leukocytes",
            Self::LowSemenVolume => "low semen volume",
            Self::AbnormalPh => "abnormal pH",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RiskAssessment {
    pub estimate: RiskEstimate,
    pub flags: Vec<RiskFlag>,
}

/// Sums the triggered weights in `RiskFlag::ALL` order and truncates the
/// percentage. The float sum is kept as is, so 0.30 + 0.15 lands on 44.
pub fn estimate_risk(m: &Measurements) -> RiskAssessment {
    let flags: Vec<RiskFlag> = RiskFlag::ALL
        .into_iter()
        .filter(|flag| flag.is_triggered(m))
        .collect();
    let total: f64 = flags.iter().map(|flag| flag.weight()).sum();
    let percent = truncate_percent(total);

    RiskAssessment {
        estimate: RiskEstimate {
            percent,
            category: RiskCategory::from_percent(percent),
        },
        flags,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn truncate_percent(fraction: f64) -> u8 {
    (fraction * 100.0).clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::record::fixtures::baseline;

    fn with_flags(flags: &[RiskFlag]) -> Measurements {
        let mut m = baseline();
        for flag in flags {
            match flag {
                RiskFlag::LowMotility => m.total_mobility = 30.0,
                RiskFlag::AbnormalMorphology => m.morphology_rate = 2.0,
                RiskFlag::HighLeukocytes => m.leukocytes = 1.5,
                RiskFlag::LowSemenVolume => m.semen_quantity = 1.0,
                RiskFlag::AbnormalPh => m.ph = 8.4,
            }
        }
        m
    }

    #[test]
    fn clean_sample_has_no_risk() {
        let out = estimate_risk(&baseline());
        assert!(out.flags.is_empty());
        assert_eq!(out.estimate.percent(), 0);
        assert_eq!(out.estimate.category(), RiskCategory::Low);
    }

    #[test]
    fn motility_and_morphology_flags_give_high_risk() {
        let out = estimate_risk(&with_flags(&[
            RiskFlag::LowMotility,
            RiskFlag::AbnormalMorphology,
        ]));
        assert_eq!(out.estimate.percent(), 55);
        assert_eq!(out.estimate.category(), RiskCategory::High);
        assert_eq!(
            out.flags,
            vec![RiskFlag::LowMotility, RiskFlag::AbnormalMorphology]
        );
    }

    #[test]
    fn float_sum_is_truncated() {
        let motility_volume = estimate_risk(&with_flags(&[
            RiskFlag::LowMotility,
            RiskFlag::LowSemenVolume,
        ]));
        assert_eq!(motility_volume.estimate.percent(), 44);
        assert_eq!(motility_volume.estimate.category(), RiskCategory::High);

        let motility_volume_ph = estimate_risk(&with_flags(&[
            RiskFlag::LowMotility,
            RiskFlag::LowSemenVolume,
            RiskFlag::AbnormalPh,
        ]));
        assert_eq!(motility_volume_ph.estimate.percent(), 54);

        let leukocytes_volume_ph = estimate_risk(&with_flags(&[
            RiskFlag::HighLeukocytes,
            RiskFlag::LowSemenVolume,
            RiskFlag::AbnormalPh,
        ]));
        assert_eq!(leukocytes_volume_ph.estimate.percent(), 44);

        let volume_ph = estimate_risk(&with_flags(&[
            RiskFlag::LowSemenVolume,
            RiskFlag::AbnormalPh,
        ]));
        assert_eq!(volume_ph.estimate.percent(), 25);

        let all = estimate_risk(&with_flags(&RiskFlag::ALL));
        assert_eq!(all.estimate.percent(), 100);
    }

    #[test]
    fn category_boundaries() {
        assert_eq!(RiskCategory::from_percent(19), RiskCategory::Low);
        assert_eq!(RiskCategory::from_percent(20), RiskCategory::Moderate);
        assert_eq!(RiskCategory::from_percent(39), RiskCategory::Moderate);
        assert_eq!(RiskCategory::from_percent(40), RiskCategory::High);
    }

    #[test]
    fn leukocyte_threshold_is_exclusive() {
        let mut m = baseline();
        m.leukocytes = MAX_LEUKOCYTES;
        assert!(estimate_risk(&m).flags.is_empty());
        m.ph = 7.1;
        assert_eq!(estimate_risk(&m).flags, vec![RiskFlag::AbnormalPh]);
    }

    #[test]
    fn estimate_rejects_percent_above_hundred() {
        assert_eq!(
            RiskEstimate::from_percent(101),
            Err(RecordError::RiskOutOfRange(101))
        );
    }

    proptest! {
        #[test]
        fn adding_a_flag_never_lowers_risk(
            base in proptest::collection::vec(0usize..5, 0..5),
            extra in 0usize..5,
        ) {
            let chosen: Vec<RiskFlag> = base.iter().filter_map(|&i| RiskFlag::ALL.get(i).copied()).collect();
            let mut extended = chosen.clone();
            if let Some(flag) = RiskFlag::ALL.get(extra) {
                extended.push(*flag);
            }

            let before = estimate_risk(&with_flags(&chosen)).estimate.percent();
            let after = estimate_risk(&with_flags(&extended)).estimate.percent();
            prop_assert!(after >= before, "{} < {}", after, before);
        }
    }
}
