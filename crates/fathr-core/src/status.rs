use std::fmt;

use serde::{Serialize, Serializer};

use crate::record::{Agglutination, Appearance, Liquefaction, Measurements};

pub const PH_MIN: f64 = 7.2;
pub const PH_MAX: f64 = 8.0;
pub const MIN_SEMEN_QUANTITY_ML: f64 = 1.5;
pub const MIN_TOTAL_MOBILITY: f64 = 40.0;
pub const MIN_PROGRESSIVE_MOBILITY: f64 = 32.0;
pub const MIN_SPERM_CONCENTRATION: f64 = 15.0;
pub const MIN_LIVE_SPERMATOZOA: f64 = 58.0;
pub const MIN_MORPHOLOGY_RATE: f64 = 4.0;

pub fn ph_in_range(ph: f64) -> bool {
    (PH_MIN..=PH_MAX).contains(&ph)
}

macro_rules! status_label {
    ($name:ident { $pass:ident => $pass_label:literal, $fail:ident => $fail_label:literal }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $pass,
            $fail,
        }

        impl $name {
            const fn from_pass(pass: bool) -> Self {
                if pass {
                    Self::$pass
                } else {
                    Self::$fail
                }
            }

            pub const fn is_pass(self) -> bool {
                matches!(self, Self::$pass)
            }

            pub const fn label(self) -> &'static str {
                match self {
                    Self::$pass => $pass_label,
                    Self::$fail => $fail_label,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.label())
            }
        }
    };
}

status_label!(AnalysisStatus { Typical => "Typical", Atypical => "Atypical" });
status_label!(MotilityStatus { Active => "Active", LessActive => "Less Active" });
status_label!(ConcentrationStatus { Typical => "Typical", Lower => "Lower" });
status_label!(MorphologyStatus { Typical => "Typical", Varied => "Varied" });
status_label!(OverallStatus { Balanced => "Balanced", Review => "Review" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub analysis: AnalysisStatus,
    pub motility: MotilityStatus,
    pub concentration: ConcentrationStatus,
    pub morphology: MorphologyStatus,
    pub overall: OverallStatus,
}

pub fn classify_analysis(m: &Measurements) -> AnalysisStatus {
    AnalysisStatus::from_pass(
        m.appearance == Appearance::Normal
            && m.liquefaction == Liquefaction::Normal
            && ph_in_range(m.ph)
            && m.semen_quantity >= MIN_SEMEN_QUANTITY_ML,
    )
}

pub fn classify_motility(m: &Measurements) -> MotilityStatus {
    MotilityStatus::from_pass(
        m.total_mobility >= MIN_TOTAL_MOBILITY
            && m.progressive_mobility >= MIN_PROGRESSIVE_MOBILITY
            && m.agglutination == Agglutination::Mild,
    )
}

pub fn classify_concentration(m: &Measurements) -> ConcentrationStatus {
    ConcentrationStatus::from_pass(
        m.sperm_concentration >= MIN_SPERM_CONCENTRATION
            && m.live_spermatozoa >= MIN_LIVE_SPERMATOZOA,
    )
}

pub fn classify_morphology(m: &Measurements) -> MorphologyStatus {
    MorphologyStatus::from_pass(m.morphology_rate >= MIN_MORPHOLOGY_RATE)
}

/// Labels one test. Values are taken as given; range checks belong to
/// intake.
pub fn classify(m: &Measurements) -> StatusReport {
    let analysis = classify_analysis(m);
    let motility = classify_motility(m);
    let concentration = classify_concentration(m);
    let morphology = classify_morphology(m);
    let overall = OverallStatus::from_pass(
        analysis.is_pass() && motility.is_pass() && concentration.is_pass() && morphology.is_pass(),
    );

    StatusReport {
        analysis,
        motility,
        concentration,
        morphology,
        overall,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::fixtures::baseline;

    #[test]
    fn baseline_is_balanced() {
        let report = classify(&baseline());
        assert_eq!(report.analysis, AnalysisStatus::Typical);
        assert_eq!(report.motility, MotilityStatus::Active);
        assert_eq!(report.concentration, ConcentrationStatus::Typical);
        assert_eq!(report.morphology, MorphologyStatus::Typical);
        assert_eq!(report.overall, OverallStatus::Balanced);
    }

    #[test]
    fn analysis_typical_for_reference_sample() {
        let mut m = baseline();
        m.ph = 7.5;
        m.semen_quantity = 2.0;
        m.total_mobility = 5.0;
        m.morphology_rate = 0.0;
        assert_eq!(classify(&m).analysis, AnalysisStatus::Typical);
    }

    #[test]
    fn acidic_ph_is_atypical_regardless_of_other_fields() {
        let mut m = baseline();
        m.ph = 6.9;
        m.semen_quantity = 9.0;
        let report = classify(&m);
        assert_eq!(report.analysis, AnalysisStatus::Atypical);
        assert_eq!(report.overall, OverallStatus::Review);
    }

    #[test]
    fn thresholds_are_inclusive_on_the_pass_side() {
        let mut m = baseline();
        m.ph = PH_MIN;
        m.semen_quantity = MIN_SEMEN_QUANTITY_ML;
        m.total_mobility = MIN_TOTAL_MOBILITY;
        m.progressive_mobility = MIN_PROGRESSIVE_MOBILITY;
        m.sperm_concentration = MIN_SPERM_CONCENTRATION;
        m.live_spermatozoa = MIN_LIVE_SPERMATOZOA;
        m.morphology_rate = MIN_MORPHOLOGY_RATE;
        assert_eq!(classify(&m).overall, OverallStatus::Balanced);

        m.ph = PH_MAX;
        assert_eq!(classify(&m).analysis, AnalysisStatus::Typical);
        m.ph = 8.1;
        assert_eq!(classify(&m).analysis, AnalysisStatus::Atypical);
    }

    #[test]
    fn any_non_mild_agglutination_is_less_active() {
        let mut m = baseline();
        m.agglutination = Agglutination::Moderate;
        assert_eq!(classify(&m).motility, MotilityStatus::LessActive);
        m.agglutination = Agglutination::Severe;
        assert_eq!(classify(&m).motility.label(), "Less Active");
    }

    #[test]
    fn single_failing_category_forces_review() {
        let mut m = baseline();
        m.live_spermatozoa = 57.9;
        let report = classify(&m);
        assert_eq!(report.concentration, ConcentrationStatus::Lower);
        assert_eq!(report.overall, OverallStatus::Review);

        let mut m = baseline();
        m.morphology_rate = 3.0;
        assert_eq!(classify(&m).morphology, MorphologyStatus::Varied);
    }

    #[test]
    fn labels_serialize_as_display_text() {
        let value = serde_json::to_value(classify(&baseline())).expect("serialize");
        assert_eq!(value["motility"], "Active");
        assert_eq!(value["overall"], "Balanced");
    }
}
