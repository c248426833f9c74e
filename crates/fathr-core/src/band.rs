use std::fmt;

use serde::{Serialize, Serializer};

/// Label for one record's composite score on the history screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScoreBand {
    Poor,
    Fair,
    Good,
    Excellent,
}

impl ScoreBand {
    pub const fn from_score(score: u8) -> Self {
        match score {
            0..=49 => Self::Poor,
            50..=69 => Self::Fair,
            70..=84 => Self::Good,
            _ => Self::Excellent,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Poor => "Poor",
            Self::Fair => "Fair",
            Self::Good => "Good",
            Self::Excellent => "Excellent",
        }
    }
}

/// Dashboard reading of the overall score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Zone {
    FertileZone,
    NeedsImprovement,
    BelowAverage,
}

impl Zone {
    pub const fn from_score(score: u8) -> Self {
        match score {
            80.. => Self::FertileZone,
            60..=79 => Self::NeedsImprovement,
            _ => Self::BelowAverage,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::FertileZone => "In the Fertile Zone",
            Self::NeedsImprovement => "Needs Improvement",
            Self::BelowAverage => "Below Average",
        }
    }
}

/// Feedback shown next to a single category score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CategoryFeedback {
    Optimal,
    NeedsBoosting,
    TakeAction,
}

impl CategoryFeedback {
    pub const fn from_score(score: u8) -> Self {
        match score {
            80.. => Self::Optimal,
            60..=79 => Self::NeedsBoosting,
            _ => Self::TakeAction,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Optimal => "Optimal",
            Self::NeedsBoosting => "Needs Boosting",
            Self::TakeAction => "Low – Take Action",
        }
    }
}

macro_rules! label_serde {
    ($($ty:ty),+) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.label())
                }
            }

            impl Serialize for $ty {
                fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                    serializer.serialize_str(self.label())
                }
            }
        )+
    };
}

label_serde!(ScoreBand, Zone, CategoryFeedback);
