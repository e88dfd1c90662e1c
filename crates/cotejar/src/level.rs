//! Distortion levels, pair keys, and agent identifiers.

use crate::result::{CotejarError, CotejarResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Highest valid distortion level
pub const MAX_LEVEL: u8 = 10;

/// Number of levels in the standard 0..=10 scheme
pub const LEVEL_COUNT: usize = MAX_LEVEL as usize + 1;

/// Subfield delimiter inside CSV cells and symbol-map keys
pub const SUBFIELD_DELIM: char = '#';

/// Delimiter between agent kind and agent name
pub const AGENT_DELIM: char = '-';

/// A distortion level in 0..=10. Level 0 is the untransformed baseline.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Level(u8);

impl Level {
    /// Create a level, validating the 0..=10 range.
    ///
    /// # Errors
    ///
    /// Fails with [`CotejarError::InvalidLevel`] outside the range.
    pub fn new(value: u32) -> CotejarResult<Self> {
        if value > u32::from(MAX_LEVEL) {
            return Err(CotejarError::InvalidLevel { level: value });
        }
        Ok(Self(value as u8))
    }

    /// The raw level number
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }

    /// The untransformed baseline level
    #[must_use]
    pub const fn baseline() -> Self {
        Self(0)
    }

    /// All levels 0..=10 in ascending order
    pub fn full_range() -> impl Iterator<Item = Self> {
        (0..=MAX_LEVEL).map(Self)
    }

    /// Zero-padded filename stem for this level, e.g. `level_03`
    #[must_use]
    pub fn file_stem(self) -> String {
        format!("level_{:02}", self.0)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Level {
    type Err = CotejarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: u32 = s.trim().parse().map_err(|_| CotejarError::Parse {
            message: format!("'{s}' is not a level number"),
        })?;
        Self::new(value)
    }
}

/// The canonical "true" ordering: levels ascending, most similar first.
///
/// `n` is the ordering length; 11 for the standard scheme, 10 for the
/// legacy symbol scheme. Any `n <= LEVEL_COUNT` is accepted.
#[must_use]
pub fn standard_order(n: usize) -> Vec<Level> {
    Level::full_range().take(n).collect()
}

/// Identifies one (category, transformation) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PairKey {
    /// Category (named baseline image)
    pub category: String,
    /// Transformation family name
    pub transformation: String,
}

impl PairKey {
    /// Create a new pair key
    #[must_use]
    pub fn new(category: impl Into<String>, transformation: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            transformation: transformation.into(),
        }
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{SUBFIELD_DELIM}{}", self.category, self.transformation)
    }
}

impl FromStr for PairKey {
    type Err = CotejarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(SUBFIELD_DELIM) {
            Some((category, transformation))
                if !category.is_empty() && !transformation.is_empty() =>
            {
                Ok(Self::new(category, transformation))
            }
            _ => Err(CotejarError::Parse {
                message: format!("'{s}' is not a '<category>{SUBFIELD_DELIM}<transformation>' key"),
            }),
        }
    }
}

/// The source of a candidate ordering: a metric, or a human rater.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AgentId {
    /// A registered computational metric
    Metric(String),
    /// A human rater identifier
    Human(String),
}

impl AgentId {
    /// A metric agent
    #[must_use]
    pub fn metric(name: impl Into<String>) -> Self {
        Self::Metric(name.into())
    }

    /// A human-rater agent
    #[must_use]
    pub fn human(name: impl Into<String>) -> Self {
        Self::Human(name.into())
    }

    /// The bare agent name without its kind prefix
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Metric(name) | Self::Human(name) => name,
        }
    }

    /// The agent kind as it appears in data paths ("metrics" / "humans")
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Metric(_) => "metrics",
            Self::Human(_) => "humans",
        }
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{AGENT_DELIM}{}", self.kind(), self.name())
    }
}

impl FromStr for AgentId {
    type Err = CotejarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(AGENT_DELIM) {
            Some(("metrics", name)) if !name.is_empty() => Ok(Self::Metric(name.to_string())),
            Some(("humans", name)) if !name.is_empty() => Ok(Self::Human(name.to_string())),
            _ => Err(CotejarError::Parse {
                message: format!("'{s}' is not a '(metrics|humans){AGENT_DELIM}<name>' agent id"),
            }),
        }
    }
}
