use crate::report::StageKind;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Unknown stage '{0}'. Valid stages: metadata, deepfake, vision, logic")]
pub struct UnknownStage(pub String);

/// Subset of stages a caller asked for
///
/// Iteration always follows invocation order, whatever order the names were given in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnabledStages(BTreeSet<StageKind>);

impl EnabledStages {
    pub fn all() -> Self {
        Self(StageKind::ALL.into_iter().collect())
    }

    pub fn none() -> Self {
        Self(BTreeSet::new())
    }

    pub fn only(stages: impl IntoIterator<Item = StageKind>) -> Self {
        Self(stages.into_iter().collect())
    }

    pub fn contains(&self, stage: StageKind) -> bool {
        self.0.contains(&stage)
    }

    pub fn iter(&self) -> impl Iterator<Item = StageKind> + '_ {
        self.0.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// The jury used by the HTTP service: metadata, vision and logic
impl Default for EnabledStages {
    fn default() -> Self {
        Self::only([StageKind::Metadata, StageKind::Vision, StageKind::Logic])
    }
}

impl FromStr for EnabledStages {
    type Err = UnknownStage;

    /// Parses a comma separated list; `all` selects every stage
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut stages = BTreeSet::new();
        for name in s.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            if name.eq_ignore_ascii_case("all") {
                return Ok(Self::all());
            }
            let stage = StageKind::from_name(name).ok_or_else(|| UnknownStage(name.to_string()))?;
            stages.insert(stage);
        }
        Ok(Self(stages))
    }
}

impl fmt::Display for EnabledStages {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(|s| s.as_str()).collect();
        f.write_str(&names.join(","))
    }
}
