use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::status::SolvedConfigStatus;

/// A demand expressed on a plugin or a service.
///
/// Variants are declared weakest first so the derived `Ord` is the demand
/// strength: `Optional < OptionalTryStart < MustExist < MustExistTryStart <
/// MustExistAndRun`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunningRequirement {
    #[default]
    Optional,
    OptionalTryStart,
    MustExist,
    MustExistTryStart,
    MustExistAndRun,
}

impl RunningRequirement {
    /// Max-wins merge of two demands on the same target
    pub fn merge(self, other: Self) -> Self {
        self.max(other)
    }

    /// Merge any number of demands; `None` for an empty input
    pub fn merge_all<I>(requirements: I) -> Option<Self>
    where
        I: IntoIterator<Item = Self>,
    {
        requirements.into_iter().reduce(Self::merge)
    }

    /// The demand that flows through a reference of strength `cap`
    pub fn capped_by(self, cap: Self) -> Self {
        self.min(cap)
    }

    /// `MustExist`, `MustExistTryStart` or `MustExistAndRun`
    pub fn is_must_exist(self) -> bool {
        self >= RunningRequirement::MustExist
    }

    /// Whether this demand resolves to a running plugin
    pub fn requires_running(self) -> bool {
        self >= RunningRequirement::MustExistTryStart
    }

    /// The solved status this demand asks for on its own
    pub fn to_solved(self) -> SolvedConfigStatus {
        if self.requires_running() {
            SolvedConfigStatus::MustExistAndRun
        } else {
            SolvedConfigStatus::Optional
        }
    }

    /// The demand a solved configuration status contributes, if any
    pub fn from_solved(status: SolvedConfigStatus) -> Option<Self> {
        match status {
            SolvedConfigStatus::Disabled => None,
            SolvedConfigStatus::Optional => Some(RunningRequirement::Optional),
            SolvedConfigStatus::MustExistAndRun => Some(RunningRequirement::MustExistAndRun),
        }
    }
}

impl fmt::Display for RunningRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunningRequirement::Optional => "optional",
            RunningRequirement::OptionalTryStart => "optional_try_start",
            RunningRequirement::MustExist => "must_exist",
            RunningRequirement::MustExistTryStart => "must_exist_try_start",
            RunningRequirement::MustExistAndRun => "must_exist_and_run",
        };
        f.write_str(name)
    }
}
