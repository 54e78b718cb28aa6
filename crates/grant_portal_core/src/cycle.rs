//! Application Cycle Types
//!
//! A cycle is one yearly grant round. Exactly one cycle is flagged current and
//! every other workflow gates on its stage.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::GrantType;
use crate::error::PortalError;
use crate::policy::StagePolicy;

/// Stage of the current cycle, in the order the admin UI presents them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CycleStage {
    #[serde(rename = "Applications Open")]
    ApplicationsOpen,
    #[serde(rename = "Applications Closed")]
    ApplicationsClosed,
    #[serde(rename = "Review")]
    Review,
    #[serde(rename = "Grading")]
    Grading,
    #[serde(rename = "Final Decisions")]
    FinalDecisions,
}

impl CycleStage {
    pub const ALL: [CycleStage; 5] = [
        Self::ApplicationsOpen,
        Self::ApplicationsClosed,
        Self::Review,
        Self::Grading,
        Self::FinalDecisions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ApplicationsOpen => "Applications Open",
            Self::ApplicationsClosed => "Applications Closed",
            Self::Review => "Review",
            Self::Grading => "Grading",
            Self::FinalDecisions => "Final Decisions",
        }
    }

    fn order(&self) -> u8 {
        match self {
            Self::ApplicationsOpen => 0,
            Self::ApplicationsClosed => 1,
            Self::Review => 2,
            Self::Grading => 3,
            Self::FinalDecisions => 4,
        }
    }

    /// Can the cycle move from this stage to `target` under `policy`?
    /// Staying on the same stage is always allowed.
    pub fn can_transition_to(&self, target: CycleStage, policy: StagePolicy) -> bool {
        match policy {
            StagePolicy::Unordered => true,
            StagePolicy::ForwardOnly => target.order() >= self.order(),
        }
    }
}

impl FromStr for CycleStage {
    type Err = PortalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|stage| stage.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| PortalError::InvalidInput(format!("unknown cycle stage '{s}'")))
    }
}

impl std::fmt::Display for CycleStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-track deadlines of a cycle. Unset deadlines never close anything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CycleDeadlines {
    pub research: Option<DateTime<Utc>>,
    pub nextgen: Option<DateTime<Utc>>,
    pub nonresearch: Option<DateTime<Utc>>,
    pub reviewer: Option<DateTime<Utc>>,
    pub post_grant_report: Option<DateTime<Utc>>,
}

/// Partial deadline update. Only provided dates are written; each lands on
/// 23:59 UTC of that day.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeadlineUpdate {
    #[serde(default)]
    pub research: Option<NaiveDate>,
    #[serde(default)]
    pub nextgen: Option<NaiveDate>,
    #[serde(default)]
    pub nonresearch: Option<NaiveDate>,
    #[serde(default)]
    pub reviewer: Option<NaiveDate>,
    #[serde(default)]
    pub post_grant_report: Option<NaiveDate>,
}

impl DeadlineUpdate {
    pub fn is_empty(&self) -> bool {
        self.research.is_none()
            && self.nextgen.is_none()
            && self.nonresearch.is_none()
            && self.reviewer.is_none()
            && self.post_grant_report.is_none()
    }
}

/// 23:59:00 UTC on `date`.
pub fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    let time = NaiveTime::from_hms_opt(23, 59, 0).unwrap_or(NaiveTime::MIN);
    date.and_time(time).and_utc()
}

/// Record of a stage change
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageTransition {
    pub from_stage: CycleStage,
    pub to_stage: CycleStage,
    pub transitioned_at: DateTime<Utc>,
    pub transitioned_by: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationCycle {
    pub cycle_id: Uuid,
    pub name: String,
    pub current: bool,
    pub stage: CycleStage,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub deadlines: CycleDeadlines,
    #[serde(default)]
    pub history: Vec<StageTransition>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ApplicationCycle {
    /// A fresh current cycle, open for applications.
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            cycle_id: Uuid::new_v4(),
            name: name.into(),
            current: true,
            stage: CycleStage::ApplicationsOpen,
            start_date: Some(now.date_naive()),
            end_date: None,
            deadlines: CycleDeadlines::default(),
            history: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Move to `to_stage`, recording the change. Returns `false` when the
    /// cycle is already in that stage.
    pub fn transition_to(
        &mut self,
        to_stage: CycleStage,
        by: Option<String>,
        policy: StagePolicy,
    ) -> Result<bool, PortalError> {
        if self.stage == to_stage {
            return Ok(false);
        }
        if !self.stage.can_transition_to(to_stage, policy) {
            return Err(PortalError::InvalidTransition {
                entity: "cycle stage",
                from: self.stage.to_string(),
                to: to_stage.to_string(),
            });
        }

        let now = Utc::now();
        let from_stage = std::mem::replace(&mut self.stage, to_stage);
        self.history.push(StageTransition {
            from_stage,
            to_stage,
            transitioned_at: now,
            transitioned_by: by,
        });
        self.updated_at = now;
        Ok(true)
    }

    pub fn apply_deadlines(&mut self, update: &DeadlineUpdate) {
        let slots = [
            (update.research, &mut self.deadlines.research),
            (update.nextgen, &mut self.deadlines.nextgen),
            (update.nonresearch, &mut self.deadlines.nonresearch),
            (update.reviewer, &mut self.deadlines.reviewer),
            (update.post_grant_report, &mut self.deadlines.post_grant_report),
        ];
        for (date, slot) in slots {
            if let Some(date) = date {
                *slot = Some(end_of_day(date));
            }
        }
        self.updated_at = Utc::now();
    }

    /// Submission deadline for a grant track.
    pub fn deadline_for(&self, grant_type: GrantType) -> Option<DateTime<Utc>> {
        match grant_type {
            GrantType::Research => self.deadlines.research,
            GrantType::Nextgen => self.deadlines.nextgen,
            GrantType::Nonresearch => self.deadlines.nonresearch,
        }
    }

    pub fn require_stage(&self, required: CycleStage) -> Result<(), PortalError> {
        if self.stage == required {
            Ok(())
        } else {
            Err(PortalError::StageClosed {
                current: self.stage.to_string(),
                required: required.to_string(),
            })
        }
    }
}

/// A change to the current cycle, applied by the store to the stored copy.
#[derive(Debug, Clone)]
pub enum CycleEdit {
    Stage {
        to: CycleStage,
        by: Option<String>,
        policy: StagePolicy,
    },
    Deadlines(DeadlineUpdate),
}

impl CycleEdit {
    /// Apply to `cycle`. Returns `false` when nothing changed.
    pub fn apply(&self, cycle: &mut ApplicationCycle) -> Result<bool, PortalError> {
        match self {
            Self::Stage { to, by, policy } => cycle.transition_to(*to, by.clone(), *policy),
            Self::Deadlines(update) => {
                cycle.apply_deadlines(update);
                Ok(true)
            }
        }
    }
}
