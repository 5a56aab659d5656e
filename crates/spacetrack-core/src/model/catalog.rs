//! Scoring reference data: single actions and multi-step checklists.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// A named, fixed-point scoring event the user can trigger repeatedly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub id: Uuid,
    pub space_id: Uuid,
    pub name: String,
    /// Base score, always positive.
    pub points: u32,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAction {
    pub space_id: Uuid,
    pub name: String,
    pub points: u32,
    #[serde(default)]
    pub description: String,
}

impl NewAction {
    pub fn validate(&self) -> Result<(), ValidationError> {
        super::require_text("name", &self.name)?;
        if self.points == 0 {
            return Err(ValidationError::InvalidValue {
                field: "points".to_string(),
                message: "must be positive".to_string(),
            });
        }
        Ok(())
    }

    pub fn into_action(self) -> Action {
        Action {
            id: Uuid::new_v4(),
            space_id: self.space_id,
            name: self.name.trim().to_string(),
            points: self.points,
            description: self.description,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionStep {
    pub id: Uuid,
    pub name: String,
    pub completed: bool,
}

/// An ordered checklist whose steps are completed one at a time.
///
/// Steps below `current_step_index` are complete, the rest are not, and
/// the index only moves forward. `current_step_index == steps.len()`
/// means the checklist is finished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiStepAction {
    pub id: Uuid,
    pub space_id: Uuid,
    pub name: String,
    pub points_per_step: u32,
    pub steps: Vec<ActionStep>,
    pub current_step_index: usize,
}

impl MultiStepAction {
    pub fn is_complete(&self) -> bool {
        self.current_step_index >= self.steps.len()
    }

    pub fn next_step(&self) -> Option<&ActionStep> {
        self.steps.get(self.current_step_index)
    }

    /// Complete the next step and return its index.
    pub fn advance(&mut self) -> Result<usize, ValidationError> {
        let index = self.current_step_index;
        let step = self
            .steps
            .get_mut(index)
            .ok_or_else(|| ValidationError::MultiStepComplete {
                name: self.name.clone(),
            })?;
        step.completed = true;
        self.current_step_index = index + 1;
        Ok(index)
    }

    /// Check the index/completed-flags invariant.
    pub fn is_consistent(&self) -> bool {
        self.current_step_index <= self.steps.len()
            && self
                .steps
                .iter()
                .enumerate()
                .all(|(i, step)| step.completed == (i < self.current_step_index))
    }

    /// Ledger label for a completed step.
    pub fn step_label(&self, index: usize) -> String {
        match self.steps.get(index) {
            Some(step) => format!("{}: {}", self.name, step.name),
            None => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMultiStepAction {
    pub space_id: Uuid,
    pub name: String,
    pub points_per_step: u32,
    pub step_names: Vec<String>,
}

impl NewMultiStepAction {
    pub fn validate(&self) -> Result<(), ValidationError> {
        super::require_text("name", &self.name)?;
        if self.step_names.is_empty() {
            return Err(ValidationError::EmptyCollection("steps".to_string()));
        }
        for name in &self.step_names {
            super::require_text("step name", name)?;
        }
        Ok(())
    }

    pub fn into_action(self) -> MultiStepAction {
        MultiStepAction {
            id: Uuid::new_v4(),
            space_id: self.space_id,
            name: self.name.trim().to_string(),
            points_per_step: self.points_per_step,
            steps: self
                .step_names
                .into_iter()
                .map(|name| ActionStep {
                    id: Uuid::new_v4(),
                    name: name.trim().to_string(),
                    completed: false,
                })
                .collect(),
            current_step_index: 0,
        }
    }
}
