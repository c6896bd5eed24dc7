//! Multi-step project creation wizard

use chrono::NaiveDate;

use super::types::{CreateProjectRequest, ProjectStatus};
use crate::validation::{check_required, FieldErrors};

/// Steps of the wizard, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardStep {
    Basics,
    Scope,
    Budget,
    Geography,
    Review,
}

impl WizardStep {
    pub const ALL: [WizardStep; 5] = [
        WizardStep::Basics,
        WizardStep::Scope,
        WizardStep::Budget,
        WizardStep::Geography,
        WizardStep::Review,
    ];

    pub fn key(self) -> &'static str {
        match self {
            WizardStep::Basics => "basics",
            WizardStep::Scope => "scope",
            WizardStep::Budget => "budget",
            WizardStep::Geography => "geography",
            WizardStep::Review => "review",
        }
    }
}

/// Fields collected across the wizard steps
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectDraft {
    pub name: String,
    pub start_date: Option<NaiveDate>,
    pub submission_date: Option<NaiveDate>,
    pub description: String,
    pub total_budget: Option<f64>,
    pub location_id: Option<i64>,
}

/// Step-by-step project form
///
/// `next` only advances once the current step validates; `previous`
/// never validates. `submit` checks every step again, since earlier
/// steps can be edited after moving on.
#[derive(Debug, Clone, Default)]
pub struct ProjectWizard {
    step: usize,
    pub draft: ProjectDraft,
}

impl ProjectWizard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&self) -> WizardStep {
        WizardStep::ALL[self.step]
    }

    /// Completion ratio shown by the progress bar, in `(0, 1]`
    pub fn progress(&self) -> f64 {
        (self.step + 1) as f64 / WizardStep::ALL.len() as f64
    }

    pub fn is_last_step(&self) -> bool {
        self.step + 1 == WizardStep::ALL.len()
    }

    /// Validate the current step and move forward
    pub fn next(&mut self) -> Result<WizardStep, FieldErrors> {
        validate_step(&self.draft, self.step())?;
        if !self.is_last_step() {
            self.step += 1;
        }
        Ok(self.step())
    }

    pub fn previous(&mut self) -> WizardStep {
        self.step = self.step.saturating_sub(1);
        self.step()
    }

    /// Validate all steps and build a request awaiting approval
    pub fn submit(&self) -> Result<CreateProjectRequest, FieldErrors> {
        let mut errors = FieldErrors::default();
        for step in WizardStep::ALL {
            if let Err(step_errors) = validate_step(&self.draft, step) {
                for e in step_errors.iter() {
                    errors.push(&e.field, e.message.clone());
                }
            }
        }
        errors.into_result()?;

        let request = self.build(ProjectStatus::PendingApproval)?;
        request.validate()?;
        Ok(request)
    }

    /// Build a draft request; only the Basics step has to be complete
    pub fn save_draft(&self) -> Result<CreateProjectRequest, FieldErrors> {
        validate_step(&self.draft, WizardStep::Basics)?;
        self.build(ProjectStatus::Draft)
    }

    fn build(&self, status: ProjectStatus) -> Result<CreateProjectRequest, FieldErrors> {
        let draft = &self.draft;
        let mut errors = FieldErrors::default();

        let (Some(start_date), Some(submission_date)) = (draft.start_date, draft.submission_date)
        else {
            errors.push("startDate", "Start and submission dates are required");
            return Err(errors);
        };

        Ok(CreateProjectRequest {
            name: draft.name.trim().to_string(),
            description: draft.description.trim().to_string(),
            status,
            total_budget: draft.total_budget.unwrap_or_default(),
            start_date,
            submission_date,
            location_id: draft.location_id.unwrap_or_default(),
        })
    }
}

fn validate_step(draft: &ProjectDraft, step: WizardStep) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::default();
    match step {
        WizardStep::Basics => {
            check_required(&mut errors, "name", &draft.name, "Project name is required");
            if draft.start_date.is_none() {
                errors.push("startDate", "Start date is required");
            }
            if draft.submission_date.is_none() {
                errors.push("submissionDate", "Submission date is required");
            }
            if let (Some(start), Some(submission)) = (draft.start_date, draft.submission_date) {
                if submission > start {
                    errors.push(
                        "submissionDate",
                        "Submission date must not be after the start date",
                    );
                }
            }
        }
        WizardStep::Scope => {
            check_required(
                &mut errors,
                "description",
                &draft.description,
                "Description is required",
            );
        }
        WizardStep::Budget => match draft.total_budget {
            Some(budget) if budget.is_finite() && budget > 0.0 => {}
            Some(_) => errors.push("totalBudget", "Total budget must be greater than zero"),
            None => errors.push("totalBudget", "Total budget is required"),
        },
        WizardStep::Geography => {
            if !draft.location_id.is_some_and(|id| id > 0) {
                errors.push("locationId", "Please select a location");
            }
        }
        WizardStep::Review => {}
    }
    errors.into_result()
}
