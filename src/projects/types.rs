//! Types for projects

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::applications::Application;
use crate::validation::{check_required, FieldErrors};

/// Publication state of a project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    Draft,
    PendingApproval,
    Published,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Draft => "DRAFT",
            ProjectStatus::PendingApproval => "PENDING_APPROVAL",
            ProjectStatus::Published => "PUBLISHED",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Place a project or application is attached to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub postal_code: Option<i64>,
    #[serde(default)]
    pub department_id: Option<i64>,
}

/// A project proposed by an intervener
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub submission_date: Option<String>,
    pub status: ProjectStatus,
    #[serde(default)]
    pub total_budget: f64,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub location_id: Option<i64>,
    #[serde(default)]
    pub intervener_id: Option<i64>,
    #[serde(default)]
    pub winner_user_id: Option<i64>,
    #[serde(default)]
    pub creation_date: Option<String>,
    #[serde(default)]
    pub last_modification_date: Option<String>,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default)]
    pub intervener: Option<String>,
    #[serde(default)]
    pub winner_user: Option<serde_json::Value>,
    #[serde(default)]
    pub applications: Option<Vec<Application>>,
    #[serde(default)]
    pub location: Option<Location>,
}

impl Project {
    /// Only projects awaiting review can be approved or rejected
    pub fn is_reviewable(&self) -> bool {
        self.status == ProjectStatus::PendingApproval
    }
}

/// Body of a project creation call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub name: String,
    pub description: String,
    pub status: ProjectStatus,
    pub total_budget: f64,
    pub start_date: NaiveDate,
    pub submission_date: NaiveDate,
    pub location_id: i64,
}

impl CreateProjectRequest {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::default();
        check_required(&mut errors, "name", &self.name, "Project name is required");
        check_required(&mut errors, "description", &self.description, "Description is required");
        if !(self.total_budget.is_finite() && self.total_budget > 0.0) {
            errors.push("totalBudget", "Total budget must be greater than zero");
        }
        if self.submission_date > self.start_date {
            errors.push("submissionDate", "Submission date must not be after the start date");
        }
        if self.location_id <= 0 {
            errors.push("locationId", "Please select a location");
        }
        errors.into_result()
    }
}

/// Body of a project update call; absent fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_budget: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ProjectStatus>,
}
