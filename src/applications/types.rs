use serde::{Deserialize, Serialize};

use crate::projects::ProjectStatus;

/// Review state of an application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    Draft,
    Approved,
    Rejected,
}

/// Kind of supporting document a project asks for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentType {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub project_id: Option<i64>,
}

/// A supporting document attached to an application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSubmitted {
    pub id: i64,
    pub path: String,
    #[serde(default)]
    pub document_type_id: Option<i64>,
    #[serde(default)]
    pub application_id: Option<i64>,
    #[serde(default)]
    pub document_type: Option<DocumentType>,
}

/// The account that submitted an application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicantSummary {
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
}

impl ApplicantSummary {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub status: Option<ProjectStatus>,
}

/// An application submitted against a project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: i64,
    pub status: ApplicationStatus,
    #[serde(default)]
    pub date_application: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub motivation: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub budget: f64,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub location_id: Option<i64>,
    /// Display name of the location
    #[serde(default)]
    pub location: Option<String>,
    /// Wizard step the applicant stopped at
    #[serde(default)]
    pub current_step: u32,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub project_id: Option<i64>,
    #[serde(default)]
    pub documents_submitted: Vec<DocumentSubmitted>,
    #[serde(default)]
    pub user: Option<ApplicantSummary>,
    #[serde(default)]
    pub project: Option<ProjectSummary>,
}

impl Application {
    /// Drafts are the applications still awaiting a decision
    pub fn is_pending(&self) -> bool {
        self.status == ApplicationStatus::Draft
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_application_from_backend() {
        let application: Application = serde_json::from_value(json!({
            "id": 4,
            "dateApplication": "2025-02-01",
            "motivation": "We run three schools nearby",
            "status": "DRAFT",
            "title": "Wells for Kolda",
            "budget": 1200.5,
            "locationId": 3,
            "location": "Ottawa",
            "currentStep": 2,
            "userId": 9,
            "projectId": 12,
            "user": {
                "id": 9,
                "firstName": "Marie",
                "lastName": "Dupont",
                "email": "m@example.org"
            },
            "project": { "id": 12, "name": "Clean water" },
            "documentsSubmitted": [{
                "id": 1,
                "path": "/uploads/rib.pdf",
                "documentTypeId": 5,
                "applicationId": 4,
                "documentType": { "id": 5, "name": "Bank details", "projectId": 12 }
            }]
        }))
        .unwrap();

        assert!(application.is_pending());
        assert_eq!(application.current_step, 2);
        assert_eq!(application.user.unwrap().display_name(), "Marie Dupont");
        assert_eq!(application.project.unwrap().status, None);
        let document = &application.documents_submitted[0];
        assert_eq!(document.document_type.as_ref().unwrap().name, "Bank details");
    }

    #[test]
    fn test_application_status_wire_names() {
        let status: ApplicationStatus = serde_json::from_value(json!("REJECTED")).unwrap();
        assert_eq!(status, ApplicationStatus::Rejected);
        assert_eq!(serde_json::to_value(ApplicationStatus::Approved).unwrap(), json!("APPROVED"));
    }
}
