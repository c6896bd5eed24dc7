//! Project endpoints and the project creation wizard

mod types;
mod wizard;

use log::info;

use crate::envelope::{Contents, Envelope, Page};
use crate::error::Result;
use crate::gateway::{ApiClient, RequestOptions};

pub use types::*;
pub use wizard::*;

const PROJECTS_PATH: &str = "/api/v1/projects";

/// Client for `/api/v1/projects`
#[derive(Debug, Clone)]
pub struct ProjectsClient {
    api: ApiClient,
}

impl ProjectsClient {
    pub(crate) fn new(api: ApiClient) -> Self {
        Self { api }
    }

    fn path(id: i64) -> String {
        format!("{}/{}", PROJECTS_PATH, id)
    }

    /// First page of the projects visible to the signed-in account,
    /// with the backend's default page size
    pub async fn list(&self) -> Result<Page<Project>> {
        let page = self
            .api
            .get::<Envelope<Page<Project>>>(PROJECTS_PATH, RequestOptions::new())
            .await?
            .into_inner();
        Ok(page)
    }

    pub async fn list_page(&self, page: u32, size: u32) -> Result<Page<Project>> {
        let options = RequestOptions::new().query("page", page).query("size", size);
        let page = self
            .api
            .get::<Envelope<Page<Project>>>(PROJECTS_PATH, options)
            .await?
            .into_inner();
        Ok(page)
    }

    pub async fn get(&self, id: i64) -> Result<Project> {
        let project = self
            .api
            .get::<Envelope<Project>>(&Self::path(id), RequestOptions::new())
            .await?
            .into_inner();
        Ok(project)
    }

    /// Create a project; the request is validated before anything is sent
    pub async fn create(&self, request: &CreateProjectRequest) -> Result<Project> {
        request.validate()?;
        let project = self
            .api
            .post::<Envelope<Project>, _>(PROJECTS_PATH, request)
            .await?
            .into_inner();
        info!("Created project {} ({})", project.id, project.status);
        Ok(project)
    }

    pub async fn update(&self, id: i64, request: &UpdateProjectRequest) -> Result<Project> {
        let project = self
            .api
            .put::<Envelope<Project>, _>(&Self::path(id), Some(request), RequestOptions::new())
            .await?
            .into_inner();
        Ok(project)
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        self.api
            .delete::<Option<serde_json::Value>>(&Self::path(id))
            .await?;
        info!("Deleted project {}", id);
        Ok(())
    }

    /// Move a project to `status`, e.g. publish a pending project
    pub async fn change_status(&self, id: i64, status: ProjectStatus) -> Result<Project> {
        let path = format!("{}/status", Self::path(id));
        let options = RequestOptions::new().query("status", status);
        let project = self
            .api
            .put::<Envelope<Project>, ()>(&path, None, options)
            .await?
            .into_inner();
        Ok(project)
    }

    /// Full-text search over project names and descriptions
    pub async fn search(&self, query: &str) -> Result<Vec<Project>> {
        let path = format!("{}/search", PROJECTS_PATH);
        let options = RequestOptions::new().query("query", query);
        let found = self
            .api
            .get::<Envelope<Contents<Project>>>(&path, options)
            .await?
            .into_inner();
        Ok(found.content)
    }
}
