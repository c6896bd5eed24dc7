//! Application review endpoints

mod types;

use log::{debug, info};

use crate::envelope::{Contents, Envelope, Page};
use crate::error::Result;
use crate::gateway::{ApiClient, RequestOptions};

pub use types::*;

const APPLICATIONS_PATH: &str = "/api/v1/applications";

/// Client for `/api/v1/applications`
#[derive(Debug, Clone)]
pub struct ApplicationsClient {
    api: ApiClient,
}

impl ApplicationsClient {
    pub(crate) fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn list(&self) -> Result<Page<Application>> {
        let page = self
            .api
            .get::<Envelope<Page<Application>>>(APPLICATIONS_PATH, RequestOptions::new())
            .await?
            .into_inner();
        Ok(page)
    }

    pub async fn get(&self, id: i64) -> Result<Application> {
        let path = format!("{}/{}", APPLICATIONS_PATH, id);
        let application = self
            .api
            .get::<Envelope<Application>>(&path, RequestOptions::new())
            .await?
            .into_inner();
        Ok(application)
    }

    /// Applications submitted against one project
    pub async fn by_project(&self, project_id: i64) -> Result<Vec<Application>> {
        let path = format!("{}/project/{}", APPLICATIONS_PATH, project_id);
        let found = self
            .api
            .get::<Envelope<Contents<Application>>>(&path, RequestOptions::new())
            .await?
            .into_inner();
        Ok(found.content)
    }

    pub async fn approve(&self, id: i64) -> Result<Application> {
        let application = self.review(id, "approve").await?;
        info!("Approved application {}", id);
        Ok(application)
    }

    pub async fn reject(&self, id: i64) -> Result<Application> {
        let application = self.review(id, "reject").await?;
        info!("Rejected application {}", id);
        Ok(application)
    }

    async fn review(&self, id: i64, action: &str) -> Result<Application> {
        let path = format!("{}/{}/{}", APPLICATIONS_PATH, id, action);
        let response = self
            .api
            .put::<Envelope<Application>, ()>(&path, None, RequestOptions::new())
            .await?;
        if let Some(message) = response.message() {
            debug!("Review of application {}: {}", id, message);
        }
        Ok(response.into_inner())
    }

    pub async fn search(&self, query: &str) -> Result<Vec<Application>> {
        let path = format!("{}/search", APPLICATIONS_PATH);
        let found = self
            .api
            .get::<Envelope<Contents<Application>>>(
                &path,
                RequestOptions::new().query("query", query),
            )
            .await?
            .into_inner();
        Ok(found.content)
    }
}
