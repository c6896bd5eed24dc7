//! Public city directory used by the location pickers

use serde::{Deserialize, Serialize};

use crate::envelope::{Envelope, Page};
use crate::error::Result;
use crate::gateway::{ApiClient, RequestOptions};

const CITIES_PATH: &str = "/api/v1/public/cities";

pub const DEFAULT_PAGE: u32 = 0;
pub const DEFAULT_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct City {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub postal_code: Option<i64>,
    #[serde(default)]
    pub department_id: Option<i64>,
    #[serde(default)]
    pub creation_date: Option<String>,
    #[serde(default)]
    pub last_modification_date: Option<String>,
    #[serde(default)]
    pub is_deleted: bool,
}

/// Client for the public city listing; no sign-in is needed
#[derive(Debug, Clone)]
pub struct CitiesClient {
    api: ApiClient,
}

impl CitiesClient {
    pub(crate) fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// One page of cities; `None` falls back to page 0 of 100 entries
    pub async fn list(&self, page: Option<u32>, size: Option<u32>) -> Result<Page<City>> {
        let options = RequestOptions::new()
            .anonymous()
            .query("page", page.unwrap_or(DEFAULT_PAGE))
            .query("size", size.unwrap_or(DEFAULT_PAGE_SIZE));
        let page = self
            .api
            .get::<Envelope<Page<City>>>(CITIES_PATH, options)
            .await?
            .into_inner();
        Ok(page)
    }
}
