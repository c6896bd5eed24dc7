//! Response envelopes shared by every resource endpoint

use serde::{Deserialize, Serialize};

/// Standard backend wrapper around a payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    pub data: T,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub status: Option<u16>,
}

/// Accepts a payload either wrapped in an [`ApiResponse`] or bare
///
/// The auth endpoints are not consistent about the wrapper.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Envelope<T> {
    Wrapped(ApiResponse<T>),
    Bare(T),
}

impl<T> Envelope<T> {
    pub fn into_inner(self) -> T {
        match self {
            Envelope::Wrapped(response) => response.data,
            Envelope::Bare(data) => data,
        }
    }

    /// The backend's `message`, when the payload was wrapped
    pub fn message(&self) -> Option<&str> {
        match self {
            Envelope::Wrapped(response) => response.message.as_deref(),
            Envelope::Bare(_) => None,
        }
    }
}

/// One page of a paginated listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total_elements: u64,
    pub total_pages: u32,
    pub first: bool,
    pub last: bool,
    pub has_next: bool,
    pub has_previous: bool,
}

impl<T> Page<T> {
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Index of the following page, if there is one
    pub fn next_page(&self) -> Option<u32> {
        self.has_next.then_some(self.page + 1)
    }
}

/// Search endpoints return only the `content` part of a page
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Contents<T> {
    #[serde(default = "Vec::new")]
    pub content: Vec<T>,
}
