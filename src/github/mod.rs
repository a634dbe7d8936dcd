//! GitHub Projects v2 access.
//!
//! The board engine only sees [`ProjectsApi`]; [`client::GithubClient`] is the
//! GraphQL implementation used at runtime.

pub mod auth;
pub mod client;
#[cfg(test)]
pub mod fake;
pub mod queries;

use async_trait::async_trait;

use crate::board::{Card, Comment, FieldDef, Project};

/// Any failure talking to GitHub, including auth and not-found conditions.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("GitHub returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("GitHub rejected the query: {0}")]
    GraphQl(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("unexpected response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerKind {
    User,
    Organization,
}

impl OwnerKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Organization => "org",
        }
    }
}

/// A user or organization that can own projects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner {
    pub login: String,
    pub id: String,
    pub kind: OwnerKind,
}

/// One page of project items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardPage {
    pub cards: Vec<Card>,
    pub next_cursor: String,
    pub has_more: bool,
}

/// The remote operations the board needs. Every call yields exactly one
/// success or failure.
#[async_trait]
pub trait ProjectsApi: Send + Sync {
    /// The authenticated user first, then their organizations.
    async fn viewer_and_orgs(&self) -> Result<Vec<Owner>, ApiError>;

    async fn resolve_owner(&self, login: &str) -> Result<Owner, ApiError>;

    async fn list_projects(&self, owner: &Owner) -> Result<Vec<Project>, ApiError>;

    /// Field definitions in project order, options in configured order.
    async fn project_fields(&self, project_id: &str) -> Result<Vec<FieldDef>, ApiError>;

    /// Items with their value for the field named `group_field`.
    async fn card_page(
        &self,
        project_id: &str,
        group_field: &str,
        cursor: &str,
        page_size: u32,
    ) -> Result<CardPage, ApiError>;

    async fn comments(&self, repo: &str, number: u64) -> Result<Vec<Comment>, ApiError>;

    /// Set a single-select value; an empty `option_id` clears it.
    async fn update_card_field(
        &self,
        project_id: &str,
        item_id: &str,
        field_id: &str,
        option_id: &str,
    ) -> Result<(), ApiError>;

    async fn add_comment(&self, repo: &str, number: u64, body: &str) -> Result<(), ApiError>;
}
