use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::queries::{self, Envelope};
use super::{ApiError, CardPage, Owner, OwnerKind, ProjectsApi};
use crate::board::{Comment, FieldDef, Project};

const USER_AGENT: &str = concat!("ghboard/", env!("CARGO_PKG_VERSION"));
const PROJECTS_PER_OWNER: u32 = 100;

/// GraphQL client for the GitHub v4 API.
#[derive(Debug, Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    api_url: String,
    token: String,
}

impl GithubClient {
    pub fn new(api_url: impl Into<String>, token: impl Into<String>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            http,
            api_url: api_url.into(),
            token: token.into(),
        })
    }

    /// Post one GraphQL document and return the raw envelope.
    async fn post<T: DeserializeOwned>(&self, query: &str, variables: Value) -> Result<Envelope<T>, ApiError> {
        let resp = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.token)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            warn!(status = status.as_u16(), "GraphQL request failed");
            return Err(ApiError::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(serde_json::from_str(&text)?)
    }

    /// Post one GraphQL document and decode its `data` member. Any reported
    /// error fails the call.
    async fn graphql<T: DeserializeOwned>(&self, query: &str, variables: Value) -> Result<T, ApiError> {
        let envelope: Envelope<T> = self.post(query, variables).await?;
        if !envelope.errors.is_empty() {
            let message = envelope
                .errors
                .into_iter()
                .map(|e| e.message)
                .collect::<Vec<_>>()
                .join("; ");
            warn!(%message, "GraphQL errors");
            return Err(ApiError::GraphQl(message));
        }
        envelope
            .data
            .ok_or_else(|| ApiError::GraphQl("response carried no data".into()))
    }

    async fn subject_id(&self, repo: &str, number: u64) -> Result<String, ApiError> {
        let (owner, name) = split_repo(repo)?;
        let data: queries::NodeIdData = self
            .graphql(
                queries::ISSUE_NODE_ID,
                json!({ "owner": owner, "repo": name, "number": number }),
            )
            .await?;
        data.into_id()
            .ok_or_else(|| ApiError::NotFound(format!("{repo}#{number}")))
    }
}

fn split_repo(repo: &str) -> Result<(&str, &str), ApiError> {
    match repo.split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() => Ok((owner, name)),
        _ => Err(ApiError::NotFound(format!("repository {repo:?}"))),
    }
}

#[async_trait]
impl ProjectsApi for GithubClient {
    async fn viewer_and_orgs(&self) -> Result<Vec<Owner>, ApiError> {
        let data: queries::ViewerData = self.graphql(queries::VIEWER_AND_ORGS, json!({})).await?;
        let owners = data.into_owners();
        debug!(count = owners.len(), "fetched owners");
        Ok(owners)
    }

    async fn resolve_owner(&self, login: &str) -> Result<Owner, ApiError> {
        // One of the two lookups always reports "could not resolve", so the
        // partial data is what counts here.
        let envelope: Envelope<queries::ResolveOwnerData> = self
            .post(queries::RESOLVE_OWNER, json!({ "login": login }))
            .await?;
        envelope
            .data
            .and_then(|data| data.into_owner(login))
            .ok_or_else(|| ApiError::NotFound(format!("owner {login:?}")))
    }

    async fn list_projects(&self, owner: &Owner) -> Result<Vec<Project>, ApiError> {
        let query = match owner.kind {
            OwnerKind::Organization => queries::ORG_PROJECTS,
            OwnerKind::User => queries::USER_PROJECTS,
        };
        let data: queries::ProjectsData = self
            .graphql(query, json!({ "id": owner.id, "first": PROJECTS_PER_OWNER }))
            .await?;
        let projects = data.into_projects(&owner.login);
        debug!(owner = %owner.login, count = projects.len(), "fetched projects");
        Ok(projects)
    }

    async fn project_fields(&self, project_id: &str) -> Result<Vec<FieldDef>, ApiError> {
        let data: queries::FieldsData = self
            .graphql(queries::PROJECT_FIELDS, json!({ "projectId": project_id }))
            .await?;
        Ok(data.into_fields())
    }

    async fn card_page(
        &self,
        project_id: &str,
        group_field: &str,
        cursor: &str,
        page_size: u32,
    ) -> Result<CardPage, ApiError> {
        let after = if cursor.is_empty() { Value::Null } else { json!(cursor) };
        let data: queries::ItemsData = self
            .graphql(
                queries::PROJECT_ITEMS,
                json!({
                    "projectId": project_id,
                    "first": page_size,
                    "after": after,
                    "fieldName": group_field,
                }),
            )
            .await?;
        let page = data
            .into_page()
            .ok_or_else(|| ApiError::NotFound(format!("project {project_id}")))?;
        debug!(
            cards = page.cards.len(),
            has_more = page.has_more,
            "fetched card page"
        );
        Ok(page)
    }

    async fn comments(&self, repo: &str, number: u64) -> Result<Vec<Comment>, ApiError> {
        let (owner, name) = split_repo(repo)?;
        let data: queries::CommentsData = self
            .graphql(
                queries::ISSUE_COMMENTS,
                json!({ "owner": owner, "repo": name, "number": number }),
            )
            .await?;
        data.into_comments()
            .ok_or_else(|| ApiError::NotFound(format!("{repo}#{number}")))
    }

    async fn update_card_field(
        &self,
        project_id: &str,
        item_id: &str,
        field_id: &str,
        option_id: &str,
    ) -> Result<(), ApiError> {
        if option_id.is_empty() {
            let _: Value = self
                .graphql(
                    queries::CLEAR_ITEM_FIELD,
                    json!({ "projectId": project_id, "itemId": item_id, "fieldId": field_id }),
                )
                .await?;
        } else {
            let _: Value = self
                .graphql(
                    queries::UPDATE_ITEM_FIELD,
                    json!({
                        "projectId": project_id,
                        "itemId": item_id,
                        "fieldId": field_id,
                        "value": { "singleSelectOptionId": option_id },
                    }),
                )
                .await?;
        }
        debug!(item_id, option_id, "updated card field");
        Ok(())
    }

    async fn add_comment(&self, repo: &str, number: u64, body: &str) -> Result<(), ApiError> {
        let subject_id = self.subject_id(repo, number).await?;
        let _: Value = self
            .graphql(
                queries::ADD_COMMENT,
                json!({ "subjectId": subject_id, "body": body }),
            )
            .await?;
        debug!(repo, number, "posted comment");
        Ok(())
    }
}
