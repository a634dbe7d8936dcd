//! Scripted [`ProjectsApi`] for tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{ApiError, CardPage, Owner, OwnerKind, ProjectsApi};
use crate::board::{Card, Comment, FieldDef, Project};

#[derive(Debug, Default)]
pub struct FakeApi {
    pub owners: Vec<Owner>,
    pub projects: Vec<Project>,
    pub fields: Vec<FieldDef>,
    /// Pages keyed by the cursor that requests them.
    pub pages: HashMap<String, CardPage>,
    pub comments: Vec<Comment>,
    failing: HashSet<&'static str>,
    calls: Mutex<Vec<String>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call to `op` fail.
    pub fn failing(mut self, op: &'static str) -> Self {
        self.failing.insert(op);
        self
    }

    pub fn with_page(mut self, cursor: &str, cards: Vec<Card>, next: &str, has_more: bool) -> Self {
        self.pages.insert(
            cursor.to_string(),
            CardPage {
                cards,
                next_cursor: next.to_string(),
                has_more,
            },
        );
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, op: &'static str, detail: String) -> Result<(), ApiError> {
        self.calls.lock().unwrap().push(format!("{op} {detail}").trim_end().to_string());
        if self.failing.contains(op) {
            return Err(ApiError::GraphQl(format!("{op} failed")));
        }
        Ok(())
    }
}

pub fn owner(login: &str, kind: OwnerKind) -> Owner {
    Owner {
        login: login.into(),
        id: format!("id_{login}"),
        kind,
    }
}

pub fn project(number: u32, title: &str) -> Project {
    Project {
        id: format!("proj_{number}"),
        number,
        title: title.into(),
        owner: "octo".into(),
    }
}

/// `n` cards named `{prefix}{i}`, all in `group`.
pub fn cards(prefix: &str, n: usize, group: &str) -> Vec<Card> {
    (0..n)
        .map(|i| {
            let mut card = Card::new(format!("{prefix}{i}"), format!("Card {prefix}{i}"));
            card.group_value = group.into();
            card
        })
        .collect()
}

#[async_trait]
impl ProjectsApi for FakeApi {
    async fn viewer_and_orgs(&self) -> Result<Vec<Owner>, ApiError> {
        self.record("viewer_and_orgs", String::new())?;
        Ok(self.owners.clone())
    }

    async fn resolve_owner(&self, login: &str) -> Result<Owner, ApiError> {
        self.record("resolve_owner", login.to_string())?;
        self.owners
            .iter()
            .find(|o| o.login == login)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("owner {login:?}")))
    }

    async fn list_projects(&self, owner: &Owner) -> Result<Vec<Project>, ApiError> {
        self.record("list_projects", owner.login.clone())?;
        Ok(self.projects.clone())
    }

    async fn project_fields(&self, project_id: &str) -> Result<Vec<FieldDef>, ApiError> {
        self.record("project_fields", project_id.to_string())?;
        Ok(self.fields.clone())
    }

    async fn card_page(
        &self,
        _project_id: &str,
        group_field: &str,
        cursor: &str,
        page_size: u32,
    ) -> Result<CardPage, ApiError> {
        self.record("card_page", format!("{group_field} {cursor:?} {page_size}"))?;
        Ok(self.pages.get(cursor).cloned().unwrap_or_default())
    }

    async fn comments(&self, repo: &str, number: u64) -> Result<Vec<Comment>, ApiError> {
        self.record("comments", format!("{repo}#{number}"))?;
        Ok(self.comments.clone())
    }

    async fn update_card_field(
        &self,
        _project_id: &str,
        item_id: &str,
        field_id: &str,
        option_id: &str,
    ) -> Result<(), ApiError> {
        self.record("update_card_field", format!("{item_id} {field_id} {option_id}"))
    }

    async fn add_comment(&self, repo: &str, number: u64, body: &str) -> Result<(), ApiError> {
        self.record("add_comment", format!("{repo}#{number} {body}"))
    }
}
