pub mod age;
pub mod field_select;
pub mod mutation;
pub mod pagination;
pub mod store;

use chrono::{DateTime, Utc};

use crate::github::ApiError;

/// Column key for cards whose grouping value is empty.
pub const NO_GROUP_KEY: &str = "_no_status_";

/// Errors raised by the board engine.
///
/// Everything except `Network` and `NoSelectableFields` is local and
/// recoverable: the caller picks a different action.
#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    #[error("no project set")]
    NoProject,
    #[error("no grouping field set")]
    NoGroupField,
    #[error("card not found: {0}")]
    CardNotFound(String),
    #[error("invalid option id: {0}")]
    InvalidOption(String),
    #[error("no rollback state available")]
    NoRollbackState,
    #[error("no single-select fields found in project")]
    NoSelectableFields,
    #[error("a move of card {0} is still in flight")]
    MoveInFlight(String),
    #[error(transparent)]
    Network(#[from] ApiError),
}

/// A GitHub Projects v2 board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub id: String,
    pub number: u32,
    pub title: String,
    pub owner: String,
}

/// Data type of a project field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    SingleSelect,
    Text,
    Number,
    Date,
    Iteration,
    /// A data type this client does not know about yet.
    Other(String),
}

impl FieldType {
    /// Parse the GraphQL `dataType` enum value.
    pub fn from_api(s: &str) -> Self {
        match s {
            "SINGLE_SELECT" => Self::SingleSelect,
            "TEXT" => Self::Text,
            "NUMBER" => Self::Number,
            "DATE" => Self::Date,
            "ITERATION" => Self::Iteration,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::SingleSelect => "SINGLE_SELECT",
            Self::Text => "TEXT",
            Self::Number => "NUMBER",
            Self::Date => "DATE",
            Self::Iteration => "ITERATION",
            Self::Other(s) => s,
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One option of a single-select field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldOption {
    pub id: String,
    pub name: String,
    pub color: String,
    pub order: usize,
}

/// A project field definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub id: String,
    pub name: String,
    pub field_type: FieldType,
    pub options: Vec<FieldOption>,
    pub order: usize,
}

impl FieldDef {
    pub fn is_single_select(&self) -> bool {
        self.field_type == FieldType::SingleSelect
    }

    pub fn has_option(&self, option_id: &str) -> bool {
        self.options.iter().any(|o| o.id == option_id)
    }
}

/// What a project item points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CardContent {
    Issue,
    PullRequest,
    Draft,
    /// Content the viewer cannot see, or a type this client does not know.
    #[default]
    Private,
}

impl CardContent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Issue => "Issue",
            Self::PullRequest => "Pull request",
            Self::Draft => "Draft",
            Self::Private => "Private",
        }
    }

    /// Only issues and pull requests have a comment thread.
    pub fn has_comments(&self) -> bool {
        matches!(self, Self::Issue | Self::PullRequest)
    }
}

/// A single project item, normalized from the API's content union.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Card {
    pub item_id: String,
    pub content: CardContent,
    pub title: String,
    pub url: String,
    /// `owner/name` of the repository, empty for drafts and private items.
    pub repo: String,
    pub number: u64,
    /// Option id of the grouping field, empty when unset.
    pub group_value: String,
    pub assignees: Vec<String>,
    pub body: String,
    pub state: String,
    pub labels: Vec<String>,
    pub author: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl Card {
    pub fn new(item_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            title: title.into(),
            ..Self::default()
        }
    }

    /// Short right-aligned marker shown next to the title on the board.
    pub fn suffix(&self) -> Option<String> {
        match self.content {
            CardContent::Issue | CardContent::PullRequest if self.number > 0 => {
                Some(format!("#{}", self.number))
            }
            CardContent::Issue | CardContent::PullRequest => None,
            CardContent::Draft => Some("(draft)".to_string()),
            CardContent::Private => Some("(pvt)".to_string()),
        }
    }

    /// Case-insensitive assignee check.
    pub fn is_assigned_to(&self, login: &str) -> bool {
        self.assignees.iter().any(|a| a.eq_ignore_ascii_case(login))
    }

    /// Split `repo` into `(owner, name)`.
    pub fn repo_parts(&self) -> Option<(&str, &str)> {
        let (owner, name) = self.repo.split_once('/')?;
        if owner.is_empty() || name.is_empty() {
            return None;
        }
        Some((owner, name))
    }
}

/// A comment on an issue or pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub id: String,
    /// `None` when the author's account was deleted.
    pub author: Option<String>,
    pub body: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}
