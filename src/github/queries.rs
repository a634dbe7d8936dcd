//! GraphQL documents and the response shapes they decode into.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

use super::{CardPage, Owner, OwnerKind};
use crate::board::{Card, CardContent, Comment, FieldDef, FieldOption, FieldType, Project};

pub const VIEWER_AND_ORGS: &str = r#"
query {
  viewer {
    login
    id
    organizations(first: 100) { nodes { login id } }
  }
}"#;

pub const RESOLVE_OWNER: &str = r#"
query($login: String!) {
  organization(login: $login) { id }
  user(login: $login) { id }
}"#;

pub const ORG_PROJECTS: &str = r#"
query($id: ID!, $first: Int!) {
  node(id: $id) {
    ... on Organization { projectsV2(first: $first) { nodes { id number title } } }
  }
}"#;

pub const USER_PROJECTS: &str = r#"
query($id: ID!, $first: Int!) {
  node(id: $id) {
    ... on User { projectsV2(first: $first) { nodes { id number title } } }
  }
}"#;

pub const PROJECT_FIELDS: &str = r#"
query($projectId: ID!) {
  node(id: $projectId) {
    ... on ProjectV2 {
      fields(first: 50) {
        nodes {
          ... on ProjectV2Field { id name dataType }
          ... on ProjectV2SingleSelectField { id name dataType options { id name color } }
          ... on ProjectV2IterationField { id name dataType }
        }
      }
    }
  }
}"#;

pub const PROJECT_ITEMS: &str = r#"
query($projectId: ID!, $first: Int!, $after: String, $fieldName: String!) {
  node(id: $projectId) {
    ... on ProjectV2 {
      items(first: $first, after: $after) {
        pageInfo { hasNextPage endCursor }
        nodes {
          id
          fieldValueByName(name: $fieldName) {
            ... on ProjectV2ItemFieldSingleSelectValue { optionId }
          }
          content {
            __typename
            ... on Issue {
              title body url number state createdAt
              author { login }
              repository { nameWithOwner }
              assignees(first: 10) { nodes { login } }
              labels(first: 10) { nodes { name } }
            }
            ... on PullRequest {
              title body url number state createdAt
              author { login }
              repository { nameWithOwner }
              assignees(first: 10) { nodes { login } }
              labels(first: 10) { nodes { name } }
            }
            ... on DraftIssue {
              title body createdAt
              assignees(first: 10) { nodes { login } }
            }
          }
        }
      }
    }
  }
}"#;

pub const ISSUE_COMMENTS: &str = r#"
query($owner: String!, $repo: String!, $number: Int!) {
  repository(owner: $owner, name: $repo) {
    issueOrPullRequest(number: $number) {
      ... on Issue { comments(first: 100) { nodes { id author { login } body createdAt updatedAt } } }
      ... on PullRequest { comments(first: 100) { nodes { id author { login } body createdAt updatedAt } } }
    }
  }
}"#;

pub const ISSUE_NODE_ID: &str = r#"
query($owner: String!, $repo: String!, $number: Int!) {
  repository(owner: $owner, name: $repo) {
    issueOrPullRequest(number: $number) {
      ... on Issue { id }
      ... on PullRequest { id }
    }
  }
}"#;

pub const UPDATE_ITEM_FIELD: &str = r#"
mutation($projectId: ID!, $itemId: ID!, $fieldId: ID!, $value: ProjectV2FieldValue!) {
  updateProjectV2ItemFieldValue(
    input: { projectId: $projectId, itemId: $itemId, fieldId: $fieldId, value: $value }
  ) { projectV2Item { id } }
}"#;

pub const CLEAR_ITEM_FIELD: &str = r#"
mutation($projectId: ID!, $itemId: ID!, $fieldId: ID!) {
  clearProjectV2ItemFieldValue(
    input: { projectId: $projectId, itemId: $itemId, fieldId: $fieldId }
  ) { projectV2Item { id } }
}"#;

pub const ADD_COMMENT: &str = r#"
mutation($subjectId: ID!, $body: String!) {
  addComment(input: { subjectId: $subjectId, body: $body }) { commentEdge { node { id } } }
}"#;

/// Standard GraphQL response envelope.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
pub struct GraphQlError {
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Nodes<T> {
    #[serde(default = "Vec::new", deserialize_with = "skip_null_nodes")]
    pub nodes: Vec<T>,
}

/// Connection `nodes` lists are nullable per element and as a whole; nulls
/// are dropped.
fn skip_null_nodes<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let nodes: Option<Vec<Option<T>>> = Option::deserialize(deserializer)?;
    Ok(nodes.unwrap_or_default().into_iter().flatten().collect())
}

#[derive(Debug, Deserialize)]
pub struct Login {
    pub login: String,
}

#[derive(Debug, Deserialize)]
pub struct Id {
    pub id: String,
}

// -- viewer ---------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ViewerData {
    pub viewer: Viewer,
}

#[derive(Debug, Deserialize)]
pub struct Viewer {
    pub login: String,
    pub id: String,
    pub organizations: Nodes<OrgNode>,
}

#[derive(Debug, Deserialize)]
pub struct OrgNode {
    pub login: String,
    pub id: String,
}

impl ViewerData {
    pub fn into_owners(self) -> Vec<Owner> {
        let mut owners = Vec::with_capacity(1 + self.viewer.organizations.nodes.len());
        owners.push(Owner {
            login: self.viewer.login,
            id: self.viewer.id,
            kind: OwnerKind::User,
        });
        owners.extend(self.viewer.organizations.nodes.into_iter().map(|org| Owner {
            login: org.login,
            id: org.id,
            kind: OwnerKind::Organization,
        }));
        owners
    }
}

// -- owner ----------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ResolveOwnerData {
    pub organization: Option<Id>,
    pub user: Option<Id>,
}

impl ResolveOwnerData {
    /// Organizations take precedence over users with the same login.
    pub fn into_owner(self, login: &str) -> Option<Owner> {
        if let Some(org) = self.organization {
            return Some(Owner {
                login: login.to_string(),
                id: org.id,
                kind: OwnerKind::Organization,
            });
        }
        self.user.map(|user| Owner {
            login: login.to_string(),
            id: user.id,
            kind: OwnerKind::User,
        })
    }
}

// -- projects -------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ProjectsData {
    pub node: Option<ProjectsNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectsNode {
    pub projects_v2: Option<Nodes<ProjectNode>>,
}

#[derive(Debug, Deserialize)]
pub struct ProjectNode {
    pub id: String,
    pub number: u32,
    pub title: String,
}

impl ProjectsData {
    pub fn into_projects(self, owner_login: &str) -> Vec<Project> {
        self.node
            .and_then(|n| n.projects_v2)
            .map(|p| p.nodes)
            .unwrap_or_default()
            .into_iter()
            .map(|p| Project {
                id: p.id,
                number: p.number,
                title: p.title,
                owner: owner_login.to_string(),
            })
            .collect()
    }
}

// -- fields ---------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct FieldsData {
    pub node: Option<FieldsNode>,
}

#[derive(Debug, Deserialize)]
pub struct FieldsNode {
    pub fields: Nodes<FieldNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldNode {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub data_type: String,
    #[serde(default)]
    pub options: Vec<OptionNode>,
}

#[derive(Debug, Deserialize)]
pub struct OptionNode {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub color: String,
}

impl FieldsData {
    pub fn into_fields(self) -> Vec<FieldDef> {
        let nodes = self.node.map(|n| n.fields.nodes).unwrap_or_default();
        nodes
            .into_iter()
            // Fragments that matched nothing decode as empty objects
            .filter(|n| !n.id.is_empty())
            .enumerate()
            .map(|(order, node)| {
                let field_type = FieldType::from_api(&node.data_type);
                let options = if field_type == FieldType::SingleSelect {
                    node.options
                        .into_iter()
                        .enumerate()
                        .map(|(i, o)| FieldOption {
                            id: o.id,
                            name: o.name,
                            color: o.color,
                            order: i,
                        })
                        .collect()
                } else {
                    Vec::new()
                };
                FieldDef {
                    id: node.id,
                    name: node.name,
                    field_type,
                    options,
                    order,
                }
            })
            .collect()
    }
}

// -- items ----------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ItemsData {
    pub node: Option<ItemsNode>,
}

#[derive(Debug, Deserialize)]
pub struct ItemsNode {
    pub items: ItemConnection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemConnection {
    pub page_info: PageInfo,
    #[serde(default, deserialize_with = "skip_null_nodes")]
    pub nodes: Vec<ItemNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemNode {
    pub id: String,
    pub field_value_by_name: Option<FieldValue>,
    pub content: Option<ItemContent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldValue {
    pub option_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemContent {
    #[serde(rename = "__typename")]
    pub typename: String,
    #[serde(default)]
    pub title: String,
    pub body: Option<String>,
    pub url: Option<String>,
    pub number: Option<u64>,
    pub state: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub author: Option<Login>,
    pub repository: Option<Repository>,
    pub assignees: Option<Nodes<Login>>,
    pub labels: Option<Nodes<Label>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    pub name_with_owner: String,
}

#[derive(Debug, Deserialize)]
pub struct Label {
    pub name: String,
}

impl ItemNode {
    pub fn into_card(self) -> Card {
        let mut card = Card::new(self.id, "");
        card.group_value = self
            .field_value_by_name
            .and_then(|v| v.option_id)
            .unwrap_or_default();

        let Some(content) = self.content else {
            card.content = CardContent::Private;
            card.title = "(private item)".into();
            return card;
        };

        card.content = match content.typename.as_str() {
            "Issue" => CardContent::Issue,
            "PullRequest" => CardContent::PullRequest,
            "DraftIssue" => CardContent::Draft,
            _ => {
                card.content = CardContent::Private;
                card.title = "(unknown item type)".into();
                return card;
            }
        };

        card.title = content.title;
        card.body = content.body.unwrap_or_default();
        card.url = content.url.unwrap_or_default();
        card.number = content.number.unwrap_or(0);
        card.state = content.state.unwrap_or_default();
        card.created_at = content.created_at;
        card.author = content.author.map(|a| a.login).unwrap_or_default();
        card.repo = content
            .repository
            .map(|r| r.name_with_owner)
            .unwrap_or_default();
        card.assignees = content
            .assignees
            .map(|a| a.nodes.into_iter().map(|l| l.login).collect())
            .unwrap_or_default();
        card.labels = content
            .labels
            .map(|l| l.nodes.into_iter().map(|l| l.name).collect())
            .unwrap_or_default();
        card
    }
}

impl ItemsData {
    pub fn into_page(self) -> Option<CardPage> {
        let items = self.node?.items;
        Some(CardPage {
            cards: items.nodes.into_iter().map(ItemNode::into_card).collect(),
            next_cursor: items.page_info.end_cursor.unwrap_or_default(),
            has_more: items.page_info.has_next_page,
        })
    }
}

// -- comments -------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CommentsData {
    pub repository: Option<CommentsRepository>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentsRepository {
    pub issue_or_pull_request: Option<CommentsSubject>,
}

#[derive(Debug, Deserialize)]
pub struct CommentsSubject {
    pub comments: Option<Nodes<CommentNode>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentNode {
    pub id: String,
    pub author: Option<Login>,
    #[serde(default)]
    pub body: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl CommentsData {
    /// `None` when the repository or issue does not exist.
    pub fn into_comments(self) -> Option<Vec<Comment>> {
        let subject = self.repository?.issue_or_pull_request?;
        Some(
            subject
                .comments
                .map(|c| c.nodes)
                .unwrap_or_default()
                .into_iter()
                .map(|c| Comment {
                    id: c.id,
                    author: c.author.map(|a| a.login),
                    body: c.body,
                    created_at: c.created_at,
                    updated_at: c.updated_at,
                })
                .collect(),
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct NodeIdData {
    pub repository: Option<NodeIdRepository>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeIdRepository {
    pub issue_or_pull_request: Option<Id>,
}

impl NodeIdData {
    pub fn into_id(self) -> Option<String> {
        self.repository?.issue_or_pull_request.map(|n| n.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn viewer_comes_first() {
        let data: ViewerData = serde_json::from_value(json!({
            "viewer": {
                "login": "octocat",
                "id": "U1",
                "organizations": { "nodes": [{ "login": "github", "id": "O1" }] }
            }
        }))
        .unwrap();
        let owners = data.into_owners();
        assert_eq!(owners.len(), 2);
        assert_eq!(owners[0].kind, OwnerKind::User);
        assert_eq!(owners[1].login, "github");
        assert_eq!(owners[1].kind, OwnerKind::Organization);
    }

    #[test]
    fn resolve_prefers_organization() {
        let data: ResolveOwnerData = serde_json::from_value(json!({
            "organization": { "id": "O1" },
            "user": { "id": "U1" }
        }))
        .unwrap();
        let owner = data.into_owner("acme").unwrap();
        assert_eq!(owner.kind, OwnerKind::Organization);
        assert_eq!(owner.id, "O1");

        let missing: ResolveOwnerData =
            serde_json::from_value(json!({ "organization": null, "user": null })).unwrap();
        assert!(missing.into_owner("ghost").is_none());
    }

    #[test]
    fn projects_carry_owner_login() {
        let data: ProjectsData = serde_json::from_value(json!({
            "node": { "projectsV2": { "nodes": [
                { "id": "P1", "number": 3, "title": "Roadmap" }
            ] } }
        }))
        .unwrap();
        let projects = data.into_projects("acme");
        assert_eq!(projects[0].owner, "acme");
        assert_eq!(projects[0].number, 3);
    }

    #[test]
    fn fields_keep_order_and_skip_empty_fragments() {
        let data: FieldsData = serde_json::from_value(json!({
            "node": { "fields": { "nodes": [
                { "id": "F1", "name": "Title", "dataType": "TITLE" },
                {},
                { "id": "F2", "name": "Status", "dataType": "SINGLE_SELECT", "options": [
                    { "id": "o1", "name": "Todo", "color": "GRAY" },
                    { "id": "o2", "name": "Done", "color": "GREEN" }
                ] }
            ] } }
        }))
        .unwrap();
        let fields = data.into_fields();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].field_type, FieldType::Other("TITLE".into()));
        assert_eq!(fields[1].order, 1);
        assert_eq!(fields[1].options[1].name, "Done");
        assert_eq!(fields[1].options[1].order, 1);
    }

    #[test]
    fn items_decode_content_union() {
        let data: ItemsData = serde_json::from_value(json!({
            "node": { "items": {
                "pageInfo": { "hasNextPage": true, "endCursor": "c1" },
                "nodes": [
                    {
                        "id": "I1",
                        "fieldValueByName": { "optionId": "o1" },
                        "content": {
                            "__typename": "Issue",
                            "title": "Fix it",
                            "body": "details",
                            "url": "https://github.com/acme/app/issues/7",
                            "number": 7,
                            "state": "OPEN",
                            "createdAt": "2024-01-02T03:04:05Z",
                            "author": { "login": "octocat" },
                            "repository": { "nameWithOwner": "acme/app" },
                            "assignees": { "nodes": [{ "login": "hubot" }] },
                            "labels": { "nodes": [{ "name": "bug" }] }
                        }
                    },
                    { "id": "I2", "fieldValueByName": null, "content": null },
                    {
                        "id": "I3",
                        "fieldValueByName": {},
                        "content": { "__typename": "DraftIssue", "title": "Idea" }
                    },
                    {
                        "id": "I4",
                        "fieldValueByName": null,
                        "content": { "__typename": "Discussion", "title": "?" }
                    }
                ]
            } }
        }))
        .unwrap();
        let page = data.into_page().unwrap();
        assert!(page.has_more);
        assert_eq!(page.next_cursor, "c1");

        let issue = &page.cards[0];
        assert_eq!(issue.content, CardContent::Issue);
        assert_eq!(issue.group_value, "o1");
        assert_eq!(issue.repo, "acme/app");
        assert_eq!(issue.number, 7);
        assert_eq!(issue.assignees, vec!["hubot"]);
        assert_eq!(issue.labels, vec!["bug"]);
        assert!(issue.created_at.is_some());

        assert_eq!(page.cards[1].content, CardContent::Private);
        assert_eq!(page.cards[1].group_value, "");

        assert_eq!(page.cards[2].content, CardContent::Draft);
        assert_eq!(page.cards[2].title, "Idea");
        assert_eq!(page.cards[2].group_value, "");

        assert_eq!(page.cards[3].content, CardContent::Private);
        assert_eq!(page.cards[3].title, "(unknown item type)");
    }

    #[test]
    fn null_connection_entries_are_dropped() {
        let data: ItemsData = serde_json::from_value(json!({
            "node": { "items": {
                "pageInfo": { "hasNextPage": false, "endCursor": null },
                "nodes": [
                    null,
                    {
                        "id": "I1",
                        "fieldValueByName": null,
                        "content": {
                            "__typename": "PullRequest",
                            "title": "Bump deps",
                            "assignees": { "nodes": [null, { "login": "hubot" }] },
                            "labels": { "nodes": null }
                        }
                    }
                ]
            } }
        }))
        .unwrap();
        let page = data.into_page().unwrap();
        assert_eq!(page.cards.len(), 1);
        assert_eq!(page.cards[0].assignees, vec!["hubot"]);
        assert!(page.cards[0].labels.is_empty());
    }

    #[test]
    fn comments_allow_deleted_authors() {
        let data: CommentsData = serde_json::from_value(json!({
            "repository": { "issueOrPullRequest": { "comments": { "nodes": [
                { "id": "C1", "author": null, "body": "ghost", "createdAt": "2024-01-02T03:04:05Z", "updatedAt": null },
                { "id": "C2", "author": { "login": "octocat" }, "body": "hi" }
            ] } } }
        }))
        .unwrap();
        let comments = data.into_comments().unwrap();
        assert_eq!(comments[0].author, None);
        assert_eq!(comments[1].author.as_deref(), Some("octocat"));
    }

    #[test]
    fn envelope_collects_errors() {
        let env: Envelope<ViewerData> = serde_json::from_value(json!({
            "data": null,
            "errors": [{ "message": "Bad credentials" }]
        }))
        .unwrap();
        assert!(env.data.is_none());
        assert_eq!(env.errors[0].message, "Bad credentials");
    }
}
