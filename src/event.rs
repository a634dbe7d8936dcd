//! The closed set of inputs the app reacts to, and the requests it hands to
//! the worker in return.

use crate::board::pagination::PageRequest;
use crate::board::{Card, Comment, FieldDef, Project};
use crate::github::{ApiError, CardPage, Owner};
use crate::input::action::Action;

#[derive(Debug)]
pub enum Event {
    Input(Action),
    Tick,
    OwnersLoaded(Result<Vec<Owner>, ApiError>),
    OwnerResolved(Result<Owner, ApiError>),
    ProjectsLoaded(Result<Vec<Project>, ApiError>),
    FieldsLoaded(Result<Vec<FieldDef>, ApiError>),
    PageLoaded {
        generation: u64,
        result: Result<CardPage, ApiError>,
    },
    AllCardsLoaded {
        generation: u64,
        result: Result<Vec<Card>, ApiError>,
    },
    MoveFinished {
        generation: u64,
        item_id: String,
        result: Result<(), ApiError>,
    },
    CommentsLoaded {
        item_id: String,
        result: Result<Vec<Comment>, ApiError>,
    },
    CommentPosted {
        item_id: String,
        result: Result<(), ApiError>,
    },
}

/// Work for the worker. Each command yields exactly one [`Event`], except
/// `OpenUrl` which yields none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    FetchOwners,
    ResolveOwner(String),
    ListProjects(Owner),
    LoadFields { project_id: String },
    LoadPage(PageRequest),
    LoadAllCards(PageRequest),
    UpdateCardField {
        generation: u64,
        project_id: String,
        item_id: String,
        field_id: String,
        option_id: String,
    },
    LoadComments {
        item_id: String,
        repo: String,
        number: u64,
    },
    AddComment {
        item_id: String,
        repo: String,
        number: u64,
        body: String,
    },
    OpenUrl(String),
}
