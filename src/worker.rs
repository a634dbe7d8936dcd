//! Runs [`Command`]s on the tokio runtime and reports back through the event
//! channel. The app never awaits anything itself.

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

use crate::board::pagination::fetch_all_cards;
use crate::event::{Command, Event};
use crate::github::ProjectsApi;

pub struct Worker {
    api: Arc<dyn ProjectsApi>,
    runtime: Handle,
    events: UnboundedSender<Event>,
}

impl Worker {
    pub fn new(api: Arc<dyn ProjectsApi>, runtime: Handle, events: UnboundedSender<Event>) -> Self {
        Self { api, runtime, events }
    }

    pub fn dispatch(&self, commands: Vec<Command>) {
        for command in commands {
            self.spawn(command);
        }
    }

    fn spawn(&self, command: Command) {
        if let Command::OpenUrl(url) = command {
            if let Err(e) = open::that_detached(&url) {
                warn!(%url, error = %e, "failed to open browser");
            }
            return;
        }

        let api = Arc::clone(&self.api);
        let events = self.events.clone();
        self.runtime.spawn(async move {
            if let Some(event) = execute(api.as_ref(), command).await {
                // The receiver is gone only while shutting down
                let _ = events.send(event);
            }
        });
    }
}

/// Perform one command and turn its outcome into the matching event.
pub async fn execute(api: &dyn ProjectsApi, command: Command) -> Option<Event> {
    debug!(?command, "executing");
    let event = match command {
        Command::FetchOwners => Event::OwnersLoaded(api.viewer_and_orgs().await),
        Command::ResolveOwner(login) => Event::OwnerResolved(api.resolve_owner(&login).await),
        Command::ListProjects(owner) => Event::ProjectsLoaded(api.list_projects(&owner).await),
        Command::LoadFields { project_id } => {
            Event::FieldsLoaded(api.project_fields(&project_id).await)
        }
        Command::LoadPage(request) => Event::PageLoaded {
            generation: request.generation,
            result: api
                .card_page(
                    &request.project_id,
                    &request.field_name,
                    &request.cursor,
                    request.page_size,
                )
                .await,
        },
        Command::LoadAllCards(request) => Event::AllCardsLoaded {
            generation: request.generation,
            result: fetch_all_cards(api, &request).await,
        },
        Command::UpdateCardField {
            generation,
            project_id,
            item_id,
            field_id,
            option_id,
        } => {
            let result = api
                .update_card_field(&project_id, &item_id, &field_id, &option_id)
                .await;
            Event::MoveFinished {
                generation,
                item_id,
                result,
            }
        }
        Command::LoadComments {
            item_id,
            repo,
            number,
        } => Event::CommentsLoaded {
            result: api.comments(&repo, number).await,
            item_id,
        },
        Command::AddComment {
            item_id,
            repo,
            number,
            body,
        } => Event::CommentPosted {
            result: api.add_comment(&repo, number, &body).await,
            item_id,
        },
        Command::OpenUrl(_) => return None,
    };
    if let Some(err) = event_error(&event) {
        warn!(error = %err, "command failed");
    }
    Some(event)
}

fn event_error(event: &Event) -> Option<&crate::github::ApiError> {
    match event {
        Event::OwnersLoaded(Err(e))
        | Event::OwnerResolved(Err(e))
        | Event::ProjectsLoaded(Err(e))
        | Event::FieldsLoaded(Err(e))
        | Event::PageLoaded { result: Err(e), .. }
        | Event::AllCardsLoaded { result: Err(e), .. }
        | Event::MoveFinished { result: Err(e), .. }
        | Event::CommentsLoaded { result: Err(e), .. }
        | Event::CommentPosted { result: Err(e), .. } => Some(e),
        _ => None,
    }
}
