use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::Utc;
use crossterm::event::{self as term, KeyEventKind};
use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use ratatui::DefaultTerminal;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, warn};

use crate::board::field_select::{select_group_field, selectable_fields, FieldSelection};
use crate::board::mutation::MoveTracker;
use crate::board::pagination::{PageOutcome, Paginator};
use crate::board::store::BoardStore;
use crate::board::{BoardError, Card, Comment, FieldDef, Project, NO_GROUP_KEY};
use crate::event::{Command, Event};
use crate::github::{ApiError, CardPage, Owner, OwnerKind};
use crate::input::action::Action;
use crate::input::keymap::map_key;
use crate::worker::Worker;

/// Cards skipped by Ctrl-d / Ctrl-u.
const PAGE_JUMP: isize = 10;

/// Reusable text editing buffer with cursor.
///
/// `cursor` is a **char index** (not byte index), always in `0..=char_count`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextBuffer {
    pub input: String,
    pub cursor: usize,
}

impl TextBuffer {
    pub fn new(input: String) -> Self {
        let cursor = input.chars().count();
        Self { input, cursor }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Convert a char index to a byte index.
    fn byte_offset(&self, char_idx: usize) -> usize {
        self.input
            .char_indices()
            .nth(char_idx)
            .map(|(i, _)| i)
            .unwrap_or(self.input.len())
    }

    pub fn insert(&mut self, c: char) {
        let byte_idx = self.byte_offset(self.cursor);
        self.input.insert(byte_idx, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            let byte_idx = self.byte_offset(self.cursor - 1);
            self.input.remove(byte_idx);
            self.cursor -= 1;
        }
    }

    pub fn delete_word(&mut self) {
        let byte_pos = self.byte_offset(self.cursor);
        let before = &self.input[..byte_pos];
        let trimmed = before.trim_end();
        let start_byte = trimmed
            .char_indices()
            .rev()
            .find(|(_, c)| c.is_whitespace())
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(0);
        let start_char = self.input[..start_byte].chars().count();
        self.input.drain(start_byte..byte_pos);
        self.cursor = start_char;
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        if self.cursor < self.input.chars().count() {
            self.cursor += 1;
        }
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.input.chars().count();
    }

    pub fn is_blank(&self) -> bool {
        self.input.trim().is_empty()
    }

    /// Apply an editing action. Returns false for anything that is not an
    /// edit.
    pub fn apply(&mut self, action: Action) -> bool {
        match action {
            Action::InputChar(c) => self.insert(c),
            Action::InputNewline => self.insert('\n'),
            Action::InputBackspace => self.backspace(),
            Action::InputLeft => self.move_left(),
            Action::InputRight => self.move_right(),
            Action::InputHome => self.home(),
            Action::InputEnd => self.end(),
            Action::InputDeleteWord => self.delete_word(),
            _ => return false,
        }
        true
    }
}

/// Which keymap applies right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Loading,
    Error,
    Picker,
    Board,
    MoveTo,
    Filter,
    Help,
    Detail,
    Compose,
    ConfirmDiscard,
}

/// Something a picker can list.
pub trait PickerItem {
    fn label(&self) -> String;
}

impl PickerItem for Owner {
    fn label(&self) -> String {
        format!("{} ({})", self.login, self.kind.label())
    }
}

impl PickerItem for Project {
    fn label(&self) -> String {
        format!("#{} {}", self.number, self.title)
    }
}

impl PickerItem for FieldDef {
    fn label(&self) -> String {
        format!("{} ({} options)", self.name, self.options.len())
    }
}

/// A list with a type-to-filter query.
#[derive(Debug, Clone)]
pub struct Picker<T> {
    pub title: String,
    pub items: Vec<T>,
    pub query: TextBuffer,
    pub selected: usize,
}

impl<T: PickerItem + Clone> Picker<T> {
    pub fn new(title: impl Into<String>, items: Vec<T>) -> Self {
        Self {
            title: title.into(),
            items,
            query: TextBuffer::empty(),
            selected: 0,
        }
    }

    /// Items matching the query, in their original order.
    pub fn visible(&self) -> Vec<&T> {
        if self.query.input.is_empty() {
            return self.items.iter().collect();
        }
        let matcher = SkimMatcherV2::default();
        self.items
            .iter()
            .filter(|item| matcher.fuzzy_match(&item.label(), &self.query.input).is_some())
            .collect()
    }

    pub fn selected_item(&self) -> Option<T> {
        self.visible().get(self.selected).map(|item| (*item).clone())
    }

    pub fn select_next(&mut self) {
        let len = self.visible().len();
        if self.selected + 1 < len {
            self.selected += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    /// Edit the query; the selection snaps back to the first match.
    pub fn edit(&mut self, action: Action) -> bool {
        if matches!(action, Action::InputNewline) || !self.query.apply(action) {
            return false;
        }
        self.selected = 0;
        true
    }
}

/// Comment thread of the card shown in the detail view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentsState {
    /// Drafts and private items have no thread.
    Unavailable,
    Loading,
    Loaded(Vec<Comment>),
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct DetailState {
    pub item_id: String,
    pub scroll: u16,
    pub comments: CommentsState,
    pub compose: Option<TextBuffer>,
    pub confirm_discard: bool,
    pub posting: bool,
}

#[derive(Debug, Clone)]
pub enum Screen {
    Loading { message: String },
    OwnerSelect(Picker<Owner>),
    ProjectSelect(Picker<Project>),
    FieldSelect {
        picker: Picker<FieldDef>,
        /// Opened from a loaded board, so Esc goes back to it.
        from_board: bool,
    },
    Board,
    Detail(DetailState),
    Error { message: String },
}

/// Selection and filters of the board screen.
#[derive(Debug, Clone, Default)]
pub struct BoardView {
    pub focused_column: usize,
    /// Selected row per column key, so switching columns keeps position.
    selected: HashMap<String, usize>,
    pub move_mode: bool,
    /// Title filter being typed; applied live.
    pub filter_input: Option<TextBuffer>,
    pub filter: String,
    pub mine_only: bool,
    pub show_help: bool,
}

impl BoardView {
    pub fn selected_in(&self, key: &str) -> usize {
        self.selected.get(key).copied().unwrap_or(0)
    }

    /// The filter currently in effect, including one still being typed.
    pub fn active_filter(&self) -> &str {
        self.filter_input
            .as_ref()
            .map_or(self.filter.as_str(), |buf| buf.input.as_str())
    }
}

/// One board column after filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnView {
    pub key: String,
    pub name: String,
    pub color: String,
    pub card_ids: Vec<String>,
    /// Cards in the column before filtering.
    pub total: usize,
}

/// Values given up front that skip the matching picker.
#[derive(Debug, Clone, Default)]
pub struct Prefill {
    pub owner: Option<String>,
    pub project: Option<u32>,
    pub group_field: Option<String>,
}

/// Notification severity for statusbar coloring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Error,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub message: String,
    pub level: NotificationLevel,
    pub expires: Instant,
}

/// Global application state: the screen machine plus the board engine.
pub struct App {
    pub screen: Screen,
    pub store: BoardStore,
    pub paginator: Paginator,
    pub moves: MoveTracker,
    pub view: BoardView,
    fields: Vec<FieldDef>,
    owner: Option<Owner>,
    prefill: Prefill,
    notification: Option<Notification>,
    notification_ttl: Duration,
    pub should_quit: bool,
}

impl App {
    pub fn new(prefill: Prefill, page_size: u32, notification_ttl: Duration) -> Self {
        Self {
            screen: Screen::Loading {
                message: "Starting...".into(),
            },
            store: BoardStore::new(),
            paginator: Paginator::new(page_size),
            moves: MoveTracker::new(),
            view: BoardView::default(),
            fields: Vec::new(),
            owner: None,
            prefill,
            notification: None,
            notification_ttl,
            should_quit: false,
        }
    }

    /// Kick off the bootstrap sequence.
    pub fn start(&mut self) -> Vec<Command> {
        match self.prefill.owner.clone() {
            Some(login) => {
                self.loading(format!("Resolving {login}..."));
                // The owner list is still fetched for the viewer's login
                vec![Command::FetchOwners, Command::ResolveOwner(login)]
            }
            None => {
                self.loading("Loading owners...");
                vec![Command::FetchOwners]
            }
        }
    }

    pub fn mode(&self) -> Mode {
        match &self.screen {
            Screen::Loading { .. } => Mode::Loading,
            Screen::Error { .. } => Mode::Error,
            Screen::OwnerSelect(_) | Screen::ProjectSelect(_) | Screen::FieldSelect { .. } => {
                Mode::Picker
            }
            Screen::Board if self.view.show_help => Mode::Help,
            Screen::Board if self.view.filter_input.is_some() => Mode::Filter,
            Screen::Board if self.view.move_mode => Mode::MoveTo,
            Screen::Board => Mode::Board,
            Screen::Detail(d) if d.confirm_discard => Mode::ConfirmDiscard,
            Screen::Detail(d) if d.compose.is_some() => Mode::Compose,
            Screen::Detail(_) => Mode::Detail,
        }
    }

    pub fn owner(&self) -> Option<&Owner> {
        self.owner.as_ref()
    }

    pub fn notification(&self) -> Option<&Notification> {
        self.notification.as_ref()
    }

    /// Show a transient notification.
    pub fn notify(&mut self, msg: impl Into<String>) {
        self.notification = Some(Notification {
            message: msg.into(),
            level: NotificationLevel::Info,
            expires: Instant::now() + self.notification_ttl,
        });
    }

    /// Show a transient error notification (rendered in red).
    pub fn notify_error(&mut self, msg: impl Into<String>) {
        let message = msg.into();
        warn!(%message, "error notification");
        self.notification = Some(Notification {
            message,
            level: NotificationLevel::Error,
            expires: Instant::now() + self.notification_ttl,
        });
    }

    /// Clear expired notifications.
    pub fn tick_notification(&mut self) {
        if self
            .notification
            .as_ref()
            .is_some_and(|n| Instant::now() >= n.expires)
        {
            self.notification = None;
        }
    }

    fn loading(&mut self, message: impl Into<String>) {
        self.screen = Screen::Loading {
            message: message.into(),
        };
    }

    fn fail(&mut self, message: impl Into<String>) -> Vec<Command> {
        let message = message.into();
        warn!(%message, "entering error screen");
        self.screen = Screen::Error { message };
        Vec::new()
    }

    fn is_loading_screen(&self) -> bool {
        matches!(self.screen, Screen::Loading { .. })
    }

    /// Process one event to completion.
    pub fn handle(&mut self, event: Event) -> Vec<Command> {
        match event {
            Event::Input(action) => self.handle_action(action),
            Event::Tick => {
                self.tick_notification();
                Vec::new()
            }
            Event::OwnersLoaded(result) => self.on_owners(result),
            Event::OwnerResolved(result) => self.on_owner_resolved(result),
            Event::ProjectsLoaded(result) => self.on_projects(result),
            Event::FieldsLoaded(result) => self.on_fields(result),
            Event::PageLoaded { generation, result } => self.on_page(generation, result),
            Event::AllCardsLoaded { generation, result } => self.on_reload(generation, result),
            Event::MoveFinished {
                generation,
                item_id,
                result,
            } => self.on_move_finished(generation, &item_id, result),
            Event::CommentsLoaded { item_id, result } => self.on_comments(&item_id, result),
            Event::CommentPosted { item_id, result } => self.on_comment_posted(&item_id, result),
        }
    }

    // -----------------------------------------------------------------------
    // Bootstrap: owner → project → field → board
    // -----------------------------------------------------------------------

    fn on_owners(&mut self, result: Result<Vec<Owner>, ApiError>) -> Vec<Command> {
        if let Ok(owners) = &result {
            if let Some(viewer) = owners.iter().find(|o| o.kind == OwnerKind::User) {
                self.store.set_viewer_login(viewer.login.clone());
            }
        }
        if self.prefill.owner.is_some() {
            if let Err(e) = result {
                warn!(error = %e, "viewer lookup failed; assigned-to-me filter unavailable");
            }
            return Vec::new();
        }
        if !self.is_loading_screen() {
            return Vec::new();
        }
        match result {
            Ok(owners) if owners.is_empty() => self.fail("No owners available for this account"),
            Ok(owners) => {
                self.screen = Screen::OwnerSelect(Picker::new("Select owner", owners));
                Vec::new()
            }
            Err(e) => self.fail(format!("Failed to load owners: {e}")),
        }
    }

    fn on_owner_resolved(&mut self, result: Result<Owner, ApiError>) -> Vec<Command> {
        if !self.is_loading_screen() {
            return Vec::new();
        }
        match result {
            Ok(owner) => self.select_owner(owner),
            Err(e) => self.fail(format!("Failed to resolve owner: {e}")),
        }
    }

    fn select_owner(&mut self, owner: Owner) -> Vec<Command> {
        info!(owner = %owner.login, kind = owner.kind.label(), "owner selected");
        self.loading(format!("Loading projects for {}...", owner.login));
        self.owner = Some(owner.clone());
        vec![Command::ListProjects(owner)]
    }

    fn on_projects(&mut self, result: Result<Vec<Project>, ApiError>) -> Vec<Command> {
        if !self.is_loading_screen() {
            return Vec::new();
        }
        let owner = self.owner.as_ref().map_or("owner", |o| o.login.as_str()).to_string();
        let projects = match result {
            Ok(projects) => projects,
            Err(e) => return self.fail(format!("Failed to load projects: {e}")),
        };
        if projects.is_empty() {
            return self.fail(format!("No projects found for {owner}"));
        }
        if let Some(number) = self.prefill.project {
            return match projects.into_iter().find(|p| p.number == number) {
                Some(project) => self.select_project(project),
                None => self.fail(format!("Project #{number} not found for {owner}")),
            };
        }
        self.screen = Screen::ProjectSelect(Picker::new(format!("Projects of {owner}"), projects));
        Vec::new()
    }

    fn select_project(&mut self, project: Project) -> Vec<Command> {
        info!(project = %project.title, number = project.number, "project selected");
        self.loading(format!("Loading fields of {}...", project.title));
        let project_id = project.id.clone();
        self.store.set_project(project);
        vec![Command::LoadFields { project_id }]
    }

    fn on_fields(&mut self, result: Result<Vec<FieldDef>, ApiError>) -> Vec<Command> {
        if !self.is_loading_screen() {
            return Vec::new();
        }
        let fields = match result {
            Ok(fields) => fields,
            Err(e) => return self.fail(format!("Failed to load fields: {e}")),
        };
        self.fields = fields;

        if let Some(name) = self.prefill.group_field.clone() {
            return match self.fields.iter().find(|f| f.name == name).cloned() {
                Some(field) if field.is_single_select() => self.enter_board(field),
                Some(field) => self.fail(format!(
                    "Field {:?} is {}, not a single-select field",
                    field.name, field.field_type
                )),
                None => self.fail(format!("Field {name:?} not found in project")),
            };
        }

        match select_group_field(&self.fields) {
            Ok(FieldSelection::Selected(field)) => self.enter_board(field),
            Ok(FieldSelection::Choose(candidates)) => {
                self.screen = Screen::FieldSelect {
                    picker: Picker::new("Group by", candidates),
                    from_board: false,
                };
                Vec::new()
            }
            Err(e) => self.fail(e.to_string()),
        }
    }

    /// Show the board grouped by `field` and start loading cards.
    fn enter_board(&mut self, field: FieldDef) -> Vec<Command> {
        info!(field = %field.name, "grouping by field");
        if self.moves.abandon().is_some() {
            debug!("pending move abandoned by regrouping");
        }
        self.store.clear();
        self.store.set_group_field(field);
        self.view = BoardView {
            mine_only: self.view.mine_only,
            filter: std::mem::take(&mut self.view.filter),
            ..BoardView::default()
        };
        self.screen = Screen::Board;
        match self.paginator.start(&mut self.store) {
            Ok(request) => vec![Command::LoadPage(request)],
            Err(e) => {
                self.notify_error(e.to_string());
                Vec::new()
            }
        }
    }

    // -----------------------------------------------------------------------
    // Loading cards
    // -----------------------------------------------------------------------

    fn on_page(&mut self, generation: u64, result: Result<CardPage, ApiError>) -> Vec<Command> {
        let page = match result {
            Ok(page) => page,
            Err(e) => {
                if self.paginator.on_error(generation) {
                    self.notify_error(format!("Load failed: {e}"));
                }
                return Vec::new();
            }
        };
        let commands = match self.paginator.on_page(&mut self.store, generation, page) {
            Ok(PageOutcome::Next(request)) => vec![Command::LoadPage(request)],
            Ok(PageOutcome::Done) => {
                info!(cards = self.store.card_count(), "board loaded");
                Vec::new()
            }
            Ok(PageOutcome::Stale) => Vec::new(),
            Err(e) => {
                self.notify_error(e.to_string());
                Vec::new()
            }
        };
        self.clamp_selection();
        commands
    }

    fn on_reload(&mut self, generation: u64, result: Result<Vec<Card>, ApiError>) -> Vec<Command> {
        match result {
            Ok(cards) => {
                let count = cards.len();
                if self.paginator.on_reload(&mut self.store, generation, cards) {
                    self.clamp_selection();
                    self.notify(format!("Reloaded {count} cards"));
                }
            }
            Err(e) => {
                if self.paginator.on_reload_error(generation) {
                    self.notify_error(format!("Reload failed: {e}"));
                }
            }
        }
        Vec::new()
    }

    fn reload(&mut self) -> Vec<Command> {
        if self.moves.abandon().is_some() {
            debug!("pending move abandoned by reload");
        }
        match self.paginator.begin_reload(&mut self.store) {
            Ok(request) => {
                self.clamp_selection();
                self.notify("Reloading...");
                vec![Command::LoadAllCards(request)]
            }
            Err(e) => {
                self.notify_error(e.to_string());
                Vec::new()
            }
        }
    }

    fn load_more(&mut self) -> Vec<Command> {
        if self.paginator.is_loading() {
            self.notify("Already loading");
            return Vec::new();
        }
        match self.paginator.request_more(&self.store) {
            Ok(Some(request)) => {
                self.notify("Loading more cards...");
                vec![Command::LoadPage(request)]
            }
            Ok(None) => {
                self.notify("All cards loaded");
                Vec::new()
            }
            Err(e) => {
                self.notify_error(e.to_string());
                Vec::new()
            }
        }
    }

    // -----------------------------------------------------------------------
    // Moves
    // -----------------------------------------------------------------------

    fn move_selected_card(&mut self, column_idx: usize) -> Vec<Command> {
        self.view.move_mode = false;
        let columns = self.columns();
        let Some(target) = columns.get(column_idx) else {
            self.notify_error(format!("No column {}", column_idx + 1));
            return Vec::new();
        };
        let Some(card) = self.selected_card() else {
            return Vec::new();
        };
        let value = if target.key == NO_GROUP_KEY {
            ""
        } else {
            target.key.as_str()
        };
        if card.group_value == value {
            self.notify(format!("Already in {}", target.name));
            return Vec::new();
        }

        // A previous failure has been shown already
        self.moves.acknowledge();
        let generation = self.paginator.generation();
        let pending = match self.moves.begin(&mut self.store, &card.item_id, value, generation) {
            Ok(pending) => pending,
            Err(BoardError::MoveInFlight(_)) => {
                self.notify_error("Wait for the previous move to finish");
                return Vec::new();
            }
            Err(e) => {
                self.notify_error(e.to_string());
                return Vec::new();
            }
        };
        info!(item = %card.item_id, to = %target.name, "moving card");
        self.notify(format!("Moving to {}...", target.name));

        // Follow the card into its new column
        let key = target.key.clone();
        self.view.focused_column = column_idx;
        if let Some(pos) = self
            .columns()
            .get(column_idx)
            .and_then(|c| c.card_ids.iter().position(|id| *id == card.item_id))
        {
            self.view.selected.insert(key, pos);
        }
        self.clamp_selection();

        vec![Command::UpdateCardField {
            generation: pending.generation,
            project_id: pending.project_id,
            item_id: pending.item_id,
            field_id: pending.field_id,
            option_id: pending.target,
        }]
    }

    fn on_move_finished(
        &mut self,
        generation: u64,
        item_id: &str,
        result: Result<(), ApiError>,
    ) -> Vec<Command> {
        if generation != self.paginator.generation() {
            // The board was cleared since; there is nothing to roll back
            if let Err(e) = result {
                self.notify_error(format!("Move failed: {e}"));
            }
            return Vec::new();
        }
        match result {
            Ok(()) => {
                if self.moves.confirm(item_id) {
                    self.notify("Card moved");
                }
            }
            Err(e) => {
                let message = format!("Move failed: {e}");
                match self.moves.fail(&mut self.store, item_id, e) {
                    Ok(()) => {
                        self.clamp_selection();
                        self.notify_error(message);
                    }
                    Err(err) => warn!(error = %err, item_id, "move result without pending move"),
                }
            }
        }
        Vec::new()
    }

    // -----------------------------------------------------------------------
    // Detail & comments
    // -----------------------------------------------------------------------

    fn open_detail(&mut self) -> Vec<Command> {
        let Some(card) = self.selected_card() else {
            return Vec::new();
        };
        let mut commands = Vec::new();
        let comments = match card.repo_parts() {
            Some(_) if card.content.has_comments() && card.number > 0 => {
                commands.push(Command::LoadComments {
                    item_id: card.item_id.clone(),
                    repo: card.repo.clone(),
                    number: card.number,
                });
                CommentsState::Loading
            }
            _ => CommentsState::Unavailable,
        };
        self.screen = Screen::Detail(DetailState {
            item_id: card.item_id,
            scroll: 0,
            comments,
            compose: None,
            confirm_discard: false,
            posting: false,
        });
        commands
    }

    fn detail_mut(&mut self, item_id: &str) -> Option<&mut DetailState> {
        match &mut self.screen {
            Screen::Detail(d) if d.item_id == item_id => Some(d),
            _ => None,
        }
    }

    fn on_comments(&mut self, item_id: &str, result: Result<Vec<Comment>, ApiError>) -> Vec<Command> {
        if let Some(detail) = self.detail_mut(item_id) {
            detail.comments = match result {
                Ok(comments) => CommentsState::Loaded(comments),
                Err(e) => CommentsState::Failed(e.to_string()),
            };
        }
        Vec::new()
    }

    fn post_comment(&mut self) -> Vec<Command> {
        let Screen::Detail(detail) = &mut self.screen else {
            return Vec::new();
        };
        if detail.posting {
            return Vec::new();
        }
        let body = match &detail.compose {
            Some(buf) if !buf.is_blank() => buf.input.trim().to_string(),
            _ => return Vec::new(),
        };
        let item_id = detail.item_id.clone();
        let card = match self.store.card(&item_id) {
            Ok(card) => card,
            Err(e) => {
                self.notify_error(e.to_string());
                return Vec::new();
            }
        };
        if let Screen::Detail(detail) = &mut self.screen {
            detail.posting = true;
        }
        self.notify("Posting comment...");
        vec![Command::AddComment {
            item_id,
            repo: card.repo,
            number: card.number,
            body,
        }]
    }

    fn on_comment_posted(&mut self, item_id: &str, result: Result<(), ApiError>) -> Vec<Command> {
        let Some(detail) = self.detail_mut(item_id) else {
            if let Err(e) = result {
                self.notify_error(format!("Comment failed: {e}"));
            }
            return Vec::new();
        };
        detail.posting = false;
        match result {
            Ok(()) => {
                detail.compose = None;
                detail.confirm_discard = false;
                detail.comments = CommentsState::Loading;
                let item_id = detail.item_id.clone();
                self.notify("Comment posted");
                match self.store.card(&item_id) {
                    Ok(card) => vec![Command::LoadComments {
                        item_id,
                        repo: card.repo,
                        number: card.number,
                    }],
                    Err(_) => Vec::new(),
                }
            }
            Err(e) => {
                self.notify_error(format!("Comment failed: {e}"));
                Vec::new()
            }
        }
    }

    // -----------------------------------------------------------------------
    // Board queries used by rendering and navigation
    // -----------------------------------------------------------------------

    /// Columns in option order plus the no-value column, after filters.
    pub fn columns(&self) -> Vec<ColumnView> {
        let Some(field) = self.store.group_field() else {
            return Vec::new();
        };
        let matcher = SkimMatcherV2::default();
        let filter = TitleFilter::for_cards(self.view.active_filter(), &self.store.all_cards());
        let viewer = self.store.viewer_login();

        let mut columns: Vec<(String, String, String)> = field
            .options
            .iter()
            .map(|o| (o.id.clone(), o.name.clone(), o.color.clone()))
            .collect();
        columns.push((NO_GROUP_KEY.to_string(), format!("No {}", field.name), String::new()));

        columns
            .into_iter()
            .map(|(key, name, color)| {
                let ids = self.store.column_card_ids(&key);
                let total = ids.len();
                let card_ids = ids
                    .into_iter()
                    .filter(|id| match self.store.card(id) {
                        Ok(card) => card_is_visible(&card, &filter, self.view.mine_only, viewer, &matcher),
                        Err(_) => false,
                    })
                    .collect();
                ColumnView {
                    key,
                    name,
                    color,
                    card_ids,
                    total,
                }
            })
            .collect()
    }

    pub fn selected_card(&self) -> Option<Card> {
        let columns = self.columns();
        let column = columns.get(self.view.focused_column)?;
        let id = column.card_ids.get(self.view.selected_in(&column.key))?;
        self.store.card(id).ok()
    }

    /// Keep the focused column and every per-column selection in range.
    pub fn clamp_selection(&mut self) {
        let columns = self.columns();
        if self.view.focused_column >= columns.len() {
            self.view.focused_column = columns.len().saturating_sub(1);
        }
        for column in &columns {
            if let Some(sel) = self.view.selected.get_mut(&column.key) {
                *sel = (*sel).min(column.card_ids.len().saturating_sub(1));
            }
        }
    }

    fn move_selection(&mut self, delta: isize) {
        let columns = self.columns();
        let Some(column) = columns.get(self.view.focused_column) else {
            return;
        };
        if column.card_ids.is_empty() {
            return;
        }
        let current = self.view.selected_in(&column.key) as isize;
        let last = column.card_ids.len() as isize - 1;
        let next = (current + delta).clamp(0, last) as usize;
        self.view.selected.insert(column.key.clone(), next);
    }

    fn focus_column(&mut self, forward: bool) {
        let count = self.columns().len();
        if forward && self.view.focused_column + 1 < count {
            self.view.focused_column += 1;
        } else if !forward && self.view.focused_column > 0 {
            self.view.focused_column -= 1;
        }
    }

    // -----------------------------------------------------------------------
    // Input dispatch
    // -----------------------------------------------------------------------

    fn handle_action(&mut self, action: Action) -> Vec<Command> {
        if action == Action::ForceQuit {
            self.should_quit = true;
            return Vec::new();
        }
        match self.mode() {
            Mode::Loading | Mode::Error => {
                if action == Action::Quit {
                    self.should_quit = true;
                }
                Vec::new()
            }
            Mode::Picker => self.handle_picker(action),
            Mode::Board => self.handle_board(action),
            Mode::MoveTo => match action {
                Action::MoveToColumn(idx) => self.move_selected_card(idx),
                Action::InputCancel => {
                    self.view.move_mode = false;
                    Vec::new()
                }
                _ => Vec::new(),
            },
            Mode::Filter => {
                self.handle_filter_input(action);
                Vec::new()
            }
            Mode::Help => {
                if action == Action::ClosePanel {
                    self.view.show_help = false;
                }
                Vec::new()
            }
            Mode::Detail => self.handle_detail(action),
            Mode::Compose | Mode::ConfirmDiscard => self.handle_compose(action),
        }
    }

    fn handle_board(&mut self, action: Action) -> Vec<Command> {
        match action {
            Action::FocusPrevColumn => self.focus_column(false),
            Action::FocusNextColumn => self.focus_column(true),
            Action::SelectNextCard => self.move_selection(1),
            Action::SelectPrevCard => self.move_selection(-1),
            Action::PageDown => self.move_selection(PAGE_JUMP),
            Action::PageUp => self.move_selection(-PAGE_JUMP),
            Action::JumpToFirstCard => self.move_selection(isize::MIN / 2),
            Action::JumpToLastCard => self.move_selection(isize::MAX / 2),
            Action::EnterMoveMode => {
                if self.selected_card().is_some() {
                    self.view.move_mode = true;
                }
            }
            Action::OpenInBrowser => return self.open_selected_url(),
            Action::OpenCardDetail => return self.open_detail(),
            Action::ReloadBoard => return self.reload(),
            Action::LoadMore => return self.load_more(),
            Action::ChangeGroupField => {
                let candidates = selectable_fields(&self.fields);
                if candidates.is_empty() {
                    self.notify_error("No single-select fields to group by");
                } else {
                    let mut picker = Picker::new("Group by", candidates);
                    let current = self.store.group_field().map(|f| f.id.clone());
                    if let Some(pos) = picker.items.iter().position(|f| Some(&f.id) == current.as_ref()) {
                        picker.selected = pos;
                    }
                    self.screen = Screen::FieldSelect {
                        picker,
                        from_board: true,
                    };
                }
            }
            Action::ToggleMine => {
                if self.store.viewer_login().is_none() {
                    self.notify_error("Your login is unknown, cannot filter by assignee");
                } else {
                    self.view.mine_only = !self.view.mine_only;
                    self.clamp_selection();
                }
            }
            Action::StartFilter => {
                self.view.filter_input = Some(TextBuffer::new(self.view.filter.clone()));
            }
            Action::ClearFilters => {
                if !self.view.filter.is_empty() || self.view.mine_only {
                    self.view.filter.clear();
                    self.view.mine_only = false;
                    self.notify("Filters cleared");
                }
            }
            Action::ShowHelp => self.view.show_help = true,
            Action::Quit => self.should_quit = true,
            _ => {}
        }
        Vec::new()
    }

    fn open_selected_url(&mut self) -> Vec<Command> {
        let url = match &self.screen {
            Screen::Detail(d) => self.store.card(&d.item_id).ok().map(|c| c.url),
            _ => self.selected_card().map(|c| c.url),
        };
        match url {
            Some(url) if !url.is_empty() => vec![Command::OpenUrl(url)],
            Some(_) => {
                self.notify("This card has no URL");
                Vec::new()
            }
            None => Vec::new(),
        }
    }

    fn handle_filter_input(&mut self, action: Action) {
        let Some(buf) = self.view.filter_input.as_mut() else {
            return;
        };
        match action {
            Action::InputConfirm => {
                self.view.filter = buf.input.trim().to_string();
                self.view.filter_input = None;
            }
            Action::InputCancel => self.view.filter_input = None,
            other => {
                buf.apply(other);
            }
        }
        self.clamp_selection();
    }

    fn handle_picker(&mut self, action: Action) -> Vec<Command> {
        enum Picked {
            Owner(Owner),
            Project(Project),
            Field(FieldDef),
            Back,
            Quit,
            Nothing,
        }

        let picked = match &mut self.screen {
            Screen::OwnerSelect(p) => picker_step(p, action).map_or(Picked::Nothing, |r| match r {
                PickerResult::Chosen(o) => Picked::Owner(o),
                PickerResult::Cancelled => Picked::Quit,
            }),
            Screen::ProjectSelect(p) => picker_step(p, action).map_or(Picked::Nothing, |r| match r {
                PickerResult::Chosen(p) => Picked::Project(p),
                PickerResult::Cancelled => Picked::Quit,
            }),
            Screen::FieldSelect { picker, from_board } => {
                let from_board = *from_board;
                picker_step(picker, action).map_or(Picked::Nothing, |r| match r {
                    PickerResult::Chosen(f) => Picked::Field(f),
                    PickerResult::Cancelled if from_board => Picked::Back,
                    PickerResult::Cancelled => Picked::Quit,
                })
            }
            _ => Picked::Nothing,
        };

        match picked {
            Picked::Owner(owner) => self.select_owner(owner),
            Picked::Project(project) => self.select_project(project),
            Picked::Field(field) => self.enter_board(field),
            Picked::Back => {
                self.screen = Screen::Board;
                Vec::new()
            }
            Picked::Quit => {
                self.should_quit = true;
                Vec::new()
            }
            Picked::Nothing => Vec::new(),
        }
    }

    fn handle_detail(&mut self, action: Action) -> Vec<Command> {
        let Screen::Detail(detail) = &mut self.screen else {
            return Vec::new();
        };
        match action {
            Action::ClosePanel => self.screen = Screen::Board,
            Action::DetailScrollDown => detail.scroll = detail.scroll.saturating_add(1),
            Action::DetailScrollUp => detail.scroll = detail.scroll.saturating_sub(1),
            Action::PageDown => detail.scroll = detail.scroll.saturating_add(PAGE_JUMP as u16),
            Action::PageUp => detail.scroll = detail.scroll.saturating_sub(PAGE_JUMP as u16),
            Action::JumpToFirstCard => detail.scroll = 0,
            // Clamped by the renderer against the content height
            Action::JumpToLastCard => detail.scroll = u16::MAX,
            Action::OpenInBrowser => return self.open_selected_url(),
            Action::StartComment => {
                if detail.comments == CommentsState::Unavailable {
                    self.notify("Only issues and pull requests take comments");
                } else {
                    detail.compose = Some(TextBuffer::empty());
                }
            }
            _ => {}
        }
        Vec::new()
    }

    fn handle_compose(&mut self, action: Action) -> Vec<Command> {
        let Screen::Detail(detail) = &mut self.screen else {
            return Vec::new();
        };
        let Some(buf) = detail.compose.as_mut() else {
            return Vec::new();
        };

        if detail.confirm_discard {
            match action {
                Action::DiscardComment => {
                    detail.confirm_discard = false;
                    detail.compose = None;
                    self.screen = Screen::Board;
                }
                Action::KeepEditing => detail.confirm_discard = false,
                Action::SaveComment => {
                    detail.confirm_discard = false;
                    return self.post_comment();
                }
                _ => {}
            }
            return Vec::new();
        }

        match action {
            Action::SubmitComment => return self.post_comment(),
            Action::InputCancel => {
                if buf.is_blank() {
                    detail.compose = None;
                } else {
                    detail.confirm_discard = true;
                }
            }
            other => {
                if !detail.posting {
                    buf.apply(other);
                }
            }
        }
        Vec::new()
    }
}

enum PickerResult<T> {
    Chosen(T),
    Cancelled,
}

/// Feed one action to a picker. Esc clears a non-empty query before it
/// cancels.
fn picker_step<T: PickerItem + Clone>(
    picker: &mut Picker<T>,
    action: Action,
) -> Option<PickerResult<T>> {
    match action {
        Action::SelectNextCard => picker.select_next(),
        Action::SelectPrevCard => picker.select_prev(),
        Action::InputConfirm => return picker.selected_item().map(PickerResult::Chosen),
        Action::InputCancel => {
            if picker.query.input.is_empty() {
                return Some(PickerResult::Cancelled);
            }
            picker.query = TextBuffer::empty();
            picker.selected = 0;
        }
        other => {
            picker.edit(other);
        }
    }
    None
}

/// How the title filter compares against card titles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TitleFilter {
    All,
    /// Case-insensitive substring; holds the lowercased query.
    Substring(String),
    Fuzzy(String),
}

impl TitleFilter {
    /// Substring matching while any title contains the query, fuzzy only
    /// once nothing does.
    pub fn for_cards(query: &str, cards: &[Card]) -> Self {
        let query = query.trim();
        if query.is_empty() {
            return TitleFilter::All;
        }
        let lower = query.to_lowercase();
        if cards.iter().any(|c| c.title.to_lowercase().contains(&lower)) {
            TitleFilter::Substring(lower)
        } else {
            TitleFilter::Fuzzy(query.to_string())
        }
    }

    pub fn matches(&self, title: &str, matcher: &SkimMatcherV2) -> bool {
        match self {
            TitleFilter::All => true,
            TitleFilter::Substring(lower) => title.to_lowercase().contains(lower.as_str()),
            TitleFilter::Fuzzy(query) => matcher.fuzzy_match(title, query).is_some(),
        }
    }
}

/// Whether a card passes the title filter and the assigned-to-me toggle.
pub fn card_is_visible(
    card: &Card,
    filter: &TitleFilter,
    mine_only: bool,
    viewer: Option<&str>,
    matcher: &SkimMatcherV2,
) -> bool {
    if mine_only {
        match viewer {
            Some(login) if card.is_assigned_to(login) => {}
            Some(_) => return false,
            None => {}
        }
    }
    filter.matches(&card.title, matcher)
}

/// Main TUI application loop.
pub fn run(
    terminal: &mut DefaultTerminal,
    app: &mut App,
    worker: &Worker,
    events: &mut UnboundedReceiver<Event>,
) -> color_eyre::Result<()> {
    worker.dispatch(app.start());

    loop {
        app.handle(Event::Tick);

        while let Ok(event) = events.try_recv() {
            let commands = app.handle(event);
            worker.dispatch(commands);
        }

        let now = Utc::now();
        terminal.draw(|f| crate::ui::render(f, app, now))?;

        if term::poll(Duration::from_millis(100))? {
            if let term::Event::Key(key) = term::read()? {
                if key.kind == KeyEventKind::Press {
                    let action = map_key(key, app.mode());
                    let commands = app.handle(Event::Input(action));
                    worker.dispatch(commands);
                }
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::store::tests::{card, field, status_field};
    use crate::board::FieldType;
    use crate::github::fake::{cards, owner, project};

    fn fresh_app() -> App {
        App::new(Prefill::default(), 100, Duration::from_secs(3))
    }

    fn press(app: &mut App, action: Action) -> Vec<Command> {
        app.handle(Event::Input(action))
    }

    fn typed(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, Action::InputChar(c));
        }
    }

    fn page(cards: Vec<Card>, next: &str, has_more: bool) -> CardPage {
        CardPage {
            cards,
            next_cursor: next.into(),
            has_more,
        }
    }

    fn priority_field() -> FieldDef {
        field("field_priority", "Priority", FieldType::SingleSelect, &["opt_p1", "opt_p2"])
    }

    fn only_page_request(commands: &[Command]) -> crate::board::pagination::PageRequest {
        match commands {
            [Command::LoadPage(req)] => req.clone(),
            other => panic!("expected one page request, got {other:?}"),
        }
    }

    fn issue(id: &str, group: &str, number: u64) -> Card {
        let mut c = card(id, group);
        c.content = crate::board::CardContent::Issue;
        c.repo = "acme/app".into();
        c.number = number;
        c.url = format!("https://github.com/acme/app/issues/{number}");
        c
    }

    /// An app on the board screen with the four sample cards loaded.
    fn board_app() -> App {
        let mut app = fresh_app();
        app.store.set_project(project(1, "Roadmap"));
        app.store.set_viewer_login("octocat");
        app.fields = vec![status_field(), priority_field()];
        let req = only_page_request(&app.enter_board(status_field()));
        let mut first = issue("item_1", "opt_todo", 1);
        first.assignees = vec!["octocat".into()];
        app.handle(Event::PageLoaded {
            generation: req.generation,
            result: Ok(page(
                vec![
                    first,
                    issue("item_2", "opt_inprogress", 2),
                    card("item_3", ""),
                    issue("item_4", "opt_done", 4),
                ],
                "",
                false,
            )),
        });
        app
    }

    fn toast(app: &App) -> (String, NotificationLevel) {
        let n = app.notification().expect("notification");
        (n.message.clone(), n.level)
    }

    // -----------------------------------------------------------------------
    // TextBuffer
    // -----------------------------------------------------------------------

    #[test]
    fn test_text_buffer_editing() {
        let mut buf = TextBuffer::empty();
        for c in "hé llo".chars() {
            buf.insert(c);
        }
        assert_eq!(buf.cursor, 6);
        buf.move_left();
        buf.backspace();
        assert_eq!(buf.input, "hé lo");
        buf.end();
        buf.delete_word();
        assert_eq!(buf.input, "hé ");
        buf.home();
        assert_eq!(buf.cursor, 0);
        buf.move_left();
        assert_eq!(buf.cursor, 0);
    }

    #[test]
    fn test_text_buffer_apply() {
        let mut buf = TextBuffer::new("a".into());
        assert!(buf.apply(Action::InputNewline));
        assert!(buf.apply(Action::InputChar('b')));
        assert_eq!(buf.input, "a\nb");
        assert!(!buf.apply(Action::Quit));
        assert!(!TextBuffer::new(" \n ".into()).apply(Action::None));
        assert!(TextBuffer::new(" \n ".into()).is_blank());
    }

    // -----------------------------------------------------------------------
    // Bootstrap
    // -----------------------------------------------------------------------

    #[test]
    fn test_interactive_bootstrap() {
        let mut app = fresh_app();
        assert_eq!(app.start(), vec![Command::FetchOwners]);
        assert_eq!(app.mode(), Mode::Loading);

        let me = owner("octocat", OwnerKind::User);
        let org = owner("acme", OwnerKind::Organization);
        app.handle(Event::OwnersLoaded(Ok(vec![me, org.clone()])));
        assert!(matches!(app.screen, Screen::OwnerSelect(_)));
        assert_eq!(app.store.viewer_login(), Some("octocat"));

        press(&mut app, Action::SelectNextCard);
        let cmds = press(&mut app, Action::InputConfirm);
        assert_eq!(cmds, vec![Command::ListProjects(org)]);

        app.handle(Event::ProjectsLoaded(Ok(vec![project(1, "Roadmap"), project(2, "Bugs")])));
        let Screen::ProjectSelect(picker) = &app.screen else {
            panic!("expected project picker");
        };
        assert_eq!(picker.items.len(), 2);

        typed(&mut app, "bugs");
        let cmds = press(&mut app, Action::InputConfirm);
        assert_eq!(cmds, vec![Command::LoadFields { project_id: "proj_2".into() }]);
        assert_eq!(app.store.project().unwrap().number, 2);

        let cmds = app.handle(Event::FieldsLoaded(Ok(vec![priority_field(), status_field()])));
        let req = only_page_request(&cmds);
        assert_eq!(req.field_name, "Status");
        assert_eq!(req.cursor, "");
        assert_eq!(app.mode(), Mode::Board);
    }

    #[test]
    fn test_prefilled_bootstrap_skips_pickers() {
        let mut app = App::new(
            Prefill {
                owner: Some("acme".into()),
                project: Some(2),
                group_field: Some("Priority".into()),
            },
            50,
            Duration::from_secs(3),
        );
        assert_eq!(
            app.start(),
            vec![Command::FetchOwners, Command::ResolveOwner("acme".into())]
        );

        let org = owner("acme", OwnerKind::Organization);
        let cmds = app.handle(Event::OwnerResolved(Ok(org.clone())));
        assert_eq!(cmds, vec![Command::ListProjects(org)]);

        // The viewer list arriving late does not change screens
        app.handle(Event::OwnersLoaded(Ok(vec![owner("octocat", OwnerKind::User)])));
        assert_eq!(app.mode(), Mode::Loading);
        assert_eq!(app.store.viewer_login(), Some("octocat"));

        let cmds = app.handle(Event::ProjectsLoaded(Ok(vec![project(1, "A"), project(2, "B")])));
        assert_eq!(cmds, vec![Command::LoadFields { project_id: "proj_2".into() }]);

        let cmds = app.handle(Event::FieldsLoaded(Ok(vec![status_field(), priority_field()])));
        let req = only_page_request(&cmds);
        assert_eq!(req.field_name, "Priority");
        assert_eq!(req.page_size, 50);
    }

    #[test]
    fn test_viewer_failure_is_not_fatal_with_owner() {
        let mut app = App::new(
            Prefill {
                owner: Some("acme".into()),
                ..Prefill::default()
            },
            100,
            Duration::from_secs(3),
        );
        app.start();
        app.handle(Event::OwnersLoaded(Err(ApiError::GraphQl("boom".into()))));
        assert_eq!(app.mode(), Mode::Loading);
    }

    #[test]
    fn test_unknown_project_number_is_an_error() {
        let mut app = App::new(
            Prefill {
                owner: Some("acme".into()),
                project: Some(9),
                ..Prefill::default()
            },
            100,
            Duration::from_secs(3),
        );
        app.start();
        app.handle(Event::OwnerResolved(Ok(owner("acme", OwnerKind::Organization))));
        app.handle(Event::ProjectsLoaded(Ok(vec![project(1, "A")])));
        let Screen::Error { message } = &app.screen else {
            panic!("expected error screen");
        };
        assert!(message.contains("#9"));
    }

    #[test]
    fn test_unknown_field_name_is_an_error() {
        let mut app = App::new(
            Prefill {
                group_field: Some("Team".into()),
                ..Prefill::default()
            },
            100,
            Duration::from_secs(3),
        );
        app.loading("fields");
        app.handle(Event::FieldsLoaded(Ok(vec![status_field()])));
        assert_eq!(app.mode(), Mode::Error);

        // Any key exits from the error screen
        press(&mut app, Action::Quit);
        assert!(app.should_quit);
    }

    #[test]
    fn test_non_single_select_field_name_is_an_error() {
        let mut app = App::new(
            Prefill {
                group_field: Some("Notes".into()),
                ..Prefill::default()
            },
            100,
            Duration::from_secs(3),
        );
        app.loading("fields");
        app.handle(Event::FieldsLoaded(Ok(vec![field("f", "Notes", FieldType::Text, &[])])));
        let Screen::Error { message } = &app.screen else {
            panic!("expected error screen");
        };
        assert!(message.contains("TEXT"));
    }

    #[test]
    fn test_no_projects_and_fetch_failures_are_fatal() {
        let mut app = fresh_app();
        app.start();
        app.handle(Event::OwnersLoaded(Err(ApiError::Status {
            status: 401,
            body: "Bad credentials".into(),
        })));
        assert_eq!(app.mode(), Mode::Error);

        let mut app = fresh_app();
        app.owner = Some(owner("acme", OwnerKind::Organization));
        app.loading("projects");
        app.handle(Event::ProjectsLoaded(Ok(Vec::new())));
        let Screen::Error { message } = &app.screen else {
            panic!("expected error screen");
        };
        assert!(message.contains("No projects found for acme"));
    }

    #[test]
    fn test_no_single_select_fields_is_fatal() {
        let mut app = fresh_app();
        app.loading("fields");
        app.handle(Event::FieldsLoaded(Ok(vec![field("f", "Notes", FieldType::Text, &[])])));
        assert_eq!(app.mode(), Mode::Error);
    }

    #[test]
    fn test_several_fields_need_a_choice() {
        let mut app = fresh_app();
        app.store.set_project(project(1, "Roadmap"));
        app.loading("fields");
        let team = field("field_team", "Team", FieldType::SingleSelect, &["opt_a"]);
        app.handle(Event::FieldsLoaded(Ok(vec![priority_field(), team])));
        assert!(matches!(app.screen, Screen::FieldSelect { from_board: false, .. }));

        press(&mut app, Action::SelectNextCard);
        let req = only_page_request(&press(&mut app, Action::InputConfirm));
        assert_eq!(req.field_name, "Team");
    }

    #[test]
    fn test_escape_in_bootstrap_picker_quits() {
        let mut app = fresh_app();
        app.start();
        app.handle(Event::OwnersLoaded(Ok(vec![owner("octocat", OwnerKind::User)])));
        typed(&mut app, "zz");
        press(&mut app, Action::InputCancel);
        assert!(!app.should_quit, "first Esc clears the query");
        press(&mut app, Action::InputCancel);
        assert!(app.should_quit);
    }

    // -----------------------------------------------------------------------
    // Board and pagination
    // -----------------------------------------------------------------------

    #[test]
    fn test_columns_follow_option_order() {
        let app = board_app();
        let columns = app.columns();
        let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["todo", "inprogress", "done", "No Status"]);
        assert!(columns.iter().all(|c| c.card_ids.len() == 1));
        assert_eq!(columns[3].card_ids, vec!["item_3".to_string()]);
    }

    #[test]
    fn test_pages_stream_in() {
        let mut app = fresh_app();
        app.store.set_project(project(1, "Roadmap"));
        let req = only_page_request(&app.enter_board(status_field()));

        let cmds = app.handle(Event::PageLoaded {
            generation: req.generation,
            result: Ok(page(cards("a", 60, "opt_todo"), "c60", true)),
        });
        let next = only_page_request(&cmds);
        assert_eq!(next.cursor, "c60");
        // Cards are visible while the next page loads
        assert_eq!(app.columns()[0].card_ids.len(), 60);
        assert!(app.paginator.is_loading());

        let cmds = app.handle(Event::PageLoaded {
            generation: next.generation,
            result: Ok(page(cards("b", 40, ""), "", false)),
        });
        assert!(cmds.is_empty());
        assert_eq!(app.store.all_cards().len(), 100);
        assert_eq!(app.store.pagination(), (String::new(), false));
    }

    #[test]
    fn test_page_error_keeps_cards_and_can_resume() {
        let mut app = fresh_app();
        app.store.set_project(project(1, "Roadmap"));
        let req = only_page_request(&app.enter_board(status_field()));
        let next = only_page_request(&app.handle(Event::PageLoaded {
            generation: req.generation,
            result: Ok(page(cards("a", 5, ""), "c5", true)),
        }));
        app.handle(Event::PageLoaded {
            generation: next.generation,
            result: Err(ApiError::GraphQl("rate limited".into())),
        });
        let (msg, level) = toast(&app);
        assert!(msg.starts_with("Load failed"));
        assert_eq!(level, NotificationLevel::Error);
        assert_eq!(app.store.card_count(), 5);
        assert_eq!(app.mode(), Mode::Board);

        let resumed = only_page_request(&press(&mut app, Action::LoadMore));
        assert_eq!(resumed.cursor, "c5");
    }

    #[test]
    fn test_load_more_when_complete() {
        let mut app = board_app();
        assert!(press(&mut app, Action::LoadMore).is_empty());
        assert_eq!(toast(&app).0, "All cards loaded");
    }

    #[test]
    fn test_stale_page_after_regrouping_is_ignored() {
        let mut app = fresh_app();
        app.store.set_project(project(1, "Roadmap"));
        app.fields = vec![status_field(), priority_field()];
        let old = only_page_request(&app.enter_board(status_field()));

        press(&mut app, Action::ChangeGroupField);
        assert!(matches!(app.screen, Screen::FieldSelect { from_board: true, .. }));
        press(&mut app, Action::SelectNextCard);
        let new = only_page_request(&press(&mut app, Action::InputConfirm));
        assert_eq!(new.field_name, "Priority");
        assert!(new.generation > old.generation);

        let cmds = app.handle(Event::PageLoaded {
            generation: old.generation,
            result: Ok(page(cards("old", 3, "opt_todo"), "x", true)),
        });
        assert!(cmds.is_empty());
        assert_eq!(app.store.card_count(), 0);
    }

    #[test]
    fn test_change_field_escape_returns_to_board() {
        let mut app = board_app();
        press(&mut app, Action::ChangeGroupField);
        assert_eq!(app.mode(), Mode::Picker);
        press(&mut app, Action::InputCancel);
        assert_eq!(app.mode(), Mode::Board);
        assert_eq!(app.store.card_count(), 4);
    }

    #[test]
    fn test_reload_replaces_cards() {
        let mut app = board_app();
        let cmds = press(&mut app, Action::ReloadBoard);
        let [Command::LoadAllCards(req)] = cmds.as_slice() else {
            panic!("expected reload command, got {cmds:?}");
        };
        assert_eq!(app.store.card_count(), 0);

        app.handle(Event::AllCardsLoaded {
            generation: req.generation,
            result: Ok(cards("n", 7, "opt_done")),
        });
        assert_eq!(app.store.card_count(), 7);
        assert_eq!(app.columns()[2].card_ids.len(), 7);
        assert_eq!(toast(&app).0, "Reloaded 7 cards");
    }

    // -----------------------------------------------------------------------
    // Navigation & filters
    // -----------------------------------------------------------------------

    #[test]
    fn test_navigation_clamps() {
        let mut app = board_app();
        press(&mut app, Action::FocusPrevColumn);
        assert_eq!(app.view.focused_column, 0);
        for _ in 0..10 {
            press(&mut app, Action::FocusNextColumn);
        }
        assert_eq!(app.view.focused_column, 3);
        press(&mut app, Action::SelectNextCard);
        assert_eq!(app.selected_card().unwrap().item_id, "item_3");
    }

    #[test]
    fn test_selection_is_kept_per_column() {
        let mut app = board_app();
        app.store.upsert_cards(cards("t", 3, "opt_todo"));
        press(&mut app, Action::JumpToLastCard);
        assert_eq!(app.selected_card().unwrap().item_id, "t2");
        press(&mut app, Action::FocusNextColumn);
        press(&mut app, Action::FocusPrevColumn);
        assert_eq!(app.selected_card().unwrap().item_id, "t2");
        press(&mut app, Action::PageUp);
        assert_eq!(app.selected_card().unwrap().item_id, "item_1");
    }

    #[test]
    fn test_filter_applies_live_and_cancel_restores() {
        let mut app = board_app();
        press(&mut app, Action::StartFilter);
        assert_eq!(app.mode(), Mode::Filter);
        typed(&mut app, "item_2");
        let visible: usize = app.columns().iter().map(|c| c.card_ids.len()).sum();
        assert_eq!(visible, 1);

        press(&mut app, Action::InputCancel);
        let visible: usize = app.columns().iter().map(|c| c.card_ids.len()).sum();
        assert_eq!(visible, 4);

        press(&mut app, Action::StartFilter);
        typed(&mut app, "item_4");
        press(&mut app, Action::InputConfirm);
        assert_eq!(app.view.filter, "item_4");
        assert_eq!(app.columns()[2].card_ids, vec!["item_4".to_string()]);
        assert_eq!(app.columns()[2].total, 1);

        press(&mut app, Action::ClearFilters);
        assert!(app.view.filter.is_empty());
    }

    #[test]
    fn test_title_filter_prefers_substring() {
        let mut app = board_app();
        let titled = |id: &str, title: &str| {
            let mut c = card(id, "opt_todo");
            c.title = title.into();
            c
        };
        let batch = vec![
            titled("t1", "Add dark mode"),
            titled("t2", "Update docs"),
            titled("t3", "Fix login"),
        ];
        app.store.upsert_cards(batch);

        press(&mut app, Action::StartFilter);
        typed(&mut app, "AD");
        let todo = &app.columns()[0];
        assert_eq!(todo.card_ids, vec!["t1".to_string()]);

        // Nothing contains the query, so fuzzy matching takes over
        press(&mut app, Action::InputCancel);
        press(&mut app, Action::StartFilter);
        typed(&mut app, "fxlgn");
        assert_eq!(app.columns()[0].card_ids, vec!["t3".to_string()]);
    }

    #[test]
    fn test_title_filter_kinds() {
        let cards = vec![Card::new("a", "Update docs")];
        assert_eq!(TitleFilter::for_cards("  ", &cards), TitleFilter::All);
        assert_eq!(TitleFilter::for_cards("DOCS", &cards), TitleFilter::Substring("docs".into()));
        assert_eq!(TitleFilter::for_cards("udd", &cards), TitleFilter::Fuzzy("udd".into()));

        let matcher = SkimMatcherV2::default();
        let substring = TitleFilter::Substring("ad".into());
        assert!(substring.matches("Add dark mode", &matcher));
        assert!(!substring.matches("Update docs", &matcher));
        assert!(TitleFilter::Fuzzy("udd".into()).matches("Update docs", &matcher));
    }

    #[test]
    fn test_assigned_to_me() {
        let mut app = board_app();
        press(&mut app, Action::ToggleMine);
        let visible: Vec<String> = app.columns().into_iter().flat_map(|c| c.card_ids).collect();
        assert_eq!(visible, vec!["item_1".to_string()]);

        let mut anonymous = fresh_app();
        anonymous.screen = Screen::Board;
        press(&mut anonymous, Action::ToggleMine);
        assert!(!anonymous.view.mine_only);
        assert_eq!(toast(&anonymous).1, NotificationLevel::Error);
    }

    #[test]
    fn test_open_in_browser() {
        let mut app = board_app();
        assert_eq!(
            press(&mut app, Action::OpenInBrowser),
            vec![Command::OpenUrl("https://github.com/acme/app/issues/1".into())]
        );
        press(&mut app, Action::FocusNextColumn);
        press(&mut app, Action::FocusNextColumn);
        press(&mut app, Action::FocusNextColumn);
        assert!(press(&mut app, Action::OpenInBrowser).is_empty());
    }

    #[test]
    fn test_help_overlay() {
        let mut app = board_app();
        press(&mut app, Action::ShowHelp);
        assert_eq!(app.mode(), Mode::Help);
        press(&mut app, Action::ClosePanel);
        assert_eq!(app.mode(), Mode::Board);
    }

    // -----------------------------------------------------------------------
    // Moves
    // -----------------------------------------------------------------------

    fn start_move(app: &mut App, column: usize) -> Vec<Command> {
        press(app, Action::EnterMoveMode);
        assert_eq!(app.mode(), Mode::MoveTo);
        press(app, Action::MoveToColumn(column))
    }

    #[test]
    fn test_move_success() {
        let mut app = board_app();
        let cmds = start_move(&mut app, 2);
        let [Command::UpdateCardField { item_id, field_id, option_id, generation, .. }] = cmds.as_slice() else {
            panic!("expected update, got {cmds:?}");
        };
        assert_eq!(item_id, "item_1");
        assert_eq!(field_id, "field_status");
        assert_eq!(option_id, "opt_done");
        assert_eq!(app.store.card("item_1").unwrap().group_value, "opt_done");
        // Selection follows the card
        assert_eq!(app.view.focused_column, 2);
        assert_eq!(app.selected_card().unwrap().item_id, "item_1");

        app.handle(Event::MoveFinished {
            generation: *generation,
            item_id: "item_1".into(),
            result: Ok(()),
        });
        assert!(!app.moves.is_pending());
        assert_eq!(toast(&app).0, "Card moved");
    }

    #[test]
    fn test_move_failure_rolls_back() {
        let mut app = board_app();
        let cmds = start_move(&mut app, 2);
        let [Command::UpdateCardField { generation, .. }] = cmds.as_slice() else {
            panic!("expected update");
        };
        app.handle(Event::MoveFinished {
            generation: *generation,
            item_id: "item_1".into(),
            result: Err(ApiError::GraphQl("no access".into())),
        });
        assert_eq!(app.store.card("item_1").unwrap().group_value, "opt_todo");
        let (msg, level) = toast(&app);
        assert!(msg.starts_with("Move failed"));
        assert_eq!(level, NotificationLevel::Error);
        assert!(matches!(
            app.moves.failure().map(|f| &f.cause),
            Some(ApiError::GraphQl(_))
        ));
    }

    #[test]
    fn test_move_to_no_status_clears_value() {
        let mut app = board_app();
        let cmds = start_move(&mut app, 3);
        let [Command::UpdateCardField { option_id, .. }] = cmds.as_slice() else {
            panic!("expected update");
        };
        assert_eq!(option_id, "");
        assert_eq!(app.columns()[3].card_ids.len(), 2);
    }

    #[test]
    fn test_second_move_waits() {
        let mut app = board_app();
        start_move(&mut app, 2);
        press(&mut app, Action::FocusPrevColumn);
        let cmds = start_move(&mut app, 0);
        assert!(cmds.is_empty());
        assert_eq!(toast(&app).1, NotificationLevel::Error);
        assert_eq!(app.store.card("item_2").unwrap().group_value, "opt_inprogress");
    }

    #[test]
    fn test_move_to_same_or_missing_column() {
        let mut app = board_app();
        assert!(start_move(&mut app, 0).is_empty());
        assert!(toast(&app).0.starts_with("Already in"));
        assert!(start_move(&mut app, 8).is_empty());
        assert_eq!(toast(&app).0, "No column 9");
        assert_eq!(app.mode(), Mode::Board);
    }

    #[test]
    fn test_stale_move_failure_after_reload_does_not_roll_back() {
        let mut app = board_app();
        let cmds = start_move(&mut app, 2);
        let [Command::UpdateCardField { generation, .. }] = cmds.as_slice() else {
            panic!("expected update");
        };
        let generation = *generation;
        let reload = press(&mut app, Action::ReloadBoard);
        let [Command::LoadAllCards(req)] = reload.as_slice() else {
            panic!("expected reload");
        };
        app.handle(Event::AllCardsLoaded {
            generation: req.generation,
            result: Ok(vec![card("item_1", "opt_done")]),
        });
        app.handle(Event::MoveFinished {
            generation,
            item_id: "item_1".into(),
            result: Err(ApiError::GraphQl("late".into())),
        });
        assert_eq!(app.store.card("item_1").unwrap().group_value, "opt_done");
        assert!(toast(&app).0.starts_with("Move failed"));
    }

    // -----------------------------------------------------------------------
    // Detail & comments
    // -----------------------------------------------------------------------

    #[test]
    fn test_detail_loads_comments() {
        let mut app = board_app();
        let cmds = press(&mut app, Action::OpenCardDetail);
        assert_eq!(
            cmds,
            vec![Command::LoadComments {
                item_id: "item_1".into(),
                repo: "acme/app".into(),
                number: 1,
            }]
        );
        assert_eq!(app.mode(), Mode::Detail);

        // A result for another card is ignored
        app.handle(Event::CommentsLoaded {
            item_id: "item_2".into(),
            result: Ok(Vec::new()),
        });
        let Screen::Detail(d) = &app.screen else { panic!() };
        assert_eq!(d.comments, CommentsState::Loading);

        app.handle(Event::CommentsLoaded {
            item_id: "item_1".into(),
            result: Err(ApiError::NotFound("acme/app#1".into())),
        });
        let Screen::Detail(d) = &app.screen else { panic!() };
        assert!(matches!(d.comments, CommentsState::Failed(_)));

        press(&mut app, Action::ClosePanel);
        assert_eq!(app.mode(), Mode::Board);
    }

    #[test]
    fn test_draft_detail_has_no_comments() {
        let mut app = board_app();
        for _ in 0..3 {
            press(&mut app, Action::FocusNextColumn);
        }
        assert!(press(&mut app, Action::OpenCardDetail).is_empty());
        press(&mut app, Action::StartComment);
        assert_eq!(app.mode(), Mode::Detail);
    }

    #[test]
    fn test_compose_and_post_comment() {
        let mut app = board_app();
        press(&mut app, Action::OpenCardDetail);
        press(&mut app, Action::StartComment);
        assert_eq!(app.mode(), Mode::Compose);
        typed(&mut app, "LGTM");
        press(&mut app, Action::InputNewline);
        typed(&mut app, "ship it");

        let cmds = press(&mut app, Action::SubmitComment);
        assert_eq!(
            cmds,
            vec![Command::AddComment {
                item_id: "item_1".into(),
                repo: "acme/app".into(),
                number: 1,
                body: "LGTM\nship it".into(),
            }]
        );
        // Double submit is ignored while posting
        assert!(press(&mut app, Action::SubmitComment).is_empty());

        let cmds = app.handle(Event::CommentPosted {
            item_id: "item_1".into(),
            result: Ok(()),
        });
        assert!(matches!(cmds.as_slice(), [Command::LoadComments { .. }]));
        assert_eq!(app.mode(), Mode::Detail);
    }

    #[test]
    fn test_escape_with_draft_asks_first() {
        let mut app = board_app();
        press(&mut app, Action::OpenCardDetail);
        press(&mut app, Action::StartComment);
        press(&mut app, Action::InputCancel);
        assert_eq!(app.mode(), Mode::Detail, "empty draft closes silently");

        press(&mut app, Action::StartComment);
        typed(&mut app, "wip");
        press(&mut app, Action::InputCancel);
        assert_eq!(app.mode(), Mode::ConfirmDiscard);
        press(&mut app, Action::KeepEditing);
        assert_eq!(app.mode(), Mode::Compose);

        press(&mut app, Action::InputCancel);
        let cmds = press(&mut app, Action::SaveComment);
        assert!(matches!(cmds.as_slice(), [Command::AddComment { body, .. }] if body == "wip"));

        app.handle(Event::CommentPosted {
            item_id: "item_1".into(),
            result: Err(ApiError::GraphQl("locked".into())),
        });
        assert_eq!(app.mode(), Mode::Compose, "failed post keeps the draft");
        press(&mut app, Action::InputCancel);
        press(&mut app, Action::DiscardComment);
        assert_eq!(app.mode(), Mode::Board);
    }

    // -----------------------------------------------------------------------
    // Notifications & quitting
    // -----------------------------------------------------------------------

    #[test]
    fn test_notification_expires() {
        let mut app = App::new(Prefill::default(), 100, Duration::ZERO);
        app.notify("hi");
        app.handle(Event::Tick);
        assert!(app.notification().is_none());
    }

    #[test]
    fn test_force_quit_from_anywhere() {
        let mut app = board_app();
        press(&mut app, Action::OpenCardDetail);
        press(&mut app, Action::StartComment);
        press(&mut app, Action::ForceQuit);
        assert!(app.should_quit);
    }
}
