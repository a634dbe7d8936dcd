use std::collections::HashMap;

use super::{BoardError, Card, FieldDef, Project, NO_GROUP_KEY};

/// Column key → card ids, sorted by id within each column.
pub type Columns = HashMap<String, Vec<String>>;

/// In-memory state of one project board.
///
/// Owned by a single orchestrator. Every accessor hands out copies, so callers
/// can never reach into the card table or the column index; all mutation goes
/// through the methods below.
#[derive(Debug, Default)]
pub struct BoardStore {
    project: Option<Project>,
    group_field: Option<FieldDef>,
    viewer_login: Option<String>,

    cards: HashMap<String, Card>,
    columns: Columns,

    cursor: String,
    has_next_page: bool,

    rollback: Option<Card>,
}

impl BoardStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_project(&mut self, project: Project) {
        self.project = Some(project);
    }

    pub fn project(&self) -> Option<&Project> {
        self.project.as_ref()
    }

    pub fn set_viewer_login(&mut self, login: impl Into<String>) {
        self.viewer_login = Some(login.into());
    }

    pub fn viewer_login(&self) -> Option<&str> {
        self.viewer_login.as_deref()
    }

    /// Replace the grouping field and rebuild the column index.
    pub fn set_group_field(&mut self, field: FieldDef) {
        self.group_field = Some(field);
        self.rebuild_columns();
    }

    pub fn group_field(&self) -> Option<&FieldDef> {
        self.group_field.as_ref()
    }

    /// Insert or overwrite each card by id, then rebuild once.
    pub fn upsert_cards(&mut self, cards: impl IntoIterator<Item = Card>) {
        for card in cards {
            self.cards.insert(card.item_id.clone(), card);
        }
        self.rebuild_columns();
    }

    pub fn card(&self, item_id: &str) -> Result<Card, BoardError> {
        self.cards
            .get(item_id)
            .cloned()
            .ok_or_else(|| BoardError::CardNotFound(item_id.to_string()))
    }

    pub fn all_cards(&self) -> Vec<Card> {
        self.cards.values().cloned().collect()
    }

    pub fn card_count(&self) -> usize {
        self.cards.len()
    }

    /// A copy of the column index.
    pub fn columns(&self) -> Result<Columns, BoardError> {
        if self.group_field.is_none() {
            return Err(BoardError::NoGroupField);
        }
        Ok(self.columns.clone())
    }

    /// A copy of one column's card ids; empty for unknown keys.
    pub fn column_card_ids(&self, key: &str) -> Vec<String> {
        self.columns.get(key).cloned().unwrap_or_default()
    }

    /// Optimistically regroup a card. The previous state of the card replaces
    /// whatever sits in the rollback slot.
    pub fn move_card(&mut self, item_id: &str, new_value: &str) -> Result<(), BoardError> {
        let card = self
            .cards
            .get_mut(item_id)
            .ok_or_else(|| BoardError::CardNotFound(item_id.to_string()))?;
        self.rollback = Some(card.clone());
        card.group_value = new_value.to_string();
        self.rebuild_columns();
        Ok(())
    }

    /// Undo the most recent move.
    pub fn rollback_move(&mut self) -> Result<Card, BoardError> {
        let card = self.rollback.take().ok_or(BoardError::NoRollbackState)?;
        self.cards.insert(card.item_id.clone(), card.clone());
        self.rebuild_columns();
        Ok(card)
    }

    pub fn rollback_pending(&self) -> bool {
        self.rollback.is_some()
    }

    /// Check that `value` is an option of the active grouping field.
    /// The empty string (ungrouped) is always accepted.
    pub fn validate_option(&self, value: &str) -> Result<(), BoardError> {
        let field = self.group_field.as_ref().ok_or(BoardError::NoGroupField)?;
        if value.is_empty() || field.has_option(value) {
            Ok(())
        } else {
            Err(BoardError::InvalidOption(value.to_string()))
        }
    }

    pub fn set_pagination(&mut self, cursor: impl Into<String>, has_next_page: bool) {
        self.cursor = cursor.into();
        self.has_next_page = has_next_page;
    }

    pub fn pagination(&self) -> (String, bool) {
        (self.cursor.clone(), self.has_next_page)
    }

    /// Drop cards, columns, pagination and rollback state. Project and
    /// grouping field survive.
    pub fn clear(&mut self) {
        self.cards.clear();
        self.columns.clear();
        self.cursor.clear();
        self.has_next_page = false;
        self.rollback = None;
    }

    /// `clear` plus forgetting the project and grouping field.
    pub fn reset(&mut self) {
        self.project = None;
        self.group_field = None;
        self.clear();
    }

    /// Recompute the whole column index from the card table.
    fn rebuild_columns(&mut self) {
        let mut columns = Columns::new();
        for (item_id, card) in &self.cards {
            let key = if card.group_value.is_empty() {
                NO_GROUP_KEY
            } else {
                card.group_value.as_str()
            };
            columns.entry(key.to_string()).or_default().push(item_id.clone());
        }
        for ids in columns.values_mut() {
            ids.sort_unstable();
        }
        self.columns = columns;
    }
}
