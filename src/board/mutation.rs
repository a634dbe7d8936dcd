//! Optimistic card moves: apply locally, then confirm or roll back once the
//! remote update reports back.

use super::store::BoardStore;
use super::BoardError;
use crate::github::ApiError;

/// A move applied locally whose remote update has not finished yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMove {
    pub item_id: String,
    /// Option id the card was moved to; empty means ungrouped.
    pub target: String,
    pub field_id: String,
    pub project_id: String,
    /// Board generation the move was issued under.
    pub generation: u64,
}

/// A move the server refused, already rolled back locally.
#[derive(Debug)]
pub struct MoveFailure {
    pub item_id: String,
    pub title: String,
    pub cause: ApiError,
}

#[derive(Debug, Default)]
pub enum MoveState {
    #[default]
    Idle,
    Pending(PendingMove),
    RolledBack(MoveFailure),
}

/// Tracks the single move that may be in flight.
///
/// Moves are serialized: a second move is refused while one is pending, so
/// the store's rollback slot always belongs to the pending move.
#[derive(Debug, Default)]
pub struct MoveTracker {
    state: MoveState,
}

impl MoveTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &MoveState {
        &self.state
    }

    pub fn pending(&self) -> Option<&PendingMove> {
        match &self.state {
            MoveState::Pending(pending) => Some(pending),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending().is_some()
    }

    /// Validate and apply a move locally. The returned [`PendingMove`]
    /// describes the remote update to issue.
    pub fn begin(
        &mut self,
        store: &mut BoardStore,
        item_id: &str,
        target: &str,
        generation: u64,
    ) -> Result<PendingMove, BoardError> {
        if let Some(pending) = self.pending() {
            return Err(BoardError::MoveInFlight(pending.item_id.clone()));
        }
        let project_id = store.project().ok_or(BoardError::NoProject)?.id.clone();
        let field_id = store
            .group_field()
            .ok_or(BoardError::NoGroupField)?
            .id
            .clone();
        store.validate_option(target)?;
        store.move_card(item_id, target)?;

        let pending = PendingMove {
            item_id: item_id.to_string(),
            target: target.to_string(),
            field_id,
            project_id,
            generation,
        };
        self.state = MoveState::Pending(pending.clone());
        Ok(pending)
    }

    /// The server accepted the move. Returns false when `item_id` is not the
    /// pending move.
    pub fn confirm(&mut self, item_id: &str) -> bool {
        if self.pending().is_some_and(|p| p.item_id == item_id) {
            self.state = MoveState::Idle;
            true
        } else {
            false
        }
    }

    /// The server refused the move: restore the card and keep the cause.
    pub fn fail(
        &mut self,
        store: &mut BoardStore,
        item_id: &str,
        cause: ApiError,
    ) -> Result<(), BoardError> {
        if !self.pending().is_some_and(|p| p.item_id == item_id) {
            return Err(BoardError::NoRollbackState);
        }
        let restored = store.rollback_move()?;
        self.state = MoveState::RolledBack(MoveFailure {
            item_id: restored.item_id,
            title: restored.title,
            cause,
        });
        Ok(())
    }

    /// The last refused move, until acknowledged.
    pub fn failure(&self) -> Option<&MoveFailure> {
        match &self.state {
            MoveState::RolledBack(failure) => Some(failure),
            _ => None,
        }
    }

    /// Hand the failure to the caller and return to idle.
    pub fn acknowledge(&mut self) -> Option<MoveFailure> {
        match std::mem::take(&mut self.state) {
            MoveState::RolledBack(failure) => Some(failure),
            other => {
                self.state = other;
                None
            }
        }
    }

    /// Forget any pending move, e.g. after the store was cleared.
    pub fn abandon(&mut self) -> Option<PendingMove> {
        match std::mem::take(&mut self.state) {
            MoveState::Pending(pending) => Some(pending),
            other => {
                self.state = other;
                None
            }
        }
    }
}
