//! Background loading of project items, one page at a time.
//!
//! Every load is stamped with a generation. Changing the grouping field or
//! reloading bumps it, and any response carrying an older generation is
//! dropped on arrival.

use tracing::{debug, warn};

use super::store::BoardStore;
use super::{BoardError, Card};
use crate::github::{ApiError, CardPage, ProjectsApi};

pub const DEFAULT_PAGE_SIZE: u32 = 100;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Everything the worker needs to fetch one page (or, for a reload, all of
/// them starting at `cursor`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub generation: u64,
    pub project_id: String,
    pub field_name: String,
    pub cursor: String,
    pub page_size: u32,
}

/// What to do after a page arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    /// The page belonged to a superseded load and was dropped.
    Stale,
    /// Applied; fetch this next.
    Next(PageRequest),
    /// Applied; nothing left to fetch.
    Done,
}

#[derive(Debug)]
pub struct Paginator {
    generation: u64,
    page_size: u32,
    in_flight: bool,
    reloading: bool,
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl Paginator {
    pub fn new(page_size: u32) -> Self {
        Self {
            generation: 0,
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
            in_flight: false,
            reloading: false,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight || self.reloading
    }

    pub fn is_reloading(&self) -> bool {
        self.reloading
    }

    /// Supersede whatever is in flight.
    pub fn invalidate(&mut self) {
        self.generation += 1;
        self.in_flight = false;
        self.reloading = false;
    }

    /// Start a fresh incremental load from the first page.
    pub fn start(&mut self, store: &mut BoardStore) -> Result<PageRequest, BoardError> {
        let request = self.request(store, String::new())?;
        self.invalidate();
        store.set_pagination("", false);
        self.in_flight = true;
        Ok(PageRequest {
            generation: self.generation,
            ..request
        })
    }

    /// Apply a page. Only the current generation touches the store.
    pub fn on_page(
        &mut self,
        store: &mut BoardStore,
        generation: u64,
        page: CardPage,
    ) -> Result<PageOutcome, BoardError> {
        if generation != self.generation || !self.in_flight {
            debug!(generation, current = self.generation, "dropping stale page");
            return Ok(PageOutcome::Stale);
        }

        let (previous_cursor, _) = store.pagination();
        let count = page.cards.len();
        store.upsert_cards(page.cards);

        let repeated = !previous_cursor.is_empty() && page.next_cursor == previous_cursor;
        if repeated {
            warn!(cursor = %page.next_cursor, "server repeated a cursor, stopping");
        }
        if page.has_more && !page.next_cursor.is_empty() && !repeated {
            store.set_pagination(page.next_cursor.clone(), true);
            debug!(count, total = store.card_count(), "page applied, fetching next");
            let request = self.request(store, page.next_cursor)?;
            return Ok(PageOutcome::Next(request));
        }

        store.set_pagination("", false);
        self.in_flight = false;
        debug!(count, total = store.card_count(), "all pages loaded");
        Ok(PageOutcome::Done)
    }

    /// A page request failed. Loaded cards stay, and the stored cursor lets
    /// [`Paginator::request_more`] resume. Returns whether the error was
    /// for the current load.
    pub fn on_error(&mut self, generation: u64) -> bool {
        if generation != self.generation {
            return false;
        }
        self.in_flight = false;
        true
    }

    /// Manually fetch the next page, if the server said there is one.
    pub fn request_more(&mut self, store: &BoardStore) -> Result<Option<PageRequest>, BoardError> {
        if self.is_loading() {
            return Ok(None);
        }
        let (cursor, has_more) = store.pagination();
        if !has_more || cursor.is_empty() {
            return Ok(None);
        }
        let request = self.request(store, cursor)?;
        self.in_flight = true;
        Ok(Some(request))
    }

    /// Clear the store and supersede everything; the returned request is
    /// meant for [`fetch_all_cards`].
    pub fn begin_reload(&mut self, store: &mut BoardStore) -> Result<PageRequest, BoardError> {
        let request = self.request(store, String::new())?;
        store.clear();
        self.invalidate();
        self.reloading = true;
        Ok(PageRequest {
            generation: self.generation,
            ..request
        })
    }

    /// Apply the result of a full reload in one upsert.
    pub fn on_reload(&mut self, store: &mut BoardStore, generation: u64, cards: Vec<Card>) -> bool {
        if generation != self.generation || !self.reloading {
            debug!(generation, current = self.generation, "dropping stale reload");
            return false;
        }
        store.upsert_cards(cards);
        store.set_pagination("", false);
        self.reloading = false;
        true
    }

    pub fn on_reload_error(&mut self, generation: u64) -> bool {
        if generation != self.generation {
            return false;
        }
        self.reloading = false;
        true
    }

    fn request(&self, store: &BoardStore, cursor: String) -> Result<PageRequest, BoardError> {
        let project = store.project().ok_or(BoardError::NoProject)?;
        let field = store.group_field().ok_or(BoardError::NoGroupField)?;
        Ok(PageRequest {
            generation: self.generation,
            project_id: project.id.clone(),
            field_name: field.name.clone(),
            cursor,
            page_size: self.page_size,
        })
    }
}

/// Walk every page starting at `request.cursor` and return all cards.
pub async fn fetch_all_cards(
    api: &dyn ProjectsApi,
    request: &PageRequest,
) -> Result<Vec<Card>, ApiError> {
    let mut cards = Vec::new();
    let mut cursor = request.cursor.clone();
    loop {
        let page = api
            .card_page(&request.project_id, &request.field_name, &cursor, request.page_size)
            .await?;
        cards.extend(page.cards);
        if !page.has_more || page.next_cursor.is_empty() || page.next_cursor == cursor {
            break;
        }
        cursor = page.next_cursor;
    }
    debug!(count = cards.len(), "reload fetched all pages");
    Ok(cards)
}
