use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use super::action::Action;
use crate::app::Mode;

/// Map a key event to a semantic action based on current mode.
pub fn map_key(key: KeyEvent, mode: Mode) -> Action {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Action::ForceQuit;
    }
    match mode {
        Mode::Loading => match key.code {
            KeyCode::Esc | KeyCode::Char('q') => Action::Quit,
            _ => Action::None,
        },
        // The error screen only waits for a key to exit
        Mode::Error => Action::Quit,
        Mode::Picker => map_picker(key),
        Mode::Board => map_board(key),
        Mode::MoveTo => map_move_to(key),
        Mode::Filter => map_input(key),
        Mode::Help => match key.code {
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?') => Action::ClosePanel,
            _ => Action::None,
        },
        Mode::Detail => map_detail(key),
        Mode::Compose => map_compose(key),
        Mode::ConfirmDiscard => match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => Action::DiscardComment,
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => Action::KeepEditing,
            KeyCode::Char('s') | KeyCode::Char('S') => Action::SaveComment,
            _ => Action::None,
        },
    }
}

fn map_board(key: KeyEvent) -> Action {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('d') if ctrl => Action::PageDown,
        KeyCode::Char('u') if ctrl => Action::PageUp,
        KeyCode::Char('h') | KeyCode::Left => Action::FocusPrevColumn,
        KeyCode::Char('l') | KeyCode::Right => Action::FocusNextColumn,
        KeyCode::Char('j') | KeyCode::Down => Action::SelectNextCard,
        KeyCode::Char('k') | KeyCode::Up => Action::SelectPrevCard,
        KeyCode::Char('g') => Action::JumpToFirstCard,
        KeyCode::Char('G') => Action::JumpToLastCard,
        KeyCode::Char('m') => Action::EnterMoveMode,
        KeyCode::Char('o') => Action::OpenInBrowser,
        KeyCode::Enter => Action::OpenCardDetail,
        KeyCode::Char('r') => Action::ReloadBoard,
        KeyCode::Char('L') => Action::LoadMore,
        KeyCode::Char('f') => Action::ChangeGroupField,
        KeyCode::Char('a') => Action::ToggleMine,
        KeyCode::Char('/') => Action::StartFilter,
        KeyCode::Esc => Action::ClearFilters,
        KeyCode::Char('?') => Action::ShowHelp,
        KeyCode::Char('q') => Action::Quit,
        _ => Action::None,
    }
}

fn map_move_to(key: KeyEvent) -> Action {
    match key.code {
        KeyCode::Char(c @ '1'..='9') => Action::MoveToColumn(c as usize - '1' as usize),
        KeyCode::Esc | KeyCode::Char('q') => Action::InputCancel,
        _ => Action::None,
    }
}

fn map_input(key: KeyEvent) -> Action {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Enter => Action::InputConfirm,
        KeyCode::Esc => Action::InputCancel,
        KeyCode::Char('a') if ctrl => Action::InputHome,
        KeyCode::Char('e') if ctrl => Action::InputEnd,
        KeyCode::Char('w') if ctrl => Action::InputDeleteWord,
        KeyCode::Char(_) if ctrl => Action::None,
        KeyCode::Char(c) => Action::InputChar(c),
        KeyCode::Backspace => Action::InputBackspace,
        KeyCode::Left => Action::InputLeft,
        KeyCode::Right => Action::InputRight,
        KeyCode::Home => Action::InputHome,
        KeyCode::End => Action::InputEnd,
        _ => Action::None,
    }
}

/// Pickers take typed characters as a filter, so navigation stays off the
/// letter keys.
fn map_picker(key: KeyEvent) -> Action {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Down | KeyCode::Tab => Action::SelectNextCard,
        KeyCode::Up | KeyCode::BackTab => Action::SelectPrevCard,
        KeyCode::Char('n') | KeyCode::Char('j') if ctrl => Action::SelectNextCard,
        KeyCode::Char('p') | KeyCode::Char('k') if ctrl => Action::SelectPrevCard,
        _ => map_input(key),
    }
}

fn map_detail(key: KeyEvent) -> Action {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('d') if ctrl => Action::PageDown,
        KeyCode::Char('u') if ctrl => Action::PageUp,
        KeyCode::Esc | KeyCode::Char('q') => Action::ClosePanel,
        KeyCode::Char('o') => Action::OpenInBrowser,
        KeyCode::Char('c') => Action::StartComment,
        KeyCode::Char('j') | KeyCode::Down => Action::DetailScrollDown,
        KeyCode::Char('k') | KeyCode::Up => Action::DetailScrollUp,
        KeyCode::Char('g') => Action::JumpToFirstCard,
        KeyCode::Char('G') => Action::JumpToLastCard,
        _ => Action::None,
    }
}

fn map_compose(key: KeyEvent) -> Action {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('s') if ctrl => Action::SubmitComment,
        KeyCode::Enter => Action::InputNewline,
        _ => map_input(key),
    }
}

// ---------------------------------------------------------------------------
// Binding registry: keybinding documentation.
// Used by the help overlay and status bar hints.
// ---------------------------------------------------------------------------

/// A documented keybinding for display in help and hints.
pub struct Binding {
    pub key: &'static str,
    pub description: &'static str,
    /// Show in the status bar hint line?
    pub hint: bool,
}

/// A group of related bindings (one section in help).
pub struct BindingGroup {
    pub name: &'static str,
    pub bindings: &'static [Binding],
}

pub const BOARD_BINDINGS: &[Binding] = &[
    Binding { key: "h / l", description: "Switch columns", hint: true },
    Binding { key: "j / k", description: "Move between cards", hint: true },
    Binding { key: "g / G", description: "First/last card", hint: false },
    Binding { key: "C-d / C-u", description: "Page down/up", hint: false },
    Binding { key: "m", description: "Move card to column", hint: true },
    Binding { key: "Enter", description: "Open card detail", hint: true },
    Binding { key: "o", description: "Open in browser", hint: false },
    Binding { key: "/", description: "Filter by title", hint: true },
    Binding { key: "a", description: "Only cards assigned to me", hint: false },
    Binding { key: "Esc", description: "Clear filters", hint: false },
    Binding { key: "f", description: "Change grouping field", hint: true },
    Binding { key: "r", description: "Reload all cards", hint: false },
    Binding { key: "L", description: "Load next page", hint: false },
    Binding { key: "?", description: "Help", hint: true },
    Binding { key: "q", description: "Quit", hint: true },
];

pub const MOVE_BINDINGS: &[Binding] = &[
    Binding { key: "1-9", description: "Move to column N", hint: true },
    Binding { key: "Esc", description: "Cancel", hint: true },
];

pub const DETAIL_BINDINGS: &[Binding] = &[
    Binding { key: "j / k", description: "Scroll", hint: true },
    Binding { key: "C-d / C-u", description: "Page down/up", hint: false },
    Binding { key: "g / G", description: "Top/bottom", hint: false },
    Binding { key: "c", description: "Write a comment", hint: true },
    Binding { key: "o", description: "Open in browser", hint: true },
    Binding { key: "q / Esc", description: "Back to board", hint: true },
];

pub const COMPOSE_BINDINGS: &[Binding] = &[
    Binding { key: "C-s", description: "Post comment", hint: true },
    Binding { key: "Enter", description: "New line", hint: false },
    Binding { key: "Esc", description: "Stop writing", hint: true },
];

pub const PICKER_BINDINGS: &[Binding] = &[
    Binding { key: "Up / Down", description: "Move selection", hint: true },
    Binding { key: "type", description: "Filter", hint: true },
    Binding { key: "Enter", description: "Select", hint: true },
    Binding { key: "Esc", description: "Clear filter / back", hint: true },
];

/// All binding groups for the help overlay.
pub const HELP_GROUPS: &[BindingGroup] = &[
    BindingGroup { name: "Board", bindings: BOARD_BINDINGS },
    BindingGroup { name: "Move (m)", bindings: MOVE_BINDINGS },
    BindingGroup { name: "Card Detail", bindings: DETAIL_BINDINGS },
    BindingGroup { name: "Comment", bindings: COMPOSE_BINDINGS },
    BindingGroup { name: "Pickers", bindings: PICKER_BINDINGS },
];

/// Bindings worth hinting at in the status bar for a mode.
pub fn mode_bindings(mode: Mode) -> &'static [Binding] {
    match mode {
        Mode::Board => BOARD_BINDINGS,
        Mode::MoveTo => MOVE_BINDINGS,
        Mode::Detail => DETAIL_BINDINGS,
        Mode::Compose => COMPOSE_BINDINGS,
        Mode::Picker => PICKER_BINDINGS,
        _ => &[],
    }
}
