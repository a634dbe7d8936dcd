/// All possible semantic actions in ghboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    // Navigation
    FocusPrevColumn,
    FocusNextColumn,
    SelectPrevCard,
    SelectNextCard,
    JumpToFirstCard,
    JumpToLastCard,
    PageDown,
    PageUp,

    // Card actions
    EnterMoveMode,
    MoveToColumn(usize),
    OpenInBrowser,
    OpenCardDetail,
    ClosePanel,
    DetailScrollUp,
    DetailScrollDown,
    StartComment,
    SubmitComment,

    // Board
    ReloadBoard,
    LoadMore,
    ChangeGroupField,
    ToggleMine,
    StartFilter,
    ClearFilters,
    ShowHelp,
    Quit,
    ForceQuit,

    // Text input
    InputConfirm,
    InputCancel,
    InputChar(char),
    InputNewline,
    InputBackspace,
    InputLeft,
    InputRight,
    InputHome,
    InputEnd,
    InputDeleteWord,

    // Unsaved comment prompt
    DiscardComment,
    KeepEditing,
    SaveComment,

    // No-op
    None,
}
