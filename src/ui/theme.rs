use ratatui::style::{Color, Style};

/// Color theme for ghboard.
///
/// All text and UI chrome uses the terminal's default foreground color (Color::Reset).
/// Only column dots, labels and state signals get color.
pub struct Theme;

impl Theme {
    // Base: terminal default foreground
    pub const FG: Color = Color::Reset;
    pub const DIM: Color = Color::DarkGray;

    // Column
    pub const COLUMN_HEADER: Color = Color::Reset;
    pub const COLUMN_BORDER: Color = Color::DarkGray;
    pub const COLUMN_FOCUSED_BORDER: Color = Color::Reset;
    pub const MOVE_TARGET: Color = Color::Cyan;

    // Card
    pub const CARD_BORDER: Color = Color::Reset;
    pub const CARD_TITLE: Color = Color::Reset;
    pub const CARD_PENDING: Color = Color::Yellow;
    pub const ASSIGNEE: Color = Color::Cyan;

    // Status bar
    pub const STATUS_ERROR: Color = Color::Red;
    pub const LOADING: Color = Color::Yellow;

    // Hint popup
    pub const HINT_KEY: Color = Color::Reset;
    pub const HINT_DESC: Color = Color::Reset;

    pub fn dim_style() -> Style {
        Style::default().fg(Self::DIM)
    }

    pub fn status_style() -> Style {
        Style::default().fg(Self::FG)
    }

    /// Terminal color for a single-select option color name (`"GREEN"`, ...).
    pub fn option_color(name: &str) -> Color {
        match name.to_ascii_uppercase().as_str() {
            "RED" => Color::Red,
            "ORANGE" => Color::LightRed,
            "YELLOW" => Color::Yellow,
            "GREEN" => Color::Green,
            "BLUE" => Color::Blue,
            "PURPLE" => Color::Magenta,
            "PINK" => Color::LightMagenta,
            "GRAY" => Color::Gray,
            _ => Self::DIM,
        }
    }

    /// Assign a consistent color to a label based on its name.
    pub fn label_color(label: &str) -> Color {
        let hash = label
            .bytes()
            .fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32));
        const PALETTE: [Color; 12] = [
            Color::Cyan,
            Color::Green,
            Color::Magenta,
            Color::Blue,
            Color::Yellow,
            Color::Red,
            Color::LightCyan,
            Color::LightGreen,
            Color::LightMagenta,
            Color::LightBlue,
            Color::LightYellow,
            Color::LightRed,
        ];
        PALETTE[(hash % PALETTE.len() as u32) as usize]
    }

    /// Issue/PR state color: open green, closed/merged dimmed.
    pub fn state_color(state: &str) -> Color {
        match state {
            "OPEN" => Color::Green,
            "MERGED" => Color::Magenta,
            "CLOSED" => Color::Red,
            _ => Self::DIM,
        }
    }
}
