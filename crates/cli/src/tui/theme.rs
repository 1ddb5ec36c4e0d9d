//! Centralized TUI theme built on ratatui's Tailwind CSS palette.

use ratatui::style::Color;
use ratatui::style::palette::tailwind;

/// The application theme — all visual tokens in one place.
pub struct Theme {
    /// Dimmed foreground for less prominent text.
    pub fg_dim: Color,
    /// Muted foreground for minimal-emphasis elements.
    pub fg_muted: Color,
    /// Default border color for panels and widgets.
    pub border: Color,
    /// Border color for the active composer.
    pub border_active: Color,

    /// Primary accent/brand color.
    pub accent: Color,

    /// Color for warning indicators (system-instruction badge).
    pub warning: Color,
    /// Color for error indicators.
    pub error: Color,
    /// Color for informational indicators.
    pub info: Color,

    /// Label color for user messages in chat.
    pub user_label: Color,
    /// Label color for model responses in chat.
    pub model_label: Color,
    /// Color for local notice entries.
    pub notice: Color,

    /// Spinner animation color in the status bar.
    pub status_spinner: Color,
    /// Hint/keybinding text color in the status bar.
    pub status_hint: Color,
}

impl Theme {
    /// The default dark theme using Tailwind palette.
    pub const fn default_dark() -> Self {
        Self {
            fg_dim: tailwind::SLATE.c400,
            fg_muted: tailwind::SLATE.c500,
            border: tailwind::SLATE.c700,
            border_active: tailwind::SKY.c500,

            accent: tailwind::SKY.c400,

            warning: tailwind::AMBER.c500,
            error: tailwind::RED.c500,
            info: tailwind::SKY.c500,

            user_label: tailwind::CYAN.c400,
            model_label: tailwind::VIOLET.c400,
            notice: tailwind::SLATE.c400,

            status_spinner: tailwind::AMBER.c400,
            status_hint: tailwind::SLATE.c500,
        }
    }
}

/// Global theme instance.
pub const THEME: Theme = Theme::default_dark();
