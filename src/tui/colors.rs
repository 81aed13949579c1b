//! Color constants for the terminal user interface.

use ratatui::style::Color;

/// Header and status bar background.
pub const ACCENT: Color = Color::Rgb(0, 80, 0);
/// Completed rows and secondary text.
pub const MUTED: Color = Color::DarkGray;
/// Rows waiting out the removal delay.
pub const REMOVING: Color = Color::Rgb(114, 0, 0);
/// Text on top of `ACCENT`.
pub const ON_ACCENT: Color = Color::White;
