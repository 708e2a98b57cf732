//! Color constants for the terminal user interface.

use ratatui::style::Color;

// Column accents follow the board's status progression.

/// Nuevo column.
pub const COLUMN_CYAN: Color = Color::Rgb(0, 150, 170);
/// En curso column.
pub const COLUMN_BLUE: Color = Color::Rgb(60, 90, 200);
/// Completo column.
pub const COLUMN_AMBER: Color = Color::Rgb(200, 150, 0);
/// Terminado column.
pub const COLUMN_GREEN: Color = Color::Rgb(0, 130, 60);

/// Deadline badge: overdue or due within two days.
pub const URGENT_RED: Color = Color::Rgb(200, 40, 40);
/// Deadline badge: due this week.
pub const WARNING_ORANGE: Color = Color::Rgb(220, 130, 30);
/// Deadline badge: comfortably ahead.
pub const SAFE_GREEN: Color = Color::Rgb(40, 160, 80);
