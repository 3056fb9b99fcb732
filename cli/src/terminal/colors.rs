use colored::Color;

pub const PRIMARY: Color = Color::BrightGreen;
pub const ACCENT: Color = Color::BrightYellow;
pub const SEPARATOR: Color = Color::BrightBlack;
pub const TEXT_DEFAULT: Color = Color::White;
pub const PATH: Color = Color::Cyan;

pub const SEVERITY_CRITICAL: Color = Color::BrightRed;
pub const SEVERITY_HIGH: Color = Color::Red;
pub const SEVERITY_MEDIUM: Color = Color::Yellow;
pub const SEVERITY_LOW: Color = Color::Blue;
