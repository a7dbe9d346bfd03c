use colored::Color;

pub const PRIMARY: Color = Color::TrueColor { r: 94, g: 196, b: 255 };
pub const ACCENT: Color = Color::TrueColor { r: 255, g: 201, b: 87 };
pub const SEPARATOR: Color = Color::BrightBlack;
pub const TEXT_DEFAULT: Color = Color::White;

pub const IPV4_ADDR: Color = Color::TrueColor { r: 126, g: 231, b: 135 };
pub const IPV6_ADDR: Color = Color::TrueColor { r: 171, g: 155, b: 255 };
pub const HOSTNAME: Color = Color::TrueColor { r: 94, g: 196, b: 255 };
pub const REGION: Color = Color::TrueColor { r: 255, g: 201, b: 87 };

pub const ALLOWED: Color = Color::BrightRed;
pub const DENIED: Color = Color::Green;
pub const FAILED: Color = Color::Yellow;
pub const NOT_ATTEMPTED: Color = Color::BrightBlack;
