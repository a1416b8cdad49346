use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The sixteen console colors a sender can be shown in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DisplayColor {
    Black,
    DarkBlue,
    DarkGreen,
    DarkCyan,
    DarkRed,
    DarkMagenta,
    DarkYellow,
    #[default]
    Gray,
    DarkGray,
    Blue,
    Green,
    Cyan,
    Red,
    Magenta,
    Yellow,
    White,
}

impl DisplayColor {
    pub const ALL: [DisplayColor; 16] = [
        DisplayColor::Black,
        DisplayColor::DarkBlue,
        DisplayColor::DarkGreen,
        DisplayColor::DarkCyan,
        DisplayColor::DarkRed,
        DisplayColor::DarkMagenta,
        DisplayColor::DarkYellow,
        DisplayColor::Gray,
        DisplayColor::DarkGray,
        DisplayColor::Blue,
        DisplayColor::Green,
        DisplayColor::Cyan,
        DisplayColor::Red,
        DisplayColor::Magenta,
        DisplayColor::Yellow,
        DisplayColor::White,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DisplayColor::Black => "Black",
            DisplayColor::DarkBlue => "DarkBlue",
            DisplayColor::DarkGreen => "DarkGreen",
            DisplayColor::DarkCyan => "DarkCyan",
            DisplayColor::DarkRed => "DarkRed",
            DisplayColor::DarkMagenta => "DarkMagenta",
            DisplayColor::DarkYellow => "DarkYellow",
            DisplayColor::Gray => "Gray",
            DisplayColor::DarkGray => "DarkGray",
            DisplayColor::Blue => "Blue",
            DisplayColor::Green => "Green",
            DisplayColor::Cyan => "Cyan",
            DisplayColor::Red => "Red",
            DisplayColor::Magenta => "Magenta",
            DisplayColor::Yellow => "Yellow",
            DisplayColor::White => "White",
        }
    }

    /// ANSI SGR foreground sequence for terminals.
    pub fn ansi(self) -> &'static str {
        match self {
            DisplayColor::Black => "\x1b[30m",
            DisplayColor::DarkRed => "\x1b[31m",
            DisplayColor::DarkGreen => "\x1b[32m",
            DisplayColor::DarkYellow => "\x1b[33m",
            DisplayColor::DarkBlue => "\x1b[34m",
            DisplayColor::DarkMagenta => "\x1b[35m",
            DisplayColor::DarkCyan => "\x1b[36m",
            DisplayColor::Gray => "\x1b[37m",
            DisplayColor::DarkGray => "\x1b[90m",
            DisplayColor::Red => "\x1b[91m",
            DisplayColor::Green => "\x1b[92m",
            DisplayColor::Yellow => "\x1b[93m",
            DisplayColor::Blue => "\x1b[94m",
            DisplayColor::Magenta => "\x1b[95m",
            DisplayColor::Cyan => "\x1b[96m",
            DisplayColor::White => "\x1b[97m",
        }
    }

    pub const RESET: &'static str = "\x1b[0m";
}

impl fmt::Display for DisplayColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown display color `{0}`")]
pub struct UnknownColor(pub String);

impl FromStr for DisplayColor {
    type Err = UnknownColor;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DisplayColor::ALL
            .into_iter()
            .find(|color| color.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownColor(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!("darkred".parse::<DisplayColor>(), Ok(DisplayColor::DarkRed));
        assert_eq!(" Cyan ".parse::<DisplayColor>(), Ok(DisplayColor::Cyan));
        assert!("Purple".parse::<DisplayColor>().is_err());
    }

    #[test]
    fn every_color_round_trips_through_its_name() {
        for color in DisplayColor::ALL {
            assert_eq!(color.to_string().parse::<DisplayColor>(), Ok(color));
        }
    }
}
