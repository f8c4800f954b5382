//! Simple TOML parser for board configuration
//!
//! This is a minimal TOML parser that handles only the subset needed for
//! Lumen board files. It does NOT support the full TOML spec.
//!
//! Supported features:
//! - Key = value pairs (string, integer, boolean)
//! - [section] headers
//! - Comments (# ...), including trailing comments
//!
//! NOT supported:
//! - Arrays and inline tables
//! - Multi-line strings
//! - Dotted keys

use heapless::String;

use super::types::BoardConfig;

/// Parse error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Invalid or unknown section header (line number)
    InvalidSection(usize),
    /// Key not known in its section (line number)
    UnknownKey(usize),
    /// Line is not a `key = value` pair (line number)
    InvalidLine(usize),
    /// Value has the wrong type or is out of range (line number)
    InvalidValue(usize),
    /// String value longer than its field allows (line number)
    TooLong(usize),
}

/// Current parsing context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Root,
    Display,
    Storage,
    App,
}

/// Parse a board TOML file, starting from the default configuration
///
/// Keys that are absent keep their default values.
pub fn parse_config(input: &str) -> Result<BoardConfig, ParseError> {
    let mut config = BoardConfig::default();
    let mut section = Section::Root;

    for (index, line) in input.lines().enumerate() {
        let line_no = index + 1;
        let line = line.trim();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if line.starts_with('[') && line.ends_with(']') {
            section = parse_section_header(&line[1..line.len() - 1])
                .ok_or(ParseError::InvalidSection(line_no))?;
            continue;
        }

        let (key, value) = parse_key_value(line).ok_or(ParseError::InvalidLine(line_no))?;
        apply(&mut config, section, key, value)
            .map_err(|kind| kind.at(line_no))?;
    }

    Ok(config)
}

/// Error kind before the line number is attached
enum ValueError {
    UnknownKey,
    Invalid,
    TooLong,
}

impl ValueError {
    fn at(self, line: usize) -> ParseError {
        match self {
            ValueError::UnknownKey => ParseError::UnknownKey(line),
            ValueError::Invalid => ParseError::InvalidValue(line),
            ValueError::TooLong => ParseError::TooLong(line),
        }
    }
}

fn apply(config: &mut BoardConfig, section: Section, key: &str, value: &str) -> Result<(), ValueError> {
    match section {
        Section::Root => return Err(ValueError::UnknownKey),
        Section::Display => {
            let display = &mut config.display;
            match key {
                "frequency_hz" => display.frequency_hz = parse_int(value)?,
                "spi_mode" => {
                    display.spi_mode = parse_int(value)?;
                    if display.spi_mode > 3 {
                        return Err(ValueError::Invalid);
                    }
                }
                "reset_pulse_ms" => display.reset_pulse_ms = parse_int(value)?,
                "post_command_delay_ms" => display.post_command_delay_ms = parse_int(value)?,
                "backlight_active_low" => display.backlight_active_low = parse_bool(value)?,
                _ => return Err(ValueError::UnknownKey),
            }
        }
        Section::Storage => match key {
            "frequency_hz" => config.storage.frequency_hz = parse_int(value)?,
            _ => return Err(ValueError::UnknownKey),
        },
        Section::App => {
            let app = &mut config.app;
            match key {
                "splash_path" => app.splash_path = parse_path(value)?,
                "sprite_path" => app.sprite_path = parse_path(value)?,
                "splash_hold_ms" => app.splash_hold_ms = parse_int(value)?,
                "logo_hold_ms" => app.logo_hold_ms = parse_int(value)?,
                "frame_period_ms" => app.frame_period_ms = parse_int(value)?,
                "sprite_row" => app.sprite_row = parse_int(value)?,
                "sprite_speed" => app.sprite_speed = parse_int(value)?,
                _ => return Err(ValueError::UnknownKey),
            }
        }
    }
    Ok(())
}

fn parse_section_header(header: &str) -> Option<Section> {
    match header.trim() {
        "display" => Some(Section::Display),
        "storage" => Some(Section::Storage),
        "app" => Some(Section::App),
        _ => None,
    }
}

/// Split a `key = value` line, dropping any trailing comment
fn parse_key_value(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    let value = value.trim();

    // Remove inline comments
    let value = match value.find('#') {
        // Make sure # is not inside a string
        Some(hash_pos) if value[..hash_pos].matches('"').count() % 2 == 0 => {
            value[..hash_pos].trim()
        }
        _ => value,
    };

    if key.is_empty() || value.is_empty() {
        return None;
    }
    Some((key, value))
}

/// Parse a quoted string value
fn parse_string(value: &str) -> Result<&str, ValueError> {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        Ok(&value[1..value.len() - 1])
    } else {
        Err(ValueError::Invalid)
    }
}

fn parse_path<const N: usize>(value: &str) -> Result<String<N>, ValueError> {
    let path = parse_string(value)?;
    if path.is_empty() {
        return Err(ValueError::Invalid);
    }
    let mut out = String::new();
    out.push_str(path).map_err(|_| ValueError::TooLong)?;
    Ok(out)
}

/// Parse an integer value, allowing `_` digit separators
fn parse_int<T: core::str::FromStr>(value: &str) -> Result<T, ValueError> {
    let mut digits: String<24> = String::new();
    for c in value.chars().filter(|c| *c != '_') {
        digits.push(c).map_err(|_| ValueError::Invalid)?;
    }
    digits.parse().map_err(|_| ValueError::Invalid)
}

/// Parse a boolean value
fn parse_bool(value: &str) -> Result<bool, ValueError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ValueError::Invalid),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOARD: &str = r#"
# Reference board
[display]
frequency_hz = 40_000_000
spi_mode = 0
reset_pulse_ms = 120   # slower panel
backlight_active_low = true

[storage]
frequency_hz = 8000000

[app]
splash_path = "/splash/logo.bmp"
frame_period_ms = 20
"#;

    #[test]
    fn test_parse_board() {
        let config = parse_config(BOARD).unwrap();
        assert_eq!(config.display.frequency_hz, 40_000_000);
        assert_eq!(config.display.reset_pulse_ms, 120);
        assert!(config.display.backlight_active_low);
        assert_eq!(config.storage.frequency_hz, 8_000_000);
        assert_eq!(config.app.splash_path.as_str(), "/splash/logo.bmp");
        assert_eq!(config.app.frame_period_ms, 20);
        // Untouched keys keep defaults
        assert_eq!(config.display.post_command_delay_ms, 100);
        assert_eq!(config.app.sprite_path.as_str(), "/ghost.bmp");
    }

    #[test]
    fn test_empty_input_is_default() {
        assert_eq!(parse_config("").unwrap(), BoardConfig::default());
    }

    #[test]
    fn test_unknown_section() {
        assert_eq!(
            parse_config("[heater]\n"),
            Err(ParseError::InvalidSection(1))
        );
    }

    #[test]
    fn test_unknown_key() {
        assert_eq!(
            parse_config("[display]\nrotation = 90\n"),
            Err(ParseError::UnknownKey(2))
        );
        assert_eq!(parse_config("width = 320\n"), Err(ParseError::UnknownKey(1)));
    }

    #[test]
    fn test_invalid_values() {
        assert_eq!(
            parse_config("[display]\nspi_mode = 4\n"),
            Err(ParseError::InvalidValue(2))
        );
        assert_eq!(
            parse_config("[display]\nbacklight_active_low = yes\n"),
            Err(ParseError::InvalidValue(2))
        );
        assert_eq!(
            parse_config("[app]\nsplash_path = /logo.bmp\n"),
            Err(ParseError::InvalidValue(2))
        );
        assert_eq!(
            parse_config("[app]\nsprite_row = -1\n"),
            Err(ParseError::InvalidValue(2))
        );
    }

    #[test]
    fn test_path_too_long() {
        let input = "[app]\nsprite_path = \"/a/very/long/path/to/some/sprite/ghost.bmp\"\n";
        assert_eq!(parse_config(input), Err(ParseError::TooLong(2)));
    }

    #[test]
    fn test_hash_inside_string() {
        let config = parse_config("[app]\nsprite_path = \"/#1.bmp\"\n").unwrap();
        assert_eq!(config.app.sprite_path.as_str(), "/#1.bmp");
    }

    #[test]
    fn test_missing_value() {
        assert_eq!(
            parse_config("[display]\nfrequency_hz =\n"),
            Err(ParseError::InvalidLine(2))
        );
    }
}
