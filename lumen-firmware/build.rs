//! Build script for lumen-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates board.toml at compile time

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

fn main() {
    setup_linker();
    validate_config();
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    // Copy memory.x to the output directory
    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    println!("cargo:rustc-link-search={}", out_dir.display());
    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");

    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Keys accepted in each section, with their expected value kind
const DISPLAY_KEYS: &[(&str, Kind)] = &[
    ("frequency_hz", Kind::Integer),
    ("spi_mode", Kind::Integer),
    ("reset_pulse_ms", Kind::Integer),
    ("post_command_delay_ms", Kind::Integer),
    ("backlight_active_low", Kind::Boolean),
];

const STORAGE_KEYS: &[(&str, Kind)] = &[("frequency_hz", Kind::Integer)];

const APP_KEYS: &[(&str, Kind)] = &[
    ("splash_path", Kind::Path),
    ("sprite_path", Kind::Path),
    ("splash_hold_ms", Kind::Integer),
    ("logo_hold_ms", Kind::Integer),
    ("frame_period_ms", Kind::Integer),
    ("sprite_row", Kind::Integer),
    ("sprite_speed", Kind::Integer),
];

/// Must match `MAX_PATH_LEN` in lumen-core
const MAX_PATH_LEN: usize = 32;

#[derive(Clone, Copy)]
enum Kind {
    Integer,
    Boolean,
    Path,
}

/// Validate board.toml configuration at compile time
fn validate_config() {
    println!("cargo:rerun-if-changed=board.toml");

    let config_path = Path::new("board.toml");

    if !config_path.exists() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: board.toml not found!                                    ║\n\
            ║                                                                  ║\n\
            ║  The firmware embeds a board.toml configuration file.            ║\n\
            ║  Please create one in the lumen-firmware directory.              ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n"
        );
    }

    let config_content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Failed to read board.toml                                ║\n\
                ║                                                                  ║\n\
                ║  Error: {:<56} ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                e
            );
        }
    };

    let config: toml::Value = match toml::from_str(&config_content) {
        Ok(value) => value,
        Err(e) => {
            let error_msg = e.to_string();
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Invalid TOML syntax in board.toml                        ║\n\
                ╠══════════════════════════════════════════════════════════════════╣\n\
                ║                                                                  ║\n\
                {}\n\
                ║                                                                  ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                format_error_lines(&error_msg)
            );
        }
    };

    let mut errors = Vec::new();
    validate_sections(&config, &mut errors);
    validate_display(&config, &mut errors);

    if !errors.is_empty() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: Invalid board configuration                              ║\n\
            ╠══════════════════════════════════════════════════════════════════╣\n\
            {}\n\
            ╚══════════════════════════════════════════════════════════════════╝\n",
            errors
                .iter()
                .map(|e| format!("║  • {:<62} ║", e))
                .collect::<Vec<_>>()
                .join("\n")
        );
    }

    println!("cargo:warning=board.toml validated successfully");
}

/// Format error message lines with box drawing
fn format_error_lines(msg: &str) -> String {
    msg.lines()
        .map(|line| {
            let truncated = if line.len() > 64 {
                format!("{}...", &line[..61])
            } else {
                line.to_string()
            };
            format!("║  {:<64} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Reject unknown sections and keys, and values of the wrong kind
fn validate_sections(config: &toml::Value, errors: &mut Vec<String>) {
    let root = match config.as_table() {
        Some(t) => t,
        None => return,
    };

    for (section, body) in root {
        let keys = match section.as_str() {
            "display" => DISPLAY_KEYS,
            "storage" => STORAGE_KEYS,
            "app" => APP_KEYS,
            _ => {
                errors.push(format!("unknown section [{}]", section));
                continue;
            }
        };

        let table = match body.as_table() {
            Some(t) => t,
            None => {
                errors.push(format!("[{}] must be a table", section));
                continue;
            }
        };

        for (key, value) in table {
            let kind = match keys.iter().find(|(name, _)| name == key) {
                Some((_, kind)) => *kind,
                None => {
                    errors.push(format!("[{}] unknown key '{}'", section, key));
                    continue;
                }
            };
            check_value(section, key, value, kind, errors);
        }
    }
}

fn check_value(section: &str, key: &str, value: &toml::Value, kind: Kind, errors: &mut Vec<String>) {
    match (kind, value) {
        (Kind::Integer, toml::Value::Integer(n)) => {
            if *n < 0 || *n > i64::from(u32::MAX) {
                errors.push(format!("[{}] {} must be 0-{}", section, key, u32::MAX));
            }
        }
        (Kind::Boolean, toml::Value::Boolean(_)) => {}
        (Kind::Path, toml::Value::String(path)) => {
            if !path.starts_with('/') {
                errors.push(format!("[{}] {} must be an absolute path", section, key));
            }
            if path.len() > MAX_PATH_LEN {
                errors.push(format!(
                    "[{}] {} longer than {} bytes",
                    section, key, MAX_PATH_LEN
                ));
            }
        }
        (Kind::Integer, _) => errors.push(format!("[{}] {} must be an integer", section, key)),
        (Kind::Boolean, _) => errors.push(format!("[{}] {} must be true or false", section, key)),
        (Kind::Path, _) => errors.push(format!("[{}] {} must be a string", section, key)),
    }
}

/// Display-specific ranges
fn validate_display(config: &toml::Value, errors: &mut Vec<String>) {
    let display = match config.get("display").and_then(|d| d.as_table()) {
        Some(t) => t,
        None => return,
    };

    if let Some(toml::Value::Integer(mode)) = display.get("spi_mode") {
        if !(0..=3).contains(mode) {
            errors.push("[display] spi_mode must be 0-3".to_string());
        }
    }

    if let Some(toml::Value::Integer(freq)) = display.get("frequency_hz") {
        if *freq == 0 {
            errors.push("[display] frequency_hz must be non-zero".to_string());
        }
    }
}
