use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

pub const SETTINGS_FILE_NAME: &str = "config.txt";
pub const DEFAULT_EXTENSION: &str = "png";
pub const DEFAULT_FPS: &str = "30";

/// Run parameters, read once at startup and passed by reference afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub extension: String,
    pub fps: String,
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            extension: DEFAULT_EXTENSION.to_owned(),
            fps: DEFAULT_FPS.to_owned(),
            verbose: true,
        }
    }
}

impl Config {
    /// Reads the settings file at `path`. A missing or unreadable file yields the defaults.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(_) => Self::default(),
        }
    }

    /// Line 1 is the extension, line 2 the frame rate, and any content on line 3
    /// turns verbose output off. Rejected lines keep the default.
    pub fn parse(content: &str) -> Self {
        let mut config = Self::default();

        for (index, line) in content.lines().take(3).enumerate() {
            let value = line.trim_matches(' ');
            match index {
                0 => {
                    let extension = value.to_lowercase();
                    if !extension.is_empty() && extension_re().is_match(&extension) {
                        config.extension = extension;
                    }
                }
                1 => {
                    if !value.is_empty() && fps_re().is_match(value) {
                        config.fps = value.to_owned();
                    }
                }
                _ => {
                    if !value.is_empty() {
                        config.verbose = false;
                    }
                }
            }
        }

        config
    }

    /// `%06d.<ext>`, the ffmpeg image2 pattern matching the sequential names.
    pub fn input_pattern(&self) -> String {
        format!("%06d.{}", self.extension)
    }

    pub fn log_summary(&self) {
        log::info!("running with parameters:");
        log::info!("\tfiletype {}", self.extension);
        log::info!("\tfps {}", self.fps);
        log::info!("\tverbose {}", self.verbose);
    }
}

fn extension_re() -> &'static Regex {
    static EXTENSION_RE: OnceLock<Regex> = OnceLock::new();
    EXTENSION_RE
        .get_or_init(|| Regex::new(r"^[a-zA-Z0-9]*$").expect("extension regex should compile"))
}

fn fps_re() -> &'static Regex {
    static FPS_RE: OnceLock<Regex> = OnceLock::new();
    FPS_RE.get_or_init(|| Regex::new(r"^[0-9]*$").expect("fps regex should compile"))
}
