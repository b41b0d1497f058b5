//! Centralized CLI status output: a small set of semantic statuses
//! (`Resolving`, `Fetching`, `Added`, ...), each right-aligned and
//! optionally colored, printed to stderr.

use std::fmt::Display;
use std::io::IsTerminal;

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// --quiet: errors only
    Quiet,
    #[default]
    Normal,
    /// --verbose: nothing additional for this CLI beyond log level, kept for symmetry
    Verbose,
}

/// Color output mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorChoice {
    #[default]
    Auto,
    Always,
    Never,
}

impl std::str::FromStr for ColorChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(ColorChoice::Auto),
            "always" => Ok(ColorChoice::Always),
            "never" => Ok(ColorChoice::Never),
            _ => Err(format!("invalid color choice '{s}'; expected 'auto', 'always', or 'never'")),
        }
    }
}

/// Semantic status for a CLI output line. Shell handles formatting; callers
/// just name the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Added,
    Finished,
    Updated,
    Removed,
    Fetching,
    Resolving,
    Info,
    Skipped,
    Warning,
    Error,
}

impl Status {
    fn as_str(&self) -> &'static str {
        match self {
            Status::Added => "Added",
            Status::Finished => "Finished",
            Status::Updated => "Updated",
            Status::Removed => "Removed",
            Status::Fetching => "Fetching",
            Status::Resolving => "Resolving",
            Status::Info => "Info",
            Status::Skipped => "Skipped",
            Status::Warning => "Warning",
            Status::Error => "error",
        }
    }

    fn color_code(&self) -> &'static str {
        match self {
            Status::Added | Status::Finished | Status::Updated | Status::Removed => "\x1b[1;32m",
            Status::Fetching | Status::Resolving => "\x1b[1;36m",
            Status::Info => "\x1b[1;34m",
            Status::Skipped | Status::Warning => "\x1b[1;33m",
            Status::Error => "\x1b[1;31m",
        }
    }

    const WIDTH: usize = 12;
}

/// Central shell for CLI status output.
#[derive(Debug)]
pub struct Shell {
    quiet: bool,
    use_color: bool,
}

impl Shell {
    pub fn new(quiet: bool, color: ColorChoice) -> Self {
        let use_color = match color {
            ColorChoice::Auto => std::io::stderr().is_terminal(),
            ColorChoice::Always => true,
            ColorChoice::Never => false,
        };
        Shell { quiet, use_color }
    }

    pub fn from_flags(quiet: bool, color: ColorChoice) -> Self {
        Shell::new(quiet, color)
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    pub fn use_color(&self) -> bool {
        self.use_color
    }

    /// Prints `{status:>12} {msg}` to stderr. Only `Error` survives quiet mode.
    pub fn status(&self, status: Status, msg: impl Display) {
        if self.quiet && status != Status::Error {
            return;
        }
        eprintln!("{} {}", self.format_status(status), msg);
    }

    pub fn note(&self, msg: impl Display) {
        self.status(Status::Info, msg);
    }

    pub fn warn(&self, msg: impl Display) {
        self.status(Status::Warning, msg);
    }

    pub fn error(&self, msg: impl Display) {
        self.status(Status::Error, msg);
    }

    fn format_status(&self, status: Status) -> String {
        let text = status.as_str();
        if self.use_color {
            format!("{}{:>width$}\x1b[0m", status.color_code(), text, width = Status::WIDTH)
        } else {
            format!("{:>width$}", text, width = Status::WIDTH)
        }
    }
}

impl Default for Shell {
    fn default() -> Self {
        Shell::new(false, ColorChoice::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_mode_suppresses_non_error_status() {
        let shell = Shell::new(true, ColorChoice::Never);
        assert!(shell.is_quiet());
    }

    #[test]
    fn color_choice_parses_from_str() {
        assert_eq!("auto".parse::<ColorChoice>().unwrap(), ColorChoice::Auto);
        assert_eq!("always".parse::<ColorChoice>().unwrap(), ColorChoice::Always);
        assert_eq!("never".parse::<ColorChoice>().unwrap(), ColorChoice::Never);
        assert!("invalid".parse::<ColorChoice>().is_err());
    }

    #[test]
    fn status_is_right_aligned_to_twelve_columns() {
        let shell = Shell::new(false, ColorChoice::Never);
        let formatted = shell.format_status(Status::Added);
        assert_eq!(formatted.trim(), "Added");
        assert_eq!(formatted.len(), 12);
    }
}
