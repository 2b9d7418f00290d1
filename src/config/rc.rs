use crate::document_model::LineEnding;
use crate::error::{EditorError, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const RC_FILE_NAME: &str = ".exvirc";

/// Editor options settable with `:set` or from the rc file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub tabstop: usize,
    pub shiftwidth: usize,
    pub expandtab: bool,
    pub ignorecase: bool,
    pub wrapscan: bool,
    pub autoindent: bool,
    pub fileformat: LineEnding,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tabstop: 8,
            shiftwidth: 8,
            expandtab: false,
            ignorecase: false,
            wrapscan: true,
            autoindent: false,
            fileformat: LineEnding::Unix,
        }
    }
}

/// What a single `:set` argument did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetOutcome {
    Changed(&'static str),
    /// `name?`, or a bare numeric/string option: its current value.
    Query(String),
    /// Not an option this engine knows; the host may claim it.
    Unknown(String),
}

const OPTION_NAMES: [(&str, &str); 7] = [
    ("tabstop", "ts"),
    ("shiftwidth", "sw"),
    ("expandtab", "et"),
    ("ignorecase", "ic"),
    ("wrapscan", "ws"),
    ("autoindent", "ai"),
    ("fileformat", "ff"),
];

fn canonical(name: &str) -> Option<&'static str> {
    OPTION_NAMES
        .iter()
        .find(|(full, short)| name == *full || name == *short)
        .map(|(full, _)| *full)
}

fn is_boolean(name: &str) -> bool {
    matches!(name, "expandtab" | "ignorecase" | "wrapscan" | "autoindent")
}

impl Settings {
    /// Applies one `:set` argument: `name`, `noname`, `name!`, `name?` or
    /// `name=value`.
    pub fn apply(&mut self, arg: &str) -> Result<SetOutcome> {
        if let Some((name, value)) = arg.split_once('=') {
            let Some(name) = canonical(name) else {
                return Ok(SetOutcome::Unknown(name.to_string()));
            };
            self.set_value(name, value)?;
            return Ok(SetOutcome::Changed(name));
        }
        if let Some(name) = arg.strip_suffix('?') {
            return match canonical(name) {
                Some(name) => Ok(SetOutcome::Query(self.describe(name))),
                None => Ok(SetOutcome::Unknown(name.to_string())),
            };
        }
        if let Some(name) = arg.strip_suffix('!') {
            return match canonical(name) {
                Some(name) if is_boolean(name) => {
                    let current = self.flag(name);
                    self.set_flag(name, !current);
                    Ok(SetOutcome::Changed(name))
                }
                Some(name) => Err(EditorError::InvalidOptionValue(name.to_string())),
                None => Ok(SetOutcome::Unknown(name.to_string())),
            };
        }
        if let Some(name) = canonical(arg) {
            if is_boolean(name) {
                self.set_flag(name, true);
                return Ok(SetOutcome::Changed(name));
            }
            return Ok(SetOutcome::Query(self.describe(name)));
        }
        if let Some(name) = arg.strip_prefix("no").and_then(canonical) {
            if is_boolean(name) {
                self.set_flag(name, false);
                return Ok(SetOutcome::Changed(name));
            }
            return Err(EditorError::InvalidOptionValue(arg.to_string()));
        }
        Ok(SetOutcome::Unknown(arg.to_string()))
    }

    fn flag(&self, name: &str) -> bool {
        match name {
            "expandtab" => self.expandtab,
            "ignorecase" => self.ignorecase,
            "wrapscan" => self.wrapscan,
            "autoindent" => self.autoindent,
            _ => false,
        }
    }

    fn set_flag(&mut self, name: &str, value: bool) {
        match name {
            "expandtab" => self.expandtab = value,
            "ignorecase" => self.ignorecase = value,
            "wrapscan" => self.wrapscan = value,
            "autoindent" => self.autoindent = value,
            _ => {}
        }
    }

    fn set_value(&mut self, name: &str, value: &str) -> Result<()> {
        let invalid = || EditorError::InvalidOptionValue(format!("{name}={value}"));
        match name {
            "tabstop" => match value.parse::<usize>() {
                Ok(n) if (1..=32).contains(&n) => self.tabstop = n,
                _ => return Err(invalid()),
            },
            "shiftwidth" => match value.parse::<usize>() {
                Ok(n) if (1..=32).contains(&n) => self.shiftwidth = n,
                _ => return Err(invalid()),
            },
            "fileformat" => self.fileformat = LineEnding::from_name(value).ok_or_else(invalid)?,
            _ if is_boolean(name) => match value {
                "true" | "1" | "yes" | "on" => self.set_flag(name, true),
                "false" | "0" | "no" | "off" => self.set_flag(name, false),
                _ => return Err(invalid()),
            },
            _ => return Err(invalid()),
        }
        Ok(())
    }

    pub fn describe(&self, name: &str) -> String {
        match name {
            "tabstop" => format!("tabstop={}", self.tabstop),
            "shiftwidth" => format!("shiftwidth={}", self.shiftwidth),
            "fileformat" => format!("fileformat={}", self.fileformat.name()),
            _ if self.flag(name) => name.to_string(),
            _ => format!("no{name}"),
        }
    }

    /// Every option in `:set all` order.
    pub fn describe_all(&self) -> Vec<String> {
        OPTION_NAMES
            .iter()
            .map(|(full, _)| self.describe(full))
            .collect()
    }

    /// Indentation text covering `width` display columns.
    pub fn indent_string(&self, width: usize) -> String {
        if self.expandtab {
            " ".repeat(width)
        } else {
            let tabstop = self.tabstop.max(1);
            format!("{}{}", "\t".repeat(width / tabstop), " ".repeat(width % tabstop))
        }
    }
}

pub struct RcLoader;

impl RcLoader {
    /// Get the path to the RC file
    /// Looks for .exvirc in:
    /// 1. Current directory
    /// 2. Home directory (~/.exvirc)
    pub fn get_rc_path() -> Option<PathBuf> {
        let current_rc = Path::new(RC_FILE_NAME);
        if current_rc.exists() {
            return Some(current_rc.to_path_buf());
        }

        if let Ok(home) = env::var("HOME") {
            let home_rc = Path::new(&home).join(RC_FILE_NAME);
            if home_rc.exists() {
                return Some(home_rc);
            }
        }

        None
    }

    /// Load and parse the RC file, falling back to defaults.
    pub fn load_config() -> Settings {
        let mut settings = Settings::default();
        if let Some(rc_path) = Self::get_rc_path() {
            Self::load_from(&rc_path, &mut settings);
        }
        settings
    }

    pub fn load_from(path: &Path, settings: &mut Settings) {
        match fs::read_to_string(path) {
            Ok(content) => {
                debug!(target: "editor.io", path = %path.display(), "reading rc file");
                Self::parse_config_content(&content, settings);
            }
            Err(e) => warn!(
                target: "editor.io",
                path = %path.display(),
                error = %e,
                "rc file unreadable"
            ),
        }
    }

    /// Parse the content of an RC file
    pub fn parse_config_content(content: &str, settings: &mut Settings) {
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('"') {
                continue;
            }
            Self::parse_config_line(line, settings);
        }
    }

    /// Parse a single configuration line. Bad values are logged and skipped.
    fn parse_config_line(line: &str, settings: &mut Settings) {
        let line = match line.find('#') {
            Some(pos) => &line[..pos],
            None => line,
        }
        .trim();

        let args: Vec<String> = if let Some(stripped) = line.strip_prefix("set ") {
            stripped.split_whitespace().map(str::to_string).collect()
        } else if let Some((key, value)) = line.split_once('=') {
            vec![format!("{}={}", key.trim(), value.trim())]
        } else {
            return;
        };

        for arg in args {
            match settings.apply(&arg) {
                Ok(SetOutcome::Unknown(name)) => {
                    debug!(target: "editor.io", option = %name, "ignoring unknown rc option")
                }
                Ok(_) => {}
                Err(e) => warn!(target: "editor.io", error = %e, "ignoring rc line"),
            }
        }
    }

    /// Generate a sample RC file content
    pub fn generate_sample_rc() -> String {
        r#"# vi-engine configuration file (.exvirc)
# Lines starting with # or " are comments

# Tab settings
set tabstop=8          # Display width of a tab
set shiftwidth=4       # Columns moved by < and >
set noexpandtab        # Use spaces instead of tabs with set expandtab

# Editing
set autoindent         # Copy indentation to new lines
set wrapscan           # Searches wrap around the end of the buffer
set noignorecase       # Case sensitive searches

# File format
set fileformat=unix    # Line endings: unix, dos, or mac

# Alternative key=value syntax:
# tabstop=4
# expandtab=true
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vim_style_config() {
        let mut settings = Settings::default();
        let content = r#"
            set expandtab
            set tabstop=4 sw=2
            set ic
            set fileformat=dos
        "#;

        RcLoader::parse_config_content(content, &mut settings);

        assert!(settings.expandtab);
        assert_eq!(settings.tabstop, 4);
        assert_eq!(settings.shiftwidth, 2);
        assert!(settings.ignorecase);
        assert_eq!(settings.fileformat, LineEnding::Windows);
    }

    #[test]
    fn test_parse_key_value_config() {
        let mut settings = Settings::default();
        let content = r#"
            tabstop=2
            expandtab=true
            wrapscan=no
            fileformat=mac
        "#;

        RcLoader::parse_config_content(content, &mut settings);

        assert!(settings.expandtab);
        assert_eq!(settings.tabstop, 2);
        assert!(!settings.wrapscan);
        assert_eq!(settings.fileformat, LineEnding::Mac);
    }

    #[test]
    fn test_parse_mixed_config_with_comments() {
        let mut settings = Settings::default();
        let content = r#"
            # This is a comment
            set ai                 # Enable autoindent
            " This is also a comment

            tabstop=6              # Custom tab stop
            # set expandtab        # This is commented out
        "#;

        RcLoader::parse_config_content(content, &mut settings);

        assert!(settings.autoindent);
        assert!(!settings.expandtab);
        assert_eq!(settings.tabstop, 6);
    }

    #[test]
    fn test_invalid_values_ignored() {
        let mut settings = Settings::default();
        let content = r#"
            set tabstop=0          # Invalid: too small
            set tabstop=40         # Invalid: too large
            tabstop=invalid        # Invalid: not a number
            fileformat=invalid     # Invalid: unknown format
            unknown_setting=value  # Unknown setting
        "#;

        RcLoader::parse_config_content(content, &mut settings);

        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_set_forms() {
        let mut s = Settings::default();
        assert_eq!(s.apply("et").unwrap(), SetOutcome::Changed("expandtab"));
        assert!(s.expandtab);
        assert_eq!(s.apply("expandtab!").unwrap(), SetOutcome::Changed("expandtab"));
        assert!(!s.expandtab);
        assert_eq!(
            s.apply("ws?").unwrap(),
            SetOutcome::Query("wrapscan".to_string())
        );
        assert_eq!(s.apply("nows").unwrap(), SetOutcome::Changed("wrapscan"));
        assert_eq!(
            s.apply("ts").unwrap(),
            SetOutcome::Query("tabstop=8".to_string())
        );
        assert_eq!(
            s.apply("number").unwrap(),
            SetOutcome::Unknown("number".to_string())
        );
        assert!(s.apply("ts=abc").is_err());
        assert!(s.apply("nots").is_err());
    }

    #[test]
    fn test_indent_string() {
        let mut s = Settings::default();
        s.tabstop = 4;
        assert_eq!(s.indent_string(6), "\t  ");
        s.expandtab = true;
        assert_eq!(s.indent_string(3), "   ");
    }

    #[test]
    fn test_sample_rc_parses_cleanly() {
        let mut settings = Settings::default();
        RcLoader::parse_config_content(&RcLoader::generate_sample_rc(), &mut settings);
        assert_eq!(settings.shiftwidth, 4);
        assert!(settings.autoindent);
    }
}
