//! Linux platform implementation.
//!
//! - XDG desktop files for application discovery
//! - xclip for clipboard operations
//! - xdg-open for opening URLs, files and directories
//! - loginctl/systemctl for session and power commands

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use freedesktop_desktop_entry::DesktopEntry;
use walkdir::WalkDir;

use super::{capture, pipe_to, spawn_detached, AppEntry, Platform, SystemCommand};
use crate::error::{ActionError, ActionResult};

pub struct LinuxPlatform;

impl LinuxPlatform {
    pub fn new() -> Self {
        Self
    }

    fn application_dirs() -> Vec<PathBuf> {
        let mut dirs_to_scan = vec![
            PathBuf::from("/usr/share/applications"),
            PathBuf::from("/usr/local/share/applications"),
        ];

        if let Some(data_home) = dirs::data_local_dir() {
            dirs_to_scan.push(data_home.join("applications"));
        }

        // Flatpak and snap exports
        if let Some(home) = dirs::home_dir() {
            dirs_to_scan.push(home.join(".local/share/flatpak/exports/share/applications"));
        }
        dirs_to_scan.push(PathBuf::from("/var/lib/flatpak/exports/share/applications"));
        dirs_to_scan.push(PathBuf::from("/var/lib/snapd/desktop/applications"));

        dirs_to_scan
    }

    /// Parse a .desktop file into an AppEntry.
    fn parse_desktop_file(path: &Path) -> Option<AppEntry> {
        let content = std::fs::read_to_string(path).ok()?;
        let entry = DesktopEntry::from_str(path, &content, Some(&["en"])).ok()?;

        if entry.no_display() || entry.hidden() {
            return None;
        }

        // Untranslated values
        let locales: &[&str] = &[];

        let name = entry.name(locales)?.to_string();
        entry.exec()?;

        let id = path.file_stem()?.to_string_lossy().to_string();
        let description = entry.comment(locales).map(|s| s.to_string());
        let keywords = entry
            .keywords(locales)
            .map(|kw| kw.iter().map(|s| s.to_lowercase()).collect())
            .unwrap_or_default();

        Some(AppEntry {
            id,
            name,
            path: path.to_path_buf(),
            description,
            keywords,
        })
    }

    /// Read the Exec line of a desktop file and split it into argv.
    fn exec_argv(path: &Path) -> ActionResult<Vec<String>> {
        let content = std::fs::read_to_string(path)
            .map_err(|_| ActionError::MissingPath(path.to_path_buf()))?;
        let entry = DesktopEntry::from_str(path, &content, Some(&["en"]))
            .map_err(|e| ActionError::Unsupported(format!("{}: {e}", path.display())))?;
        let exec = entry.exec().ok_or(ActionError::EmptyCommand)?;

        let argv = strip_field_codes(exec);
        if argv.is_empty() {
            return Err(ActionError::EmptyCommand);
        }
        Ok(argv)
    }
}

impl Default for LinuxPlatform {
    fn default() -> Self {
        Self::new()
    }
}

/// Split an Exec value and drop field codes (%f, %U, %i...). `%%` is a literal `%`.
fn strip_field_codes(exec: &str) -> Vec<String> {
    exec.split_whitespace()
        .filter(|token| !(token.len() == 2 && token.starts_with('%') && token != &"%%"))
        .map(|token| token.replace("%%", "%").trim_matches('"').to_string())
        .filter(|token| !token.is_empty())
        .collect()
}

impl Platform for LinuxPlatform {
    fn name(&self) -> &'static str {
        "Linux"
    }

    fn discover_apps(&self) -> Vec<AppEntry> {
        let mut entries = Vec::new();
        let mut seen = HashSet::new();

        for dir in Self::application_dirs() {
            if !dir.exists() {
                continue;
            }

            for entry in WalkDir::new(&dir)
                .max_depth(2)
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let path = entry.path();
                if !path.extension().is_some_and(|ext| ext == "desktop") {
                    continue;
                }
                if let Some(app) = Self::parse_desktop_file(path) {
                    // First directory wins for duplicate ids
                    if seen.insert(app.id.clone()) {
                        entries.push(app);
                    }
                }
            }
        }

        entries.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        entries
    }

    fn clipboard_read(&self) -> Option<String> {
        let content = capture("xclip", &["-selection", "clipboard", "-o"])?;
        (!content.trim().is_empty()).then_some(content)
    }

    fn clipboard_write(&self, content: &str) -> ActionResult<()> {
        pipe_to("xclip", &["-selection", "clipboard"], content)
    }

    fn open(&self, target: &str) -> ActionResult<()> {
        spawn_detached("xdg-open", [target])
    }

    fn reveal(&self, path: &Path) -> ActionResult<()> {
        let dir = if path.is_dir() {
            path
        } else {
            path.parent().unwrap_or(path)
        };
        spawn_detached("xdg-open", [dir])
    }

    fn launch(&self, path: &Path) -> ActionResult<()> {
        if path.extension().is_some_and(|ext| ext == "desktop") {
            let argv = Self::exec_argv(path)?;
            let (program, args) = argv.split_first().ok_or(ActionError::EmptyCommand)?;
            return spawn_detached(program, args);
        }
        spawn_detached("xdg-open", [path])
    }

    fn system_command_line(&self, command: SystemCommand) -> String {
        match command {
            SystemCommand::Lock => "loginctl lock-session".into(),
            SystemCommand::Sleep => "systemctl suspend".into(),
            SystemCommand::Logout => {
                "gnome-session-quit --logout --no-prompt || loginctl terminate-user \"$USER\"".into()
            }
            SystemCommand::Restart => "systemctl reboot".into(),
            SystemCommand::Shutdown => "systemctl poweroff".into(),
        }
    }
}
