//! macOS platform implementation.
//!
//! - /Applications and ~/Applications bundle scanning for app discovery
//! - pbcopy/pbpaste for the clipboard
//! - `open` for URLs, files, bundles and Finder reveal
//! - osascript and pmset for session and power commands

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use super::{capture, pipe_to, spawn_detached, AppEntry, Platform, SystemCommand};
use crate::error::ActionResult;

pub struct MacOSPlatform;

impl MacOSPlatform {
    pub fn new() -> Self {
        Self
    }

    /// Read an .app bundle's Info.plist (via plutil's JSON output).
    fn parse_app_bundle(app_path: &Path) -> Option<AppEntry> {
        let info_plist = app_path.join("Contents/Info.plist");
        if !info_plist.exists() {
            return None;
        }

        let bundle_name = app_path.file_stem()?.to_str()?.to_string();
        let fallback_id = bundle_name.to_lowercase().replace(' ', ".");

        let plist: Option<serde_json::Value> =
            capture("plutil", &["-convert", "json", "-o", "-", info_plist.to_str()?])
                .and_then(|json| serde_json::from_str(&json).ok());

        let Some(plist) = plist else {
            return Some(AppEntry {
                id: fallback_id,
                name: bundle_name.clone(),
                path: app_path.to_path_buf(),
                description: None,
                keywords: vec![bundle_name.to_lowercase()],
            });
        };

        let field = |key: &str| plist.get(key).and_then(|v| v.as_str()).map(str::to_string);

        let name = field("CFBundleDisplayName")
            .or_else(|| field("CFBundleName"))
            .unwrap_or_else(|| bundle_name.clone());
        let id = field("CFBundleIdentifier").unwrap_or(fallback_id);

        // Bundle name and the meaningful parts of the bundle id
        let mut keywords = vec![bundle_name.to_lowercase()];
        for part in id.split('.') {
            let lower = part.to_lowercase();
            if lower.len() > 2 && !keywords.contains(&lower) && !matches!(lower.as_str(), "com" | "org" | "app") {
                keywords.push(lower);
            }
        }

        Some(AppEntry {
            id,
            name,
            path: app_path.to_path_buf(),
            description: field("CFBundleGetInfoString"),
            keywords,
        })
    }

    /// Scan a directory for .app bundles, one level of subfolders deep
    /// (for things like /Applications/Utilities).
    fn scan_applications_dir(dir: &Path, apps: &mut Vec<AppEntry>, seen: &mut HashSet<String>) {
        let Ok(entries) = fs::read_dir(dir) else {
            return;
        };

        let is_bundle = |path: &Path| path.is_dir() && path.extension().is_some_and(|ext| ext == "app");

        for path in entries.flatten().map(|e| e.path()) {
            let candidates: Vec<PathBuf> = if is_bundle(&path) {
                vec![path]
            } else if path.is_dir() {
                fs::read_dir(&path)
                    .map(|sub| sub.flatten().map(|e| e.path()).filter(|p| is_bundle(p)).collect())
                    .unwrap_or_default()
            } else {
                Vec::new()
            };

            for bundle in candidates {
                if let Some(app) = Self::parse_app_bundle(&bundle) {
                    if seen.insert(app.id.clone()) {
                        apps.push(app);
                    }
                }
            }
        }
    }
}

impl Default for MacOSPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl Platform for MacOSPlatform {
    fn name(&self) -> &'static str {
        "macOS"
    }

    fn discover_apps(&self) -> Vec<AppEntry> {
        let mut apps = Vec::new();
        let mut seen = HashSet::new();

        Self::scan_applications_dir(Path::new("/Applications"), &mut apps, &mut seen);
        Self::scan_applications_dir(Path::new("/System/Applications"), &mut apps, &mut seen);
        if let Some(home) = dirs::home_dir() {
            Self::scan_applications_dir(&home.join("Applications"), &mut apps, &mut seen);
        }

        apps.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        tracing::debug!(count = apps.len(), "discovered applications");
        apps
    }

    fn clipboard_read(&self) -> Option<String> {
        capture("pbpaste", &[]).filter(|content| !content.trim().is_empty())
    }

    fn clipboard_write(&self, content: &str) -> ActionResult<()> {
        pipe_to("pbcopy", &[], content)
    }

    fn open(&self, target: &str) -> ActionResult<()> {
        spawn_detached("open", [target])
    }

    fn reveal(&self, path: &Path) -> ActionResult<()> {
        spawn_detached("open", [Path::new("-R"), path])
    }

    fn launch(&self, path: &Path) -> ActionResult<()> {
        spawn_detached("open", [path])
    }

    fn system_command_line(&self, command: SystemCommand) -> String {
        let events = |verb: &str| format!("osascript -e 'tell application \"System Events\" to {verb}'");
        match command {
            SystemCommand::Lock => events("keystroke \"q\" using {control down, command down}"),
            SystemCommand::Sleep => "pmset sleepnow".into(),
            SystemCommand::Logout => events("log out"),
            SystemCommand::Restart => events("restart"),
            SystemCommand::Shutdown => events("shut down"),
        }
    }

    fn data_dir(&self) -> PathBuf {
        // Config and data share Application Support on macOS
        self.config_dir()
    }
}
