//! Execution dispatcher - performs the side effect behind an activated candidate.
//!
//! Every effect goes through the [`Platform`] trait. Failures are returned to
//! the caller as [`ActionError`] for display and are never retried here.

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::core::{Action, Candidate};
use crate::error::{ActionError, ActionResult};
use crate::platform::Platform;
use crate::services::UsageTracker;

/// Which of a candidate's actions to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Modifier {
    #[default]
    Primary,
    Alternate,
}

/// What an activation did, for the UI to report.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum ActionOutcome {
    Launched { target: String },
    Opened { url: String },
    Copied { text: String },
    Revealed { path: String },
    CommandStarted { command: String },
    /// Nothing to do; the candidate needs more input
    NothingToDo,
}

impl ActionOutcome {
    /// Short confirmation for the user
    pub fn message(&self) -> String {
        match self {
            ActionOutcome::Launched { target } => format!("Launched {target}"),
            ActionOutcome::Opened { url } => format!("Opened {url}"),
            ActionOutcome::Copied { text } => {
                let preview: String = text.chars().take(40).collect();
                if preview.len() < text.len() {
                    format!("Copied \"{preview}...\"")
                } else {
                    format!("Copied \"{preview}\"")
                }
            }
            ActionOutcome::Revealed { path } => format!("Revealed {path}"),
            ActionOutcome::CommandStarted { command } => format!("Started: {command}"),
            ActionOutcome::NothingToDo => "Nothing to do".to_string(),
        }
    }
}

/// Maps a candidate's action tag to a platform side effect.
pub struct Dispatcher {
    platform: Arc<dyn Platform>,
    usage: Arc<UsageTracker>,
}

impl Dispatcher {
    pub fn new(platform: Arc<dyn Platform>, usage: Arc<UsageTracker>) -> Self {
        Self { platform, usage }
    }

    /// Perform the primary or alternate action of `candidate`.
    ///
    /// Successful activations are recorded for frecency.
    pub fn activate(&self, candidate: &Candidate, modifier: Modifier) -> ActionResult<ActionOutcome> {
        let action = match modifier {
            Modifier::Primary => candidate.action.clone(),
            Modifier::Alternate => candidate.alternate_action(),
        };

        match self.execute(&action) {
            Ok(outcome) => {
                if outcome != ActionOutcome::NothingToDo {
                    self.usage.record_candidate(candidate);
                }
                info!(
                    category = %candidate.category,
                    identity = %candidate.identity,
                    ?modifier,
                    "activated"
                );
                Ok(outcome)
            }
            Err(e) => {
                warn!(identity = %candidate.identity, error = %e, "activation failed");
                Err(e)
            }
        }
    }

    /// Perform a single action.
    pub fn execute(&self, action: &Action) -> ActionResult<ActionOutcome> {
        match action {
            Action::Launch(path) => {
                require_exists(path)?;
                self.platform.launch(path)?;
                Ok(ActionOutcome::Launched {
                    target: path.display().to_string(),
                })
            }
            Action::OpenUrl(url) => {
                if url.trim().is_empty() {
                    return Err(ActionError::EmptyCommand);
                }
                self.platform.open(url)?;
                Ok(ActionOutcome::Opened { url: url.clone() })
            }
            Action::CopyToClipboard(text) => {
                self.platform.clipboard_write(text)?;
                Ok(ActionOutcome::Copied { text: text.clone() })
            }
            Action::Reveal(path) => {
                require_exists(path)?;
                self.platform.reveal(path)?;
                Ok(ActionOutcome::Revealed {
                    path: path.display().to_string(),
                })
            }
            Action::RunShellCommand(command) => {
                if command.trim().is_empty() {
                    return Err(ActionError::EmptyCommand);
                }
                self.platform.run_shell_command(command)?;
                Ok(ActionOutcome::CommandStarted {
                    command: command.clone(),
                })
            }
            Action::NoOp => Ok(ActionOutcome::NothingToDo),
        }
    }
}

fn require_exists(path: &Path) -> ActionResult<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(ActionError::MissingPath(path.to_path_buf()))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::Category;
    use crate::platform::{AppEntry, SystemCommand};
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// Records every side effect instead of performing it.
    #[derive(Default)]
    pub(crate) struct RecordingPlatform {
        pub calls: Mutex<Vec<String>>,
        pub clipboard: Mutex<Option<String>>,
        pub apps: Vec<AppEntry>,
        pub fail_with: Option<String>,
    }

    impl RecordingPlatform {
        fn log(&self, call: String) -> ActionResult<()> {
            self.calls.lock().unwrap().push(call);
            match &self.fail_with {
                Some(program) => Err(ActionError::CommandFailed {
                    program: program.clone(),
                    status: "exit status: 1".into(),
                }),
                None => Ok(()),
            }
        }

        pub(crate) fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Platform for RecordingPlatform {
        fn name(&self) -> &'static str {
            "Test"
        }

        fn discover_apps(&self) -> Vec<AppEntry> {
            self.apps.clone()
        }

        fn clipboard_read(&self) -> Option<String> {
            self.clipboard.lock().unwrap().clone()
        }

        fn clipboard_write(&self, content: &str) -> ActionResult<()> {
            self.log(format!("copy {content}"))?;
            *self.clipboard.lock().unwrap() = Some(content.to_string());
            Ok(())
        }

        fn open(&self, target: &str) -> ActionResult<()> {
            self.log(format!("open {target}"))
        }

        fn reveal(&self, path: &Path) -> ActionResult<()> {
            self.log(format!("reveal {}", path.display()))
        }

        fn launch(&self, path: &Path) -> ActionResult<()> {
            self.log(format!("launch {}", path.display()))
        }

        fn run_shell_command(&self, command: &str) -> ActionResult<()> {
            self.log(format!("sh {command}"))
        }

        fn system_command_line(&self, command: SystemCommand) -> String {
            format!("test-{}", command.id())
        }
    }

    fn dispatcher(platform: Arc<RecordingPlatform>) -> (Dispatcher, Arc<UsageTracker>) {
        let usage = Arc::new(UsageTracker::in_memory());
        (Dispatcher::new(platform, Arc::clone(&usage)), usage)
    }

    #[test]
    fn test_primary_launch_records_usage() {
        let dir = tempfile::tempdir().unwrap();
        let platform = Arc::new(RecordingPlatform::default());
        let (dispatcher, usage) = dispatcher(Arc::clone(&platform));

        let candidate = Candidate::new(
            Category::Application,
            "editor",
            "Editor",
            Action::Launch(dir.path().to_path_buf()),
        );

        let outcome = dispatcher.activate(&candidate, Modifier::Primary).unwrap();
        assert!(matches!(outcome, ActionOutcome::Launched { .. }));
        assert_eq!(platform.calls(), vec![format!("launch {}", dir.path().display())]);
        assert!(usage.score(Category::Application, "editor") > 0.0);
    }

    #[test]
    fn test_alternate_reveals_launch_target() {
        let dir = tempfile::tempdir().unwrap();
        let platform = Arc::new(RecordingPlatform::default());
        let (dispatcher, _) = dispatcher(Arc::clone(&platform));

        let candidate = Candidate::new(
            Category::File,
            dir.path().display().to_string(),
            "dir",
            Action::Launch(dir.path().to_path_buf()),
        );

        dispatcher.activate(&candidate, Modifier::Alternate).unwrap();
        assert_eq!(platform.calls(), vec![format!("reveal {}", dir.path().display())]);
    }

    #[test]
    fn test_missing_path_is_reported_not_retried() {
        let platform = Arc::new(RecordingPlatform::default());
        let (dispatcher, usage) = dispatcher(Arc::clone(&platform));

        let gone = PathBuf::from("/nonexistent/orbit/file.txt");
        let candidate = Candidate::new(
            Category::File,
            gone.display().to_string(),
            "file.txt",
            Action::Launch(gone.clone()),
        );

        let err = dispatcher.activate(&candidate, Modifier::Primary).unwrap_err();
        assert_eq!(err.to_string(), format!("{} does not exist", gone.display()));
        assert!(platform.calls().is_empty());
        assert!(usage.is_empty());
    }

    #[test]
    fn test_platform_failure_is_surfaced_once() {
        let platform = Arc::new(RecordingPlatform {
            fail_with: Some("xdg-open".into()),
            ..Default::default()
        });
        let (dispatcher, usage) = dispatcher(Arc::clone(&platform));

        let candidate = Candidate::new(
            Category::Bookmark,
            "gh",
            "GitHub",
            Action::OpenUrl("https://github.com".into()),
        );

        let err = dispatcher.activate(&candidate, Modifier::Primary).unwrap_err();
        assert!(err.to_string().contains("xdg-open"));
        assert_eq!(platform.calls().len(), 1);
        assert!(usage.is_empty());
    }

    #[test]
    fn test_copy_and_url_alternate() {
        let platform = Arc::new(RecordingPlatform::default());
        let (dispatcher, _) = dispatcher(Arc::clone(&platform));

        let candidate = Candidate::new(
            Category::Bookmark,
            "docs",
            "Docs",
            Action::OpenUrl("https://docs.rs".into()),
        );

        let outcome = dispatcher.activate(&candidate, Modifier::Alternate).unwrap();
        assert_eq!(
            outcome,
            ActionOutcome::Copied {
                text: "https://docs.rs".into()
            }
        );
        assert_eq!(platform.clipboard_read().as_deref(), Some("https://docs.rs"));
    }

    #[test]
    fn test_noop_does_nothing() {
        let platform = Arc::new(RecordingPlatform::default());
        let (dispatcher, usage) = dispatcher(Arc::clone(&platform));

        let candidate = Candidate::new(Category::Bookmark, "g", "Search Google", Action::NoOp);
        let outcome = dispatcher.activate(&candidate, Modifier::Primary).unwrap();

        assert_eq!(outcome, ActionOutcome::NothingToDo);
        assert!(platform.calls().is_empty());
        assert!(usage.is_empty());
    }

    #[test]
    fn test_empty_shell_command_is_an_error() {
        let platform = Arc::new(RecordingPlatform::default());
        let (dispatcher, _) = dispatcher(platform);

        assert!(matches!(
            dispatcher.execute(&Action::RunShellCommand("  ".into())),
            Err(ActionError::EmptyCommand)
        ));
    }

    #[test]
    fn test_copy_message_is_truncated() {
        let outcome = ActionOutcome::Copied {
            text: "x".repeat(100),
        };
        assert_eq!(outcome.message(), format!("Copied \"{}...\"", "x".repeat(40)));
    }
}
