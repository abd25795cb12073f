//! Running processes, read from the process table through `ps`.
//!
//! `ps` is an external program that can stall, so the child is polled
//! rather than waited on, and killed as soon as the search is cancelled.

use std::process::{Command, Stdio};

use tracing::debug;

use crate::core::{fuzzy, Action, Candidate, Category};
use crate::error::{ProviderError, ProviderResult};
use crate::platform::collect_output;
use crate::search::{Provider, ProviderKind, SearchContext};

/// Queries starting with one of these list every process.
const KEYWORDS: &[&str] = &["kill", "ps"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
}

/// Parse `ps -axo pid=,comm=` output. Malformed lines are skipped and
/// command paths are reduced to their file name.
pub fn parse_ps_output(output: &str) -> Vec<ProcessInfo> {
    output
        .lines()
        .filter_map(|line| {
            let (pid, command) = line.trim().split_once(char::is_whitespace)?;
            let pid = pid.parse().ok()?;
            let command = command.trim();
            let name = command.rsplit('/').next().unwrap_or(command);
            (!name.is_empty()).then(|| ProcessInfo {
                pid,
                name: name.to_string(),
            })
        })
        .collect()
}

pub struct ProcessProvider {
    enabled: bool,
    program: String,
    args: Vec<String>,
}

impl ProcessProvider {
    pub fn new(enabled: bool) -> Self {
        Self::with_command(enabled, "ps", &["-axo", "pid=,comm="])
    }

    /// Use a different lister; it must print `ps`-style `pid name` lines.
    pub fn with_command(enabled: bool, program: &str, args: &[&str]) -> Self {
        Self {
            enabled,
            program: program.to_string(),
            args: args.iter().map(|arg| arg.to_string()).collect(),
        }
    }

    /// Run the lister until it exits or `ctx` is cancelled.
    fn list(&self, ctx: &SearchContext) -> ProviderResult<Vec<ProcessInfo>> {
        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        let Some((status, output)) = collect_output(child, || ctx.is_cancelled())? else {
            debug!(program = %self.program, "process listing cancelled");
            return Err(ProviderError::Cancelled);
        };

        if !status.success() {
            return Err(ProviderError::failed(
                "processes",
                format!("{} exited with {status}", self.program),
            ));
        }
        Ok(parse_ps_output(&output))
    }

    fn candidate(process: &ProcessInfo, match_score: f64) -> Candidate {
        Candidate::new(
            Category::Process,
            format!("pid:{}", process.pid),
            format!("{} ({})", process.name, process.pid),
            Action::RunShellCommand(format!("kill {}", process.pid)),
        )
        .with_subtitle(format!("PID {} · select to quit", process.pid))
        .with_match_score(match_score)
        .with_alternate(Action::CopyToClipboard(process.pid.to_string()))
    }
}

impl Provider for ProcessProvider {
    fn name(&self) -> &str {
        "processes"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Slow
    }

    fn should_search(&self, ctx: &SearchContext) -> bool {
        self.enabled && !ctx.is_empty()
    }

    fn search(&self, ctx: &SearchContext) -> ProviderResult<Vec<Candidate>> {
        let processes = self.list(ctx)?;

        let (term, keyword_mode) = if KEYWORDS.contains(&ctx.keyword.as_str()) {
            (ctx.remaining.clone().unwrap_or_default(), true)
        } else {
            (ctx.query.clone(), false)
        };

        Ok(processes
            .iter()
            .filter_map(|process| {
                let score = if keyword_mode && term.is_empty() {
                    1.0
                } else {
                    fuzzy::score(&term, &process.name)
                };
                (score > 0.0).then(|| Self::candidate(process, score))
            })
            .collect())
    }
}
