//! Session and power commands (lock, sleep, log out, restart, shut down).

use std::sync::Arc;

use crate::core::{fuzzy, Action, Candidate, Category};
use crate::error::ProviderResult;
use crate::platform::{Platform, SystemCommand};
use crate::search::{Provider, ProviderKind, SearchContext};

use super::UsageTracker;

pub struct SystemCommandProvider {
    /// Command line per command, resolved once from the platform
    commands: Vec<(SystemCommand, String)>,
    usage: Arc<UsageTracker>,
}

impl SystemCommandProvider {
    pub fn new(platform: &dyn Platform, usage: Arc<UsageTracker>) -> Self {
        let commands = SystemCommand::ALL
            .into_iter()
            .map(|command| (command, platform.system_command_line(command)))
            .collect();
        Self { commands, usage }
    }
}

impl Provider for SystemCommandProvider {
    fn name(&self) -> &str {
        "system"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Fast
    }

    fn should_search(&self, ctx: &SearchContext) -> bool {
        !ctx.is_empty()
    }

    fn search(&self, ctx: &SearchContext) -> ProviderResult<Vec<Candidate>> {
        let results = self
            .commands
            .iter()
            .filter_map(|(command, line)| {
                let by_title = fuzzy::score(&ctx.query, command.title());
                // Aliases are a second chance, slightly discounted
                let by_alias = command
                    .aliases()
                    .iter()
                    .map(|alias| fuzzy::score(&ctx.query, alias) * 0.9)
                    .fold(0.0, f64::max);

                let score = by_title.max(by_alias);
                (score > 0.0).then(|| {
                    Candidate::new(
                        Category::SystemCommand,
                        command.id(),
                        command.title(),
                        Action::RunShellCommand(line.clone()),
                    )
                    .with_subtitle(command.description())
                    .with_match_score(score)
                    .with_usage(self.usage.score(Category::SystemCommand, command.id()))
                })
            })
            .collect();

        Ok(results)
    }
}
