//! Calculator provider - evaluates math expressions with `meval`.

use crate::core::{Action, Candidate, Category};
use crate::error::ProviderResult;
use crate::search::{Provider, ProviderKind, SearchContext};

use super::format::format_number;

/// Evaluate a math expression.
///
/// Returns `None` for anything that is not an expression worth showing:
/// no digit, a bare number, a parse failure, NaN or infinity.
pub fn evaluate(expr: &str) -> Option<f64> {
    let expr = expr.trim().trim_start_matches('=').trim();

    if expr.is_empty() || !expr.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    // "42" alone is not a calculation
    if expr.parse::<f64>().is_ok() {
        return None;
    }

    meval::eval_str(expr).ok().filter(|result| result.is_finite())
}

pub struct CalculatorProvider;

impl CalculatorProvider {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CalculatorProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl Provider for CalculatorProvider {
    fn name(&self) -> &str {
        "calculator"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Fast
    }

    fn should_search(&self, ctx: &SearchContext) -> bool {
        ctx.query.chars().any(|c| c.is_ascii_digit())
    }

    fn search(&self, ctx: &SearchContext) -> ProviderResult<Vec<Candidate>> {
        let Some(value) = evaluate(&ctx.query) else {
            return Ok(Vec::new());
        };

        let expr = ctx.query.trim_start_matches('=').trim();
        let result = format_number(value);

        Ok(vec![Candidate::new(
            Category::Calculation,
            format!("calc:{expr}"),
            format!("= {result}"),
            Action::CopyToClipboard(result.clone()),
        )
        .with_subtitle(expr)
        .with_match_score(1.0)
        .with_alternate(Action::CopyToClipboard(format!("{expr} = {result}")))])
    }
}
