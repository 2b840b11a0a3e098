//! Ordered literal replacement with all-or-nothing results.
//!
//! Each pair replaces the first occurrence of its match text in the current
//! working copy, so later pairs see the output of earlier ones. A single
//! missing match fails the whole call and no partial content is returned.

use crate::config::schema::Replacement;
use std::fmt;

/// Similarity above which a line is offered as a "closest match" hint.
const HINT_THRESHOLD: f64 = 0.6;

const NOT_FOUND: &str = "String not found in file";

/// What happened to one replacement pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplacementOutcome {
    pub match_text: String,
    pub found: bool,
    pub applied: bool,
    pub reason_if_not_found: Option<String>,
}

/// Successful replacement run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replaced {
    pub content: String,
    pub outcomes: Vec<ReplacementOutcome>,
}

/// One or more match strings were absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplacementError {
    /// Outcomes for every pair, in input order.
    pub outcomes: Vec<ReplacementOutcome>,
}

impl ReplacementError {
    pub fn not_found(&self) -> impl Iterator<Item = &ReplacementOutcome> {
        self.outcomes.iter().filter(|o| !o.found)
    }
}

impl fmt::Display for ReplacementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let missing: Vec<_> = self.not_found().collect();
        write!(
            f,
            "not all replacements could be applied ({} of {} not found)",
            missing.len(),
            self.outcomes.len()
        )?;
        for outcome in missing {
            write!(f, "\n  - {:?}", outcome.match_text)?;
            if let Some(reason) = &outcome.reason_if_not_found {
                write!(f, ": {reason}")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ReplacementError {}

/// Apply `replacements` to `content` in order.
pub fn apply(content: &str, replacements: &[Replacement]) -> Result<Replaced, ReplacementError> {
    let mut working = content.to_string();
    let mut outcomes = Vec::with_capacity(replacements.len());

    for replacement in replacements {
        match working.find(&replacement.find) {
            Some(start) => {
                working.replace_range(start..start + replacement.find.len(), &replacement.replace);
                outcomes.push(ReplacementOutcome {
                    match_text: replacement.find.clone(),
                    found: true,
                    applied: true,
                    reason_if_not_found: None,
                });
            }
            None => {
                let reason = match closest_line(&working, &replacement.find) {
                    Some((line_no, line)) => {
                        format!("{NOT_FOUND} (closest line {line_no}: {line:?})")
                    }
                    None => NOT_FOUND.to_string(),
                };
                tracing::warn!(match_text = %replacement.find, "replacement not found");
                outcomes.push(ReplacementOutcome {
                    match_text: replacement.find.clone(),
                    found: false,
                    applied: false,
                    reason_if_not_found: Some(reason),
                });
            }
        }
    }

    if outcomes.iter().all(|o| o.found) {
        Ok(Replaced {
            content: working,
            outcomes,
        })
    } else {
        Err(ReplacementError { outcomes })
    }
}

/// Best-matching line (1-based) for the first non-blank line of `needle`.
fn closest_line<'a>(haystack: &'a str, needle: &str) -> Option<(usize, &'a str)> {
    let probe = needle.lines().map(str::trim).find(|l| !l.is_empty())?;

    haystack
        .lines()
        .enumerate()
        .map(|(idx, line)| {
            let line = line.trim();
            (idx + 1, line, strsim::normalized_levenshtein(probe, line))
        })
        .filter(|(_, _, score)| *score >= HINT_THRESHOLD)
        .max_by(|a, b| a.2.total_cmp(&b.2))
        .map(|(line_no, line, _)| (line_no, line))
}
