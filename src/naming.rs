//! Session identifiers.
//!
//! A session ID encodes the (project, worktree, branch) triple it belongs to as
//! `wts-<project>-<worktree>-<branch>`. Each component is sanitized to
//! `[A-Za-z0-9_]`, so `-` only ever appears as a separator, except inside the
//! branch segment of IDs produced elsewhere, which absorbs everything after the
//! second separator.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Result, SessionError};

/// Prefix shared by every session ID this crate generates.
pub const SESSION_PREFIX: &str = "wts";

/// Upper bound on the length of a generated session ID.
pub const MAX_SESSION_ID_LEN: usize = 50;

/// Upper bound on a single sanitized component.
pub const MAX_COMPONENT_LEN: usize = 20;

/// Returned by [`sanitize`] when nothing usable is left.
pub const FALLBACK_COMPONENT: &str = "unnamed";

/// Appended to a component that was cut short to fit the ID length bound.
pub const TRUNCATION_MARKER: char = '~';

const SEPARATOR: char = '-';

static RE_INVALID_CHARS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^A-Za-z0-9_]").unwrap()
});

static RE_SESSION_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^{SESSION_PREFIX}-([A-Za-z0-9_~]+)-([A-Za-z0-9_~]+)-([A-Za-z0-9_~][A-Za-z0-9_~-]*)$"
    ))
    .unwrap()
});

/// Sanitize one component of a session ID.
///
/// Never returns an empty string.
pub fn sanitize(component: &str) -> String {
    let replaced = RE_INVALID_CHARS.replace_all(component, "_");
    let trimmed = replaced.trim_matches(is_separator_char);

    let mut capped: String = trimmed.chars().take(MAX_COMPONENT_LEN).collect();
    let keep = capped.trim_end_matches(is_separator_char).len();
    capped.truncate(keep);

    if capped.is_empty() {
        FALLBACK_COMPONENT.to_string()
    } else {
        capped
    }
}

/// Build the session ID for a (project, worktree, branch) triple.
///
/// Over-long results are shortened by proportional truncation: every component
/// gets an equal share of the space left after the prefix and separators,
/// components shorter than their share donate the difference, and the surplus
/// goes to the branch first, then the worktree, then the project.
pub fn generate_session_id(project: &str, worktree: &str, branch: &str) -> String {
    let parts = [sanitize(project), sanitize(worktree), sanitize(branch)];

    let joined = join_id(&parts);
    if joined.len() <= MAX_SESSION_ID_LEN {
        return joined;
    }

    let available = MAX_SESSION_ID_LEN - SESSION_PREFIX.len() - 3;
    let share = available / 3;

    let mut budgets = [share, share, share + available % 3];
    let mut slack = 0;
    for (budget, part) in budgets.iter_mut().zip(&parts) {
        if part.len() < *budget {
            slack += *budget - part.len();
            *budget = part.len();
        }
    }

    for idx in [2, 1, 0] {
        let wanted = parts[idx].len().saturating_sub(budgets[idx]);
        let extra = wanted.min(slack);
        budgets[idx] += extra;
        slack -= extra;
    }

    let fitted = [
        fit_component(&parts[0], budgets[0]),
        fit_component(&parts[1], budgets[1]),
        fit_component(&parts[2], budgets[2]),
    ];
    join_id(&fitted)
}

/// Split a session ID back into its sanitized (project, worktree, branch).
pub fn parse_session_id(id: &str) -> Result<(String, String, String)> {
    if id.is_empty() {
        return Err(invalid(id, "empty"));
    }
    if !id.starts_with(SESSION_PREFIX) || !id[SESSION_PREFIX.len()..].starts_with(SEPARATOR) {
        return Err(invalid(id, format!("missing {SESSION_PREFIX}- prefix")));
    }
    if id.len() > MAX_SESSION_ID_LEN {
        return Err(invalid(
            id,
            format!("longer than {MAX_SESSION_ID_LEN} characters"),
        ));
    }

    let caps = RE_SESSION_ID
        .captures(id)
        .ok_or_else(|| invalid(id, "expected prefix-project-worktree-branch"))?;

    Ok((
        caps[1].to_string(),
        caps[2].to_string(),
        caps[3].to_string(),
    ))
}

/// Cheap check that a string is one of our session IDs.
pub fn validate_session_id(id: &str) -> bool {
    parse_session_id(id).is_ok()
}

fn is_separator_char(c: char) -> bool {
    c == '_' || c == '-'
}

fn join_id(parts: &[String; 3]) -> String {
    format!(
        "{SESSION_PREFIX}{SEPARATOR}{}{SEPARATOR}{}{SEPARATOR}{}",
        parts[0], parts[1], parts[2]
    )
}

fn fit_component(part: &str, budget: usize) -> String {
    if part.len() <= budget {
        return part.to_string();
    }
    // Sanitized components are ASCII, so byte slicing is char slicing.
    let mut cut = part[..budget.saturating_sub(1)].to_string();
    cut.push(TRUNCATION_MARKER);
    cut
}

fn invalid(id: &str, reason: impl Into<String>) -> SessionError {
    SessionError::InvalidSessionId {
        id: id.to_string(),
        reason: reason.into(),
    }
}
