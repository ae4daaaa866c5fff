//! Route resolution: rule specificity ordering, path+tool matching, and
//! workspace-ancestor fallback. See SPEC_FULL.md §4.3.

use mux_domain::model::{workspace_chain, Policy, RouteRule, Workspace};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    #[error("no route matched")]
    NoRoute,
    #[error("route denied by policy (rule {rule_id})")]
    Denied { rule_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    pub rule_id: String,
    pub downstream_server_id: String,
    pub auth_scope_id: String,
    pub workspace_id: String,
}

/// Glob specificity: a higher score for more-literal globs and fewer `**`
/// wildcards.
fn path_specificity(glob: &str) -> i64 {
    let literal_chars = glob.chars().filter(|c| *c != '*' && *c != '/').count() as i64;
    let double_star_penalty = glob.matches("**").count() as i64 * 100;
    let single_star_penalty = glob.matches('*').count() as i64 * 10 - glob.matches("**").count() as i64 * 20;
    literal_chars * 1000 - double_star_penalty - single_star_penalty
}

/// `*` → 0, `prefix*` → 1, exact → 2. The rule's overall tool specificity is
/// the maximum across its patterns (the most exact pattern wins ties).
fn tool_specificity(patterns: &[&str]) -> i64 {
    patterns
        .iter()
        .map(|p| {
            if *p == "*" {
                0
            } else if p.ends_with('*') {
                1
            } else {
                2
            }
        })
        .max()
        .unwrap_or(0)
}

fn path_glob_matches(glob: &str, subpath: &str) -> bool {
    if glob == "*" || glob == "**" {
        return true;
    }
    if let Some(prefix) = glob.strip_suffix("/**") {
        return subpath == prefix || subpath.starts_with(&format!("{prefix}/"));
    }
    if let Some(prefix) = glob.strip_suffix('*') {
        return subpath.starts_with(prefix);
    }
    glob == subpath
}

fn tool_matches(patterns: &[&str], tool_name: &str) -> bool {
    patterns.iter().any(|pattern| {
        if *pattern == "*" {
            true
        } else if let Some(prefix) = pattern.strip_suffix('*') {
            tool_name.starts_with(prefix)
        } else {
            *pattern == tool_name
        }
    })
}

struct ScoredRule<'a> {
    rule: &'a RouteRule,
    path_specificity: i64,
    tool_specificity: i64,
}

/// Resolve a route within a single workspace's rule set. `tool_name` is the
/// fully namespace-prefixed name (`<ns>__<bare>`).
pub fn resolve_in_workspace(rules: &[RouteRule], subpath: &str, tool_name: &str) -> Result<RouteMatch, RouteError> {
    let mut scored: Vec<ScoredRule<'_>> = rules
        .iter()
        .map(|rule| ScoredRule {
            rule,
            path_specificity: path_specificity(&rule.path_glob),
            tool_specificity: tool_specificity(&rule.tool_patterns()),
        })
        .collect();

    scored.sort_by(|a, b| {
        b.path_specificity
            .cmp(&a.path_specificity)
            .then(b.tool_specificity.cmp(&a.tool_specificity))
            .then(b.rule.priority.cmp(&a.rule.priority))
            .then(a.rule.id.cmp(&b.rule.id))
    });

    for scored_rule in &scored {
        let rule = scored_rule.rule;
        if !path_glob_matches(&rule.path_glob, subpath) {
            continue;
        }
        if !tool_matches(&rule.tool_patterns(), tool_name) {
            continue;
        }
        return match rule.policy {
            Policy::Deny => Err(RouteError::Denied { rule_id: rule.id.clone() }),
            Policy::Allow => Ok(RouteMatch {
                rule_id: rule.id.clone(),
                downstream_server_id: rule.downstream_server_id.clone(),
                auth_scope_id: rule.auth_scope_id.clone(),
                workspace_id: rule.workspace_id.clone(),
            }),
        };
    }

    Err(RouteError::NoRoute)
}

/// Resolve with workspace-ancestor fallback. Walks ancestors most-specific
/// first; a `Denied` result is final (inner policies override outer ones), a
/// `NoRoute` result continues to the next ancestor.
pub fn resolve_with_fallback(
    workspaces: &[Workspace],
    rules_by_workspace: impl Fn(&str) -> Vec<RouteRule>,
    client_root: &str,
    tool_name: &str,
) -> Result<RouteMatch, RouteError> {
    let ancestors = workspace_chain(workspaces, client_root);
    if ancestors.is_empty() {
        return Err(RouteError::NoRoute);
    }

    for ws in ancestors {
        let subpath = mux_domain::model::subpath_relative_to(&ws.root_path, client_root).unwrap_or_default();
        let rules = rules_by_workspace(&ws.id);
        match resolve_in_workspace(&rules, &subpath, tool_name) {
            Ok(m) => return Ok(m),
            Err(RouteError::Denied { rule_id }) => return Err(RouteError::Denied { rule_id }),
            Err(RouteError::NoRoute) => continue,
        }
    }

    Err(RouteError::NoRoute)
}
