use serde::{Deserialize, Serialize};

/// A named scope rooted at a filesystem path, owning its own route-rule set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: String,
    pub name: String,
    pub root_path: String,
}

/// Boundary-aware `/`-separated ancestor predicate: `/a` is an ancestor of
/// `/a/b` but not of `/ab`. The root `/` is an ancestor of everything.
pub fn is_path_ancestor(ancestor: &str, path: &str) -> bool {
    let ancestor = ancestor.trim_end_matches('/');
    if ancestor.is_empty() {
        return true;
    }
    if path == ancestor {
        return true;
    }
    path.starts_with(ancestor) && path.as_bytes().get(ancestor.len()) == Some(&b'/')
}

/// Path of `client_root` relative to `root_path(ws)`, boundary-aware.
/// Empty string if the client is exactly at the workspace root or not under it.
pub fn subpath_relative_to(root_path: &str, client_root: &str) -> Option<String> {
    if !is_path_ancestor(root_path, client_root) {
        return None;
    }
    let root = root_path.trim_end_matches('/');
    if client_root == root {
        return Some(String::new());
    }
    Some(client_root[root.len() + 1..].to_string())
}

/// Given a session's `client_root` and the full list of known workspaces,
/// compute the workspace chain: every workspace whose root is a path-boundary
/// ancestor of `client_root`, sorted longest `root_path` first (most specific).
pub fn workspace_chain<'a>(workspaces: &'a [Workspace], client_root: &str) -> Vec<&'a Workspace> {
    let mut chain: Vec<&Workspace> = workspaces
        .iter()
        .filter(|ws| is_path_ancestor(&ws.root_path, client_root))
        .collect();
    chain.sort_by(|a, b| b.root_path.len().cmp(&a.root_path.len()));
    chain
}
