//! Workspace path resolution.
//!
//! Every path a tool or the model hands us is resolved against the
//! sandbox's workspace root before it reaches a backend. The model is free
//! to say `src/main.rs`, `./src/main.rs`, `/src/main.rs` or the full
//! absolute path; all four land on the same file.

/// Resolve `path` against `root`.
///
/// - A path equal to the root, or already under `root/`, is returned unchanged.
/// - Otherwise any leading `./` and `/` are stripped and the rest is joined
///   onto the root. Absolute paths outside the root are re-rooted.
///
/// The function is pure and idempotent: `normalize(normalize(p, r), r)`
/// equals `normalize(p, r)`.
pub fn normalize(path: &str, root: &str) -> String {
    let root = root.trim_end_matches('/');

    if is_under(path, root) {
        return path.to_string();
    }

    let mut rel = path;
    loop {
        let stripped = rel.trim_start_matches('/');
        let stripped = stripped.strip_prefix("./").unwrap_or(stripped);
        if stripped.len() == rel.len() {
            break;
        }
        rel = stripped;
    }

    if rel.is_empty() || rel == "." {
        return if root.is_empty() {
            "/".to_string()
        } else {
            root.to_string()
        };
    }

    format!("{root}/{rel}")
}

/// The part of `path` below `root`, if `path` lies inside it.
pub fn relative_to_root<'a>(path: &'a str, root: &str) -> Option<&'a str> {
    let root = root.trim_end_matches('/');
    if root.is_empty() {
        return path.strip_prefix('/');
    }
    path.strip_prefix(root)?.strip_prefix('/')
}

/// Parent directory of an absolute path (`/` for top-level entries).
pub fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(idx) => &path[..idx],
    }
}

fn is_under(path: &str, root: &str) -> bool {
    if root.is_empty() {
        return path.starts_with('/');
    }
    path == root
        || path
            .strip_prefix(root)
            .is_some_and(|rest| rest.starts_with('/'))
}
