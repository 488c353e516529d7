//! # Remote Repository References
//!
//! A base declared in an overlay is either a directory relative to the
//! overlay, or a reference to a remote Git repository. [`RepoSpec::parse`]
//! tells the two apart: it returns `Some` only for strings that carry both a
//! recognizable host and an `org/repo` part.
//!
//! Supported forms:
//!
//! - `github.com/org/repo/sub/dir?ref=v1`
//! - `https://gitlab.com/org/repo.git/sub/dir?ref=main`
//! - `ssh://git@host/org/repo.git`
//! - `git@github.com:org/repo.git//sub/dir`
//! - `git::https://host/org/repo`
//! - `file:///srv/repos/repo.git//sub/dir` or `file:///srv/repos/repo//sub/dir`
//!
//! Each spec has a canonical identity, `domain/org_repo[/path]`, with the
//! ref left out. Different spellings of the same repository share one
//! identity, which is what the loader chain compares for repository cycles.

use std::fmt;
use std::path::{Path, PathBuf};

use url::Url;

use crate::error::{Error, Result};
use crate::filesystem::{ConfirmedDir, FileSystem};

const GIT_SUFFIX: &str = ".git";
const REF_QUERIES: [&str; 2] = ["?ref=", "?version="];

// Order matters: a wrapped form like `git::https://github.com/` consumes
// several of these in sequence.
const HOST_PREFIXES: [&str; 8] = [
    "git::",
    "ssh://",
    "https://",
    "http://",
    "git@",
    "github.com:",
    "github.com/",
    "file://",
];

/// Releases whatever a loader node owns. Receives the filesystem the node
/// was built with.
pub type Cleaner = Box<dyn FnOnce(&dyn FileSystem) -> Result<()> + Send>;

/// A parsed reference to a remote Git repository, plus the local directory
/// it was cloned into once a cloner has run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSpec {
    raw: String,
    host: String,
    org_repo: String,
    path: String,
    git_ref: Option<String>,
    git_suffix: &'static str,
    clone_dir: Option<ConfirmedDir>,
}

impl RepoSpec {
    /// Parse `reference` as a remote repository reference.
    ///
    /// Returns `None` when the string is not remote, which is how callers
    /// recognize a local directory base.
    pub fn parse(reference: &str) -> Option<Self> {
        if reference.is_empty() || Path::new(reference).is_absolute() {
            return None;
        }
        let (host, rest) = parse_host_spec(reference);
        if host.is_empty() {
            return None;
        }
        let (org_repo, path, git_ref, git_suffix) = if host == "file://" {
            split_file_reference(rest)
        } else {
            split_org_repo(rest)
        };
        if org_repo.is_empty() {
            return None;
        }
        Some(Self {
            raw: reference.to_string(),
            host,
            org_repo: org_repo.to_string(),
            path: path.trim_matches('/').to_string(),
            git_ref: git_ref.filter(|r| !r.is_empty()).map(str::to_string),
            git_suffix,
            clone_dir: None,
        })
    }

    /// The reference exactly as written.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Normalized host prefix, e.g. `https://github.com/` or `git@github.com:`.
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn org_repo(&self) -> &str {
        &self.org_repo
    }

    /// Sub-directory inside the repository, empty for the repository root.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn git_ref(&self) -> Option<&str> {
        self.git_ref.as_deref()
    }

    /// The URL handed to `git`.
    pub fn clone_url(&self) -> String {
        format!("{}{}{}", self.host, self.org_repo, self.git_suffix)
    }

    /// Canonical identity used for repository-cycle detection.
    ///
    /// Branches and tags are not part of the identity.
    pub fn identity(&self) -> String {
        let org_repo = self.org_repo.trim_matches('/');
        let mut identity = match self.domain() {
            Some(domain) => format!("{}/{}", domain, org_repo),
            None => format!("/{}", org_repo),
        };
        if !self.path.is_empty() {
            identity.push('/');
            identity.push_str(&self.path);
        }
        identity
    }

    fn domain(&self) -> Option<String> {
        if let Ok(url) = Url::parse(&self.clone_url()) {
            if url.scheme() == "file" {
                return None;
            }
            if let Some(host) = url.host_str() {
                return Some(host.to_ascii_lowercase());
            }
        }
        // scp-like `git@host:` has no URL form.
        let mut domain = self.host.as_str();
        for prefix in ["ssh://", "https://", "http://", "git@"] {
            domain = domain.strip_prefix(prefix).unwrap_or(domain);
        }
        let domain = domain.trim_end_matches(['/', ':']);
        (!domain.is_empty()).then(|| domain.to_ascii_lowercase())
    }

    /// True if either identity is a string prefix of the other.
    ///
    /// Deliberately coarse: a sub-directory of a visited repository, or the
    /// same repository at another ref, counts as already visited.
    pub fn overlaps(&self, other: &RepoSpec) -> bool {
        let (mine, theirs) = (self.identity(), other.identity());
        mine.starts_with(&theirs) || theirs.starts_with(&mine)
    }

    /// Record where a cloner put the repository.
    pub fn set_clone_dir(&mut self, dir: ConfirmedDir) {
        self.clone_dir = Some(dir);
    }

    pub fn clone_dir(&self) -> Option<&ConfirmedDir> {
        self.clone_dir.as_ref()
    }

    /// The clone directory joined with the sub-path.
    pub fn resolved_path(&self) -> Result<PathBuf> {
        match &self.clone_dir {
            Some(dir) => Ok(dir.join(&self.path)),
            None => Err(Error::NotCloned { uri: self.raw.clone() }),
        }
    }

    /// Action that deletes the clone directory, a no-op before cloning.
    pub fn cleaner(&self) -> Cleaner {
        let dir = self.clone_dir.clone();
        Box::new(move |fs: &dyn FileSystem| match dir {
            Some(dir) => fs.remove_all(dir.as_path()),
            None => Ok(()),
        })
    }
}

impl fmt::Display for RepoSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn starts_with_ignore_case(s: &str, prefix: &str) -> bool {
    s.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

/// Split off the host part of a reference and normalize it.
fn parse_host_spec(reference: &str) -> (String, &str) {
    let mut host = String::new();
    let mut rest = reference;
    for prefix in HOST_PREFIXES {
        if prefix.len() < rest.len() && starts_with_ignore_case(rest, prefix) {
            host.push_str(prefix);
            rest = &rest[prefix.len()..];
        }
    }

    if host == "git@" {
        // scp-like `git@host:org/repo`
        if let Some(i) = rest.find([':', '/']) {
            host.push_str(&rest[..=i]);
            rest = &rest[i + 1..];
        }
        return (host, rest);
    }

    // `ssh://git@host/` still needs its domain split off.
    let scheme_part = host.strip_suffix("git@").unwrap_or(&host).to_string();
    for scheme in ["ssh://", "https://", "http://"] {
        if scheme_part.ends_with(scheme) {
            if let Some(i) = rest.find('/') {
                host.push_str(&rest[..=i]);
                rest = &rest[i + 1..];
            }
            break;
        }
    }
    (normalize_host(host), rest)
}

fn normalize_host(host: String) -> String {
    let lower = host.to_ascii_lowercase();
    if lower.contains("github.com") {
        if lower.contains("git@") || lower.contains("ssh:") {
            return "git@github.com:".to_string();
        }
        return "https://github.com/".to_string();
    }
    match lower.strip_prefix("git::") {
        Some(stripped) => stripped.to_string(),
        None => host,
    }
}

fn peel_query(s: &str) -> (&str, Option<&str>) {
    for query in REF_QUERIES {
        if let Some(i) = s.find(query) {
            return (&s[..i], Some(&s[i + query.len()..]));
        }
    }
    (s, None)
}

/// Position of a `.git` that ends a repository name, that is one followed by
/// `/`, `?` or the end of the string. `my.github-tools` has none.
fn find_git_suffix(s: &str) -> Option<usize> {
    s.match_indices(GIT_SUFFIX).map(|(i, _)| i).find(|&i| {
        matches!(
            s.as_bytes().get(i + GIT_SUFFIX.len()),
            None | Some(b'/') | Some(b'?')
        )
    })
}

/// Returns `(org_repo, path, ref, git_suffix)`.
fn split_org_repo(rest: &str) -> (&str, &str, Option<&str>, &'static str) {
    if let Some(i) = find_git_suffix(rest) {
        let (path, git_ref) = peel_query(&rest[i + GIT_SUFFIX.len()..]);
        return (&rest[..i], path, git_ref, GIT_SUFFIX);
    }
    let Some(i) = rest.find('/').filter(|&i| i > 0) else {
        return ("", "", None, "");
    };
    match rest[i + 1..].find('/') {
        Some(j) => {
            let j = i + 1 + j;
            let (path, git_ref) = peel_query(&rest[j + 1..]);
            (&rest[..j], path, git_ref, "")
        }
        None => {
            let (org_repo, git_ref) = peel_query(rest);
            (org_repo, "", git_ref, "")
        }
    }
}

/// `file://` references carry an absolute path, so the sub-path is split at
/// `//` (or after `.git`) instead of after the second segment.
fn split_file_reference(rest: &str) -> (&str, &str, Option<&str>, &'static str) {
    let (rest, git_ref) = peel_query(rest);
    if !rest.starts_with('/') {
        return ("", "", None, "");
    }
    if let Some(i) = rest[1..].find("//").map(|i| i + 1) {
        return (&rest[..i], &rest[i + 2..], git_ref, "");
    }
    if let Some(i) = find_git_suffix(rest) {
        return (&rest[..i], &rest[i + GIT_SUFFIX.len()..], git_ref, GIT_SUFFIX);
    }
    (rest, "", git_ref, "")
}
