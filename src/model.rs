use std::{
    collections::BTreeSet,
    fmt::{self, Display},
    path::{Path, PathBuf},
    str::FromStr,
};

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use toml::Value;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("'{0}' is not a valid URI")]
    InvalidLocator(String),
    #[error("'{0}' is not a valid revision name")]
    InvalidRevision(String),
    #[error("'{0}' is not a valid commit id")]
    InvalidCommitId(String),
    #[error("'url' argument required")]
    MissingUrl,
    #[error("unsupported argument '{0}' to fetch")]
    UnsupportedArgument(String),
    #[error("argument '{0}' must be a string")]
    InvalidValue(String),
}

/// Address of a remote repository. Absolute filesystem paths are accepted and
/// rewritten to `file://` URIs before validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Locator(String);

impl Locator {
    pub fn parse(url: &str) -> Result<Locator, ParseError> {
        let url = if url.starts_with('/') {
            format!("file://{}", url)
        } else {
            url.to_owned()
        };
        let re: Regex = Regex::new(r"^(https?|file|git|ssh)://\S+$").unwrap();
        if re.is_match(&url) {
            Ok(Locator(url))
        } else {
            Err(ParseError::InvalidLocator(url))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Branch, tag or commit name to fetch. Defaults to the primary branch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Revision(String);

impl Revision {
    pub fn parse(rev: &str) -> Result<Revision, ParseError> {
        // A leading '-' or an embedded ':' would be misread by the client
        // when the revision is spliced into argv and the refspec.
        let malformed = rev.is_empty()
            || rev.starts_with('-')
            || rev.contains(':')
            || rev.contains(char::is_whitespace);
        if malformed {
            Err(ParseError::InvalidRevision(rev.to_owned()))
        } else {
            Ok(Revision(rev.to_owned()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Revision {
    fn default() -> Self {
        Revision("master".to_owned())
    }
}

impl Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Mirror-side ref name derived from a (locator, revision) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocalRef(String);

impl LocalRef {
    /// Stable across runs and platforms: sha256 of `"{locator}-{revision}"`,
    /// lowercase hex.
    pub fn derive(locator: &Locator, revision: &Revision) -> LocalRef {
        let mut hasher = Sha256::new();
        hasher.update(locator.as_str().as_bytes());
        hasher.update(b"-");
        hasher.update(revision.as_str().as_bytes());
        LocalRef(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for LocalRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical immutable commit hash, as printed by the client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommitId(String);

impl CommitId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for CommitId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
        if hex && matches!(s.len(), 40 | 64) {
            Ok(CommitId(s.to_owned()))
        } else {
            Err(ParseError::InvalidCommitId(s.to_owned()))
        }
    }
}

impl Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Path of an immutable artifact inside the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorePath(PathBuf);

impl StorePath {
    pub fn new(path: impl Into<PathBuf>) -> StorePath {
        StorePath(path.into())
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

impl From<PathBuf> for StorePath {
    fn from(path: PathBuf) -> Self {
        StorePath(path)
    }
}

impl AsRef<Path> for StorePath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Caller input: either a bare locator string or a `{ url, rev }` record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchRequest {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub rev: Option<String>,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>) -> FetchRequest {
        FetchRequest {
            url: url.into(),
            rev: None,
        }
    }

    pub fn with_rev(mut self, rev: impl Into<String>) -> FetchRequest {
        self.rev = Some(rev.into());
        self
    }

    /// Parses the structured input form. String values only; any key other
    /// than `url` and `rev` is rejected by name.
    pub fn from_toml(value: &Value) -> Result<FetchRequest, ParseError> {
        match value {
            Value::String(url) => Ok(FetchRequest::new(url)),
            Value::Table(table) => {
                let mut url = None;
                let mut rev = None;
                for (name, value) in table {
                    match name.as_str() {
                        "url" => url = Some(string_value(name, value)?),
                        "rev" => rev = Some(string_value(name, value)?),
                        _ => return Err(ParseError::UnsupportedArgument(name.clone())),
                    }
                }
                Ok(FetchRequest {
                    url: url.ok_or(ParseError::MissingUrl)?,
                    rev,
                })
            }
            _ => Err(ParseError::InvalidValue("url".to_owned())),
        }
    }
}

impl FromStr for FetchRequest {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(FetchRequest::new(s))
    }
}

fn string_value(name: &str, value: &Value) -> Result<String, ParseError> {
    value
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| ParseError::InvalidValue(name.to_owned()))
}

/// A materialized tree: the artifact path, the commit it came from, and the
/// provenance context (the path itself) for downstream dependency tracking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedTree {
    pub path: StorePath,
    pub commit: CommitId,
    pub context: BTreeSet<StorePath>,
}

impl FetchedTree {
    pub fn new(path: StorePath, commit: CommitId) -> FetchedTree {
        let context = BTreeSet::from([path.clone()]);
        FetchedTree {
            path,
            commit,
            context,
        }
    }
}
