use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// A repository returned by discovery. Consumed once per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoDescriptor {
    pub name: String,
    pub clone_url: String,
}

impl RepoDescriptor {
    pub fn new(name: impl Into<String>, clone_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            clone_url: clone_url.into(),
        }
    }
}

/// Local working copy of one repository, owned by the staging manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingHandle {
    pub repo_name: String,
    pub local_root: PathBuf,
}

impl StagingHandle {
    pub fn root(&self) -> &Path {
        &self.local_root
    }
}

/// Logical prefix under which a classified file is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionKey {
    PythonFiles,
    HtmlFiles,
    CssFiles,
    JavaFiles,
}

impl PartitionKey {
    pub const ALL: [PartitionKey; 4] = [
        PartitionKey::PythonFiles,
        PartitionKey::HtmlFiles,
        PartitionKey::CssFiles,
        PartitionKey::JavaFiles,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PartitionKey::PythonFiles => "python_files",
            PartitionKey::HtmlFiles => "html_files",
            PartitionKey::CssFiles => "css_files",
            PartitionKey::JavaFiles => "java_files",
        }
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PartitionKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PartitionKey::ALL
            .into_iter()
            .find(|p| p.as_str() == s.trim())
            .ok_or_else(|| format!("unknown partition '{}'", s))
    }
}

/// Outcome of classifying a single file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Route(PartitionKey),
    Discard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    DiscoveryUnavailable,
    CloneFailed,
    StagingIoFailure,
    UploadFailed,
}

/// A failure recorded during a run without aborting it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorRecord {
    pub kind: ErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunWarning {
    NoRepositoriesFound,
}

/// Aggregate result of one run, reported to the caller and then dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunOutcome {
    pub repositories_attempted: usize,
    pub repositories_skipped: usize,
    pub files_uploaded: usize,
    pub files_discarded: usize,
    pub errors: Vec<ErrorRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<RunWarning>,
}

impl RunOutcome {
    pub fn errors_of(&self, kind: ErrorKind) -> impl Iterator<Item = &ErrorRecord> {
        self.errors.iter().filter(move |e| e.kind == kind)
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}
