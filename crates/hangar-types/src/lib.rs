//! Core domain types for hangar-publish.
//!
//! A [`Publication`] is the fully-resolved description of one release: the
//! project it belongs to, the version and channel, one [`Platform`] per
//! target runtime and the documentation [`Page`]s to keep in sync. The
//! config layer builds these; the engine consumes them.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod upload;

pub use upload::{FileData, PluginDependency, ProjectNamespace, VersionUpload};

/// API endpoint of Paper's Hangar instance.
pub const DEFAULT_API_ENDPOINT: &str = "https://hangar.papermc.io/api/v1/";

/// Page name reserved for the project's main resource page.
pub const RESOURCE_PAGE_ID: &str = "MainResourcePage";

/// Normalize an API endpoint so relative paths can be appended directly.
pub fn normalize_endpoint(endpoint: &str) -> String {
    let trimmed = endpoint.trim();
    if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    }
}

/// A resolved release descriptor for one Hangar project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publication {
    /// Name of the publication, unique within a config file
    pub name: String,
    /// API endpoint, always ending in `/`
    pub api_endpoint: String,
    /// Owner (user or organization) of the project
    pub owner: String,
    /// Slug of the project
    pub slug: String,
    /// Version string to publish
    pub version: String,
    /// Release channel, i.e. "Release" or "Snapshot"
    pub channel: String,
    /// Markdown changelog for this version
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changelog: Option<String>,
    /// Target platforms, in declaration order
    pub platforms: Vec<Platform>,
    /// Pages to sync
    #[serde(default)]
    pub pages: Vec<Page>,
}

impl Publication {
    /// `owner/slug` for display.
    pub fn namespace(&self) -> String {
        format!("{}/{}", self.owner, self.slug)
    }

    /// Relative path of the version upload endpoint.
    pub fn upload_path(&self) -> String {
        format!("projects/{}/upload", self.slug)
    }

    /// Relative path of the page edit endpoint.
    pub fn page_edit_path(&self) -> String {
        format!("pages/edit/{}", self.slug)
    }

    /// Look up a page by name.
    pub fn page(&self, name: &str) -> Option<&Page> {
        self.pages.iter().find(|p| p.name == name)
    }
}

/// One target platform of a publication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    /// Platform name, e.g. `PAPER`
    pub name: String,
    /// Supported platform versions, e.g. `["1.19", "1.20"]`
    pub platform_versions: Vec<String>,
    /// Where the download comes from
    pub artifact: Artifact,
    /// Plugin dependencies for this platform
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
}

/// Download source of a platform: an uploaded jar or an external URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Artifact {
    /// Local jar file uploaded with the version
    Jar(PathBuf),
    /// External download URL
    Url(String),
}

impl Artifact {
    /// Returns the jar path for [`Artifact::Jar`].
    pub fn jar(&self) -> Option<&PathBuf> {
        match self {
            Artifact::Jar(path) => Some(path),
            Artifact::Url(_) => None,
        }
    }
}

/// A plugin dependency of a platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Dependency {
    /// Another project hosted on Hangar
    Hangar {
        /// Dependency name, unique within the platform
        name: String,
        /// Owner of the referenced project
        owner: String,
        /// Slug of the referenced project
        slug: String,
        /// Whether the dependency is required
        required: bool,
    },
    /// A dependency hosted elsewhere
    Url {
        /// Display name on Hangar
        name: String,
        /// Where the dependency is located
        url: String,
        /// Whether the dependency is required
        required: bool,
    },
}

impl Dependency {
    pub fn name(&self) -> &str {
        match self {
            Dependency::Hangar { name, .. } | Dependency::Url { name, .. } => name,
        }
    }

    pub fn required(&self) -> bool {
        match self {
            Dependency::Hangar { required, .. } | Dependency::Url { required, .. } => *required,
        }
    }
}

/// A project page and the markdown it should contain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Page name; [`RESOURCE_PAGE_ID`] for the main page
    pub name: String,
    /// Markdown content
    pub content: String,
}

impl Page {
    /// The project's main resource page.
    pub fn resource(content: impl Into<String>) -> Self {
        Self {
            name: RESOURCE_PAGE_ID.to_string(),
            content: content.into(),
        }
    }

    pub fn is_resource_page(&self) -> bool {
        self.name == RESOURCE_PAGE_ID
    }

    /// Path sent to the page edit endpoint. Empty for the main page.
    pub fn path(&self) -> &str {
        if self.is_resource_page() {
            ""
        } else {
            &self.name
        }
    }
}

/// Kind of remote operation the engine performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Version upload
    CreateVersion,
    /// Page edit
    SyncPage,
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationKind::CreateVersion => write!(f, "create-version"),
            OperationKind::SyncPage => write!(f, "sync-page"),
        }
    }
}

/// Failure classification for a single operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// Credentials rejected or token response unusable
    Auth,
    /// Registry answered with a non-200 status
    Server,
    /// Network or IO failure
    Transport,
    /// Local input could not be turned into a request
    Invalid,
}

impl std::fmt::Display for FailureClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureClass::Auth => write!(f, "auth"),
            FailureClass::Server => write!(f, "server"),
            FailureClass::Transport => write!(f, "transport"),
            FailureClass::Invalid => write!(f, "invalid"),
        }
    }
}

/// Final state of one operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum OperationStatus {
    Succeeded {
        /// Link or summary returned by the registry, if any
        #[serde(skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
    Failed {
        class: FailureClass,
        message: String,
    },
}

impl OperationStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, OperationStatus::Succeeded { .. })
    }
}

/// Evidence for one remote operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationReport {
    /// Publication the operation belongs to
    pub publication: String,
    /// What was attempted
    pub kind: OperationKind,
    /// Version string or page name
    pub target: String,
    /// How it ended
    pub status: OperationStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
}

/// Collected reports of one CLI run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub operations: Vec<OperationReport>,
}

impl RunReport {
    pub fn success_count(&self) -> usize {
        self.operations
            .iter()
            .filter(|op| op.status.is_success())
            .count()
    }

    pub fn failure_count(&self) -> usize {
        self.operations.len() - self.success_count()
    }

    /// True when every operation succeeded.
    pub fn is_success(&self) -> bool {
        self.failure_count() == 0
    }
}
