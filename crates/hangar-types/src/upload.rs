//! Wire body of the version upload endpoint.
//!
//! Hangar receives the version metadata as a JSON part named
//! `versionUpload` next to one binary `files` part per uploaded jar. Each
//! entry in [`VersionUpload::files`] without an external URL corresponds,
//! in order, to one of those binary parts.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Artifact, Dependency, Publication};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionUpload {
    pub version: String,
    /// Plugin dependencies keyed by platform name
    pub plugin_dependencies: BTreeMap<String, Vec<PluginDependency>>,
    /// Supported platform versions keyed by platform name
    pub platform_dependencies: BTreeMap<String, Vec<String>>,
    /// The changelog
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub files: Vec<FileData>,
    pub channel: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginDependency {
    pub name: String,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<ProjectNamespace>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_url: Option<String>,
}

impl From<&Dependency> for PluginDependency {
    fn from(dep: &Dependency) -> Self {
        match dep {
            Dependency::Hangar {
                name,
                owner,
                slug,
                required,
            } => PluginDependency {
                name: name.clone(),
                required: *required,
                namespace: Some(ProjectNamespace {
                    owner: owner.clone(),
                    slug: slug.clone(),
                }),
                external_url: None,
            },
            Dependency::Url {
                name,
                url,
                required,
            } => PluginDependency {
                name: name.clone(),
                required: *required,
                namespace: None,
                external_url: Some(url.clone()),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectNamespace {
    pub owner: String,
    pub slug: String,
}

/// One downloadable file, shared by one or more platforms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileData {
    pub platforms: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_url: Option<String>,
}

impl FileData {
    /// True when the file is uploaded rather than linked.
    pub fn is_file(&self) -> bool {
        self.external_url.is_none()
    }
}

impl VersionUpload {
    /// Build the upload body for a publication.
    ///
    /// Returns the body and the jar paths to attach, one per uploaded
    /// [`FileData`] entry and in the same order. Platforms pointing at the
    /// same jar (compared by canonical path) or the same URL share an entry.
    pub fn from_publication(publication: &Publication) -> (Self, Vec<PathBuf>) {
        let mut plugin_dependencies = BTreeMap::new();
        let mut platform_dependencies = BTreeMap::new();
        let mut jars: Vec<(PathBuf, PathBuf, Vec<String>)> = Vec::new();
        let mut urls: Vec<(String, Vec<String>)> = Vec::new();

        for platform in &publication.platforms {
            plugin_dependencies.insert(
                platform.name.clone(),
                platform
                    .dependencies
                    .iter()
                    .map(PluginDependency::from)
                    .collect(),
            );
            platform_dependencies.insert(platform.name.clone(), platform.platform_versions.clone());

            match &platform.artifact {
                Artifact::Jar(path) => {
                    let canonical = canonical_path(path);
                    match jars.iter_mut().find(|(_, c, _)| *c == canonical) {
                        Some((_, _, names)) => names.push(platform.name.clone()),
                        None => jars.push((path.clone(), canonical, vec![platform.name.clone()])),
                    }
                }
                Artifact::Url(url) => match urls.iter_mut().find(|(u, _)| u == url) {
                    Some((_, names)) => names.push(platform.name.clone()),
                    None => urls.push((url.clone(), vec![platform.name.clone()])),
                },
            }
        }

        let mut files = Vec::with_capacity(jars.len() + urls.len());
        let mut paths = Vec::with_capacity(jars.len());
        for (path, _, platforms) in jars {
            files.push(FileData {
                platforms,
                external_url: None,
            });
            paths.push(path);
        }
        for (url, platforms) in urls {
            files.push(FileData {
                platforms,
                external_url: Some(url),
            });
        }

        let upload = VersionUpload {
            version: publication.version.clone(),
            plugin_dependencies,
            platform_dependencies,
            description: publication.changelog.clone(),
            files,
            channel: publication.channel.clone(),
        };
        (upload, paths)
    }
}

fn canonical_path(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
