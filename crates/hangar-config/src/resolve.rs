use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result, bail};
use hangar_types::{Artifact, Dependency, Page, Platform, Publication, normalize_endpoint};

use crate::{Config, DependencyConfig, PageConfig, PlatformConfig, PublicationConfig, ResolvedPublication};

pub(crate) fn resolve_publication(
    config: &Config,
    name: &str,
    raw: &PublicationConfig,
    base_dir: &Path,
) -> Result<ResolvedPublication> {
    for (field, value) in [
        ("owner", &raw.owner),
        ("slug", &raw.slug),
        ("version", &raw.version),
    ] {
        if value.trim().is_empty() {
            bail!("{field} must not be empty");
        }
    }

    let channel = raw
        .channel
        .as_ref()
        .or(config.defaults.channel.as_ref())
        .filter(|c| !c.trim().is_empty())
        .cloned()
        .context("channel is not set (set it on the publication or in [defaults])")?;

    let changelog = match (&raw.changelog, &raw.changelog_file) {
        (Some(_), Some(_)) => bail!("changelog and changelog_file are mutually exclusive"),
        (Some(text), None) => Some(text.clone()),
        (None, Some(file)) => Some(read_text(base_dir, file, "changelog")?),
        (None, None) => None,
    };

    if raw.platforms.is_empty() {
        bail!("no platforms declared");
    }
    let mut seen = BTreeSet::new();
    let mut platforms = Vec::with_capacity(raw.platforms.len());
    for platform in &raw.platforms {
        if !seen.insert(platform.name.as_str()) {
            bail!("platform '{}' is declared more than once", platform.name);
        }
        platforms.push(
            resolve_platform(platform, base_dir)
                .with_context(|| format!("invalid platform '{}'", platform.name))?,
        );
    }

    let mut seen = BTreeSet::new();
    let mut pages = Vec::with_capacity(raw.pages.len());
    for page in &raw.pages {
        if !seen.insert(page.name.as_str()) {
            bail!("page '{}' is declared more than once", page.name);
        }
        pages.push(resolve_page(page, base_dir).with_context(|| format!("invalid page '{}'", page.name))?);
    }

    let api_endpoint = match &raw.api_endpoint {
        Some(endpoint) => normalize_endpoint(endpoint),
        None => config.api_endpoint(),
    };

    Ok(ResolvedPublication {
        publication: Publication {
            name: name.to_string(),
            api_endpoint,
            owner: raw.owner.clone(),
            slug: raw.slug.clone(),
            version: raw.version.clone(),
            channel,
            changelog,
            platforms,
            pages,
        },
        api_key: raw.api_key.clone().filter(|k| !k.is_empty()),
    })
}

fn resolve_platform(raw: &PlatformConfig, base_dir: &Path) -> Result<Platform> {
    if raw.name.trim().is_empty() {
        bail!("platform name must not be empty");
    }
    if raw.platform_versions.is_empty() {
        bail!("platform_versions must list at least one version");
    }

    let artifact = match (&raw.jar, &raw.url) {
        (Some(_), Some(_)) => bail!("both jar and url are set; exactly one is required"),
        (None, None) => bail!("neither jar nor url is set; exactly one is required"),
        (Some(jar), None) => Artifact::Jar(base_dir.join(jar)),
        (None, Some(url)) => Artifact::Url(url.clone()),
    };

    let mut seen = BTreeSet::new();
    let mut dependencies = Vec::with_capacity(raw.dependencies.len());
    for dep in &raw.dependencies {
        if !seen.insert(dep.name.as_str()) {
            bail!("dependency '{}' is declared more than once", dep.name);
        }
        dependencies.push(
            resolve_dependency(dep).with_context(|| format!("invalid dependency '{}'", dep.name))?,
        );
    }

    Ok(Platform {
        name: raw.name.clone(),
        platform_versions: raw.platform_versions.clone(),
        artifact,
        dependencies,
    })
}

fn resolve_dependency(raw: &DependencyConfig) -> Result<Dependency> {
    match (&raw.owner, &raw.slug, &raw.url) {
        (Some(owner), Some(slug), None) => Ok(Dependency::Hangar {
            name: raw.name.clone(),
            owner: owner.clone(),
            slug: slug.clone(),
            required: raw.required,
        }),
        (None, None, Some(url)) => Ok(Dependency::Url {
            name: raw.name.clone(),
            url: url.clone(),
            required: raw.required,
        }),
        (None, None, None) => bail!("set either owner and slug, or url"),
        (_, _, Some(_)) => bail!("owner/slug and url are mutually exclusive"),
        _ => bail!("owner and slug must be set together"),
    }
}

fn resolve_page(raw: &PageConfig, base_dir: &Path) -> Result<Page> {
    let content = match (&raw.content, &raw.file) {
        (Some(_), Some(_)) => bail!("content and file are mutually exclusive"),
        (None, None) => bail!("set either content or file"),
        (Some(content), None) => content.clone(),
        (None, Some(file)) => read_text(base_dir, file, "page")?,
    };
    Ok(Page {
        name: raw.name.clone(),
        content,
    })
}

fn read_text(base_dir: &Path, file: &Path, what: &str) -> Result<String> {
    let path = base_dir.join(file);
    std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {what} file: {}", path.display()))
}
