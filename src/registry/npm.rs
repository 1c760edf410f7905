//! npm registry API implementation

use std::collections::HashMap;

use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::DEFAULT_REGISTRY_URL;
use crate::manifest::Manifest;
use crate::registry::client::Registry;
use crate::registry::error::RegistryError;
use crate::registry::range::{Range, max_satisfying};

/// Prefer the abbreviated "corgi" document, it carries everything a crawl needs
const ACCEPT_ABBREVIATED: &str =
    "application/vnd.npm.install-v1+json; q=1.0, application/json; q=0.8, */*";

/// Packument response from the npm registry API
#[derive(Debug, Deserialize)]
struct NpmPackument {
    #[serde(default, rename = "dist-tags")]
    dist_tags: HashMap<String, String>,
    #[serde(default)]
    versions: HashMap<String, serde_json::Value>,
}

/// Registry implementation for the npm registry API
pub struct NpmRegistry {
    client: reqwest::Client,
    base_url: String,
    /// `git+ssh:`, `file:`, `https:` and friends
    protocol_re: Regex,
    /// GitHub shorthand `user/repo` or `user/repo#ref`
    shorthand_re: Regex,
}

impl NpmRegistry {
    /// Creates a new NpmRegistry with a custom base URL
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent(concat!("remote-ls/", env!("CARGO_PKG_VERSION")))
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
            protocol_re: Regex::new(r"^(?:[A-Za-z][A-Za-z0-9+.-]*:|\.{0,2}/|~/)").unwrap(),
            shorthand_re: Regex::new(r"^[A-Za-z0-9_.-]+/[A-Za-z0-9_.-]+(?:#.*)?$").unwrap(),
        }
    }

    /// Encode package name for URL (handles scoped packages)
    fn encode_package_name(package_name: &str) -> String {
        if package_name.starts_with('@') {
            // Scoped package: @scope/name -> @scope%2Fname
            package_name.replace('/', "%2F")
        } else {
            package_name.to_string()
        }
    }

    /// Parse npm alias format: npm:package@version or npm:@scope/package@version
    /// Returns (actual_package_name, version)
    fn parse_npm_alias(value: &str) -> Option<(String, String)> {
        let rest = value.strip_prefix("npm:")?;

        // The name/version separator is the first @ that is not a scope marker
        let search_from = usize::from(rest.starts_with('@'));
        match rest[search_from..].find('@') {
            Some(at_pos) => {
                let at_pos = at_pos + search_from;
                Some((rest[..at_pos].to_string(), rest[at_pos + 1..].to_string()))
            }
            None => Some((rest.to_string(), "latest".to_string())),
        }
    }

    /// Map (name, spec) to the registry package and range to look up
    ///
    /// Specs pointing outside the registry are rejected before any I/O.
    fn registry_target(
        &self,
        package_name: &str,
        version_spec: &str,
    ) -> Result<(String, String), RegistryError> {
        let spec = version_spec.trim();

        if let Some((name, range)) = Self::parse_npm_alias(spec) {
            return Ok((name, range));
        }

        if self.protocol_re.is_match(spec) || self.shorthand_re.is_match(spec) {
            return Err(RegistryError::UnsupportedSpec {
                name: package_name.to_string(),
                spec: version_spec.to_string(),
            });
        }

        Ok((package_name.to_string(), spec.to_string()))
    }

    /// Pick the version a spec refers to
    ///
    /// Dist-tags win, then `latest` if it satisfies the range, then the
    /// highest satisfying version.
    fn select_version<'a>(packument: &'a NpmPackument, spec: &str) -> Option<&'a str> {
        let tag = if spec.is_empty() { "latest" } else { spec };
        if let Some(version) = packument.dist_tags.get(tag) {
            return Some(version.as_str());
        }

        let range = Range::parse(spec)?;

        if let Some(latest) = packument.dist_tags.get("latest")
            && let Ok(parsed) = semver::Version::parse(latest)
            && packument.versions.contains_key(latest)
            && range.satisfies(&parsed)
        {
            return Some(latest.as_str());
        }

        max_satisfying(&range, packument.versions.keys().map(String::as_str))
    }
}

impl Default for NpmRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_REGISTRY_URL)
    }
}

#[async_trait::async_trait]
impl Registry for NpmRegistry {
    async fn fetch_manifest(
        &self,
        package_name: &str,
        version_spec: &str,
    ) -> Result<Manifest, RegistryError> {
        let (name, spec) = self.registry_target(package_name, version_spec)?;
        let url = format!("{}/{}", self.base_url, Self::encode_package_name(&name));

        debug!("GET {} for {}@{}", url, package_name, version_spec);

        let response = self
            .client
            .get(&url)
            .header("Accept", ACCEPT_ABBREVIATED)
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(RegistryError::NotFound(name));
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(RegistryError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        if !status.is_success() {
            warn!("npm registry returned status {}: {}", status, url);
            return Err(RegistryError::InvalidResponse(format!(
                "Unexpected status: {}",
                status
            )));
        }

        let mut packument: NpmPackument = response.json().await.map_err(|e| {
            warn!("Failed to parse npm registry response: {}", e);
            RegistryError::InvalidResponse(e.to_string())
        })?;

        let Some(selected) = Self::select_version(&packument, &spec).map(str::to_string) else {
            return Err(RegistryError::NoMatchingVersion {
                name,
                spec: version_spec.to_string(),
            });
        };

        let document = packument.versions.remove(&selected).ok_or_else(|| {
            RegistryError::InvalidResponse(format!(
                "dist-tag points at unpublished version {}@{}",
                name, selected
            ))
        })?;

        let mut manifest: Manifest = serde_json::from_value(document).map_err(|e| {
            warn!("Failed to decode manifest of {}@{}: {}", name, selected, e);
            RegistryError::InvalidResponse(e.to_string())
        })?;

        if manifest.name.is_empty() {
            manifest.name = name;
        }
        if manifest.version.is_empty() {
            manifest.version = selected;
        }

        Ok(manifest)
    }
}
