use std::collections::BTreeMap;

use url::Url;

use crate::error::{CatalogError, ResourceError};

const BUILTIN: &[(&str, &str)] = &[
    ("IDE Setup Guide", "https://docs.example.com/ide-setup"),
    ("Git Configuration", "https://docs.example.com/git-config"),
    ("Repository Access", "https://docs.example.com/repo-access"),
    ("SSH Key Setup", "https://docs.example.com/ssh-setup"),
    ("Slack Invite", "https://docs.example.com/slack-invite"),
    ("Team Calendar", "https://docs.example.com/team-calendar"),
    ("Architecture Docs", "https://docs.example.com/architecture"),
    ("System Diagrams", "https://docs.example.com/diagrams"),
    ("Data Flow Diagrams", "https://docs.example.com/data-flow"),
    ("API Documentation", "https://docs.example.com/api"),
    ("Style Guide", "https://docs.example.com/style-guide"),
    ("Best Practices", "https://docs.example.com/best-practices"),
    ("Project Map", "https://docs.example.com/project-map"),
    ("README Files", "https://docs.example.com/readme"),
    ("Component Docs", "https://docs.example.com/components"),
    ("Code Comments", "https://docs.example.com/comments"),
    ("Test Guide", "https://docs.example.com/testing"),
    ("Coverage Reports", "https://docs.example.com/coverage"),
    ("Git Guide", "https://docs.example.com/git-guide"),
    ("Branch Strategy", "https://docs.example.com/branch-strategy"),
    ("Review Guidelines", "https://docs.example.com/review-guidelines"),
    ("PR Templates", "https://docs.example.com/pr-templates"),
    ("Deployment Guide", "https://docs.example.com/deployment"),
    ("Environment Docs", "https://docs.example.com/environment"),
    ("Issue Tracker", "https://docs.example.com/issues"),
    ("Task Board", "https://docs.example.com/tasks"),
    ("Development Guide", "https://docs.example.com/development"),
    ("Code Examples", "https://docs.example.com/examples"),
    ("PR Guidelines", "https://docs.example.com/pr-guidelines"),
    ("Review Checklist", "https://docs.example.com/review-checklist"),
];

/// Maps task resource names to the documents they point at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceRegistry {
    entries: BTreeMap<String, Url>,
}

impl ResourceRegistry {
    #[must_use]
    pub fn builtin() -> Self {
        let entries = BUILTIN
            .iter()
            .filter_map(|(name, raw)| Url::parse(raw).ok().map(|url| ((*name).to_owned(), url)))
            .collect();
        Self { entries }
    }

    /// Build a registry from raw `name -> url` pairs. Names are trimmed.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::InvalidResourceUrl` if any URL fails to parse.
    pub fn from_raw(raw: BTreeMap<String, String>) -> Result<Self, CatalogError> {
        let mut entries = BTreeMap::new();
        for (name, value) in raw {
            let url = Url::parse(value.trim()).map_err(|e| CatalogError::InvalidResourceUrl {
                name: name.clone(),
                reason: e.to_string(),
            })?;
            entries.insert(name.trim().to_owned(), url);
        }
        Ok(Self { entries })
    }

    /// Look up the URL registered for `name`.
    ///
    /// # Errors
    ///
    /// Returns `ResourceError::Unknown` when the name is not registered.
    pub fn resolve(&self, name: &str) -> Result<&Url, ResourceError> {
        self.entries
            .get(name.trim())
            .ok_or_else(|| ResourceError::Unknown(name.to_owned()))
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name.trim())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
