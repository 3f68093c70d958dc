use crate::error::{ErrorKind, Result};
use crate::record::{NamesMap, require_english, validate_id};
use serde::{Deserialize, Serialize};

/// What role a piece of software plays in a synthesis setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoftwareCategory {
    /// A synthesis engine or editor (OpenUtau, UTAU, ...).
    Host,
    /// Extends a host (resamplers, plugins).
    HostExtension,
    /// Standalone tooling around the ecosystem.
    Utility,
}

/// Synthesis software, as authored in the software shard files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Software {
    /// Globally unique lowercase hyphenated id.
    pub id: String,
    /// Display names by language code; must contain `en`.
    pub names: NamesMap,
    pub category: SoftwareCategory,
    pub developers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_page_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// Released versions, newest conventionally first. May be empty for
    /// entries that only point at a download page.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub versions: Vec<SoftwareVersion>,
}

/// One released version of a software entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoftwareVersion {
    pub version: String,
    /// Download locations; at least one.
    pub mirrors: Vec<Mirror>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<Dependency>,
}

/// A download location for a version, optionally pinned by digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mirror {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

/// A reference to another software entry this version needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    /// Id of the required software record.
    pub id: String,
    pub min_version: String,
}

impl Software {
    pub fn validate(&self) -> Result<()> {
        validate_id(&self.id)?;
        require_english(&self.id, &self.names)?;
        for version in &self.versions {
            version.validate(&self.id)?;
        }
        Ok(())
    }
}

impl SoftwareVersion {
    fn validate(&self, parent: &str) -> Result<()> {
        if self.mirrors.is_empty() || self.mirrors.iter().any(|m| m.url.is_empty()) {
            exn::bail!(ErrorKind::NoMirrors {
                id: parent.to_string(),
                version: self.version.clone(),
            });
        }
        for dependency in &self.dependencies {
            if validate_id(&dependency.id).is_err() || dependency.min_version.is_empty() {
                exn::bail!(ErrorKind::Dependency {
                    id: parent.to_string(),
                    dependency: dependency.id.clone(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(en: &str) -> NamesMap {
        NamesMap::from([("en".to_string(), en.to_string())])
    }

    fn software() -> Software {
        Software {
            id: "openutau".to_string(),
            names: names("OpenUtau"),
            category: SoftwareCategory::Host,
            developers: vec!["stakira".to_string()],
            homepage_url: None,
            download_page_url: Some("https://example.test/openutau".to_string()),
            tags: None,
            versions: vec![SoftwareVersion {
                version: "0.1.529".to_string(),
                mirrors: vec![Mirror { url: "https://example.test/ou.zip".to_string(), hash: None }],
                dependencies: vec![],
            }],
        }
    }

    #[test]
    fn test_valid_software() {
        assert!(software().validate().is_ok());
    }

    #[test]
    fn test_versions_may_be_absent() {
        let mut s = software();
        s.versions.clear();
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_version_needs_mirrors() {
        let mut s = software();
        s.versions[0].mirrors.clear();
        let err = s.validate().unwrap_err();
        assert_eq!(
            *err,
            ErrorKind::NoMirrors { id: "openutau".to_string(), version: "0.1.529".to_string() }
        );
    }

    #[test]
    fn test_dependency_constraint_must_be_present() {
        let mut s = software();
        s.versions[0].dependencies =
            vec![Dependency { id: "worldline".to_string(), min_version: String::new() }];
        let err = s.validate().unwrap_err();
        assert!(matches!(&*err, ErrorKind::Dependency { .. }));
    }

    #[test]
    fn test_category_wire_names() {
        let json = serde_json::to_string(&SoftwareCategory::HostExtension).unwrap();
        assert_eq!(json, r#""host_extension""#);
        let parsed: SoftwareCategory = serde_json::from_str(r#""utility""#).unwrap();
        assert_eq!(parsed, SoftwareCategory::Utility);
    }
}
