//! Dependency manifests: newline-separated `name[op version]` constraint lines.

use crate::error::DependencyError;
use crate::registry::PackageIndex;
use semver::Version;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equal,
    Greater,
    GreaterOrEqual,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operator::Equal => "==",
            Operator::Greater => ">",
            Operator::GreaterOrEqual => ">=",
        })
    }
}

/// One parsed manifest line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub name: String,
    /// `None` only requires the package to be installed.
    pub constraint: Option<(Operator, String)>,
}

const UNSUPPORTED_OPERATORS: [&str; 4] = ["<=", "<", "!=", "~="];

impl FromStr for Requirement {
    type Err = DependencyError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let split = line
            .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '-'))
            .unwrap_or(line.len());
        let (name, rest) = line.split_at(split);
        if name.is_empty() {
            return Err(DependencyError::Unparseable(line.to_string()));
        }
        if rest.is_empty() {
            return Ok(Requirement {
                name: name.to_string(),
                constraint: None,
            });
        }

        if let Some(operator) = UNSUPPORTED_OPERATORS.iter().find(|op| rest.starts_with(**op)) {
            return Err(DependencyError::UnsupportedOperator {
                line: line.to_string(),
                operator: operator.to_string(),
            });
        }
        let (operator, version) = if let Some(version) = rest.strip_prefix("==") {
            (Operator::Equal, version)
        } else if let Some(version) = rest.strip_prefix(">=") {
            (Operator::GreaterOrEqual, version)
        } else if let Some(version) = rest.strip_prefix('>') {
            (Operator::Greater, version)
        } else if let Some(version) = rest.strip_prefix('=') {
            (Operator::Equal, version)
        } else {
            return Err(DependencyError::Unparseable(line.to_string()));
        };

        if !is_loose_version(version) {
            return Err(DependencyError::Unparseable(line.to_string()));
        }
        Ok(Requirement {
            name: name.to_string(),
            constraint: Some((operator, version.to_string())),
        })
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.constraint {
            Some((operator, version)) => write!(f, "{}{}{}", self.name, operator, version),
            None => write!(f, "{}", self.name),
        }
    }
}

impl Requirement {
    /// Verifies the installed version reported by `index` against this line.
    pub fn check<I: PackageIndex + ?Sized>(&self, index: &I) -> Result<(), DependencyError> {
        let installed = index
            .installed_version(&self.name)
            .ok_or_else(|| DependencyError::NotInstalled(self.name.clone()))?;
        let Some((operator, required)) = &self.constraint else {
            return Ok(());
        };

        let installed_version = normalize(installed).ok_or_else(|| DependencyError::InvalidVersion {
            name: self.name.clone(),
            version: installed.to_string(),
        })?;
        let required_version = normalize(required).ok_or_else(|| DependencyError::InvalidVersion {
            name: self.name.clone(),
            version: required.clone(),
        })?;

        let satisfied = match operator {
            Operator::Equal => installed_version == required_version,
            Operator::Greater => installed_version > required_version,
            Operator::GreaterOrEqual => installed_version >= required_version,
        };
        if satisfied {
            Ok(())
        } else {
            Err(DependencyError::Unsatisfied {
                line: self.to_string(),
                installed: installed.to_string(),
            })
        }
    }
}

/// Parses and verifies every line of a manifest. An empty manifest has no
/// requirements.
pub fn check_dependencies<I: PackageIndex + ?Sized>(
    manifest: &str,
    index: &I,
) -> Result<(), DependencyError> {
    if manifest.is_empty() {
        return Ok(());
    }
    for line in manifest.split('\n') {
        let requirement: Requirement = line.parse()?;
        requirement.check(index)?;
    }
    Ok(())
}

/// Accepts up to three dot-separated numeric segments, optionally followed
/// by `dev` and a build number, e.g. `1.6.1`, `0.9`, `0.20.dev0`.
fn is_loose_version(version: &str) -> bool {
    let (numeric, dev) = match version.find("dev") {
        Some(index) => (&version[..index], Some(&version[index + 3..])),
        None => (version, None),
    };
    if let Some(build) = dev {
        if !build.chars().all(|c| c.is_ascii_digit()) {
            return false;
        }
    } else if numeric.is_empty() {
        return false;
    }

    let segments: Vec<&str> = numeric.split('.').collect();
    let Some((last, leading)) = segments.split_last() else {
        return false;
    };
    segments.len() <= 3
        && leading
            .iter()
            .all(|s| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()))
        && last.chars().all(|c| c.is_ascii_digit())
}

/// Maps a loose version onto semver: missing numeric parts become zero and
/// any remainder becomes a pre-release tag.
fn normalize(version: &str) -> Option<Version> {
    let split = version
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(version.len());
    let (numeric, remainder) = version.split_at(split);

    let mut parts = numeric
        .split('.')
        .filter(|part| !part.is_empty())
        .map(|part| part.parse::<u64>().ok());
    let major = parts.next().flatten()?;
    let minor = parts.next().flatten().unwrap_or(0);
    let patch = parts.next().flatten().unwrap_or(0);

    let mut normalized = format!("{}.{}.{}", major, minor, patch);
    let tag: String = remainder
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '.')
        .collect();
    let tag = tag.trim_matches('.');
    if !tag.is_empty() {
        normalized.push('-');
        normalized.push_str(tag);
    }
    Version::parse(&normalized).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_supported_operators() {
        let requirement: Requirement = "numpy>=1.6.1".parse().unwrap();
        assert_eq!(requirement.name, "numpy");
        assert_eq!(
            requirement.constraint,
            Some((Operator::GreaterOrEqual, "1.6.1".to_string()))
        );
        let bare: Requirement = "scipy".parse().unwrap();
        assert_eq!(bare.constraint, None);
        let single: Requirement = "scipy=0.9".parse().unwrap();
        assert_eq!(single.constraint, Some((Operator::Equal, "0.9".to_string())));
    }

    #[test]
    fn rejects_malformed_lines() {
        assert_eq!(
            "foo@bad".parse::<Requirement>(),
            Err(DependencyError::Unparseable("foo@bad".to_string()))
        );
        assert!(matches!(
            "foo>=1.x".parse::<Requirement>(),
            Err(DependencyError::Unparseable(_))
        ));
        assert!(matches!(
            "foo<=1.0".parse::<Requirement>(),
            Err(DependencyError::UnsupportedOperator { operator, .. }) if operator == "<="
        ));
    }

    #[test]
    fn compares_installed_versions() {
        let mut index = std::collections::HashMap::new();
        index.insert("numpy".to_string(), "1.10.0".to_string());
        assert!(check_dependencies("numpy>=1.6.1", &index).is_ok());
        assert!(check_dependencies("numpy>1.9\nnumpy==1.10", &index).is_ok());

        index.insert("numpy".to_string(), "1.5.0".to_string());
        assert_eq!(
            check_dependencies("numpy>=1.6.1", &index),
            Err(DependencyError::Unsatisfied {
                line: "numpy>=1.6.1".to_string(),
                installed: "1.5.0".to_string(),
            })
        );
        assert_eq!(
            check_dependencies("pandas", &index),
            Err(DependencyError::NotInstalled("pandas".to_string()))
        );
    }

    #[test]
    fn loose_versions_follow_the_manifest_grammar() {
        assert!(is_loose_version("1.6.1"));
        assert!(is_loose_version("0.20.dev0"));
        assert!(is_loose_version("2"));
        assert!(!is_loose_version("1.2.3.4"));
        assert!(!is_loose_version(""));
    }

    #[test]
    fn normalizes_short_and_dev_versions() {
        assert_eq!(normalize("0.9"), Version::parse("0.9.0").ok());
        assert_eq!(normalize("0.20.dev0"), Version::parse("0.20.0-dev0").ok());
        assert!(normalize("dev").is_none());
    }
}
