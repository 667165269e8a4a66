use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single token of a mount-option string: either a bare identifier
/// (`ro`, `noatime`) or a `name=value` parameter (`subvol=@`, `subvolid=256`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MountOptionToken {
    Simple(String),
    Parameterized { name: String, value: String },
}

impl fmt::Display for MountOptionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MountOptionToken::Simple(s) => write!(f, "{}", s),
            MountOptionToken::Parameterized { name, value } => write!(f, "{}={}", name, value),
        }
    }
}

/// An ordered collection of mount-option tokens that round-trips through
/// `parse`/`format`, preserving insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MountOptions {
    tokens: Vec<MountOptionToken>,
}

pub const SUBVOL: &str = "subvol";
pub const SUBVOLID: &str = "subvolid";

impl MountOptions {
    pub fn parse(options: &str) -> Result<Self, String> {
        let mut tokens = Vec::new();
        let mut seen_names: HashSet<String> = HashSet::new();

        for raw in options.split(',') {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }

            let token = match raw.split_once('=') {
                Some((name, value)) => {
                    if !seen_names.insert(name.to_string()) {
                        return Err(format!("duplicate mount option '{}'", name));
                    }
                    MountOptionToken::Parameterized {
                        name: name.to_string(),
                        value: value.to_string(),
                    }
                }
                None => MountOptionToken::Simple(raw.to_string()),
            };

            tokens.push(token);
        }

        Ok(MountOptions { tokens })
    }

    pub fn format(&self) -> String {
        self.tokens
            .iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn tokens(&self) -> &[MountOptionToken] {
        &self.tokens
    }

    pub fn simple(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().filter_map(|t| match t {
            MountOptionToken::Simple(s) => Some(s.as_str()),
            _ => None,
        })
    }

    pub fn parameterized(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tokens.iter().filter_map(|t| match t {
            MountOptionToken::Parameterized { name, value } => Some((name.as_str(), value.as_str())),
            _ => None,
        })
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.parameterized()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v)
    }

    /// Replaces `name`'s value in place (preserving position), or appends a
    /// new parameterized token if `name` is absent.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();

        for token in self.tokens.iter_mut() {
            if let MountOptionToken::Parameterized { name: n, value: v } = token {
                if n == name {
                    *v = value;
                    return;
                }
            }
        }

        self.tokens.push(MountOptionToken::Parameterized {
            name: name.to_string(),
            value,
        });
    }

    pub fn subvol(&self) -> Option<&str> {
        self.get(SUBVOL)
    }

    pub fn subvolid(&self) -> Option<u64> {
        self.get(SUBVOLID).and_then(|v| v.parse().ok())
    }

    /// A [`MountOptions`] *matches* a subvolume iff `subvol`'s value equals
    /// the subvolume's logical path (ignoring a leading separator) OR
    /// `subvolid`'s integer equals the subvolume's numeric id.
    pub fn matches(&self, logical_path: &str, num_id: u64) -> bool {
        let normalized_target = logical_path.trim_start_matches('/');

        if let Some(subvol) = self.subvol() {
            if subvol.trim_start_matches('/') == normalized_target {
                return true;
            }
        }

        if let Some(subvolid) = self.subvolid() {
            if subvolid == num_id {
                return true;
            }
        }

        false
    }
}

impl fmt::Display for MountOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let opts = MountOptions::parse("rw,noatime,subvol=@,subvolid=256").unwrap();
        assert_eq!(opts.format(), "rw,noatime,subvol=@,subvolid=256");
    }

    #[test]
    fn rejects_duplicate_parameter() {
        assert!(MountOptions::parse("subvol=@,subvol=@foo").is_err());
    }

    #[test]
    fn matches_by_subvol_or_subvolid() {
        let by_path = MountOptions::parse("subvol=/@").unwrap();
        assert!(by_path.matches("@", 5));

        let by_id = MountOptions::parse("subvolid=5").unwrap();
        assert!(by_id.matches("@different", 5));

        let neither = MountOptions::parse("subvol=@other,subvolid=9").unwrap();
        assert!(!neither.matches("@", 5));
    }

    #[test]
    fn set_preserves_position() {
        let mut opts = MountOptions::parse("rw,subvol=@,noatime").unwrap();
        opts.set("subvol", "@s1");
        assert_eq!(opts.format(), "rw,subvol=@s1,noatime");

        opts.set("subvolid", "42");
        assert_eq!(opts.format(), "rw,subvol=@s1,noatime,subvolid=42");
    }
}
