//! Versioned tables of dtypes a backend cannot handle per operation

use crate::dispatch::op::OpKind;
use crate::dtype::{DType, DTypeSet};
use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Semantic backend version `major.minor.patch`
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    /// Major component
    pub major: u32,
    /// Minor component
    pub minor: u32,
    /// Patch component
    pub patch: u32,
}

impl Version {
    /// Create a version
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for Version {
    type Err = Error;

    /// Parse `"1.11.0"`; missing minor or patch components count as zero
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidConfig {
            key: "version",
            reason: format!("'{s}' is not a version"),
        };
        let mut parts = s.trim().split('.');
        let mut next = |required: bool| -> Result<u32> {
            match parts.next() {
                Some(p) => p.parse().map_err(|_| invalid()),
                None if required => Err(invalid()),
                None => Ok(0),
            }
        };
        let version = Self::new(next(true)?, next(false)?, next(false)?);
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(version)
    }
}

/// Versions a table entry applies to
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VersionRange {
    /// The given version and everything older
    AndBelow(Version),
    /// The given version and everything newer
    AndAbove(Version),
    /// Exactly one version
    Exact(Version),
}

impl VersionRange {
    /// Whether `version` falls in the range
    pub fn contains(&self, version: Version) -> bool {
        match *self {
            Self::AndBelow(v) => version <= v,
            Self::AndAbove(v) => version >= v,
            Self::Exact(v) => version == v,
        }
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AndBelow(v) => write!(f, "{v} and below"),
            Self::AndAbove(v) => write!(f, "{v} and above"),
            Self::Exact(v) => write!(f, "{v}"),
        }
    }
}

impl FromStr for VersionRange {
    type Err = Error;

    /// Parse `"1.11.0 and below"`, `"2.0.0 and above"` or `"2.9.1"`
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some(v) = s.strip_suffix("and below") {
            Ok(Self::AndBelow(v.parse()?))
        } else if let Some(v) = s.strip_suffix("and above") {
            Ok(Self::AndAbove(v.parse()?))
        } else {
            Ok(Self::Exact(s.parse()?))
        }
    }
}

/// One rule: `dtypes` are unsupported by `op` for versions in `range`
#[derive(Copy, Clone, Debug)]
pub struct UnsupportedRule {
    /// Operation the rule applies to
    pub op: OpKind,
    /// Versions the rule applies to
    pub range: VersionRange,
    /// Rejected dtypes
    pub dtypes: DTypeSet,
}

/// Unsupported-dtype table of one backend
#[derive(Clone, Debug, Default)]
pub struct UnsupportedDtypes {
    rules: Vec<UnsupportedRule>,
}

impl UnsupportedDtypes {
    /// Table with no rules
    pub fn new() -> Self {
        Self::default()
    }

    /// Table from a static rule list
    pub fn from_rules(rules: &[UnsupportedRule]) -> Self {
        Self {
            rules: rules.to_vec(),
        }
    }

    /// Add a rule
    pub fn with(mut self, op: OpKind, range: VersionRange, dtypes: DTypeSet) -> Self {
        self.rules.push(UnsupportedRule { op, range, dtypes });
        self
    }

    /// Every dtype `op` rejects at `version`
    pub fn lookup(&self, op: OpKind, version: Version) -> DTypeSet {
        self.rules
            .iter()
            .filter(|r| r.op == op && r.range.contains(version))
            .fold(DTypeSet::EMPTY, |acc, r| acc.union(r.dtypes))
    }

    /// Whether `op` rejects `dtype` at `version`
    pub fn is_unsupported(&self, op: OpKind, version: Version, dtype: DType) -> bool {
        self.lookup(op, version).contains(dtype)
    }

    /// All rules in insertion order
    pub fn rules(&self) -> &[UnsupportedRule] {
        &self.rules
    }
}
