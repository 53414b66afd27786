//! # Server Version
//!
//! Nuxeo versions look like `10.10`, `10.10-HF05`, `2021.1.14` or `11.1-SNAPSHOT`. Versions are
//! ordered so callers can gate features on the server they talk to, a snapshot sorting before
//! the release it leads to.
use std::{cmp::Ordering, fmt, str::FromStr};

const HOTFIX_PREFIX: &str = "-HF";
const SNAPSHOT_SUFFIX: &str = "-SNAPSHOT";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' is not a Nuxeo version")]
pub struct VersionError(String);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NuxeoVersion {
    major: u32,
    minor: u32,
    build: Option<u32>,
    hotfix: Option<u32>,
    snapshot: bool,
}

impl NuxeoVersion {
    pub fn new(major: u32, minor: u32) -> Self {
        Self {
            major,
            minor,
            build: None,
            hotfix: None,
            snapshot: false,
        }
    }

    pub fn hotfix(mut self, hotfix: u32) -> Self {
        self.hotfix = Some(hotfix);
        self
    }

    pub fn major(&self) -> u32 {
        self.major
    }

    pub fn minor(&self) -> u32 {
        self.minor
    }

    pub fn build(&self) -> Option<u32> {
        self.build
    }

    pub fn hotfix_number(&self) -> Option<u32> {
        self.hotfix
    }

    pub fn is_snapshot(&self) -> bool {
        self.snapshot
    }

    fn sort_key(&self) -> (u32, u32, u32, u32, bool) {
        (
            self.major,
            self.minor,
            self.build.unwrap_or(0),
            self.hotfix.unwrap_or(0),
            !self.snapshot,
        )
    }
}

impl FromStr for NuxeoVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || VersionError(s.to_string());

        let trimmed = s.trim();
        let (rest, snapshot) = match trimmed.strip_suffix(SNAPSHOT_SUFFIX) {
            Some(rest) => (rest, true),
            None => (trimmed, false),
        };
        let (numbers, hotfix) = match rest.split_once(HOTFIX_PREFIX) {
            Some((numbers, hotfix)) => (numbers, Some(hotfix.parse().map_err(|_| invalid())?)),
            None => (rest, None),
        };

        let mut segments = numbers.split('.').map(str::parse::<u32>);
        let (Some(Ok(major)), Some(Ok(minor))) = (segments.next(), segments.next()) else {
            return Err(invalid());
        };
        let build = match segments.next() {
            Some(Ok(build)) => Some(build),
            Some(Err(_)) => return Err(invalid()),
            None => None,
        };
        if segments.next().is_some() {
            return Err(invalid());
        }

        Ok(Self {
            major,
            minor,
            build,
            hotfix,
            snapshot,
        })
    }
}

impl fmt::Display for NuxeoVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)?;
        if let Some(build) = self.build {
            write!(f, ".{build}")?;
        }
        if let Some(hotfix) = self.hotfix {
            write!(f, "{HOTFIX_PREFIX}{hotfix:02}")?;
        }
        if self.snapshot {
            f.write_str(SNAPSHOT_SUFFIX)?;
        }
        Ok(())
    }
}

impl Ord for NuxeoVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl PartialOrd for NuxeoVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn version(s: &str) -> NuxeoVersion {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse() {
        assert_eq!(version("10.10"), NuxeoVersion::new(10, 10));
        assert_eq!(version("10.10-HF05"), NuxeoVersion::new(10, 10).hotfix(5));
        assert_eq!(version("2021.1.14").build(), Some(14));
        assert!(version("11.1-SNAPSHOT").is_snapshot());
        assert!(version("9.10-HF20-SNAPSHOT").is_snapshot());
    }

    #[test]
    fn test_parse_invalid() {
        assert!("".parse::<NuxeoVersion>().is_err());
        assert!("10".parse::<NuxeoVersion>().is_err());
        assert!("ten.one".parse::<NuxeoVersion>().is_err());
        assert!("10.10-HFxx".parse::<NuxeoVersion>().is_err());
        assert!("1.2.3.4".parse::<NuxeoVersion>().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(version("10.10-HF05").to_string(), "10.10-HF05");
        assert_eq!(version("2021.1.14").to_string(), "2021.1.14");
        assert_eq!(version("11.1-SNAPSHOT").to_string(), "11.1-SNAPSHOT");
    }

    #[test]
    fn test_ordering() {
        assert!(version("10.10-HF05") > version("10.10"));
        assert!(version("10.10") > version("9.10-HF30"));
        assert!(version("11.1-SNAPSHOT") < version("11.1"));
        assert!(version("2021.1") > version("11.1"));
    }
}
