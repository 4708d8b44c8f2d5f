//! Memory regions parsed from `/proc/<pid>/maps`
//!
//! Each descriptor line has the form:
//!
//! ```text
//! 55d4c8a00000-55d4c8a21000 r-xp 00002000 08:01 1311  /usr/bin/supertux2
//! ```
//!
//! Only the address range and permission field are interpreted strictly.
//! Lines with fewer than [`MIN_MAPS_FIELDS`] fields are skipped.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use tracing::debug;

/// Minimum whitespace-separated fields of a usable maps line
pub const MIN_MAPS_FIELDS: usize = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permissions {
    pub readable: bool,
    pub writable: bool,
    pub executable: bool,
    pub shared: bool,
}

impl Permissions {
    /// Parse a `rwxp` style permission field.
    ///
    /// Returns `None` when the field is not four characters of the expected
    /// alphabet.
    pub fn parse(field: &str) -> Option<Self> {
        let bytes = field.as_bytes();
        if bytes.len() != 4 {
            return None;
        }

        let flag = |index: usize, set: u8| match bytes[index] {
            b'-' => Some(false),
            b if b == set => Some(true),
            _ => None,
        };

        let shared = match bytes[3] {
            b's' => true,
            b'p' | b'-' => false,
            _ => return None,
        };

        Some(Self {
            readable: flag(0, b'r')?,
            writable: flag(1, b'w')?,
            executable: flag(2, b'x')?,
            shared,
        })
    }
}

impl std::fmt::Display for Permissions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{}{}{}",
            if self.readable { 'r' } else { '-' },
            if self.writable { 'w' } else { '-' },
            if self.executable { 'x' } else { '-' },
            if self.shared { 's' } else { 'p' },
        )
    }
}

/// Selects which permission class of region to enumerate
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    IntoStaticStr,
    Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum RegionFilter {
    /// Readable and executable (`r-x`)
    #[default]
    Code,
    /// Readable and writable (`rw-`)
    Data,
    /// Any readable region
    Any,
}

impl RegionFilter {
    pub fn accepts(&self, perms: &Permissions) -> bool {
        if !perms.readable {
            return false;
        }
        match self {
            Self::Code => perms.executable,
            Self::Data => perms.writable,
            Self::Any => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryRegion {
    pub start: u64,
    pub end: u64,
    pub permissions: Permissions,
    /// File offset of the mapping
    pub offset: u64,
    /// Backing file or pseudo-path such as `[heap]`
    pub path: Option<String>,
}

impl MemoryRegion {
    pub fn size(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn contains(&self, address: u64) -> bool {
        (self.start..self.end).contains(&address)
    }

    /// Parse a single maps line, returning `None` for short or malformed lines.
    pub fn parse_line(line: &str) -> Option<Self> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < MIN_MAPS_FIELDS {
            return None;
        }

        let (start, end) = fields[0].split_once('-')?;
        let start = u64::from_str_radix(start, 16).ok()?;
        let end = u64::from_str_radix(end, 16).ok()?;
        if end < start {
            return None;
        }

        let permissions = Permissions::parse(fields[1])?;
        let offset = u64::from_str_radix(fields[2], 16).unwrap_or(0);
        let path = if fields.len() > MIN_MAPS_FIELDS {
            Some(fields[MIN_MAPS_FIELDS..].join(" "))
        } else {
            None
        };

        Some(Self {
            start,
            end,
            permissions,
            offset,
            path,
        })
    }
}

/// Parse a maps listing, keeping the OS ordering.
///
/// Malformed lines are skipped rather than failing the whole listing.
pub fn parse_maps(content: &str) -> Vec<MemoryRegion> {
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let region = MemoryRegion::parse_line(line);
            if region.is_none() {
                debug!("Skipping malformed maps line: {:?}", line);
            }
            region
        })
        .collect()
}

/// Parse a maps listing and keep only the regions accepted by `filter`.
pub fn filter_regions(content: &str, filter: RegionFilter) -> Vec<MemoryRegion> {
    parse_maps(content)
        .into_iter()
        .filter(|region| filter.accepts(&region.permissions))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAPS: &str = "\
55d4c8a00000-55d4c8a21000 r--p 00000000 08:01 1311 /usr/bin/game
55d4c8a21000-55d4c8b00000 r-xp 00021000 08:01 1311 /usr/bin/game
55d4c8c00000-55d4c8c10000 rw-p 000e0000 08:01 1311 /usr/bin/game
55d4c9000000-55d4c9100000 rw-p 00000000 00:00 0 [heap]
7ffd00000000-7ffd00001000 ---p 00000000 00:00 0
7ffd00010000-7ffd00012000 r-xp 00000000 00:00 0 [vdso]
";

    #[test]
    fn test_parse_permissions() {
        let perms = Permissions::parse("r-xp").unwrap();
        assert!(perms.readable);
        assert!(!perms.writable);
        assert!(perms.executable);
        assert!(!perms.shared);
        assert_eq!(perms.to_string(), "r-xp");

        assert!(Permissions::parse("rw-s").unwrap().shared);
        assert!(Permissions::parse("rwx").is_none());
        assert!(Permissions::parse("xwrp").is_none());
    }

    #[test]
    fn test_parse_maps_preserves_order() {
        let regions = parse_maps(MAPS);
        assert_eq!(regions.len(), 6);
        assert!(regions.windows(2).all(|w| w[0].start < w[1].start));
        assert_eq!(regions[0].start, 0x55d4c8a00000);
        assert_eq!(regions[0].end, 0x55d4c8a21000);
        assert_eq!(regions[1].offset, 0x21000);
        assert_eq!(regions[1].path.as_deref(), Some("/usr/bin/game"));
        assert_eq!(regions[3].path.as_deref(), Some("[heap]"));
        assert_eq!(regions[4].path, None);
    }

    #[test]
    fn test_short_lines_are_skipped() {
        let content = "\
00400000-00401000 r-xp 00000000 08:01 42 /bin/a
00401000-00402000 r-xp
garbage
00402000-00403000 r-xp 00000000 08:01 42 /bin/a
";
        let regions = parse_maps(content);
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].start, 0x400000);
        assert_eq!(regions[1].start, 0x402000);
    }

    #[test]
    fn test_unparseable_address_is_skipped() {
        let content = "zzzz-00401000 r-xp 00000000 08:01 42 /bin/a\n\
                       00402000-00401000 r-xp 00000000 08:01 42 /bin/a\n";
        assert!(parse_maps(content).is_empty());
    }

    #[test]
    fn test_path_with_spaces() {
        let line = "00400000-00401000 r--p 00000000 08:01 42 /home/user/My Game/bin";
        let region = MemoryRegion::parse_line(line).unwrap();
        assert_eq!(region.path.as_deref(), Some("/home/user/My Game/bin"));
    }

    #[test]
    fn test_filter_code_regions() {
        let regions = filter_regions(MAPS, RegionFilter::Code);
        let starts: Vec<u64> = regions.iter().map(|r| r.start).collect();
        assert_eq!(starts, vec![0x55d4c8a21000, 0x7ffd00010000]);
    }

    #[test]
    fn test_filter_data_regions() {
        let regions = filter_regions(MAPS, RegionFilter::Data);
        let starts: Vec<u64> = regions.iter().map(|r| r.start).collect();
        assert_eq!(starts, vec![0x55d4c8c00000, 0x55d4c9000000]);
    }

    #[test]
    fn test_filter_any_drops_unreadable() {
        let regions = filter_regions(MAPS, RegionFilter::Any);
        assert_eq!(regions.len(), 5);
        assert!(regions.iter().all(|r| r.permissions.readable));
    }

    #[test]
    fn test_region_filter_from_str() {
        assert_eq!("code".parse::<RegionFilter>().unwrap(), RegionFilter::Code);
        assert_eq!("DATA".parse::<RegionFilter>().unwrap(), RegionFilter::Data);
        assert_eq!(RegionFilter::Any.to_string(), "any");
        assert!("heap".parse::<RegionFilter>().is_err());
    }

    #[test]
    fn test_region_size_and_contains() {
        let region = MemoryRegion::parse_line(
            "00400000-00401000 r--p 00000000 08:01 42 /bin/a",
        )
        .unwrap();
        assert_eq!(region.size(), 0x1000);
        assert!(region.contains(0x400000));
        assert!(region.contains(0x400FFF));
        assert!(!region.contains(0x401000));
    }
}
