//! # Config
//!
//! Patch tables stored as JSON. A table is an array of patch lists:
//!
//! ```text
//! [
//!   {
//!     "name": "patches for TUN device since FRITZ!OS 07.08",
//!     "min": { "major": 7, "minor": 8 },
//!     "patches": [
//!       {
//!         "symbol": "ip_forward",
//!         "search_limit": 12,
//!         "match": { "mask": "0xffe0ffff", "bits": "0x8c80001c" },
//!         "replacement": "0x24020000"
//!       }
//!     ]
//!   }
//! ]
//! ```
//!
//! Words may be given as JSON numbers or as `0x` prefixed strings and are saved as strings. Missing bounds are
//! unbounded, missing `search_start` and `patch_offset` are 0.

use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::patch::PatchList;

/// Parses a patch table
pub fn parse_patch_lists(content: &str) -> Result<Vec<PatchList>> {
    let lists = serde_json::from_str(content)?;
    Ok(lists)
}

/// Reads a patch table from `path`
pub fn load_patch_lists<P: AsRef<Path>>(path: P) -> Result<Vec<PatchList>> {
    let content = fs::read_to_string(&path)?;
    parse_patch_lists(&content)
}

/// Writes `lists` to `path` as a patch table
pub fn save_patch_lists<P: AsRef<Path>>(path: P, lists: &[PatchList]) -> Result<()> {
    let content = serde_json::to_string_pretty(lists)?;
    fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::tun_device_lists;
    use crate::error::Error;
    use crate::version::{Version, VersionBound};
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse() {
        let lists = parse_patch_lists(
            r#"[
                {
                    "name": "receive",
                    "min": { "major": 6, "minor": 98 },
                    "max": { "major": 7, "minor": 8 },
                    "patches": [
                        {
                            "symbol": "netif_receive_skb",
                            "search_limit": 10,
                            "match": { "mask": "0xffe0ffff", "bits": 2357198876 },
                            "verify": { "offset": 1, "mask": "0xFFE0FFFF", "bits": "0x336" },
                            "patch_offset": 1,
                            "replacement": 0
                        }
                    ]
                }
            ]"#,
        )
        .unwrap();

        assert_eq!(lists.len(), 1);
        let list = &lists[0];
        assert_eq!(list.range.min, VersionBound::new(6, 98, 0));
        assert_eq!(list.range.max, VersionBound::new(7, 8, 0));
        assert!(list.admits(&Version::new(7, 4, 0)));

        let patch = &list.patches[0];
        assert_eq!(patch.search_start, 0);
        assert_eq!(patch.matcher.bits, 0x8c80_001c);
        assert_eq!(patch.matcher.set_bits, 0);
        let verify = patch.verify.unwrap();
        assert_eq!(verify.offset, 1);
        assert_eq!(verify.matcher.mask, 0xffe0_ffff);
        assert_eq!(verify.matcher.bits, 0x0000_0336);
        assert!(patch.is_enabled());
        assert!(!patch.is_applied());
    }

    #[test]
    /// Missing bounds are unbounded
    fn test_parse_open_range() {
        let lists = parse_patch_lists(
            r#"[{ "name": "any", "patches": [] }, { "name": "old", "max": { "major": 6 }, "patches": [] }]"#,
        )
        .unwrap();
        assert!(lists[0].range.min.is_unbounded());
        assert!(lists[0].range.max.is_unbounded());
        assert!(lists[1].admits(&Version::new(5, 50, 0)));
        assert!(!lists[1].admits(&Version::new(6, 0, 0)));
    }

    #[test]
    fn test_parse_invalid_word() {
        let result = parse_patch_lists(
            r#"[{ "name": "bad", "patches": [{
                "symbol": "ip_forward",
                "search_limit": 4,
                "match": { "mask": "ffff0000", "bits": "0x8c040000" },
                "replacement": "0x24020000"
            }] }]"#,
        );
        assert!(matches!(result, Err(Error::Json(_))));
    }

    #[test]
    /// Builtin tables survive a trip through a file
    fn test_save_and_load() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_path_buf();

        let lists = tun_device_lists(0x1c);
        save_patch_lists(&path, &lists).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"replacement\": \"0x24020000\""));
        assert!(!content.contains("set_bits"));

        let loaded = load_patch_lists(&path).unwrap();
        assert_eq!(
            serde_json::to_value(&loaded).unwrap(),
            serde_json::to_value(&lists).unwrap()
        );
        assert_eq!(loaded[1].patches[1].verify, lists[1].patches[1].verify);
        assert_eq!(loaded[0].patches[1].search_start, 15);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_patch_lists(dir.path().join("missing.json"));
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
