use std::ops::RangeInclusive;

use globset::{GlobBuilder, GlobMatcher};

use super::*;

/// Parses an integer in any of the bases the CLI accepts (`0x`, `0o`,
/// `0b`, decimal).
pub fn parse_int(text: &str) -> Option<u32> {
    let text = text.trim();
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).ok()
    } else if let Some(oct) = text.strip_prefix("0o").or_else(|| text.strip_prefix("0O")) {
        u32::from_str_radix(oct, 8).ok()
    } else if let Some(bin) = text.strip_prefix("0b").or_else(|| text.strip_prefix("0B")) {
        u32::from_str_radix(bin, 2).ok()
    } else {
        text.parse().ok()
    }
}

/// Parses a comma-separated list of values and inclusive `low-high`
/// ranges, e.g. `0x1-0x5,7`.
pub fn parse_ranges(text: &str) -> Result<Vec<RangeInclusive<u32>>> {
    let mut ranges = Vec::new();
    for part in text.split(',') {
        let bad = || StageError::Unpack(format!("invalid range '{part}'"));
        match part.split_once('-') {
            Some((low, high)) => {
                let low = parse_int(low).ok_or_else(bad)?;
                let high = parse_int(high).ok_or_else(bad)?;
                ranges.push(low..=high);
            }
            None => {
                let v = parse_int(part).ok_or_else(bad)?;
                ranges.push(v..=v);
            }
        }
    }
    Ok(ranges)
}

fn in_ranges(ranges: &[RangeInclusive<u32>], value: u32) -> bool {
    ranges.is_empty() || ranges.iter().any(|r| r.contains(&value))
}

/// Object-level predicate evaluated against directory entries (or bare
/// objects, for the embedded case). Every empty criterion passes.
#[derive(Default)]
pub struct ObjectFilter {
    names: Vec<GlobMatcher>,
    pub delim: Option<char>,
    pub nonascii: Option<char>,
    pub locations: Vec<RangeInclusive<u32>>,
    pub types: Vec<RangeInclusive<u32>>,
    pub statuses: Vec<RangeInclusive<u32>>,
    pub versions: Vec<RangeInclusive<u32>>,
    pub stores: Vec<RangeInclusive<u32>>,
    pub min_size: Option<u32>,
    pub max_size: Option<u32>,
}

impl ObjectFilter {
    pub fn new() -> ObjectFilter {
        ObjectFilter {
            delim: Some('.'),
            nonascii: Some('_'),
            ..ObjectFilter::default()
        }
    }

    /// Adds a case-insensitive glob the object name may match.
    pub fn add_name_pattern(&mut self, pattern: &str) -> Result<()> {
        let glob = GlobBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| StageError::Unpack(format!("invalid name pattern: {e}")))?;
        self.names.push(glob.compile_matcher());
        Ok(())
    }

    pub fn matches_entry(&self, entry: &DirectoryEntry) -> bool {
        self.matches_common(entry) && in_ranges(&self.statuses, entry.status as u32)
    }

    /// Embedded objects have no directory slot; a status criterion can
    /// therefore never match one.
    pub fn matches_object(&self, object: &Object) -> bool {
        self.statuses.is_empty() && self.matches_common(&DirectoryEntry::from_object(object))
    }

    fn matches_common(&self, entry: &DirectoryEntry) -> bool {
        if !self.names.is_empty() {
            let name = entry.id.render_name(self.delim, self.nonascii);
            if !self.names.iter().any(|g| g.is_match(&name)) {
                return false;
            }
        }
        in_ranges(&self.locations, entry.id.location as u32)
            && in_ranges(&self.types, entry.id.object_type as u32)
            && in_ranges(&self.versions, entry.version.version_value() as u32)
            && in_ranges(&self.stores, entry.version.store_candidacy() as u32)
            && self.min_size.map_or(true, |min| entry.length as u32 >= min)
            && self.max_size.map_or(true, |max| entry.length as u32 <= max)
    }
}

/// One way of naming segment types on the command line: by variant name
/// or by raw `st` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentSelector {
    Kind(SegmentKind),
    Type(u8),
}

impl SegmentSelector {
    /// Parses either a type value or a (case-insensitive) variant name.
    pub fn parse(text: &str) -> Result<SegmentSelector> {
        if let Some(value) = parse_int(text) {
            if value > u8::MAX as u32 {
                return Err(StageError::Unpack(format!(
                    "segment type {value:#x} does not fit a byte"
                )));
            }
            return Ok(SegmentSelector::Type(value as u8));
        }
        SegmentKind::all()
            .iter()
            .find(|k| k.name().eq_ignore_ascii_case(text))
            .map(|k| SegmentSelector::Kind(*k))
            .ok_or_else(|| StageError::Unpack(format!("'{text}' unknown segment type")))
    }

    fn matches(&self, segment: &Segment) -> bool {
        match self {
            SegmentSelector::Kind(kind) => segment.kind() == *kind,
            SegmentSelector::Type(st) => segment.seg_type() == Some(*st),
        }
    }
}

/// Segment-level predicate.
#[derive(Default)]
pub struct SegmentFilter {
    pub selectors: Vec<SegmentSelector>,
    pub min_size: Option<u32>,
    pub max_size: Option<u32>,
}

impl SegmentFilter {
    pub fn matches(&self, segment: &Segment) -> bool {
        if !self.selectors.is_empty() && !self.selectors.iter().any(|s| s.matches(segment)) {
            return false;
        }
        let sl = segment.seg_length().unwrap_or(0) as u32;
        self.min_size.map_or(true, |min| sl >= min) && self.max_size.map_or(true, |max| sl <= max)
    }
}

/// `key[=[value]]` attribute condition: bare keys test presence, keyed
/// values test equality (numerically when both sides parse as numbers).
#[derive(Debug, Clone)]
pub struct AttrCond {
    pub name: String,
    pub value: Option<String>,
    pub int_value: Option<u64>,
}

impl AttrCond {
    pub fn parse(text: &str) -> AttrCond {
        match text.split_once('=') {
            Some((name, value)) => AttrCond {
                name: name.to_string(),
                value: Some(value.to_string()),
                int_value: parse_int(value).map(|v| v as u64),
            },
            None => AttrCond {
                name: text.to_string(),
                value: None,
                int_value: None,
            },
        }
    }

    fn matches(&self, segment: &Segment) -> bool {
        let attrs = segment.attributes();
        let Some((_, value)) = attrs.iter().find(|(name, _)| *name == self.name) else {
            return false;
        };
        let Some(expect) = &self.value else {
            // Presence is enough.
            return true;
        };
        match value.as_int() {
            Some(actual) => Some(actual) == self.int_value,
            None => value.to_string() == *expect,
        }
    }
}

/// All conditions must hold for a segment to pass.
#[derive(Default)]
pub struct AttributeFilter {
    pub conds: Vec<AttrCond>,
}

impl AttributeFilter {
    pub fn matches(&self, segment: &Segment) -> bool {
        self.conds.iter().all(|cond| cond.matches(segment))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::object::sample_object_bytes;

    fn entry(name: &[u8], length: u16, status: u16) -> DirectoryEntry {
        DirectoryEntry {
            id: ObjectID {
                name: Some(name.to_vec()),
                location: 0x04,
                object_type: 0x0c,
            },
            status,
            length,
            version: VersionID::new(0x20, 0x02),
            ..DirectoryEntry::default()
        }
    }

    fn navigate_segment() -> Segment {
        let object = Object::unpack(&sample_object_bytes(
            b"TEST",
            &[0x71, 0x05, 0x00, 0xaa, 0xbb],
        ))
        .unwrap();
        SegmentFactory::new()
            .parse_segments(&object)
            .next()
            .unwrap()
    }

    #[test]
    fn parse_int_bases() {
        assert_eq!(parse_int("16"), Some(16));
        assert_eq!(parse_int("0x10"), Some(16));
        assert_eq!(parse_int("0o20"), Some(16));
        assert_eq!(parse_int("0b10000"), Some(16));
        assert_eq!(parse_int("zap"), None);
    }

    #[test]
    fn parse_ranges_mixed() {
        let ranges = parse_ranges("0x1-0x3,7").unwrap();
        assert_eq!(ranges, vec![1..=3, 7..=7]);
        assert!(parse_ranges("1-x").is_err());
    }

    #[test]
    fn name_glob_is_case_insensitive() {
        let mut filter = ObjectFilter::new();
        filter.add_name_pattern("hello*").unwrap();
        assert!(filter.matches_entry(&entry(b"HELLO", 40, 0)));
        assert!(!filter.matches_entry(&entry(b"WORLD", 40, 0)));
    }

    #[test]
    fn range_and_size_criteria() {
        let mut filter = ObjectFilter::new();
        filter.types = parse_ranges("0xc").unwrap();
        filter.min_size = Some(30);
        filter.max_size = Some(50);
        assert!(filter.matches_entry(&entry(b"A", 40, 0)));
        assert!(!filter.matches_entry(&entry(b"A", 20, 0)));
        filter.types = parse_ranges("0x1-0x5").unwrap();
        assert!(!filter.matches_entry(&entry(b"A", 40, 0)));
    }

    #[test]
    fn status_filter_never_matches_bare_objects() {
        let mut filter = ObjectFilter::new();
        let object =
            Object::unpack(&sample_object_bytes(b"TEST", &[0x71, 0x04, 0x00, 0x01])).unwrap();
        assert!(filter.matches_object(&object));
        filter.statuses = parse_ranges("0").unwrap();
        assert!(!filter.matches_object(&object));
    }

    #[test]
    fn segment_selector_by_name_and_value() {
        let seg = navigate_segment();
        assert!(SegmentSelector::parse("navigate")
            .unwrap()
            .matches(&seg));
        assert!(SegmentSelector::parse("0x71").unwrap().matches(&seg));
        assert!(!SegmentSelector::parse("ProgramCall").unwrap().matches(&seg));
        assert!(SegmentSelector::parse("NoSuchSegment").is_err());
    }

    #[test]
    fn segment_size_bounds() {
        let seg = navigate_segment();
        let filter = SegmentFilter {
            min_size: Some(4),
            max_size: Some(8),
            ..SegmentFilter::default()
        };
        assert!(filter.matches(&seg));
        let filter = SegmentFilter {
            min_size: Some(6),
            ..SegmentFilter::default()
        };
        assert!(!filter.matches(&seg));
    }

    #[test]
    fn attribute_presence_and_equality() {
        let seg = navigate_segment();
        let filter = AttributeFilter {
            conds: vec![AttrCond::parse("data")],
        };
        assert!(filter.matches(&seg));
        let filter = AttributeFilter {
            conds: vec![AttrCond::parse("parm")],
        };
        assert!(!filter.matches(&seg));

        // Navigate's data renders as hex bytes.
        let filter = AttributeFilter {
            conds: vec![AttrCond::parse("data=aa bb")],
        };
        assert!(filter.matches(&seg));
        let filter = AttributeFilter {
            conds: vec![AttrCond::parse("data=aa cc")],
        };
        assert!(!filter.matches(&seg));
    }
}
