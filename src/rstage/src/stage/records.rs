use super::*;

/// Check-word pair carried at the front of each AU Map and Directory.
///
/// | Offset | Size | Field    |
/// | ------ | ---- | -------- |
/// | 0      | 2    | mapcheck |
/// | 2      | 2    | dircheck |
///
/// The words are parsed but never validated here; what the Reception
/// System computes over them is still unknown, so comparison is left to a
/// future pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Check {
    pub mapcheck: u16,
    pub dircheck: u16,
}

impl Check {
    pub const SIZE: usize = 4;

    pub fn unpack(data: &[u8]) -> Result<Check> {
        if data.len() != Self::SIZE {
            return Err(StageError::unpack_size(Self::SIZE, data.len()));
        }
        Ok(Check {
            mapcheck: u16::from_le_bytes(data[0..2].try_into().unwrap()),
            dircheck: u16::from_le_bytes(data[2..4].try_into().unwrap()),
        })
    }

    pub fn pack(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out[0..2].copy_from_slice(&self.mapcheck.to_le_bytes());
        out[2..4].copy_from_slice(&self.dircheck.to_le_bytes());
        out
    }
}

/// Version/storage-control pair.
///
/// `byte1` is byte 17 of the object header (a/k/a version), `byte2` is
/// byte 15 (a/k/a storage control). Together they form a 16-bit field
/// `(byte1 << 8) | byte2`: the low [`STORAGE_WIDTH`](Self::STORAGE_WIDTH)
/// bits are the store candidacy, the rest the version value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VersionID {
    pub byte1: u8,
    pub byte2: u8,
}

impl VersionID {
    pub const SIZE: usize = 2;

    /// The patent says the candidacy field is 3 bits wide; every sampled
    /// STAGE.DAT says 5.
    pub const STORAGE_WIDTH: u32 = 5;

    // This list is certainly incomplete/outdated.
    pub const CACHE_CANDIDACY: u16 = 0;
    pub const NO_CANDIDACY: u16 = 1;
    pub const STAGE_CANDIDACY: u16 = 2;
    pub const STAGE_NO_V_CANDIDACY: u16 = 3;
    pub const REQUIRED_CANDIDACY: u16 = 4;
    pub const REQUIRED_NO_V_CANDIDACY: u16 = 5;

    pub fn new(byte1: u8, byte2: u8) -> VersionID {
        VersionID { byte1, byte2 }
    }

    pub fn unpack(data: &[u8]) -> Result<VersionID> {
        if data.len() != Self::SIZE {
            return Err(StageError::unpack_size(Self::SIZE, data.len()));
        }
        Ok(VersionID {
            byte1: data[0],
            byte2: data[1],
        })
    }

    pub fn pack(&self) -> [u8; Self::SIZE] {
        [self.byte1, self.byte2]
    }

    fn version_fields(&self) -> u16 {
        ((self.byte1 as u16) << 8) | self.byte2 as u16
    }

    pub fn version_value(&self) -> u16 {
        self.version_fields() >> Self::STORAGE_WIDTH
    }

    pub fn store_candidacy(&self) -> u16 {
        self.version_fields() & ((1 << Self::STORAGE_WIDTH) - 1)
    }
}

/// Object identifier: an 11-byte space-padded name plus location and type.
///
/// | Offset | Size | Field    |
/// | ------ | ---- | -------- |
/// | 0      | 11   | name     |
/// | 11     | 1    | location |
/// | 12     | 1    | type     |
///
/// A name of 11 zero bytes marks a nonexistent object; it decodes to
/// `None` and packs back to zeros.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectID {
    pub name: Option<Vec<u8>>,
    pub location: u8,
    pub object_type: u8,
}

impl ObjectID {
    pub const SIZE: usize = 13;
    pub const NAME_SIZE: usize = 11;

    pub fn unpack(data: &[u8]) -> Result<ObjectID> {
        if data.len() != Self::SIZE {
            return Err(StageError::unpack_size(Self::SIZE, data.len()));
        }
        let name = if data[..Self::NAME_SIZE] == [0u8; Self::NAME_SIZE] {
            None
        } else {
            Some(trim_name(&data[..Self::NAME_SIZE]).to_vec())
        };
        Ok(ObjectID {
            name,
            location: data[11],
            object_type: data[12],
        })
    }

    pub fn pack(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        if let Some(name) = &self.name {
            let len = name.len().min(Self::NAME_SIZE);
            out[..len].copy_from_slice(&name[..len]);
            for slot in out[len..Self::NAME_SIZE].iter_mut() {
                *slot = b' ';
            }
        }
        out[11] = self.location;
        out[12] = self.object_type;
        out
    }

    /// Renders the name 8.3-style: `delim` (if any) goes after the eighth
    /// character, non-printable bytes become `nonascii` or `\xHH`.
    pub fn render_name(&self, delim: Option<char>, nonascii: Option<char>) -> String {
        let mut chars: Vec<String> = self
            .name
            .as_deref()
            .unwrap_or(b"")
            .iter()
            .map(|&b| match b {
                32..=126 => (b as char).to_string(),
                _ => match nonascii {
                    Some(fill) => fill.to_string(),
                    None => format!("\\x{b:02x}"),
                },
            })
            .collect();
        if let Some(delim) = delim {
            // Standard 8.3 type file name.
            if chars.len() > 8 {
                chars.insert(8, delim.to_string());
            } else {
                chars.push(delim.to_string());
            }
        }
        chars.concat()
    }

    pub fn render_id(&self, delim: Option<char>, nonascii: Option<char>) -> String {
        format!(
            "{} {:#x} {:#x}",
            self.render_name(delim, nonascii),
            self.location,
            self.object_type
        )
    }
}

impl std::fmt::Display for ObjectID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.render_id(Some('.'), None))
    }
}

/// Strips the trailing space padding from an on-disk name.
pub(crate) fn trim_name(name: &[u8]) -> &[u8] {
    let end = name
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(0, |p| p + 1);
    &name[..end]
}

/// One member of the prologue's A/B pair: where that side's AU Map and
/// Directory chains begin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StartID {
    pub map_start_id: u16,
    pub dir_start_id: u16,
}

impl StartID {
    pub const SIZE: usize = 4;

    pub fn unpack(data: &[u8]) -> Result<StartID> {
        if data.len() != Self::SIZE {
            return Err(StageError::unpack_size(Self::SIZE, data.len()));
        }
        Ok(StartID {
            map_start_id: u16::from_le_bytes(data[0..2].try_into().unwrap()),
            dir_start_id: u16::from_le_bytes(data[2..4].try_into().unwrap()),
        })
    }

    pub fn pack(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out[0..2].copy_from_slice(&self.map_start_id.to_le_bytes());
        out[2..4].copy_from_slice(&self.dir_start_id.to_le_bytes());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_round_trip() {
        let bytes = [0x34, 0x12, 0x78, 0x56];
        let check = Check::unpack(&bytes).unwrap();
        assert_eq!(check.mapcheck, 0x1234);
        assert_eq!(check.dircheck, 0x5678);
        assert_eq!(check.pack(), bytes);
        assert_eq!(Check::unpack(&check.pack()).unwrap(), check);
    }

    #[test]
    fn check_wrong_size() {
        assert!(matches!(
            Check::unpack(&[0; 3]),
            Err(StageError::Unpack(_))
        ));
    }

    #[test]
    fn version_id_field_split() {
        // 0x0123 = versionvalue 9, candidacy 3 with a 5-bit split.
        let v = VersionID::new(0x01, 0x23);
        assert_eq!(v.version_value(), 0x0123 >> 5);
        assert_eq!(v.store_candidacy(), 0x0123 & 0x1f);
        assert_eq!(v.pack(), [0x01, 0x23]);
        assert_eq!(VersionID::unpack(&v.pack()).unwrap(), v);
    }

    #[test]
    fn version_id_candidacy_values() {
        let v = VersionID::new(0x00, VersionID::STAGE_CANDIDACY as u8);
        assert_eq!(v.store_candidacy(), VersionID::STAGE_CANDIDACY);
        assert_eq!(v.version_value(), 0);
    }

    #[test]
    fn object_id_trims_padding() {
        let mut bytes = *b"HELLO      \x04\x08";
        let id = ObjectID::unpack(&bytes).unwrap();
        assert_eq!(id.name.as_deref(), Some(&b"HELLO"[..]));
        assert_eq!(id.location, 0x04);
        assert_eq!(id.object_type, 0x08);
        // Packing restores the space padding.
        assert_eq!(id.pack(), bytes);
        bytes[0] = 0x01;
        assert_ne!(id.pack(), bytes);
    }

    #[test]
    fn object_id_all_zero_name_is_none() {
        let mut bytes = [0u8; 13];
        bytes[11] = 0x02;
        let id = ObjectID::unpack(&bytes).unwrap();
        assert_eq!(id.name, None);
        assert_eq!(id.pack(), bytes);
    }

    #[test]
    fn object_id_rendering() {
        let id = ObjectID {
            name: Some(b"AB\x01DEFGHIJK".to_vec()),
            location: 1,
            object_type: 2,
        };
        assert_eq!(id.render_name(None, Some('_')), "AB_DEFGHIJK");
        assert_eq!(id.render_name(None, None), "AB\\x01DEFGHIJK");
        assert_eq!(id.render_name(Some('.'), Some('_')), "AB_DEFGH.IJK");

        let short = ObjectID {
            name: Some(b"HELLO".to_vec()),
            location: 0,
            object_type: 0,
        };
        assert_eq!(short.render_name(Some('.'), None), "HELLO.");
    }

    #[test]
    fn start_id_round_trip() {
        let s = StartID {
            map_start_id: 2,
            dir_start_id: 5,
        };
        assert_eq!(StartID::unpack(&s.pack()).unwrap(), s);
        assert_eq!(s.pack(), [2, 0, 5, 0]);
    }
}
