use std::collections::HashMap;

use super::*;

/// One directory slot naming an object and locating its chain.
///
/// | Offset | Size | Field   | Description |
/// | ------ | ---- | ------- | ----------- |
/// | 0      | 13   | id      | [`ObjectID`]. |
/// | 13     | 1    | unused  | Purpose unknown; preserved for packing. |
/// | 14     | 2    | status  | |
/// | 16     | 2    | length  | Authoritative object byte length. |
/// | 18     | 2    | startID | AU id of the first payload AU. |
/// | 20     | 2    | version | [`VersionID`]. |
/// | 22     | 2    | check   | Parsed, not validated. |
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub id: ObjectID,
    pub unused: u8,
    pub status: u16,
    pub length: u16,
    pub start_id: u16,
    pub version: VersionID,
    pub check: u16,
}

impl DirectoryEntry {
    pub const SIZE: usize = 24;

    pub fn unpack(data: &[u8]) -> Result<DirectoryEntry> {
        if data.len() != Self::SIZE {
            return Err(StageError::unpack_size(Self::SIZE, data.len()));
        }
        Ok(DirectoryEntry {
            id: ObjectID::unpack(&data[0..13])?,
            unused: data[13],
            status: u16::from_le_bytes(data[14..16].try_into().unwrap()),
            length: u16::from_le_bytes(data[16..18].try_into().unwrap()),
            start_id: u16::from_le_bytes(data[18..20].try_into().unwrap()),
            version: VersionID::unpack(&data[20..22])?,
            check: u16::from_le_bytes(data[22..24].try_into().unwrap()),
        })
    }

    pub fn pack(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out[0..13].copy_from_slice(&self.id.pack());
        out[13] = self.unused;
        out[14..16].copy_from_slice(&self.status.to_le_bytes());
        out[16..18].copy_from_slice(&self.length.to_le_bytes());
        out[18..20].copy_from_slice(&self.start_id.to_le_bytes());
        out[20..22].copy_from_slice(&self.version.pack());
        out[22..24].copy_from_slice(&self.check.to_le_bytes());
        out
    }

    /// A bare-bones entry built from an object's own header, used when an
    /// embedded object has no directory slot behind it.
    pub fn from_object(object: &Object) -> DirectoryEntry {
        DirectoryEntry {
            id: object.id.clone(),
            length: object.length,
            version: object.version,
            ..DirectoryEntry::default()
        }
    }
}

/// Object directory: header, usage list, entry list, and a name index
/// over the entries that have one.
#[derive(Debug, Clone, Default)]
pub struct Directory {
    pub checks: Check,
    pub create_date: u32,
    pub modify_date: u32,
    pub nov_class: VersionID,
    pub in_use: u16,
    pub maximum: u16,
    pub usage_off: u16,
    pub entry_off: u16,
    /// Rebased to 0-based; a free slot (0 on disk) wraps to `0xffff`.
    pub usage_list: Vec<u16>,
    entry_list: Vec<DirectoryEntry>,
    index: HashMap<Vec<u8>, usize>,
}

pub(crate) const DIRECTORY_HEADER_SIZE: usize = 22;

impl Directory {
    /// Byte length of a directory with `maximum` slots.
    pub fn size_for(maximum: u16) -> usize {
        DIRECTORY_HEADER_SIZE + (2 + DirectoryEntry::SIZE) * maximum as usize
    }

    pub fn unpack(data: &[u8]) -> Result<Directory> {
        let mut reader = Reader::new(data, true);
        let mut dir = Directory {
            checks: Check::unpack(reader.read(Check::SIZE)?)?,
            create_date: reader.read_u32()?,
            modify_date: reader.read_u32()?,
            nov_class: VersionID::unpack(reader.read(VersionID::SIZE)?)?,
            in_use: reader.read_u16()?,
            maximum: reader.read_u16()?,
            usage_off: reader.read_u16()?,
            entry_off: reader.read_u16()?,
            ..Directory::default()
        };

        // Usage entries are stored 1-based.
        dir.usage_list = Vec::with_capacity(dir.maximum as usize);
        for _ in 0..dir.maximum {
            dir.usage_list.push(reader.read_u16()?.wrapping_sub(1));
        }

        let rest = reader.read_to_end();
        if rest.len() % DirectoryEntry::SIZE != 0 {
            return Err(StageError::Unpack(format!(
                "{} trailing directory byte(s) do not divide into entries",
                rest.len()
            )));
        }
        for chunk in rest.chunks_exact(DirectoryEntry::SIZE) {
            dir.entry_list.push(DirectoryEntry::unpack(chunk)?);
        }
        dir.build_index();
        Ok(dir)
    }

    fn build_index(&mut self) {
        self.index = self
            .entry_list
            .iter()
            .enumerate()
            .filter_map(|(i, entry)| entry.id.name.clone().map(|name| (name, i)))
            .collect();
    }

    pub fn entries(&self) -> &[DirectoryEntry] {
        &self.entry_list
    }

    pub fn entry(&self, index: usize) -> Result<&DirectoryEntry> {
        self.entry_list
            .get(index)
            .ok_or_else(|| StageError::NotFound(format!("entry #{index}")))
    }

    /// Entry-list position of `name`, given either trimmed or in its raw
    /// space-padded 11-byte form.
    pub fn index_of(&self, name: &[u8]) -> Result<usize> {
        let name = trim_name(name);
        self.index.get(name).copied().ok_or_else(|| {
            StageError::NotFound(String::from_utf8_lossy(name).into_owned())
        })
    }

    pub fn entry_ref(&self, obj: ObjRef<'_>) -> Result<&DirectoryEntry> {
        match obj {
            ObjRef::Index(i) => self.entry(i),
            ObjRef::Name(name) => self.entry(self.index_of(name)?),
            ObjRef::Id(id) => match &id.name {
                Some(name) => self.entry(self.index_of(name)?),
                None => Err(StageError::NotFound("unnamed object".into())),
            },
        }
    }
}

/// How callers may address a directory object: by slot, by name, or by a
/// full [`ObjectID`].
#[derive(Debug, Clone, Copy)]
pub enum ObjRef<'a> {
    Index(usize),
    Name(&'a [u8]),
    Id(&'a ObjectID),
}

impl From<usize> for ObjRef<'_> {
    fn from(index: usize) -> Self {
        ObjRef::Index(index)
    }
}

impl<'a> From<&'a [u8]> for ObjRef<'a> {
    fn from(name: &'a [u8]) -> Self {
        ObjRef::Name(name)
    }
}

impl<'a, const N: usize> From<&'a [u8; N]> for ObjRef<'a> {
    fn from(name: &'a [u8; N]) -> Self {
        ObjRef::Name(name)
    }
}

impl<'a> From<&'a ObjectID> for ObjRef<'a> {
    fn from(id: &'a ObjectID) -> Self {
        ObjRef::Id(id)
    }
}

#[cfg(test)]
pub(crate) fn sample_directory_bytes(entries: &[DirectoryEntry], in_use: u16) -> Vec<u8> {
    let maximum = entries.len() as u16;
    let mut data = Vec::new();
    data.extend_from_slice(&Check::default().pack());
    data.extend_from_slice(&0u32.to_le_bytes()); // create date
    data.extend_from_slice(&0u32.to_le_bytes()); // modify date
    data.extend_from_slice(&VersionID::default().pack());
    data.extend_from_slice(&in_use.to_le_bytes());
    data.extend_from_slice(&maximum.to_le_bytes());
    data.extend_from_slice(&0u16.to_le_bytes()); // usage offset
    data.extend_from_slice(&0u16.to_le_bytes()); // entry offset
    for i in 0..maximum {
        data.extend_from_slice(&(i + 1).to_le_bytes());
    }
    for entry in entries {
        data.extend_from_slice(&entry.pack());
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named_entry(name: &[u8], start_id: u16, length: u16) -> DirectoryEntry {
        DirectoryEntry {
            id: ObjectID {
                name: Some(name.to_vec()),
                location: 0,
                object_type: 0x04,
            },
            start_id,
            length,
            ..DirectoryEntry::default()
        }
    }

    #[test]
    fn entry_round_trip() {
        let entry = DirectoryEntry {
            id: ObjectID {
                name: Some(b"HELLO".to_vec()),
                location: 1,
                object_type: 2,
            },
            unused: 0xa5,
            status: 0x8000,
            length: 40,
            start_id: 3,
            version: VersionID::new(0x20, 0x02),
            check: 0x1234,
        };
        let packed = entry.pack();
        assert_eq!(DirectoryEntry::unpack(&packed).unwrap(), entry);
        // The byte after the id rides along untouched.
        assert_eq!(packed[13], 0xa5);
    }

    #[test]
    fn name_index_skips_unnamed_entries() {
        let entries = [
            named_entry(b"HELLO", 3, 40),
            DirectoryEntry::default(), // all-zero name
        ];
        let data = sample_directory_bytes(&entries, 1);
        let dir = Directory::unpack(&data).unwrap();
        assert_eq!(dir.entries().len(), 2);
        assert_eq!(dir.index_of(b"HELLO").unwrap(), 0);
        assert_eq!(dir.index_of(b"HELLO      ").unwrap(), 0);
        assert!(matches!(
            dir.index_of(b"MISSING"),
            Err(StageError::NotFound(_))
        ));
        // The unnamed entry is reachable by slot only.
        assert_eq!(dir.entry(1).unwrap().id.name, None);
    }

    #[test]
    fn entry_ref_forms() {
        let entries = [named_entry(b"HELLO", 3, 40)];
        let dir = Directory::unpack(&sample_directory_bytes(&entries, 1)).unwrap();
        assert_eq!(dir.entry_ref(ObjRef::Index(0)).unwrap().start_id, 3);
        assert_eq!(dir.entry_ref(b"HELLO".into()).unwrap().start_id, 3);
        let id = dir.entry(0).unwrap().id.clone();
        assert_eq!(dir.entry_ref((&id).into()).unwrap().start_id, 3);
    }

    #[test]
    fn empty_directory() {
        let dir = Directory::unpack(&sample_directory_bytes(&[], 0)).unwrap();
        assert_eq!(dir.in_use, 0);
        assert_eq!(dir.entries().len(), 0);
    }

    #[test]
    fn usage_list_is_rebased() {
        let entries = [named_entry(b"A", 3, 20), named_entry(b"B", 4, 20)];
        let mut data = sample_directory_bytes(&entries, 2);
        // Second usage slot is free on disk.
        data[DIRECTORY_HEADER_SIZE + 2] = 0;
        data[DIRECTORY_HEADER_SIZE + 3] = 0;
        let dir = Directory::unpack(&data).unwrap();
        assert_eq!(dir.usage_list, vec![0, 0xffff]);
    }

    #[test]
    fn ragged_entry_bytes_rejected() {
        let entries = [named_entry(b"A", 3, 20)];
        let mut data = sample_directory_bytes(&entries, 1);
        data.pop();
        assert!(matches!(
            Directory::unpack(&data),
            Err(StageError::Unpack(_))
        ));
    }

    #[test]
    fn duplicate_names_resolve_to_last() {
        let entries = [named_entry(b"SAME", 3, 20), named_entry(b"SAME", 4, 20)];
        let dir = Directory::unpack(&sample_directory_bytes(&entries, 2)).unwrap();
        assert_eq!(dir.index_of(b"SAME").unwrap(), 1);
    }
}
