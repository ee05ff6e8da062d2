use std::fs::File;
use std::path::Path;

use log::debug;
use memmap2::Mmap;

use super::*;

/// Byte source behind a [`StageFile`]: a read-only mapping of the file on
/// disk, or an owned buffer for callers that already have the bytes.
pub enum StageData {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl AsRef<[u8]> for StageData {
    fn as_ref(&self) -> &[u8] {
        match self {
            StageData::Mapped(map) => map,
            StageData::Owned(buf) => buf,
        }
    }
}

/// A loaded STAGE.DAT: prologue, both AU Maps, both directories, and the
/// byte source they came from.
///
/// Loading is eager for the metadata and lazy for object bodies. The
/// active A/B side starts out as the prologue's `curStartIdx`; callers
/// can override it with [`change_index`](Self::change_index). A
/// `StageFile` is a self-contained read-only view, so independent
/// instances over independent mappings are safe concurrent readers.
pub struct StageFile {
    data: StageData,
    prologue: Prologue,
    aums: [Aum; 2],
    dirs: [Directory; 2],
    index: usize,
}

impl StageFile {
    /// Maps `path` read-only and loads it.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<StageFile> {
        let file = File::open(path)?;
        let map = unsafe { Mmap::map(&file)? };
        Self::load(StageData::Mapped(map))
    }

    pub fn from_bytes(data: Vec<u8>) -> Result<StageFile> {
        Self::load(StageData::Owned(data))
    }

    pub fn load(data: StageData) -> Result<StageFile> {
        let bytes = data.as_ref();
        let prologue = Prologue::unpack(read_offset(bytes, 0, Prologue::SIZE)?)?;
        debug!(
            "prologue: quanta={} AUs at {:#x}, map width {}, {} map entries, side {}",
            prologue.au_quanta_size,
            prologue.au_start_offset,
            prologue.map_width,
            prologue.max_map_entries,
            prologue.cur_start_idx
        );

        let aums = [load_aum(bytes, &prologue, 0)?, load_aum(bytes, &prologue, 1)?];
        let dirs = [
            load_dir(bytes, &prologue, &aums[0], 0)?,
            load_dir(bytes, &prologue, &aums[1], 1)?,
        ];
        let index = prologue.cur_start_idx as usize;
        Ok(StageFile {
            data,
            prologue,
            aums,
            dirs,
            index,
        })
    }

    pub fn prologue(&self) -> &Prologue {
        &self.prologue
    }

    /// The active directory/AUM side, 0 or 1.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Picks the A/B side readers see; `None` restores the prologue's
    /// choice.
    pub fn change_index(&mut self, index: Option<usize>) -> Result<()> {
        match index {
            None => {
                self.index = self.prologue.cur_start_idx as usize;
                Ok(())
            }
            Some(i @ (0 | 1)) => {
                self.index = i;
                Ok(())
            }
            Some(other) => Err(StageError::Unpack(format!(
                "start index {other} is neither 0 nor 1"
            ))),
        }
    }

    pub fn aum(&self) -> &Aum {
        &self.aums[self.index]
    }

    pub fn aum_at(&self, index: usize) -> &Aum {
        &self.aums[index]
    }

    pub fn dir(&self) -> &Directory {
        &self.dirs[self.index]
    }

    pub fn dir_at(&self, index: usize) -> &Directory {
        &self.dirs[index]
    }

    pub fn offset_to_auid(&self, offset: usize) -> Result<u16> {
        offset_to_auid(&self.prologue, offset)
    }

    pub fn auid_to_offset(&self, auid: u16) -> Result<usize> {
        auid_to_offset(&self.prologue, auid)
    }

    /// The raw bytes of one allocation unit.
    pub fn read_au(&self, auid: u16) -> Result<&[u8]> {
        read_au(self.data.as_ref(), &self.prologue, auid)
    }

    /// Walks the active AUM from `auid` and concatenates every AU in the
    /// chain. Callers trim to the authoritative length themselves.
    pub fn read_chain(&self, auid: u16) -> Result<Vec<u8>> {
        self.read_chain_list(&self.aum().chain(auid)?)
    }

    /// Concatenates a pre-computed chain.
    pub fn read_chain_list(&self, chain: &[u16]) -> Result<Vec<u8>> {
        let mut data =
            Vec::with_capacity(chain.len() * self.prologue.au_quanta_size as usize);
        for &auid in chain {
            data.extend_from_slice(self.read_au(auid)?);
        }
        Ok(data)
    }

    /// Resolves `obj` through the active directory, chain-reads its AUs,
    /// trims to the directory's length, and unpacks the result.
    pub fn get_object<'a, R: Into<ObjRef<'a>>>(&self, obj: R) -> Result<Object> {
        let entry = self.dir().entry_ref(obj.into())?;
        let mut data = self.read_chain(entry.start_id)?;
        data.truncate(entry.length as usize);
        Object::unpack(&data)
    }
}

fn read_offset(bytes: &[u8], offset: usize, length: usize) -> Result<&[u8]> {
    let available = bytes.len().saturating_sub(offset);
    if available < length {
        return Err(StageError::Eof {
            wanted: length,
            available,
        });
    }
    Ok(&bytes[offset..offset + length])
}

fn offset_to_auid(prologue: &Prologue, offset: usize) -> Result<u16> {
    let start = prologue.au_start_offset as usize;
    if offset < start {
        return Err(StageError::Unpack(format!(
            "offset {offset:#x} is before the AU array at {start:#x}"
        )));
    }
    let auid = (offset - start) / prologue.au_quanta_size as usize
        + prologue.prologue_start_id as usize;
    Ok(auid as u16)
}

fn auid_to_offset(prologue: &Prologue, auid: u16) -> Result<usize> {
    if auid < prologue.prologue_start_id {
        return Err(StageError::AuDoesNotExist(auid));
    }
    Ok(prologue.au_start_offset as usize
        + (auid - prologue.prologue_start_id) as usize * prologue.au_quanta_size as usize)
}

fn read_au<'a>(bytes: &'a [u8], prologue: &Prologue, auid: u16) -> Result<&'a [u8]> {
    read_offset(
        bytes,
        auid_to_offset(prologue, auid)?,
        prologue.au_quanta_size as usize,
    )
}

fn load_aum(bytes: &[u8], prologue: &Prologue, index: usize) -> Result<Aum> {
    let mut aum = Aum::new(
        prologue.map_width,
        prologue.prologue_start_id,
        prologue.max_map_entries,
    );
    // The AUM itself cannot be chain-read; it is the one structure stored
    // contiguously.
    let offset = auid_to_offset(prologue, prologue.start_ids[index].map_start_id)?;
    aum.unpack(read_offset(bytes, offset, aum.size())?)?;
    debug!("AUM {index}: {} slots from AU {:#x}", aum.table().len(),
        prologue.start_ids[index].map_start_id);
    Ok(aum)
}

fn load_dir(bytes: &[u8], prologue: &Prologue, aum: &Aum, index: usize) -> Result<Directory> {
    let chain = aum.chain(prologue.start_ids[index].dir_start_id)?;
    let mut data = Vec::with_capacity(chain.len() * prologue.au_quanta_size as usize);
    for &auid in &chain {
        data.extend_from_slice(read_au(bytes, prologue, auid)?);
    }
    // Directories need not fill their last AU.
    let size = prologue.dir_tot_byte_size as usize;
    if data.len() < size {
        return Err(StageError::unpack_size(size, data.len()));
    }
    data.truncate(size);
    let dir = Directory::unpack(&data)?;
    debug!(
        "directory {index}: {}/{} entries in use",
        dir.in_use, dir.maximum
    );
    Ok(dir)
}


#[cfg(test)]
mod tests {
    use super::fixture;
    use super::*;

    #[test]
    fn load_and_read_object() {
        let stage = StageFile::from_bytes(fixture::build(0)).unwrap();
        assert_eq!(stage.index(), 0);
        assert_eq!(stage.dir().in_use, 1);

        let object = stage.get_object(0usize).unwrap();
        assert_eq!(object.data(true).len(), 40);
        assert_eq!(&object.data(true)[..11], b"HELLO      ");
        assert_eq!(object.payload(), &fixture::object_payload()[..]);

        // Name lookups resolve to the same object.
        let by_name = stage.get_object(b"HELLO").unwrap();
        assert_eq!(by_name, object);
    }

    #[test]
    fn chain_is_walked_in_order() {
        let stage = StageFile::from_bytes(fixture::build(0)).unwrap();
        assert_eq!(stage.aum().chain(3).unwrap(), vec![3, 4]);
        let data = stage.read_chain(3).unwrap();
        assert_eq!(data.len(), 2 * fixture::QUANTA);
        assert_eq!(&data[..11], b"HELLO      ");
    }

    #[test]
    fn b_side_is_active_when_prologue_says_so() {
        let stage = StageFile::from_bytes(fixture::build(1)).unwrap();
        assert_eq!(stage.index(), 1);
        assert!(stage.dir().index_of(b"WORLD").is_ok());
        assert!(matches!(
            stage.dir().index_of(b"HELLO"),
            Err(StageError::NotFound(_))
        ));
        let object = stage.get_object(b"WORLD").unwrap();
        // Both sides point at the same chain in this image.
        assert_eq!(&object.data(true)[..5], b"HELLO");
    }

    #[test]
    fn index_override_and_restore() {
        let mut stage = StageFile::from_bytes(fixture::build(1)).unwrap();
        stage.change_index(Some(0)).unwrap();
        assert!(stage.dir().index_of(b"HELLO").is_ok());
        stage.change_index(None).unwrap();
        assert_eq!(stage.index(), 1);
        assert!(stage.change_index(Some(2)).is_err());
    }

    #[test]
    fn offset_auid_translation_round_trips() {
        let stage = StageFile::from_bytes(fixture::build(0)).unwrap();
        for auid in 2u16..=9 {
            let offset = stage.auid_to_offset(auid).unwrap();
            assert_eq!(stage.offset_to_auid(offset).unwrap(), auid);
        }
        assert_eq!(stage.auid_to_offset(2).unwrap(), fixture::AU_START);
        assert!(matches!(
            stage.auid_to_offset(1),
            Err(StageError::AuDoesNotExist(1))
        ));
        assert!(stage.offset_to_auid(0).is_err());
    }

    #[test]
    fn object_segments_parse_end_to_end() {
        let stage = StageFile::from_bytes(fixture::build(0)).unwrap();
        let object = stage.get_object(0usize).unwrap();
        let segments: Vec<Segment> = SegmentFactory::new().parse_segments(&object).collect();
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].kind(), SegmentKind::Navigate);
        assert_eq!(segments[1].kind(), SegmentKind::ProgramData);
        assert_eq!(segments[2].kind(), SegmentKind::PresentationData);
        assert!(segments.iter().all(|s| s.exceptions().is_empty()));
    }

    #[test]
    fn truncated_file_fails_to_load() {
        let image = fixture::build(0);
        assert!(StageFile::from_bytes(image[..100].to_vec()).is_err());
        assert!(StageFile::from_bytes(image[..20].to_vec()).is_err());
    }

    #[test]
    fn missing_object_name_is_not_found() {
        let stage = StageFile::from_bytes(fixture::build(0)).unwrap();
        assert!(matches!(
            stage.get_object(b"NOPE"),
            Err(StageError::NotFound(_))
        ));
    }

    #[test]
    fn open_maps_a_real_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&fixture::build(0)).unwrap();
        file.flush().unwrap();

        let stage = StageFile::open(file.path()).unwrap();
        let object = stage.get_object(b"HELLO").unwrap();
        assert_eq!(object.length, 40);
    }
}
