use super::*;

/// File header at byte offset 0, describing the cache geometry.
///
/// | Offset | Size | Field           | Description |
/// | ------ | ---- | --------------- | ----------- |
/// | 0      | 2    | structureLevel  | Layout revision. |
/// | 2      | 2    | class           | Store class. |
/// | 4      | 2    | auQuantaSize    | Bytes per allocation unit. |
/// | 6      | 2    | auStartOffset   | File offset of the AU array. |
/// | 8      | 2    | mapWidth        | Bits per AU Map entry, 1 to 16. |
/// | 10     | 2    | maxMapEntries   | AU Map entry count. |
/// | 12     | 2    | dirTotByteSize  | Directory byte size. |
/// | 14     | 2    | curStartIdx     | Active side of the A/B pair, 0 or 1. |
/// | 16     | 8    | startIDs        | Two [`StartID`] pairs. |
/// | 24     | 2    | prologueStartID | First legal AU id, at least 2. |
/// | 26     | 2    | check           | Checksum; parsed, not validated. |
///
/// Everything is little-endian. Some Windows-era files append an extra
/// object id after the documented fields; the Reception System never reads
/// it for staging, so neither do we.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Prologue {
    pub structure_level: u16,
    pub class: u16,
    pub au_quanta_size: u16,
    pub au_start_offset: u16,
    pub map_width: u16,
    pub max_map_entries: u16,
    pub dir_tot_byte_size: u16,
    pub cur_start_idx: u16,
    pub start_ids: [StartID; 2],
    pub prologue_start_id: u16,
    pub check: u16,
}

impl Prologue {
    pub const SIZE: usize = 28;

    pub fn unpack(data: &[u8]) -> Result<Prologue> {
        if data.len() != Self::SIZE {
            return Err(StageError::unpack_size(Self::SIZE, data.len()));
        }
        let mut reader = Reader::new(data, true);
        let prologue = Prologue {
            structure_level: reader.read_u16()?,
            class: reader.read_u16()?,
            au_quanta_size: reader.read_u16()?,
            au_start_offset: reader.read_u16()?,
            map_width: reader.read_u16()?,
            max_map_entries: reader.read_u16()?,
            dir_tot_byte_size: reader.read_u16()?,
            cur_start_idx: reader.read_u16()?,
            start_ids: [
                StartID::unpack(reader.read(StartID::SIZE)?)?,
                StartID::unpack(reader.read(StartID::SIZE)?)?,
            ],
            prologue_start_id: reader.read_u16()?,
            check: reader.read_u16()?,
        };
        prologue.validate()?;
        Ok(prologue)
    }

    fn validate(&self) -> Result<()> {
        if !(1..=16).contains(&self.map_width) {
            return Err(StageError::Unpack(format!(
                "map width {} out of range 1..=16",
                self.map_width
            )));
        }
        if self.au_quanta_size == 0 {
            return Err(StageError::Unpack("AU quanta size is zero".into()));
        }
        if self.prologue_start_id < 2 {
            return Err(StageError::Unpack(format!(
                "prologue start id {} below 2",
                self.prologue_start_id
            )));
        }
        if self.cur_start_idx > 1 {
            return Err(StageError::Unpack(format!(
                "current start index {} is neither 0 nor 1",
                self.cur_start_idx
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn sample_prologue_bytes() -> Vec<u8> {
    let words: [u16; 8] = [
        1,  // structure level
        0,  // class
        32, // AU quanta size
        64, // AU start offset
        16, // map width
        10, // max map entries
        48, // directory byte size
        0,  // current start index
    ];
    let mut data = Vec::new();
    for w in words {
        data.extend_from_slice(&w.to_le_bytes());
    }
    data.extend_from_slice(
        &StartID {
            map_start_id: 2,
            dir_start_id: 5,
        }
        .pack(),
    );
    data.extend_from_slice(
        &StartID {
            map_start_id: 6,
            dir_start_id: 7,
        }
        .pack(),
    );
    data.extend_from_slice(&2u16.to_le_bytes()); // prologue start id
    data.extend_from_slice(&0xbeefu16.to_le_bytes()); // check
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpack_sample() {
        let p = Prologue::unpack(&sample_prologue_bytes()).unwrap();
        assert_eq!(p.au_quanta_size, 32);
        assert_eq!(p.au_start_offset, 64);
        assert_eq!(p.map_width, 16);
        assert_eq!(p.max_map_entries, 10);
        assert_eq!(p.dir_tot_byte_size, 48);
        assert_eq!(p.cur_start_idx, 0);
        assert_eq!(p.start_ids[0].map_start_id, 2);
        assert_eq!(p.start_ids[0].dir_start_id, 5);
        assert_eq!(p.start_ids[1].map_start_id, 6);
        assert_eq!(p.start_ids[1].dir_start_id, 7);
        assert_eq!(p.prologue_start_id, 2);
        assert_eq!(p.check, 0xbeef);
    }

    #[test]
    fn short_read_fails() {
        let data = sample_prologue_bytes();
        assert!(matches!(
            Prologue::unpack(&data[..20]),
            Err(StageError::Unpack(_))
        ));
    }

    #[test]
    fn geometry_checks() {
        let mut data = sample_prologue_bytes();
        data[8] = 17; // map width
        assert!(Prologue::unpack(&data).is_err());

        let mut data = sample_prologue_bytes();
        data[8] = 0;
        assert!(Prologue::unpack(&data).is_err());

        let mut data = sample_prologue_bytes();
        data[4] = 0; // AU quanta size
        assert!(Prologue::unpack(&data).is_err());

        let mut data = sample_prologue_bytes();
        data[24] = 1; // prologue start id
        assert!(Prologue::unpack(&data).is_err());

        let mut data = sample_prologue_bytes();
        data[14] = 2; // current start index
        assert!(Prologue::unpack(&data).is_err());
    }
}
