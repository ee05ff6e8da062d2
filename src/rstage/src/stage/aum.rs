use super::*;

/// Allocation Unit Map: the FAT of a STAGE.DAT.
///
/// One slot per AU id. A slot holds the next id of the chain, or one of
/// the two reserved values below. Slots ahead of the first legal AU id
/// do not exist on disk and are synthesized as end-of-list so a walk from
/// any legal id behaves.
///
/// On disk the table is a [`Check`] followed by `entries` unsigned fields
/// of `width` bits each, packed little-endian, least-significant bit
/// first. Every object read depends on this table decoding correctly.
#[derive(Debug, Clone)]
pub struct Aum {
    pub width: u16,
    pub start_id: u16,
    pub entries: u16,
    pub checks: Check,
    table: Vec<u16>,
}

impl Aum {
    pub const FREE_ENTRY_VALUE: u16 = 0x00;
    pub const EOL_ENTRY_VALUE: u16 = 0x01;

    pub fn new(width: u16, start_id: u16, entries: u16) -> Aum {
        Aum {
            width,
            start_id,
            entries,
            checks: Check::default(),
            table: Vec::new(),
        }
    }

    /// On-disk byte length of this map.
    pub fn size(&self) -> usize {
        Check::SIZE + (self.entries as usize * self.width as usize).div_ceil(8)
    }

    pub fn unpack(&mut self, data: &[u8]) -> Result<()> {
        if data.len() != self.size() {
            return Err(StageError::unpack_size(self.size(), data.len()));
        }
        self.checks = Check::unpack(&data[..Check::SIZE])?;
        let packed = &data[Check::SIZE..];

        // The slots before the first legal id aren't real.
        let mut table = vec![Self::EOL_ENTRY_VALUE; self.start_id as usize];

        let width = self.width as u32;
        let mask: u32 = (1 << width) - 1;
        let mut reg: u32 = 0;
        let mut bit_count: u32 = 0;
        let mut bytes = packed.iter();
        for _ in 0..self.entries.saturating_sub(self.start_id) {
            // Shift bytes in to the left of any remaining bits until the
            // register holds a whole field. (little-endian, LSB first)
            while bit_count < width {
                let byte = *bytes.next().ok_or(StageError::Eof {
                    wanted: 1,
                    available: 0,
                })?;
                reg |= (byte as u32) << bit_count;
                bit_count += 8;
            }
            table.push((reg & mask) as u16);

            // Shift out the used bits.
            reg >>= width;
            bit_count -= width;
        }

        self.table = table;
        Ok(())
    }

    /// The decoded table, synthesized leading slots included.
    pub fn table(&self) -> &[u16] {
        &self.table
    }

    /// The AU chained after `auid`.
    pub fn next(&self, auid: u16) -> Result<u16> {
        let slot = *self
            .table
            .get(auid as usize)
            .ok_or(StageError::AuDoesNotExist(auid))?;
        match slot {
            Self::EOL_ENTRY_VALUE => Err(StageError::AuEndOfList(auid)),
            Self::FREE_ENTRY_VALUE => Err(StageError::AuNotAllocated(auid)),
            next => Ok(next),
        }
    }

    /// The ordered chain starting at `auid`, walked to end-of-list.
    ///
    /// End-of-list terminates the chain; a free or nonexistent id along
    /// the way is a fault and propagates.
    pub fn chain(&self, auid: u16) -> Result<Vec<u16>> {
        let mut chain = Vec::new();
        let mut auid = auid;
        loop {
            chain.push(auid);
            match self.next(auid) {
                Ok(next) => auid = next,
                Err(StageError::AuEndOfList(_)) => break,
                Err(e) => return Err(e),
            }
        }
        Ok(chain)
    }
}
