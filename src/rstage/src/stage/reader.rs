use std::io::SeekFrom;

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use super::*;

/// Cursor over a byte range with a default endianness.
///
/// All multi-byte reads honor the default unless an explicit `_be`/`_le`
/// variant is called. Reads past the end fail with [`StageError::Eof`]
/// rather than returning short data; a read of zero bytes returns an empty
/// slice. The reader borrows its backing storage, so sub-readers and
/// returned slices are zero-copy views into the same mapping or buffer.
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
    little_endian: bool,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8], little_endian: bool) -> Reader<'a> {
        Reader {
            data,
            pos: 0,
            little_endian,
        }
    }

    pub fn little_endian(&self) -> bool {
        self.little_endian
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn tell(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// True while the cursor is short of the end of the data.
    pub fn is_more(&self) -> bool {
        self.pos < self.data.len()
    }

    pub fn seek(&mut self, pos: SeekFrom) -> Result<usize> {
        let target = match pos {
            SeekFrom::Start(n) => n as i64,
            SeekFrom::Current(n) => self.pos as i64 + n,
            SeekFrom::End(n) => self.data.len() as i64 + n,
        };
        if target < 0 {
            return Err(StageError::Unpack(format!(
                "seek before start of data ({target})"
            )));
        }
        // Seeking past the end is allowed; the next read fails instead.
        self.pos = target as usize;
        Ok(self.pos)
    }

    /// Absolute reposition; unlike [`seek`](Self::seek) this cannot fail.
    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos;
    }

    pub fn read(&mut self, length: usize) -> Result<&'a [u8]> {
        if length == 0 {
            return Ok(&[]);
        }
        let available = self.remaining();
        if available < length {
            return Err(StageError::Eof {
                wanted: length,
                available,
            });
        }
        let slice = &self.data[self.pos..self.pos + length];
        self.pos += length;
        Ok(slice)
    }

    /// Reads from the cursor to the end of the data, which may be empty.
    pub fn read_to_end(&mut self) -> &'a [u8] {
        let slice = &self.data[self.pos.min(self.data.len())..];
        self.pos = self.data.len();
        slice
    }

    /// Returns an independent reader over the next `length` bytes,
    /// inheriting this reader's endianness.
    pub fn sub_reader(&mut self, length: usize) -> Result<Reader<'a>> {
        Ok(Reader::new(self.read(length)?, self.little_endian))
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read(1)?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read(1)?[0] as i8)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let bytes = self.read(2)?;
        Ok(if self.little_endian {
            LittleEndian::read_u16(bytes)
        } else {
            BigEndian::read_u16(bytes)
        })
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(self.read_u16()? as i16)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let bytes = self.read(4)?;
        Ok(if self.little_endian {
            LittleEndian::read_u32(bytes)
        } else {
            BigEndian::read_u32(bytes)
        })
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(self.read_u32()? as i32)
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        let bytes = self.read(8)?;
        Ok(if self.little_endian {
            LittleEndian::read_u64(bytes)
        } else {
            BigEndian::read_u64(bytes)
        })
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(self.read_u64()? as i64)
    }

    pub fn read_u16_le(&mut self) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.read(2)?))
    }

    pub fn read_u16_be(&mut self) -> Result<u16> {
        Ok(BigEndian::read_u16(self.read(2)?))
    }

    pub fn read_u32_le(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.read(4)?))
    }

    pub fn read_u32_be(&mut self) -> Result<u32> {
        Ok(BigEndian::read_u32(self.read(4)?))
    }

    pub fn read_object_id(&mut self) -> Result<ObjectID> {
        ObjectID::unpack(self.read(ObjectID::SIZE)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_reads_default_little_endian() {
        let data = [0x34, 0x12, 0x78, 0x56, 0x34, 0x12];
        let mut r = Reader::new(&data, true);
        assert_eq!(r.read_u16().unwrap(), 0x1234);
        assert_eq!(r.read_u32().unwrap(), 0x12345678);
        assert!(!r.is_more());
    }

    #[test]
    fn primitive_reads_big_endian() {
        let data = [0x12, 0x34];
        let mut r = Reader::new(&data, false);
        assert_eq!(r.read_u16().unwrap(), 0x1234);
        let mut r = Reader::new(&data, true);
        assert_eq!(r.read_u16_be().unwrap(), 0x1234);
    }

    #[test]
    fn read_past_end_reports_counts() {
        let mut r = Reader::new(&[1, 2, 3], true);
        r.read(2).unwrap();
        match r.read(4) {
            Err(StageError::Eof { wanted, available }) => {
                assert_eq!(wanted, 4);
                assert_eq!(available, 1);
            }
            other => panic!("expected Eof, got {other:?}"),
        }
        // The cursor does not move on a failed read.
        assert_eq!(r.tell(), 2);
    }

    #[test]
    fn zero_length_read_is_empty() {
        let mut r = Reader::new(&[], true);
        assert_eq!(r.read(0).unwrap(), &[] as &[u8]);
        assert_eq!(r.read_to_end(), &[] as &[u8]);
    }

    #[test]
    fn seek_and_tell() {
        let mut r = Reader::new(&[0, 1, 2, 3, 4, 5], true);
        r.seek(SeekFrom::Start(4)).unwrap();
        assert_eq!(r.tell(), 4);
        r.seek(SeekFrom::Current(-2)).unwrap();
        assert_eq!(r.read_u8().unwrap(), 2);
        r.seek(SeekFrom::End(-1)).unwrap();
        assert_eq!(r.read_u8().unwrap(), 5);
        assert!(r.seek(SeekFrom::Current(-100)).is_err());
    }

    #[test]
    fn sub_reader_is_independent() {
        let data = [0xaa, 0xbb, 0xcc, 0xdd];
        let mut r = Reader::new(&data, true);
        r.read(1).unwrap();
        let mut sub = r.sub_reader(2).unwrap();
        assert_eq!(sub.read_u16().unwrap(), 0xccbb);
        assert!(!sub.is_more());
        assert_eq!(r.read_u8().unwrap(), 0xdd);
    }
}
