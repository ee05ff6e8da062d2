use super::*;

/// A named, length-delimited unit whose payload is a segment stream.
///
/// | Offset | Size | Field      | Description |
/// | ------ | ---- | ---------- | ----------- |
/// | 0      | 13   | id         | [`ObjectID`]. |
/// | 13     | 2    | length     | Total object length, header included. |
/// | 15     | 1    | storeFlags | Becomes `version.byte2`. |
/// | 16     | 1    | setSize    | |
/// | 17     | 1    | version    | Becomes `version.byte1`. |
///
/// The payload follows the 18-byte header; parse it with a
/// [`SegmentFactory`](crate::SegmentFactory).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Object {
    pub id: ObjectID,
    pub length: u16,
    pub store_flags: u8,
    pub set_size: u8,
    pub version: VersionID,
    raw: Vec<u8>,
}

impl Object {
    pub const HEADER_SIZE: usize = 18;

    pub fn unpack(data: &[u8]) -> Result<Object> {
        if data.len() < Self::HEADER_SIZE {
            return Err(StageError::unpack_size(Self::HEADER_SIZE, data.len()));
        }
        let mut reader = Reader::new(data, true);
        let id = reader.read_object_id()?;
        let length = reader.read_u16()?;
        let store_flags = reader.read_u8()?;
        let set_size = reader.read_u8()?;
        let version_byte = reader.read_u8()?;

        if data.len() != length as usize {
            return Err(StageError::unpack_size(length as usize, data.len()));
        }

        Ok(Object {
            id,
            length,
            store_flags,
            set_size,
            version: VersionID::new(version_byte, store_flags),
            raw: data.to_vec(),
        })
    }

    pub fn header(&self) -> &[u8] {
        &self.raw[..Self::HEADER_SIZE]
    }

    /// The segment-stream payload (everything past the header).
    pub fn payload(&self) -> &[u8] {
        &self.raw[Self::HEADER_SIZE..]
    }

    pub fn data(&self, with_header: bool) -> &[u8] {
        if with_header {
            &self.raw
        } else {
            self.payload()
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_object_bytes(name: &[u8], payload: &[u8]) -> Vec<u8> {
    let id = ObjectID {
        name: Some(name.to_vec()),
        location: 0,
        object_type: 0x0c,
    };
    let length = (Object::HEADER_SIZE + payload.len()) as u16;
    let mut data = id.pack().to_vec();
    data.extend_from_slice(&length.to_le_bytes());
    data.push(0x02); // store flags
    data.push(0x01); // set size
    data.push(0x20); // version
    data.extend_from_slice(payload);
    data
}
