use log::warn;

use super::*;

/// A decoded segment: header values, raw bytes, typed body, and whatever
/// went wrong while decoding it.
///
/// `st`/`sl` are `None` only when the 3-byte header itself could not be
/// read; the raw bytes are preserved either way.
#[derive(Debug)]
pub struct Segment {
    pub object_id: Option<ObjectID>,
    st: Option<u8>,
    sl: Option<u16>,
    raw: Vec<u8>,
    exceptions: Vec<StageError>,
    pub body: SegmentBody,
}

impl Segment {
    pub const HEADER_SIZE: usize = 3;

    pub fn seg_type(&self) -> Option<u8> {
        self.st
    }

    pub fn seg_length(&self) -> Option<u16> {
        self.sl
    }

    pub fn kind(&self) -> SegmentKind {
        self.body.kind()
    }

    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn header(&self) -> &[u8] {
        &self.raw[..self.raw.len().min(Self::HEADER_SIZE)]
    }

    pub fn data(&self, with_header: bool) -> &[u8] {
        if with_header {
            &self.raw
        } else if self.raw.len() > Self::HEADER_SIZE {
            &self.raw[Self::HEADER_SIZE..]
        } else {
            &[]
        }
    }

    pub fn exceptions(&self) -> &[StageError] {
        &self.exceptions
    }

    pub fn attributes(&self) -> Vec<(&'static str, AttrValue<'_>)> {
        self.body.attributes()
    }
}

/// Parses object payloads into lazy segment streams.
///
/// The dispatch table lives in [`SegmentKind`]; this type carries the
/// iteration and fault policy: one corrupt segment never takes down the
/// rest of the object.
#[derive(Debug, Default)]
pub struct SegmentFactory;

impl SegmentFactory {
    pub fn new() -> SegmentFactory {
        SegmentFactory
    }

    /// Lazily parses `object`'s payload into segments, in file order.
    pub fn parse_segments<'a>(&self, object: &'a Object) -> SegmentIter<'a> {
        SegmentIter {
            object_id: object.id.clone(),
            reader: Reader::new(object.payload(), true),
            done: false,
        }
    }

    /// Flattens an object into [`WalkEvent`]s: the object itself, then
    /// its segments in file order. With `descend`, each embedded object
    /// is entered right after its carrier segment, to any depth; an
    /// explicit work list keeps arbitrarily deep nesting off the call
    /// stack.
    pub fn walk(&self, object: &Object, descend: bool) -> Vec<WalkEvent> {
        let mut events = vec![WalkEvent::Object {
            depth: 0,
            object: object.clone(),
        }];
        let mut stack: Vec<(usize, std::vec::IntoIter<Segment>)> = vec![(
            0,
            self.parse_segments(object).collect::<Vec<_>>().into_iter(),
        )];

        loop {
            let (depth, segment) = {
                let Some((depth, iter)) = stack.last_mut() else {
                    break;
                };
                (*depth, iter.next())
            };
            let Some(segment) = segment else {
                stack.pop();
                continue;
            };

            let embedded = if descend {
                segment
                    .body
                    .as_imbedded_object()
                    .and_then(|i| i.object.clone())
            } else {
                None
            };
            events.push(WalkEvent::Segment { depth, segment });

            if let Some(inner) = embedded {
                stack.push((
                    depth + 1,
                    self.parse_segments(&inner).collect::<Vec<_>>().into_iter(),
                ));
                events.push(WalkEvent::Object {
                    depth: depth + 1,
                    object: inner,
                });
            }
        }
        events
    }
}

/// One step of [`SegmentFactory::walk`].
#[derive(Debug)]
pub enum WalkEvent {
    Object { depth: usize, object: Object },
    Segment { depth: usize, segment: Segment },
}

/// Iterator over the segments of one object payload.
pub struct SegmentIter<'a> {
    object_id: ObjectID,
    reader: Reader<'a>,
    done: bool,
}

impl Iterator for SegmentIter<'_> {
    type Item = Segment;

    fn next(&mut self) -> Option<Segment> {
        if self.done || !self.reader.is_more() {
            return None;
        }
        let loc = self.reader.tell();

        // Segment header: st u8, sl u16.
        let header = (|| -> Result<(u8, u16)> {
            Ok((self.reader.read_u8()?, self.reader.read_u16()?))
        })();
        let (st, sl) = match header {
            Ok(v) => v,
            Err(_) => {
                // Go back and salvage whatever is left into a catch-all
                // segment; the object is over.
                self.reader.set_position(loc);
                let raw = self.reader.read_to_end().to_vec();
                self.done = true;
                warn!(
                    "{}: invalid segment header at payload offset {loc}",
                    self.object_id
                );
                return Some(Segment {
                    object_id: Some(self.object_id.clone()),
                    st: None,
                    sl: None,
                    raw,
                    exceptions: vec![StageError::SegmentData(
                        "invalid segment header".into(),
                    )],
                    body: SegmentBody::new(SegmentKind::Unknown),
                });
            }
        };

        let mut exceptions = Vec::new();

        // Rewind and take the entire segment, header included.
        self.reader.set_position(loc);
        let raw = match self.reader.read(sl as usize) {
            Ok(bytes) => bytes.to_vec(),
            Err(_) => {
                exceptions.push(StageError::SegmentData(
                    "segment extends beyond end of object".into(),
                ));
                self.reader.set_position(loc);
                self.reader.read_to_end().to_vec()
            }
        };
        // A segment never consumes less than its header, or a short `sl`
        // would pin the cursor in place.
        self.reader
            .set_position((loc + (sl as usize).max(Segment::HEADER_SIZE)).min(self.reader.len()));

        let mut body = SegmentBody::new(SegmentKind::from_type(st));
        let payload = if raw.len() > Segment::HEADER_SIZE {
            &raw[Segment::HEADER_SIZE..]
        } else {
            &[]
        };
        if let Err(e) = body.unpack(payload) {
            let e = match e {
                StageError::Eof { .. } => StageError::SegmentData("segment missing data".into()),
                other => other,
            };
            warn!(
                "{}: {} segment at payload offset {loc}: {e}",
                self.object_id,
                body.kind().name()
            );
            exceptions.push(e);
        }

        Some(Segment {
            object_id: Some(self.object_id.clone()),
            st: Some(st),
            sl: Some(sl),
            raw,
            exceptions,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::object::sample_object_bytes;

    fn object_with_payload(payload: &[u8]) -> Object {
        Object::unpack(&sample_object_bytes(b"TEST", payload)).unwrap()
    }

    fn parse(payload: &[u8]) -> Vec<Segment> {
        SegmentFactory::new()
            .parse_segments(&object_with_payload(payload))
            .collect()
    }

    #[test]
    fn empty_payload_yields_nothing() {
        assert!(parse(&[]).is_empty());
    }

    #[test]
    fn single_well_formed_segment() {
        let segments = parse(&[0x71, 0x05, 0x00, 0xaa, 0xbb]);
        assert_eq!(segments.len(), 1);
        let seg = &segments[0];
        assert_eq!(seg.seg_type(), Some(0x71));
        assert_eq!(seg.seg_length(), Some(5));
        assert_eq!(seg.kind(), SegmentKind::Navigate);
        assert!(seg.exceptions().is_empty());
        assert_eq!(seg.header(), &[0x71, 0x05, 0x00]);
        assert_eq!(seg.data(false), &[0xaa, 0xbb]);
        assert_eq!(
            seg.body.as_navigate().unwrap().data.as_deref(),
            Some(&[0xaa, 0xbb][..])
        );
        assert_eq!(seg.object_id.as_ref().unwrap().name.as_deref(), Some(&b"TEST"[..]));
    }

    #[test]
    fn bad_prefix_attaches_error_and_stream_continues() {
        let mut payload = vec![0x01, 0x05, 0x00, 0x42, 0x07];
        payload.extend_from_slice(&[0x71, 0x04, 0x00, 0xcc]);
        let segments = parse(&payload);
        assert_eq!(segments.len(), 2);
        match &segments[0].exceptions()[0] {
            StageError::SegmentData(msg) => assert!(msg.starts_with("prefix=7"), "{msg}"),
            other => panic!("unexpected {other:?}"),
        }
        let call = segments[0].body.as_program_call().unwrap();
        assert_eq!(call.event, Some(0x42));
        assert_eq!(call.prefix, Some(0x07));
        // The fault did not leak into the next segment.
        assert!(segments[1].exceptions().is_empty());
        assert_eq!(segments[1].kind(), SegmentKind::Navigate);
    }

    #[test]
    fn truncated_header_salvages_remainder() {
        let mut payload = vec![0x71, 0x04, 0x00, 0xcc];
        payload.extend_from_slice(&[0x61, 0x09]); // two header bytes, then EOF
        let segments = parse(&payload);
        assert_eq!(segments.len(), 2);
        let tail = &segments[1];
        assert_eq!(tail.seg_type(), None);
        assert_eq!(tail.seg_length(), None);
        assert_eq!(tail.kind(), SegmentKind::Unknown);
        assert_eq!(tail.raw(), &[0x61, 0x09]);
        match &tail.exceptions()[0] {
            StageError::SegmentData(msg) => assert_eq!(msg, "invalid segment header"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn overlong_segment_is_truncated_and_flagged() {
        let segments = parse(&[0x61, 0x10, 0x00, 0x01, 0xaa]);
        assert_eq!(segments.len(), 1);
        let seg = &segments[0];
        assert_eq!(seg.seg_length(), Some(0x10));
        assert_eq!(seg.raw(), &[0x61, 0x10, 0x00, 0x01, 0xaa]);
        let messages: Vec<String> = seg.exceptions().iter().map(|e| e.to_string()).collect();
        assert!(messages
            .iter()
            .any(|m| m.contains("segment extends beyond end of object")));
        // The partial body still decoded what it could.
        let data = seg.body.as_program_data().unwrap();
        assert_eq!(data.data_type, Some(0x01));
        assert_eq!(data.data.as_deref(), Some(&[0xaa][..]));
    }

    #[test]
    fn short_length_cannot_stall_the_stream() {
        // sl = 1 claims less than its own header; the cursor must still
        // move past the header.
        let segments = parse(&[0x71, 0x01, 0x00, 0x71, 0x04, 0x00, 0xcc]);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].seg_length(), Some(1));
        assert_eq!(segments[1].data(false), &[0xcc]);
    }

    #[test]
    fn unknown_type_preserves_bytes() {
        let segments = parse(&[0x7f, 0x05, 0x00, 0x01, 0x02]);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].kind(), SegmentKind::Unknown);
        assert_eq!(segments[0].seg_type(), Some(0x7f));
        assert_eq!(segments[0].raw(), &[0x7f, 0x05, 0x00, 0x01, 0x02]);
        assert!(segments[0].exceptions().is_empty());
    }

    #[test]
    fn missing_body_data_is_flagged() {
        // PresentationData wants at least one data byte after its fixed
        // fields.
        let segments = parse(&[0x51, 0x07, 0x00, 0x01, 0, 0, 0]);
        assert_eq!(segments.len(), 1);
        let messages: Vec<String> = segments[0]
            .exceptions()
            .iter()
            .map(|e| e.to_string())
            .collect();
        assert!(messages.iter().any(|m| m.contains("segment missing data")));
    }

    #[test]
    fn consumed_bytes_account_for_whole_payload() {
        let payload = [
            0x71, 0x04, 0x00, 0xcc, // navigate
            0x61, 0x01, 0x00, // short sl, consumes 3
            0x7f, 0x05, 0x00, 0x01, 0x02, // unknown
        ];
        let segments = parse(&payload);
        let consumed: usize = segments
            .iter()
            .map(|s| s.raw().len().max(Segment::HEADER_SIZE))
            .sum();
        assert_eq!(consumed, payload.len());
    }

    #[test]
    fn embedded_object_reparses_to_navigate() {
        let inner = sample_object_bytes(b"INNER", &[0x71, 0x05, 0x00, 0xaa, 0xbb]);
        let mut payload = vec![0x52, (3 + inner.len()) as u8, 0x00];
        payload.extend_from_slice(&inner);
        let segments = parse(&payload);
        assert_eq!(segments.len(), 1);
        let object = segments[0]
            .body
            .as_imbedded_object()
            .unwrap()
            .object
            .as_ref()
            .unwrap();
        let inner_segments: Vec<Segment> =
            SegmentFactory::new().parse_segments(object).collect();
        assert_eq!(inner_segments.len(), 1);
        assert_eq!(inner_segments[0].kind(), SegmentKind::Navigate);
        assert_eq!(
            inner_segments[0].body.as_navigate().unwrap().data.as_deref(),
            Some(&[0xaa, 0xbb][..])
        );
    }

    #[test]
    fn malformed_embedded_object_attaches_error() {
        // Claimed object length disagrees with the bytes present.
        let mut inner = sample_object_bytes(b"INNER", &[0xaa, 0xbb]);
        inner.pop();
        let mut payload = vec![0x52, (3 + inner.len()) as u8, 0x00];
        payload.extend_from_slice(&inner);
        let segments = parse(&payload);
        assert_eq!(segments.len(), 1);
        assert!(!segments[0].exceptions().is_empty());
        assert!(segments[0].body.as_imbedded_object().unwrap().object.is_none());
    }

    #[test]
    fn walk_descends_through_nested_objects() {
        let innermost = sample_object_bytes(b"DEEP", &[0x71, 0x04, 0x00, 0xdd]);
        let mut mid_payload = vec![0x52, (3 + innermost.len()) as u8, 0x00];
        mid_payload.extend_from_slice(&innermost);
        let middle = sample_object_bytes(b"MID", &mid_payload);
        let mut top_payload = vec![0x61, 0x05, 0x00, 0x01, 0xee];
        top_payload.push(0x52);
        top_payload.extend_from_slice(&((3 + middle.len()) as u16).to_le_bytes());
        top_payload.extend_from_slice(&middle);

        let top = object_with_payload(&top_payload);
        let events = SegmentFactory::new().walk(&top, true);

        let shape: Vec<(usize, String)> = events
            .iter()
            .map(|e| match e {
                WalkEvent::Object { depth, object } => {
                    (*depth, format!("obj:{}", object.id.render_name(None, None)))
                }
                WalkEvent::Segment { depth, segment } => (*depth, format!("seg:{}", segment.name())),
            })
            .collect();
        assert_eq!(
            shape,
            vec![
                (0, "obj:TEST".to_string()),
                (0, "seg:ProgramData".to_string()),
                (0, "seg:ImbeddedObject".to_string()),
                (1, "obj:MID".to_string()),
                (1, "seg:ImbeddedObject".to_string()),
                (2, "obj:DEEP".to_string()),
                (2, "seg:Navigate".to_string()),
            ]
        );
    }

    #[test]
    fn walk_without_descent_stays_flat() {
        let inner = sample_object_bytes(b"INNER", &[0x71, 0x04, 0x00, 0xdd]);
        let mut payload = vec![0x52, (3 + inner.len()) as u8, 0x00];
        payload.extend_from_slice(&inner);
        let top = object_with_payload(&payload);
        let events = SegmentFactory::new().walk(&top, false);
        assert_eq!(events.len(), 2); // the object and its one segment
    }
}
