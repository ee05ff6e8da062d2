use paste::paste;

use super::*;

/// A value exposed by [`SegmentBody::attributes`], used by attribute
/// filters and attribute extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrValue<'a> {
    U8(u8),
    U16(u16),
    Bytes(&'a [u8]),
    Id(&'a ObjectID),
}

impl AttrValue<'_> {
    pub fn as_int(&self) -> Option<u64> {
        match self {
            AttrValue::U8(v) => Some(*v as u64),
            AttrValue::U16(v) => Some(*v as u64),
            _ => None,
        }
    }

    /// Raw bytes written when the attribute is extracted.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            AttrValue::U8(v) => vec![*v],
            AttrValue::U16(v) => v.to_le_bytes().to_vec(),
            AttrValue::Bytes(b) => b.to_vec(),
            AttrValue::Id(id) => id.pack().to_vec(),
        }
    }
}

impl std::fmt::Display for AttrValue<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttrValue::U8(v) => write!(f, "{v:#x}"),
            AttrValue::U16(v) => write!(f, "{v:#x}"),
            AttrValue::Bytes(b) => write!(f, "{}", hex_bytes(b)),
            AttrValue::Id(id) => write!(f, "{id}"),
        }
    }
}

pub(crate) fn hex_bytes(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn not_empty(data: &[u8]) -> Option<Vec<u8>> {
    if data.is_empty() {
        None
    } else {
        Some(data.to_vec())
    }
}

/// Reads from the cursor to the end, insisting on at least one byte.
fn read_rest<'a>(reader: &mut Reader<'a>) -> Result<&'a [u8]> {
    if !reader.is_more() {
        return Err(StageError::Eof {
            wanted: 1,
            available: 0,
        });
    }
    Ok(reader.read_to_end())
}

fn read_triple(reader: &mut Reader<'_>) -> Result<[u8; 3]> {
    Ok(reader.read(3)?.try_into().unwrap())
}

/// The prefix-selected call target shared by the call segments. With
/// prefix 0x0d the target is an object id (optionally trailed by a
/// parameter blob); with 0x0f it is a counted parameter blob. Anything
/// else is malformed.
fn unpack_call(
    reader: &mut Reader<'_>,
    prefix: u8,
    id: &mut Option<ObjectID>,
    parm_length: &mut Option<u16>,
    parm: &mut Option<Vec<u8>>,
    parm_after_id: bool,
) -> Result<()> {
    match prefix {
        0x0d => {
            *id = Some(reader.read_object_id()?);
            if parm_after_id {
                *parm = not_empty(reader.read_to_end());
            }
        }
        0x0f => {
            let length = reader.read_u16()?;
            *parm_length = Some(length);
            *parm = not_empty(reader.read(length as usize)?);
        }
        other => {
            return Err(StageError::SegmentData(format!(
                "prefix={other}, data=[{}]",
                hex_bytes(reader.read_to_end())
            )));
        }
    }
    Ok(())
}

/// Program call: run a program on an event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgramCall {
    pub event: Option<u8>,
    pub prefix: Option<u8>,
    pub id: Option<ObjectID>,
    pub parm_length: Option<u16>,
    pub parm: Option<Vec<u8>>,
}

impl ProgramCall {
    fn unpack(&mut self, reader: &mut Reader<'_>) -> Result<()> {
        self.event = Some(reader.read_u8()?);
        let prefix = reader.read_u8()?;
        self.prefix = Some(prefix);
        unpack_call(
            reader,
            prefix,
            &mut self.id,
            &mut self.parm_length,
            &mut self.parm,
            true,
        )
    }

    fn attributes(&self) -> Vec<(&'static str, AttrValue<'_>)> {
        let mut attrs = Vec::new();
        push_u8(&mut attrs, "event", self.event);
        push_u8(&mut attrs, "prefix", self.prefix);
        push_id(&mut attrs, "id", &self.id);
        push_u16(&mut attrs, "parm_length", self.parm_length);
        push_bytes(&mut attrs, "parm", &self.parm);
        attrs
    }
}

/// Program call bound to a field of the current page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldProgramCall {
    pub event: Option<u8>,
    pub field: Option<u8>,
    pub prefix: Option<u8>,
    pub id: Option<ObjectID>,
    pub parm_length: Option<u16>,
    pub parm: Option<Vec<u8>>,
}

impl FieldProgramCall {
    fn unpack(&mut self, reader: &mut Reader<'_>) -> Result<()> {
        self.event = Some(reader.read_u8()?);
        self.field = Some(reader.read_u8()?);
        let prefix = reader.read_u8()?;
        self.prefix = Some(prefix);
        unpack_call(
            reader,
            prefix,
            &mut self.id,
            &mut self.parm_length,
            &mut self.parm,
            true,
        )
    }

    fn attributes(&self) -> Vec<(&'static str, AttrValue<'_>)> {
        let mut attrs = Vec::new();
        push_u8(&mut attrs, "event", self.event);
        push_u8(&mut attrs, "field", self.field);
        push_u8(&mut attrs, "prefix", self.prefix);
        push_id(&mut attrs, "id", &self.id);
        push_u16(&mut attrs, "parm_length", self.parm_length);
        push_bytes(&mut attrs, "parm", &self.parm);
        attrs
    }
}

/// Composition descriptor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompDesc {
    pub table_num: Option<u8>,
    pub length1: Option<u16>,
    pub length2: Option<u16>,
}

impl CompDesc {
    fn unpack(&mut self, reader: &mut Reader<'_>) -> Result<()> {
        self.table_num = Some(reader.read_u8()?);
        self.length1 = Some(reader.read_u16()?);
        if reader.is_more() {
            self.length2 = Some(reader.read_u16()?);
        }
        Ok(())
    }

    fn attributes(&self) -> Vec<(&'static str, AttrValue<'_>)> {
        let mut attrs = Vec::new();
        push_u8(&mut attrs, "table_num", self.table_num);
        push_u16(&mut attrs, "length1", self.length1);
        push_u16(&mut attrs, "length2", self.length2);
        attrs
    }
}

/// Page field definition. The trailing text/cursor fields appear only in
/// some revisions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldDef {
    pub attributes: Option<u16>,
    pub origin: Option<[u8; 3]>,
    pub size: Option<[u8; 3]>,
    pub name: Option<u8>,
    pub text_id: Option<u8>,
    pub cursor_id: Option<u8>,
    pub cursor_origin: Option<[u8; 3]>,
}

impl FieldDef {
    fn unpack(&mut self, reader: &mut Reader<'_>) -> Result<()> {
        self.attributes = Some(reader.read_u16()?);
        self.origin = Some(read_triple(reader)?);
        self.size = Some(read_triple(reader)?);
        self.name = Some(reader.read_u8()?);
        if reader.is_more() {
            self.text_id = Some(reader.read_u8()?);
        }
        if reader.is_more() {
            self.cursor_id = Some(reader.read_u8()?);
        }
        if reader.is_more() {
            self.cursor_origin = Some(read_triple(reader)?);
        }
        Ok(())
    }

    fn attributes(&self) -> Vec<(&'static str, AttrValue<'_>)> {
        let mut attrs = Vec::new();
        push_u16(&mut attrs, "attributes", self.attributes);
        push_triple(&mut attrs, "origin", &self.origin);
        push_triple(&mut attrs, "size", &self.size);
        push_u8(&mut attrs, "name", self.name);
        push_u8(&mut attrs, "text_id", self.text_id);
        push_u8(&mut attrs, "cursor_id", self.cursor_id);
        push_triple(&mut attrs, "cursor_origin", &self.cursor_origin);
        attrs
    }
}

/// Repeated-field (array) definition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArrayDef {
    pub occurrences: Option<u8>,
    pub vertical_gap: Option<[u8; 3]>,
    pub field_name: Option<Vec<u8>>,
}

impl ArrayDef {
    fn unpack(&mut self, reader: &mut Reader<'_>) -> Result<()> {
        self.occurrences = Some(reader.read_u8()?);
        self.vertical_gap = Some(read_triple(reader)?);
        self.field_name = Some(read_rest(reader)?.to_vec());
        Ok(())
    }

    fn attributes(&self) -> Vec<(&'static str, AttrValue<'_>)> {
        let mut attrs = Vec::new();
        push_u8(&mut attrs, "occurrences", self.occurrences);
        push_triple(&mut attrs, "vertical_gap", &self.vertical_gap);
        push_bytes(&mut attrs, "field_name", &self.field_name);
        attrs
    }
}

/// Custom text style; the payload is NAPLPS, passed through opaque.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomTextDef {
    pub id: Option<u8>,
    pub naplps: Option<Vec<u8>>,
}

impl CustomTextDef {
    fn unpack(&mut self, reader: &mut Reader<'_>) -> Result<()> {
        self.id = Some(reader.read_u8()?);
        self.naplps = Some(read_rest(reader)?.to_vec());
        Ok(())
    }

    fn attributes(&self) -> Vec<(&'static str, AttrValue<'_>)> {
        let mut attrs = Vec::new();
        push_u8(&mut attrs, "id", self.id);
        push_bytes(&mut attrs, "naplps", &self.naplps);
        attrs
    }
}

/// Custom cursor shape; NAPLPS payload, opaque.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomCursorDef {
    pub id: Option<u8>,
    pub size: Option<[u8; 3]>,
    pub naplps: Option<Vec<u8>>,
}

impl CustomCursorDef {
    fn unpack(&mut self, reader: &mut Reader<'_>) -> Result<()> {
        self.id = Some(reader.read_u8()?);
        self.size = Some(read_triple(reader)?);
        self.naplps = Some(read_rest(reader)?.to_vec());
        Ok(())
    }

    fn attributes(&self) -> Vec<(&'static str, AttrValue<'_>)> {
        let mut attrs = Vec::new();
        push_u8(&mut attrs, "id", self.id);
        push_triple(&mut attrs, "size", &self.size);
        push_bytes(&mut attrs, "naplps", &self.naplps);
        attrs
    }
}

/// Selector call attached to a page partition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectorCall {
    pub part_id: Option<u8>,
    pub priority: Option<u8>,
    pub prefix: Option<u8>,
    pub id: Option<ObjectID>,
    pub parm_length: Option<u16>,
    pub parm: Option<Vec<u8>>,
}

impl SelectorCall {
    fn unpack(&mut self, reader: &mut Reader<'_>) -> Result<()> {
        self.part_id = Some(reader.read_u8()?);
        self.priority = Some(reader.read_u8()?);
        let prefix = reader.read_u8()?;
        self.prefix = Some(prefix);
        unpack_call(
            reader,
            prefix,
            &mut self.id,
            &mut self.parm_length,
            &mut self.parm,
            true,
        )
    }

    fn attributes(&self) -> Vec<(&'static str, AttrValue<'_>)> {
        let mut attrs = Vec::new();
        push_u8(&mut attrs, "part_id", self.part_id);
        push_u8(&mut attrs, "priority", self.priority);
        push_u8(&mut attrs, "prefix", self.prefix);
        push_id(&mut attrs, "id", &self.id);
        push_u16(&mut attrs, "parm_length", self.parm_length);
        push_bytes(&mut attrs, "parm", &self.parm);
        attrs
    }
}

/// Element call. Unlike the other call segments, the 0x0d form carries no
/// trailing parameter blob.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementCall {
    pub part_id: Option<u8>,
    pub priority: Option<u8>,
    pub prefix: Option<u8>,
    pub id: Option<ObjectID>,
    pub parm_length: Option<u16>,
    pub parm: Option<Vec<u8>>,
}

impl ElementCall {
    fn unpack(&mut self, reader: &mut Reader<'_>) -> Result<()> {
        self.part_id = Some(reader.read_u8()?);
        self.priority = Some(reader.read_u8()?);
        let prefix = reader.read_u8()?;
        self.prefix = Some(prefix);
        unpack_call(
            reader,
            prefix,
            &mut self.id,
            &mut self.parm_length,
            &mut self.parm,
            false,
        )
    }

    fn attributes(&self) -> Vec<(&'static str, AttrValue<'_>)> {
        let mut attrs = Vec::new();
        push_u8(&mut attrs, "part_id", self.part_id);
        push_u8(&mut attrs, "priority", self.priority);
        push_u8(&mut attrs, "prefix", self.prefix);
        push_id(&mut attrs, "id", &self.id);
        push_u16(&mut attrs, "parm_length", self.parm_length);
        push_bytes(&mut attrs, "parm", &self.parm);
        attrs
    }
}

/// Inventory control. No corroborated sample of this segment has turned
/// up yet; the layout is best-effort.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InventoryCtl {
    pub ctl_type: Option<u8>,
    pub number: Option<u16>,
    pub subnumber: Option<u16>,
}

impl InventoryCtl {
    fn unpack(&mut self, reader: &mut Reader<'_>) -> Result<()> {
        self.ctl_type = Some(reader.read_u8()?);
        self.number = Some(reader.read_u16()?);
        if reader.is_more() {
            self.subnumber = Some(reader.read_u16()?);
        }
        Ok(())
    }

    fn attributes(&self) -> Vec<(&'static str, AttrValue<'_>)> {
        let mut attrs = Vec::new();
        push_u8(&mut attrs, "ctl_type", self.ctl_type);
        push_u16(&mut attrs, "number", self.number);
        push_u16(&mut attrs, "subnumber", self.subnumber);
        attrs
    }
}

/// Page format call; 0x0d names the format object, 0x0f inlines it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageFormatCall {
    pub prefix: Option<u8>,
    pub id: Option<ObjectID>,
    pub parm_length: Option<u16>,
    pub parm: Option<Vec<u8>>,
}

impl PageFormatCall {
    fn unpack(&mut self, reader: &mut Reader<'_>) -> Result<()> {
        let prefix = reader.read_u8()?;
        self.prefix = Some(prefix);
        unpack_call(
            reader,
            prefix,
            &mut self.id,
            &mut self.parm_length,
            &mut self.parm,
            false,
        )
    }

    fn attributes(&self) -> Vec<(&'static str, AttrValue<'_>)> {
        let mut attrs = Vec::new();
        push_u8(&mut attrs, "prefix", self.prefix);
        push_id(&mut attrs, "id", &self.id);
        push_u16(&mut attrs, "parm_length", self.parm_length);
        push_bytes(&mut attrs, "parm", &self.parm);
        attrs
    }
}

/// Default page format. Best-effort layout, no samples.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageFormatDefault {
    pub naplps: Option<Vec<u8>>,
}

impl PageFormatDefault {
    fn unpack(&mut self, reader: &mut Reader<'_>) -> Result<()> {
        self.naplps = Some(read_rest(reader)?.to_vec());
        Ok(())
    }

    fn attributes(&self) -> Vec<(&'static str, AttrValue<'_>)> {
        let mut attrs = Vec::new();
        push_bytes(&mut attrs, "naplps", &self.naplps);
        attrs
    }
}

/// Page partition definition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartitionDef {
    pub part_id: Option<u8>,
    pub origin: Option<[u8; 3]>,
    pub size: Option<[u8; 3]>,
    pub naplps: Option<Vec<u8>>,
}

impl PartitionDef {
    fn unpack(&mut self, reader: &mut Reader<'_>) -> Result<()> {
        self.part_id = Some(reader.read_u8()?);
        self.origin = Some(read_triple(reader)?);
        self.size = Some(read_triple(reader)?);
        if reader.is_more() {
            self.naplps = Some(reader.read_to_end().to_vec());
        }
        Ok(())
    }

    fn attributes(&self) -> Vec<(&'static str, AttrValue<'_>)> {
        let mut attrs = Vec::new();
        push_u8(&mut attrs, "part_id", self.part_id);
        push_triple(&mut attrs, "origin", &self.origin);
        push_triple(&mut attrs, "size", &self.size);
        push_bytes(&mut attrs, "naplps", &self.naplps);
        attrs
    }
}

/// Presentation data, typically NAPLPS display lists.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PresentationData {
    pub data_type: Option<u8>,
    pub size: Option<[u8; 3]>,
    pub data: Option<Vec<u8>>,
}

impl PresentationData {
    fn unpack(&mut self, reader: &mut Reader<'_>) -> Result<()> {
        self.data_type = Some(reader.read_u8()?);
        self.size = Some(read_triple(reader)?);
        self.data = Some(read_rest(reader)?.to_vec());
        Ok(())
    }

    fn attributes(&self) -> Vec<(&'static str, AttrValue<'_>)> {
        let mut attrs = Vec::new();
        push_u8(&mut attrs, "data_type", self.data_type);
        push_triple(&mut attrs, "size", &self.size);
        push_bytes(&mut attrs, "data", &self.data);
        attrs
    }
}

/// A whole object nested inside a segment. The payload is an [`Object`]
/// (header and all); its own payload can be parsed with another pass of
/// the factory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImbeddedObject {
    pub object: Option<Object>,
}

impl ImbeddedObject {
    fn unpack(&mut self, reader: &mut Reader<'_>) -> Result<()> {
        self.object = Some(Object::unpack(reader.read_to_end())?);
        Ok(())
    }

    fn attributes(&self) -> Vec<(&'static str, AttrValue<'_>)> {
        match &self.object {
            Some(object) => vec![("id", AttrValue::Id(&object.id))],
            None => Vec::new(),
        }
    }
}

/// Embedded element. No samples; opaque payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImbeddedElement {
    pub data: Option<Vec<u8>>,
}

impl ImbeddedElement {
    fn unpack(&mut self, reader: &mut Reader<'_>) -> Result<()> {
        self.data = Some(read_rest(reader)?.to_vec());
        Ok(())
    }

    fn attributes(&self) -> Vec<(&'static str, AttrValue<'_>)> {
        let mut attrs = Vec::new();
        push_bytes(&mut attrs, "data", &self.data);
        attrs
    }
}

/// Program data blob handed to a called program.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgramData {
    pub data_type: Option<u8>,
    pub data: Option<Vec<u8>>,
}

impl ProgramData {
    fn unpack(&mut self, reader: &mut Reader<'_>) -> Result<()> {
        self.data_type = Some(reader.read_u8()?);
        self.data = Some(read_rest(reader)?.to_vec());
        Ok(())
    }

    fn attributes(&self) -> Vec<(&'static str, AttrValue<'_>)> {
        let mut attrs = Vec::new();
        push_u8(&mut attrs, "data_type", self.data_type);
        push_bytes(&mut attrs, "data", &self.data);
        attrs
    }
}

/// Navigation record. The patent's layout disagrees with the files in the
/// wild, so the payload stays opaque.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Navigate {
    pub data: Option<Vec<u8>>,
}

impl Navigate {
    fn unpack(&mut self, reader: &mut Reader<'_>) -> Result<()> {
        self.data = Some(read_rest(reader)?.to_vec());
        Ok(())
    }

    fn attributes(&self) -> Vec<(&'static str, AttrValue<'_>)> {
        let mut attrs = Vec::new();
        push_bytes(&mut attrs, "data", &self.data);
        attrs
    }
}

/// Catch-all for unrecognized segment types; the raw bytes live on the
/// enclosing [`Segment`](crate::Segment).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Unknown;

impl Unknown {
    fn unpack(&mut self, _reader: &mut Reader<'_>) -> Result<()> {
        Ok(())
    }

    fn attributes(&self) -> Vec<(&'static str, AttrValue<'_>)> {
        Vec::new()
    }
}

fn push_u8<'a>(attrs: &mut Vec<(&'static str, AttrValue<'a>)>, name: &'static str, v: Option<u8>) {
    if let Some(v) = v {
        attrs.push((name, AttrValue::U8(v)));
    }
}

fn push_u16<'a>(
    attrs: &mut Vec<(&'static str, AttrValue<'a>)>,
    name: &'static str,
    v: Option<u16>,
) {
    if let Some(v) = v {
        attrs.push((name, AttrValue::U16(v)));
    }
}

fn push_bytes<'a>(
    attrs: &mut Vec<(&'static str, AttrValue<'a>)>,
    name: &'static str,
    v: &'a Option<Vec<u8>>,
) {
    if let Some(v) = v {
        attrs.push((name, AttrValue::Bytes(v)));
    }
}

fn push_triple<'a>(
    attrs: &mut Vec<(&'static str, AttrValue<'a>)>,
    name: &'static str,
    v: &'a Option<[u8; 3]>,
) {
    if let Some(v) = v {
        attrs.push((name, AttrValue::Bytes(v)));
    }
}

fn push_id<'a>(
    attrs: &mut Vec<(&'static str, AttrValue<'a>)>,
    name: &'static str,
    v: &'a Option<ObjectID>,
) {
    if let Some(v) = v {
        attrs.push((name, AttrValue::Id(v)));
    }
}

/// The segment dispatch table in one place: type byte, variant, payload
/// record. Anything not listed lands on [`Unknown`].
macro_rules! segment_table {
    ($(($value:literal, $name:ident)),* $(,)?) => {
        /// Segment type discriminant, keyed by the header's `st` byte.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum SegmentKind {
            $($name,)*
            Unknown,
        }

        impl SegmentKind {
            pub fn from_type(st: u8) -> SegmentKind {
                match st {
                    $($value => SegmentKind::$name,)*
                    _ => SegmentKind::Unknown,
                }
            }

            /// The `st` byte this kind decodes from, `None` for the
            /// catch-all.
            pub fn type_value(&self) -> Option<u8> {
                match self {
                    $(SegmentKind::$name => Some($value),)*
                    SegmentKind::Unknown => None,
                }
            }

            pub fn name(&self) -> &'static str {
                match self {
                    $(SegmentKind::$name => stringify!($name),)*
                    SegmentKind::Unknown => "Unknown",
                }
            }

            /// Every recognized kind, in type-byte order, catch-all last.
            pub fn all() -> &'static [SegmentKind] {
                &[
                    $(SegmentKind::$name,)*
                    SegmentKind::Unknown,
                ]
            }
        }

        /// Typed payload of a segment, one variant per recognized kind.
        #[derive(Debug, Clone, PartialEq)]
        pub enum SegmentBody {
            $($name($name),)*
            Unknown(Unknown),
        }

        impl SegmentBody {
            /// A default-initialized body for `kind`; fields fill in as
            /// [`unpack`](Self::unpack) progresses.
            pub fn new(kind: SegmentKind) -> SegmentBody {
                match kind {
                    $(SegmentKind::$name => SegmentBody::$name($name::default()),)*
                    SegmentKind::Unknown => SegmentBody::Unknown(Unknown),
                }
            }

            pub fn kind(&self) -> SegmentKind {
                match self {
                    $(SegmentBody::$name(_) => SegmentKind::$name,)*
                    SegmentBody::Unknown(_) => SegmentKind::Unknown,
                }
            }

            /// Decodes the payload bytes (the slice after the 3-byte
            /// header). On failure the fields read so far remain set.
            pub fn unpack(&mut self, data: &[u8]) -> Result<()> {
                let mut reader = Reader::new(data, true);
                match self {
                    $(SegmentBody::$name(body) => body.unpack(&mut reader),)*
                    SegmentBody::Unknown(body) => body.unpack(&mut reader),
                }
            }

            pub fn attributes(&self) -> Vec<(&'static str, AttrValue<'_>)> {
                match self {
                    $(SegmentBody::$name(body) => body.attributes(),)*
                    SegmentBody::Unknown(body) => body.attributes(),
                }
            }

            paste! {
                $(
                    pub fn [<as_ $name:snake>](&self) -> Option<&$name> {
                        match self {
                            SegmentBody::$name(body) => Some(body),
                            _ => None,
                        }
                    }
                )*
            }
        }
    };
}

segment_table! {
    (0x01, ProgramCall),
    (0x02, FieldProgramCall),
    (0x03, CompDesc),
    (0x04, FieldDef),
    (0x05, ArrayDef),
    (0x0a, CustomTextDef),
    (0x0b, CustomCursorDef),
    (0x20, SelectorCall),
    (0x21, ElementCall),
    (0x26, InventoryCtl),
    (0x31, PageFormatCall),
    (0x32, PageFormatDefault),
    (0x33, PartitionDef),
    (0x51, PresentationData),
    (0x52, ImbeddedObject),
    (0x53, ImbeddedElement),
    (0x61, ProgramData),
    (0x71, Navigate),
}
