mod aum;
mod directory;
mod error;
mod factory;
mod filter;
mod hexdump;
mod object;
mod prologue;
mod reader;
mod records;
mod segments;
mod stagefile;

pub use aum::Aum;
pub use directory::{Directory, DirectoryEntry, ObjRef};
pub use error::{Result, StageError};
pub use factory::{Segment, SegmentFactory, SegmentIter, WalkEvent};
pub use filter::{
    parse_int, parse_ranges, AttrCond, AttributeFilter, ObjectFilter, SegmentFilter,
    SegmentSelector,
};
pub use hexdump::HexDump;
pub use object::Object;
pub use prologue::Prologue;
pub use reader::Reader;
pub use records::{Check, ObjectID, StartID, VersionID};
pub use segments::*;
pub use stagefile::{StageData, StageFile};

pub(crate) use records::trim_name;

#[cfg(test)]
pub(crate) use stagefile::fixture;
