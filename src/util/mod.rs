mod offset_vec;
mod ref_id;

pub use offset_vec::{Offset, OffsetVec, OffsetVecIntoIter, OffsetVecIter, Width};
pub use ref_id::RefId;
