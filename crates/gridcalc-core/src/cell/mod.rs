//! Cell addressing, values and raw content storage

mod address;
mod storage;
mod value;

pub use address::{CellAddress, CellRange};
pub(crate) use address::{parse_row_number, strip_anchor};
pub use storage::{CellData, CellStorage};
pub use value::{CellError, CellValue, SharedString};
