//! # tally-core
//!
//! Cell addressing primitives shared by the tally crates.
//!
//! - [`CellAddress`] - a single cell in A1 notation (`A1`, `$B$2`, `.C3`)
//! - [`CellRange`] - a normalized rectangle of cells (`A1:B10`)
//!
//! ## Example
//!
//! ```rust
//! use tally_core::{CellAddress, CellRange};
//!
//! let addr = CellAddress::parse("B2").unwrap();
//! assert_eq!((addr.row, addr.col), (1, 1));
//!
//! let range = CellRange::parse("A1:B2").unwrap();
//! assert_eq!(range.cell_count(), 4);
//! ```

pub mod address;
pub mod error;

pub use address::{CellAddress, CellRange, CellRangeIterator};
pub use error::{Error, Result};

/// Maximum number of rows in a sheet
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a sheet
pub const MAX_COLS: u16 = 16_384;
