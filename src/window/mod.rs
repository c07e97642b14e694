//! # Row Windows
//!
//! A [`RowWindow`] is a fixed-capacity buffer holding a contiguous slice of a
//! larger row sequence. Rows are appended with an allocate-then-fill protocol
//! and every cell carries its own type tag. The absolute position of a row is
//! `start_position + local_index`.
//!
//! ## Filling
//!
//! ```ignore
//! let window = RowWindow::builder().name("q").capacity(64 * 1024).build()?;
//! window.set_num_columns(2);
//! window.set_start_position(100)?;
//! for row in rows {
//!     if !window.alloc_row() {
//!         break; // window full
//!     }
//!     let pos = window.start_position() + window.num_rows() - 1;
//!     if !window.put_string(&row.name, pos, 0)? || !window.put_long(row.id, pos, 1)? {
//!         window.free_last_row();
//!         break;
//!     }
//! }
//! ```
//!
//! Capacity exhaustion is reported through `false` returns and is the normal
//! way a fill ends. Addressing a row or column outside the window is an error,
//! and using a window whose storage was already released panics.
//!
//! ## Sharing
//!
//! Handles are reference counted (see [`reference`]). Cloning a handle with
//! [`RowWindow::share`] or attaching one from a parcel (see [`parcel`]) adds a
//! reference; the storage is freed when the last reference is released.
//!
//! ## Module Structure
//!
//! - `layout`: zerocopy header and field slot structs
//! - `storage`: packed buffer and raw row/cell operations
//! - `reference`: shared state, atomic reference count, scoped guards
//! - `registry`: diagnostics hook for window lifecycle
//! - `builder`: `WindowBuilder`
//! - `parcel`: cross-process transfer by handle
//! - `window`: the public `RowWindow` handle and typed accessors

mod builder;
pub mod layout;
pub mod parcel;
pub mod reference;
pub mod registry;
mod storage;
#[allow(clippy::module_inception)]
mod window;


use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::types::FieldType;

pub use builder::WindowBuilder;
pub use parcel::{HandleTable, WindowHandle, WindowParcel};
pub use reference::ReferenceGuard;
pub use registry::{NoopRegistry, OwnerTracker, WindowInfo, WindowRegistry};
pub use window::RowWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(pub u64);

static NEXT_WINDOW_ID: AtomicU64 = AtomicU64::new(1);

impl WindowId {
    pub(crate) fn next() -> Self {
        WindowId(NEXT_WINDOW_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WindowError {
    OutOfBounds {
        row: usize,
        column: usize,
        start_position: usize,
        num_rows: usize,
        num_columns: usize,
    },
    TypeMismatch {
        row: usize,
        column: usize,
        stored: FieldType,
        requested: &'static str,
    },
    InvalidCapacity {
        requested: usize,
    },
    InvalidStartPosition {
        requested: usize,
        current: usize,
    },
    InvalidParcel(String),
    Released {
        name: String,
    },
}

impl fmt::Display for WindowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowError::OutOfBounds {
                row,
                column,
                start_position,
                num_rows,
                num_columns,
            } => write!(
                f,
                "couldn't read row {} column {} from window holding rows [{}, {}) with {} columns",
                row,
                column,
                start_position,
                start_position + num_rows,
                num_columns
            ),
            WindowError::TypeMismatch {
                row,
                column,
                stored,
                requested,
            } => write!(
                f,
                "cannot read {} at row {} column {} as {}",
                stored, row, column, requested
            ),
            WindowError::InvalidCapacity { requested } => write!(
                f,
                "window capacity {} is outside [{}, {}]",
                requested,
                crate::config::MIN_WINDOW_CAPACITY,
                crate::config::MAX_WINDOW_CAPACITY
            ),
            WindowError::InvalidStartPosition { requested, current } => write!(
                f,
                "cannot move start position from {} back to {} while rows are allocated",
                current, requested
            ),
            WindowError::InvalidParcel(reason) => write!(f, "invalid window parcel: {}", reason),
            WindowError::Released { name } => {
                write!(f, "window {} has already been released", name)
            }
        }
    }
}

impl std::error::Error for WindowError {}
