//! # turcursor - Windowed Cursors over Packed Row Buffers
//!
//! turcursor streams query results between a row producer and a
//! row-oriented consumer without materializing the whole result set. Rows
//! travel through fixed-capacity, reference-counted **row windows**; a
//! **positioned cursor** pages through them by absolute position.
//!
//! - **Bounded memory**: a window never grows; filling stops when it is full
//! - **Typed cells**: every cell carries its own type tag (NULL, INTEGER,
//!   FLOAT, STRING, BLOB) with well-defined coercions on read
//! - **Zero-copy sharing**: windows are shared by reference, within a process
//!   or across processes through a handle parcel
//!
//! ## Quick Start
//!
//! ```ignore
//! use turcursor::cursor::{MemoryProducer, PositionedCursor, WindowedSource};
//! use turcursor::window::RowWindow;
//!
//! let producer = MemoryProducer::new(["id", "name"], rows)?;
//! let source = WindowedSource::new(producer, RowWindow::builder().capacity(64 * 1024))?;
//! let mut cursor = PositionedCursor::new(source);
//!
//! while cursor.move_to_next() {
//!     println!("{} {:?}", cursor.get_long(0)?, cursor.get_string(1)?);
//! }
//! cursor.close();
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │   PositionedCursor (state machine,  │
//! │   observers, fill_window)           │
//! ├─────────────────────────────────────┤
//! │   RowSource  │  WindowedSource      │
//! │              │  + RowProducer       │
//! ├─────────────────────────────────────┤
//! │   RowWindow (typed put/get, refs)   │
//! ├─────────────────────────────────────┤
//! │   WindowStorage (packed layout)     │
//! ├─────────────────────────────────────┤
//! │   Heap buffer │ Anonymous mmap      │
//! └─────────────────────────────────────┘
//! ```
//!
//! ## Module Overview
//!
//! - [`window`]: row windows, reference counting, parcels, diagnostics
//! - [`cursor`]: positioned cursors, row sources, observers, paging
//! - [`types`]: cell type tags and values
//! - [`memory`]: the byte budget shared by live windows
//! - [`config`]: layout constants and defaults

#[macro_use]
mod macros;

pub mod config;
pub mod cursor;
pub mod memory;
pub mod types;
pub mod window;

pub use cursor::{CursorError, FillOutcome, FillReport, PositionedCursor, RowSource};
pub use memory::{WindowAllocationError, WindowBudget};
pub use types::{FieldType, OwnedValue, Value};
pub use window::{RowWindow, WindowBuilder, WindowError};
