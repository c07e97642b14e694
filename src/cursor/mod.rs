//! # Positioned Cursors
//!
//! A [`PositionedCursor`] walks a row sequence of known size by absolute
//! position. Rows come from a [`RowSource`]; the cursor owns the position
//! state machine, column lookup, observer bookkeeping and the bulk
//! [`fill_window`](PositionedCursor::fill_window) operation.
//!
//! ## States
//!
//! ```text
//!              move_to_position(p)
//!   BEFORE_FIRST  <-------------->  POSITIONED  <-------------->  AFTER_LAST
//!   position -1                     0 <= p < count                position == count
//!        \                              |                              /
//!         +------------------------ close() -------------------------+
//!                                       v
//!                                    CLOSED
//! ```
//!
//! `move_to_position` is the only path that changes the position; every other
//! move is defined in terms of it. Reading a column while not positioned fails
//! with [`CursorError::IndexOutOfBounds`].
//!
//! ## Windowed Sources
//!
//! [`WindowedSource`] pages a [`RowProducer`] through a single
//! [`RowWindow`](crate::window::RowWindow), refilling it whenever the cursor
//! moves outside the rows it holds.

#[allow(clippy::module_inception)]
mod cursor;
pub mod observer;
mod producer;
mod source;
mod windowed;

use std::fmt;

pub use cursor::{FillOutcome, FillReport, PositionedCursor};
pub use observer::{
    ChangeNotifier, ContentObservable, ContentObserver, DataSetObservable, DataSetObserver,
    LocalChangeNotifier,
};
pub use producer::MemoryProducer;
pub use source::RowSource;
pub use windowed::{fill_from_producer, ProducerFill, RowProducer, WindowedSource};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CursorError {
    Closed,
    IndexOutOfBounds { position: isize, count: usize },
    ColumnNotFound(String),
    ObserverAlreadyRegistered,
    ObserverNotRegistered,
}

impl fmt::Display for CursorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CursorError::Closed => write!(f, "cursor is closed"),
            CursorError::IndexOutOfBounds { position, count } => write!(
                f,
                "index {} requested, with a size of {}",
                position, count
            ),
            CursorError::ColumnNotFound(name) => write!(f, "column '{}' does not exist", name),
            CursorError::ObserverAlreadyRegistered => write!(f, "observer is already registered"),
            CursorError::ObserverNotRegistered => write!(f, "observer was not registered"),
        }
    }
}

impl std::error::Error for CursorError {}
