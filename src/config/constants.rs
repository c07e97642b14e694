//! # Cursor Window Configuration Constants
//!
//! This module centralizes the sizing constants for windows, parcels and the
//! window memory budget. Constants that depend on each other are co-located and
//! their relationships are enforced through compile-time assertions.
//!
//! ## Dependency Graph
//!
//! ```text
//! WINDOW_HEADER_SIZE (32 bytes)
//!       │
//!       ├─> MIN_WINDOW_CAPACITY (must be >=)
//!       │     A window must at least hold its own header.
//!       │
//!       └─> DEFAULT_WINDOW_CAPACITY (2 MiB)
//!
//! FIELD_SLOT_SIZE (12 bytes) + ROW_DIRECTORY_ENTRY_SIZE (4 bytes)
//!       │
//!       └─> row_footprint(n) = ROW_DIRECTORY_ENTRY_SIZE + n * FIELD_SLOT_SIZE
//!             Bytes `alloc_row` needs for a row of `n` columns, excluding
//!             string and blob payloads.
//!
//! MAX_WINDOW_CAPACITY (u32::MAX)
//!       │
//!       └─> All in-buffer offsets are u32, so no window may exceed it.
//!
//! FILL_LOOKBEHIND_DIVISOR (3)
//!       │
//!       └─> A windowed cursor refills starting a third of a page before the
//!           requested row so that short backward moves stay in the page.
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use crate::config::{DEFAULT_WINDOW_CAPACITY, FIELD_SLOT_SIZE};
//! ```

// ============================================================================
// WINDOW LAYOUT
// The packed binary layout shared by every window buffer
// ============================================================================

/// Size of the header at the start of every window buffer.
pub const WINDOW_HEADER_SIZE: usize = 32;

/// Size of one typed cell: 1 type byte, 3 reserved bytes, 8 payload bytes.
pub const FIELD_SLOT_SIZE: usize = 12;

/// Size of one row directory entry (u32 offset of the row's slot array).
pub const ROW_DIRECTORY_ENTRY_SIZE: usize = 4;

/// Default capacity of a freshly built window (2 MiB).
pub const DEFAULT_WINDOW_CAPACITY: usize = 2 * 1024 * 1024;

/// Smallest accepted window capacity. Such a window holds no rows.
pub const MIN_WINDOW_CAPACITY: usize = WINDOW_HEADER_SIZE;

/// Largest accepted window capacity; offsets inside a window are u32.
pub const MAX_WINDOW_CAPACITY: usize = u32::MAX as usize;

/// Magic bytes written at the start of every window buffer.
pub const WINDOW_MAGIC: &[u8; 8] = b"TurWin\x00\x01";

const _: () = assert!(
    MIN_WINDOW_CAPACITY >= WINDOW_HEADER_SIZE,
    "a window must be able to hold its own header"
);

const _: () = assert!(
    DEFAULT_WINDOW_CAPACITY <= MAX_WINDOW_CAPACITY,
    "DEFAULT_WINDOW_CAPACITY must fit in u32 offsets"
);

/// Bytes `alloc_row` reserves for a row of `num_columns` cells.
pub const fn row_footprint(num_columns: usize) -> usize {
    ROW_DIRECTORY_ENTRY_SIZE + num_columns * FIELD_SLOT_SIZE
}

// ============================================================================
// CROSS-PROCESS TRANSFER
// ============================================================================

/// Size of a serialized window parcel.
pub const PARCEL_SIZE: usize = 32;

/// Magic bytes identifying a window parcel.
pub const PARCEL_MAGIC: &[u8; 8] = b"TurPcl\x00\x01";

// ============================================================================
// WINDOW MEMORY BUDGET
// ============================================================================

/// Default budget for all live windows as percentage of system RAM.
pub const DEFAULT_BUDGET_PERCENT: usize = 25;

/// Minimum budget floor in bytes (4 MiB). Enough for two default windows.
pub const MIN_BUDGET_FLOOR: usize = 4 * 1024 * 1024;

const _: () = assert!(
    MIN_BUDGET_FLOOR >= 2 * DEFAULT_WINDOW_CAPACITY,
    "the budget floor must admit at least two default windows"
);

// ============================================================================
// WINDOWED CURSOR PAGING
// ============================================================================

/// Fraction of a page placed before the requested row on refill.
pub const FILL_LOOKBEHIND_DIVISOR: usize = 3;

/// Number of live windows per owner above which the tracker flags a leak.
pub const LEAK_WARNING_THRESHOLD: usize = 64;
