//! # Window Buffer Layout
//!
//! Zerocopy structs for the two fixed-size records inside a window buffer: the
//! 32-byte header at offset 0 and the 12-byte field slot describing one cell.
//!
//! ## Header Layout (32 bytes)
//!
//! ```text
//! Offset  Size  Field        Description
//! ------  ----  -----------  ----------------------------------------
//! 0       8     magic        "TurWin\0\x01"
//! 8       4     capacity     Total buffer size in bytes
//! 12      4     num_rows     Rows currently allocated
//! 16      4     num_columns  Cells per row (fixed once a row exists)
//! 20      4     free_offset  First free byte of the upward-growing area
//! 24      4     dir_offset   Lowest byte of the downward-growing row directory
//! 28      4     flags        HEADER_FLAG_* bits
//! ```
//!
//! ## Field Slot Layout (12 bytes)
//!
//! ```text
//! Offset  Size  Field        Description
//! ------  ----  -----------  ----------------------------------------
//! 0       1     field_type   FieldType tag (0 = NULL)
//! 1       3     reserved
//! 4       8     payload      INTEGER: i64 bits, FLOAT: f64 bits,
//!                            STRING/BLOB: offset | (size << 32)
//! ```
//!
//! All multi-byte fields are little-endian and unaligned, so a buffer can be
//! handed between processes on any platform the crate builds for.

use zerocopy::little_endian::{U32, U64};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::config::{FIELD_SLOT_SIZE, WINDOW_HEADER_SIZE, WINDOW_MAGIC};
use crate::types::FieldType;

/// The most recently allocated row owns every byte above its slot array.
pub const HEADER_FLAG_TAIL_RECLAIMABLE: u32 = 0x1;

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct WindowHeader {
    magic: [u8; 8],
    capacity: U32,
    num_rows: U32,
    num_columns: U32,
    free_offset: U32,
    dir_offset: U32,
    flags: U32,
}

const _: () = assert!(std::mem::size_of::<WindowHeader>() == WINDOW_HEADER_SIZE);

impl WindowHeader {
    pub fn new(capacity: u32) -> Self {
        Self {
            magic: *WINDOW_MAGIC,
            capacity: U32::new(capacity),
            num_rows: U32::new(0),
            num_columns: U32::new(0),
            free_offset: U32::new(WINDOW_HEADER_SIZE as u32),
            dir_offset: U32::new(capacity),
            flags: U32::new(0),
        }
    }

    pub fn has_valid_magic(&self) -> bool {
        &self.magic == WINDOW_MAGIC
    }

    zerocopy_accessors! {
        capacity: u32,
        num_rows: u32,
        num_columns: u32,
        free_offset: u32,
        dir_offset: u32,
        flags: u32,
    }

    pub fn has_flag(&self, flag: u32) -> bool {
        self.flags() & flag != 0
    }

    pub fn set_flag(&mut self, flag: u32, on: bool) {
        let flags = if on {
            self.flags() | flag
        } else {
            self.flags() & !flag
        };
        self.set_flags(flags);
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct FieldSlot {
    field_type: u8,
    reserved: [u8; 3],
    payload: U64,
}

const _: () = assert!(std::mem::size_of::<FieldSlot>() == FIELD_SLOT_SIZE);

impl FieldSlot {
    pub fn null() -> Self {
        Self {
            field_type: FieldType::Null.as_byte(),
            reserved: [0; 3],
            payload: U64::new(0),
        }
    }

    pub fn integer(value: i64) -> Self {
        Self {
            field_type: FieldType::Integer.as_byte(),
            reserved: [0; 3],
            payload: U64::new(value as u64),
        }
    }

    pub fn float(value: f64) -> Self {
        Self {
            field_type: FieldType::Float.as_byte(),
            reserved: [0; 3],
            payload: U64::new(value.to_bits()),
        }
    }

    pub fn variable(field_type: FieldType, offset: u32, size: u32) -> Self {
        debug_assert!(field_type.is_variable());
        Self {
            field_type: field_type.as_byte(),
            reserved: [0; 3],
            payload: U64::new(u64::from(offset) | (u64::from(size) << 32)),
        }
    }

    /// Raw tag byte; `None` from `FieldType::from_byte` means corruption.
    pub fn type_byte(&self) -> u8 {
        self.field_type
    }

    pub fn as_integer(&self) -> i64 {
        self.payload.get() as i64
    }

    pub fn as_float(&self) -> f64 {
        f64::from_bits(self.payload.get())
    }

    /// `(offset, size)` of a STRING or BLOB payload.
    pub fn variable_bounds(&self) -> (usize, usize) {
        let raw = self.payload.get();
        ((raw & 0xFFFF_FFFF) as usize, (raw >> 32) as usize)
    }
}
