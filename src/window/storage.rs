//! # Packed Window Storage
//!
//! `WindowStorage` owns the raw buffer of one window and implements the
//! allocate-then-fill protocol directly on the packed layout described in
//! [`layout`](super::layout). It knows nothing about start positions,
//! reference counts or coercions; rows are addressed by their local index.
//!
//! ## Space Management
//!
//! ```text
//! +------------------+ 0
//! | WindowHeader     |
//! +------------------+ 32
//! | slots, payloads  |  <- grows upward (free_offset)
//! +------------------+
//! | free space       |
//! +------------------+
//! | row directory    |  <- grows downward (dir_offset), u32 per row
//! +------------------+ capacity
//! ```
//!
//! Row `i`'s directory entry lives at `capacity - 4 * (i + 1)` and stores the
//! offset of its slot array. A value that does not fit returns `false`; it never
//! partially writes.
//!
//! ## Backing Memory
//!
//! Heap windows use a boxed slice. Shared windows use an anonymous shared
//! mapping from `memmap2`, which survives `fork` and can be handed to another
//! process together with a [`WindowParcel`](super::parcel::WindowParcel).

use eyre::{eyre, Result, WrapErr};
use memmap2::MmapMut;
use zerocopy::{FromBytes, IntoBytes};

use super::layout::{FieldSlot, WindowHeader, HEADER_FLAG_TAIL_RECLAIMABLE};
use super::WindowError;
use crate::config::{
    row_footprint, FIELD_SLOT_SIZE, MAX_WINDOW_CAPACITY, MIN_WINDOW_CAPACITY,
    ROW_DIRECTORY_ENTRY_SIZE, WINDOW_HEADER_SIZE,
};
use crate::types::{FieldType, Value};

enum Backing {
    Heap(Box<[u8]>),
    Shared(MmapMut),
}

impl Backing {
    fn bytes(&self) -> &[u8] {
        match self {
            Backing::Heap(buf) => buf,
            Backing::Shared(map) => map,
        }
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        match self {
            Backing::Heap(buf) => buf,
            Backing::Shared(map) => map,
        }
    }
}

pub(crate) struct WindowStorage {
    backing: Backing,
}

impl std::fmt::Debug for WindowStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowStorage")
            .field("capacity", &self.capacity())
            .field("num_rows", &self.num_rows())
            .field("num_columns", &self.num_columns())
            .field("free_space", &self.free_space())
            .field("shared", &self.is_shared())
            .finish()
    }
}

impl WindowStorage {
    pub fn new(capacity: usize, shared: bool) -> Result<Self> {
        if !(MIN_WINDOW_CAPACITY..=MAX_WINDOW_CAPACITY).contains(&capacity) {
            eyre::bail!(WindowError::InvalidCapacity {
                requested: capacity
            });
        }

        let mut backing = if shared {
            let map = MmapMut::map_anon(capacity)
                .wrap_err_with(|| format!("failed to map {} bytes of shared memory", capacity))?;
            Backing::Shared(map)
        } else {
            Backing::Heap(vec![0u8; capacity].into_boxed_slice())
        };

        WindowHeader::new(capacity as u32)
            .write_to(&mut backing.bytes_mut()[..WINDOW_HEADER_SIZE])
            .map_err(|e| eyre!("failed to write window header: {:?}", e))?;

        Ok(Self { backing })
    }

    pub fn is_shared(&self) -> bool {
        matches!(self.backing, Backing::Shared(_))
    }

    pub fn bytes(&self) -> &[u8] {
        self.backing.bytes()
    }

    fn header(&self) -> &WindowHeader {
        // capacity >= WINDOW_HEADER_SIZE is checked in new()
        match WindowHeader::ref_from_prefix(self.backing.bytes()) {
            Ok((header, _)) => header,
            Err(_) => unreachable!("window buffer is shorter than its header"),
        }
    }

    fn header_mut(&mut self) -> &mut WindowHeader {
        match WindowHeader::mut_from_prefix(self.backing.bytes_mut()) {
            Ok((header, _)) => header,
            Err(_) => unreachable!("window buffer is shorter than its header"),
        }
    }

    pub fn capacity(&self) -> usize {
        self.header().capacity() as usize
    }

    pub fn num_rows(&self) -> usize {
        self.header().num_rows() as usize
    }

    pub fn num_columns(&self) -> usize {
        self.header().num_columns() as usize
    }

    pub fn free_space(&self) -> usize {
        let header = self.header();
        (header.dir_offset() - header.free_offset()) as usize
    }

    /// Drops every row. Capacity and column count are preserved.
    pub fn clear(&mut self) {
        let capacity = self.capacity() as u32;
        let header = self.header_mut();
        header.set_num_rows(0);
        header.set_free_offset(WINDOW_HEADER_SIZE as u32);
        header.set_dir_offset(capacity);
        header.set_flags(0);
    }

    /// Fixes the row shape. Refused once rows exist with a different shape.
    pub fn set_num_columns(&mut self, num_columns: usize) -> bool {
        let current = self.num_columns();
        if current == num_columns {
            return true;
        }
        if self.num_rows() > 0 || num_columns > u32::MAX as usize {
            return false;
        }
        self.header_mut().set_num_columns(num_columns as u32);
        true
    }

    /// Appends a row of NULL cells. Returns `false` when the window is full.
    pub fn alloc_row(&mut self) -> bool {
        let num_columns = self.num_columns();
        let slots_len = num_columns * FIELD_SLOT_SIZE;
        if self.free_space() < row_footprint(num_columns) {
            return false;
        }

        let header = *self.header();
        let slot_offset = header.free_offset() as usize;
        let dir_offset = header.dir_offset() as usize - ROW_DIRECTORY_ENTRY_SIZE;

        let bytes = self.backing.bytes_mut();
        bytes[slot_offset..slot_offset + slots_len].fill(0);
        bytes[dir_offset..dir_offset + ROW_DIRECTORY_ENTRY_SIZE]
            .copy_from_slice(&(slot_offset as u32).to_le_bytes());

        let header = self.header_mut();
        header.set_free_offset((slot_offset + slots_len) as u32);
        header.set_dir_offset(dir_offset as u32);
        header.set_num_rows(header.num_rows() + 1);
        header.set_flag(HEADER_FLAG_TAIL_RECLAIMABLE, true);
        true
    }

    /// Removes the most recently allocated row.
    ///
    /// All bytes written since its `alloc_row` are reclaimed unless an earlier
    /// row was written in between, in which case only the directory entry is.
    pub fn free_last_row(&mut self) {
        let num_rows = self.num_rows();
        if num_rows == 0 {
            return;
        }

        let slot_offset = self.row_slot_offset(num_rows - 1);
        let header = self.header_mut();
        if header.has_flag(HEADER_FLAG_TAIL_RECLAIMABLE) {
            header.set_free_offset(slot_offset as u32);
        }
        header.set_dir_offset(header.dir_offset() + ROW_DIRECTORY_ENTRY_SIZE as u32);
        header.set_num_rows(header.num_rows() - 1);
        header.set_flag(HEADER_FLAG_TAIL_RECLAIMABLE, false);
    }

    fn row_slot_offset(&self, row: usize) -> usize {
        let entry = self.capacity() - ROW_DIRECTORY_ENTRY_SIZE * (row + 1);
        let bytes = self.bytes();
        u32::from_le_bytes([
            bytes[entry],
            bytes[entry + 1],
            bytes[entry + 2],
            bytes[entry + 3],
        ]) as usize
    }

    fn slot_offset(&self, row: usize, column: usize) -> Option<usize> {
        if row >= self.num_rows() || column >= self.num_columns() {
            return None;
        }
        Some(self.row_slot_offset(row) + column * FIELD_SLOT_SIZE)
    }

    fn read_slot(&self, offset: usize) -> Result<FieldSlot> {
        FieldSlot::read_from_bytes(&self.bytes()[offset..offset + FIELD_SLOT_SIZE])
            .map_err(|e| eyre!("failed to read field slot at {}: {:?}", offset, e))
    }

    fn write_slot(&mut self, offset: usize, slot: FieldSlot) -> Result<()> {
        slot.write_to(&mut self.backing.bytes_mut()[offset..offset + FIELD_SLOT_SIZE])
            .map_err(|e| eyre!("failed to write field slot at {}: {:?}", offset, e))
    }

    /// Copies `payload` into the data area, returning its offset.
    fn append_payload(&mut self, payload: &[u8]) -> Option<u32> {
        if payload.len() > self.free_space() {
            return None;
        }
        let start = self.header().free_offset() as usize;
        let end = start + payload.len();
        self.backing.bytes_mut()[start..end].copy_from_slice(payload);
        self.header_mut().set_free_offset(end as u32);
        Some(start as u32)
    }

    /// Returns `None` when `(row, column)` does not address a cell.
    pub fn field_type(&self, row: usize, column: usize) -> Result<Option<FieldType>> {
        let Some(offset) = self.slot_offset(row, column) else {
            return Ok(None);
        };
        let slot = self.read_slot(offset)?;
        FieldType::from_byte(slot.type_byte())
            .map(Some)
            .ok_or_else(|| eyre!("corrupt field type {} at row {} column {}", slot.type_byte(), row, column))
    }

    /// Reads a cell, borrowing string and blob payloads from the buffer.
    /// Returns `None` when `(row, column)` does not address a cell.
    pub fn read_value(&self, row: usize, column: usize) -> Result<Option<Value<'_>>> {
        let Some(offset) = self.slot_offset(row, column) else {
            return Ok(None);
        };
        let slot = self.read_slot(offset)?;
        let field_type = FieldType::from_byte(slot.type_byte()).ok_or_else(|| {
            eyre!("corrupt field type {} at row {} column {}", slot.type_byte(), row, column)
        })?;

        let value = match field_type {
            FieldType::Null => Value::Null,
            FieldType::Integer => Value::Int(slot.as_integer()),
            FieldType::Float => Value::Float(slot.as_float()),
            FieldType::String | FieldType::Blob => {
                let (start, size) = slot.variable_bounds();
                eyre::ensure!(
                    start + size <= self.capacity(),
                    "payload at row {} column {} exceeds the window ({}+{} > {})",
                    row,
                    column,
                    start,
                    size,
                    self.capacity()
                );
                let payload = &self.bytes()[start..start + size];
                if field_type == FieldType::String {
                    let text = std::str::from_utf8(payload).wrap_err_with(|| {
                        format!("invalid UTF-8 in string at row {} column {}", row, column)
                    })?;
                    Value::Text(text.into())
                } else {
                    Value::Blob(payload.into())
                }
            }
        };
        Ok(Some(value))
    }

    /// Writes a cell. `Ok(false)` means the payload did not fit and nothing
    /// was written; `Ok(None)` means `(row, column)` does not address a cell.
    pub fn write_value(&mut self, row: usize, column: usize, value: &Value<'_>) -> Result<Option<bool>> {
        let Some(offset) = self.slot_offset(row, column) else {
            return Ok(None);
        };

        let slot = match value {
            Value::Null => FieldSlot::null(),
            Value::Int(v) => FieldSlot::integer(*v),
            Value::Float(v) => FieldSlot::float(*v),
            Value::Text(s) => match self.append_payload(s.as_bytes()) {
                Some(start) => FieldSlot::variable(FieldType::String, start, s.len() as u32),
                None => return Ok(Some(false)),
            },
            Value::Blob(b) => match self.append_payload(b) {
                Some(start) => FieldSlot::variable(FieldType::Blob, start, b.len() as u32),
                None => return Ok(Some(false)),
            },
        };

        if row + 1 != self.num_rows() {
            self.header_mut()
                .set_flag(HEADER_FLAG_TAIL_RECLAIMABLE, false);
        }
        self.write_slot(offset, slot)?;
        Ok(Some(true))
    }
}
