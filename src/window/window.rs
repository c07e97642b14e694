//! # RowWindow Handle
//!
//! `RowWindow` is the public face of a window: one holder of a reference to
//! the shared storage, plus the holder's own start position. All accessors
//! take `&self`; the storage lock inside serializes writers.
//!
//! ## Addressing
//!
//! Every typed accessor takes an absolute row position. It is translated to a
//! local index by subtracting the start position; a position before the start
//! or past the last allocated row, or a column past `num_columns`, fails with
//! [`WindowError::OutOfBounds`].
//!
//! ## Coercions
//!
//! | stored  | get_long        | get_double        | get_string   | get_blob     |
//! |---------|-----------------|-------------------|--------------|--------------|
//! | NULL    | 0               | 0.0               | None         | None         |
//! | INTEGER | value           | as f64            | decimal      | TypeMismatch |
//! | FLOAT   | truncated       | value             | shortest     | TypeMismatch |
//! | STRING  | parsed, else 0  | parsed, else 0.0  | value        | UTF-8 bytes  |
//! | BLOB    | TypeMismatch    | TypeMismatch      | TypeMismatch | value        |
//!
//! `get_int`, `get_short` and `get_float` narrow the long and double results
//! with `as` casts.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use eyre::{bail, Report, Result};

use super::reference::{ReferenceGuard, WindowShared};
use super::storage::WindowStorage;
use super::{WindowBuilder, WindowError, WindowId};
use crate::types::{FieldType, OwnedValue, Value};

pub struct RowWindow {
    pub(crate) shared: Arc<WindowShared>,
    start_position: AtomicUsize,
    holds_reference: AtomicBool,
}

impl std::fmt::Debug for RowWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowWindow")
            .field("id", &self.shared.id)
            .field("name", &self.shared.name)
            .field("start_position", &self.start_position())
            .field("references", &self.shared.reference_count())
            .finish()
    }
}

impl RowWindow {
    /// Wraps a reference the caller has already acquired.
    pub(crate) fn attach(shared: Arc<WindowShared>, start_position: usize) -> Self {
        Self {
            shared,
            start_position: AtomicUsize::new(start_position),
            holds_reference: AtomicBool::new(true),
        }
    }

    pub fn builder() -> WindowBuilder {
        WindowBuilder::new()
    }

    pub fn new(name: impl Into<String>, capacity: usize) -> Result<Self> {
        WindowBuilder::new().name(name).capacity(capacity).build()
    }

    /// Creates another holder of the same storage, adding one reference.
    pub fn share(&self) -> RowWindow {
        self.shared.acquire();
        RowWindow::attach(Arc::clone(&self.shared), self.start_position())
    }

    pub fn id(&self) -> WindowId {
        self.shared.id
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    pub fn is_shared_memory(&self) -> bool {
        self.with_storage(|storage| storage.is_shared())
    }

    fn with_storage<R>(&self, f: impl FnOnce(&WindowStorage) -> R) -> R {
        let _reference = self.reference();
        let guard = self.shared.storage.read();
        match guard.as_ref() {
            Some(storage) => f(storage),
            None => unreachable!("window '{}' storage freed while referenced", self.shared.name),
        }
    }

    fn with_storage_mut<R>(&self, f: impl FnOnce(&mut WindowStorage) -> R) -> R {
        let _reference = self.reference();
        let mut guard = self.shared.storage.write();
        match guard.as_mut() {
            Some(storage) => f(storage),
            None => unreachable!("window '{}' storage freed while referenced", self.shared.name),
        }
    }

    pub fn start_position(&self) -> usize {
        self.start_position.load(Ordering::Acquire)
    }

    /// Sets the absolute position of local row 0.
    ///
    /// Moving the start backwards is refused while rows are allocated, since
    /// it would relabel rows that were filled for later positions.
    pub fn set_start_position(&self, position: usize) -> Result<()> {
        let current = self.start_position();
        if position < current && self.num_rows() > 0 {
            bail!(WindowError::InvalidStartPosition {
                requested: position,
                current,
            });
        }
        self.start_position.store(position, Ordering::Release);
        Ok(())
    }

    pub fn num_rows(&self) -> usize {
        self.with_storage(|storage| storage.num_rows())
    }

    pub fn num_columns(&self) -> usize {
        self.with_storage(|storage| storage.num_columns())
    }

    /// Fixes the number of columns per row. Returns `false` if rows of a
    /// different shape already exist.
    pub fn set_num_columns(&self, num_columns: usize) -> bool {
        self.with_storage_mut(|storage| storage.set_num_columns(num_columns))
    }

    pub fn free_space(&self) -> usize {
        self.with_storage(|storage| storage.free_space())
    }

    pub fn contains_row(&self, position: usize) -> bool {
        let start = self.start_position();
        position >= start && position - start < self.num_rows()
    }

    /// Drops all rows and resets the start position to 0.
    pub fn clear(&self) {
        self.with_storage_mut(|storage| {
            storage.clear();
            self.start_position.store(0, Ordering::Release);
        });
    }

    /// Appends a row of NULL cells. `false` means the window is full.
    pub fn alloc_row(&self) -> bool {
        self.with_storage_mut(|storage| storage.alloc_row())
    }

    pub fn free_last_row(&self) {
        self.with_storage_mut(|storage| storage.free_last_row());
    }

    fn local_row(&self, position: usize) -> Option<usize> {
        position.checked_sub(self.start_position())
    }

    fn out_of_bounds(&self, storage: &WindowStorage, row: usize, column: usize) -> Report {
        Report::new(WindowError::OutOfBounds {
            row,
            column,
            start_position: self.start_position(),
            num_rows: storage.num_rows(),
            num_columns: storage.num_columns(),
        })
    }

    /// Writes a cell at an absolute position.
    ///
    /// `Ok(false)` means the value did not fit; the cell keeps its previous
    /// value. Invalid addressing is an error.
    pub fn put_value(&self, value: &Value<'_>, row: usize, column: usize) -> Result<bool> {
        self.with_storage_mut(|storage| {
            let written = match self.local_row(row) {
                Some(local) => storage.write_value(local, column, value)?,
                None => None,
            };
            written.ok_or_else(|| self.out_of_bounds(storage, row, column))
        })
    }

    pub fn put_string(&self, value: &str, row: usize, column: usize) -> Result<bool> {
        self.put_value(&Value::Text(value.into()), row, column)
    }

    pub fn put_long(&self, value: i64, row: usize, column: usize) -> Result<bool> {
        self.put_value(&Value::Int(value), row, column)
    }

    pub fn put_double(&self, value: f64, row: usize, column: usize) -> Result<bool> {
        self.put_value(&Value::Float(value), row, column)
    }

    pub fn put_blob(&self, value: &[u8], row: usize, column: usize) -> Result<bool> {
        self.put_value(&Value::Blob(value.into()), row, column)
    }

    pub fn put_null(&self, row: usize, column: usize) -> Result<bool> {
        self.put_value(&Value::Null, row, column)
    }

    fn read_cell<R>(
        &self,
        row: usize,
        column: usize,
        f: impl FnOnce(Value<'_>) -> Result<R>,
    ) -> Result<R> {
        self.with_storage(|storage| {
            let value = match self.local_row(row) {
                Some(local) => storage.read_value(local, column)?,
                None => None,
            };
            match value {
                Some(value) => f(value),
                None => Err(self.out_of_bounds(storage, row, column)),
            }
        })
    }

    pub fn get_type(&self, row: usize, column: usize) -> Result<FieldType> {
        self.with_storage(|storage| {
            let field_type = match self.local_row(row) {
                Some(local) => storage.field_type(local, column)?,
                None => None,
            };
            field_type.ok_or_else(|| self.out_of_bounds(storage, row, column))
        })
    }

    pub fn is_null(&self, row: usize, column: usize) -> Result<bool> {
        Ok(self.get_type(row, column)? == FieldType::Null)
    }

    /// Copies a cell out without any coercion.
    pub fn get_value(&self, row: usize, column: usize) -> Result<OwnedValue> {
        self.read_cell(row, column, |value| Ok(OwnedValue::from(value)))
    }

    pub fn get_string(&self, row: usize, column: usize) -> Result<Option<String>> {
        self.read_cell(row, column, |value| match value {
            Value::Null => Ok(None),
            Value::Int(v) => Ok(Some(v.to_string())),
            Value::Float(v) => Ok(Some(format!("{:?}", v))),
            Value::Text(s) => Ok(Some(s.into_owned())),
            Value::Blob(_) => Err(mismatch(row, column, FieldType::Blob, "string")),
        })
    }

    /// A STRING cell reads as its whole trimmed text parsed as an integer,
    /// else as a truncated float, else 0; a numeric prefix such as `"12abc"`
    /// is not enough.
    pub fn get_long(&self, row: usize, column: usize) -> Result<i64> {
        self.read_cell(row, column, |value| match value {
            Value::Null => Ok(0),
            Value::Int(v) => Ok(v),
            Value::Float(v) => Ok(v as i64),
            Value::Text(s) => Ok(parse_long(&s)),
            Value::Blob(_) => Err(mismatch(row, column, FieldType::Blob, "long")),
        })
    }

    pub fn get_int(&self, row: usize, column: usize) -> Result<i32> {
        Ok(self.get_long(row, column)? as i32)
    }

    pub fn get_short(&self, row: usize, column: usize) -> Result<i16> {
        Ok(self.get_long(row, column)? as i16)
    }

    pub fn get_double(&self, row: usize, column: usize) -> Result<f64> {
        self.read_cell(row, column, |value| match value {
            Value::Null => Ok(0.0),
            Value::Int(v) => Ok(v as f64),
            Value::Float(v) => Ok(v),
            Value::Text(s) => Ok(s.trim().parse::<f64>().unwrap_or(0.0)),
            Value::Blob(_) => Err(mismatch(row, column, FieldType::Blob, "double")),
        })
    }

    pub fn get_float(&self, row: usize, column: usize) -> Result<f32> {
        Ok(self.get_double(row, column)? as f32)
    }

    pub fn get_blob(&self, row: usize, column: usize) -> Result<Option<Vec<u8>>> {
        self.read_cell(row, column, |value| match value {
            Value::Null => Ok(None),
            Value::Text(s) => Ok(Some(s.as_bytes().to_vec())),
            Value::Blob(b) => Ok(Some(b.into_owned())),
            Value::Int(_) => Err(mismatch(row, column, FieldType::Integer, "blob")),
            Value::Float(_) => Err(mismatch(row, column, FieldType::Float, "blob")),
        })
    }

    /// Holds a reference for the lifetime of the returned guard.
    ///
    /// # Panics
    ///
    /// Panics if the storage has already been released.
    pub fn reference(&self) -> ReferenceGuard<'_> {
        self.shared.guard()
    }

    /// # Panics
    ///
    /// Panics if the storage has already been released.
    pub fn acquire_reference(&self) {
        self.shared.acquire();
    }

    /// Releases one reference; the last release frees the storage.
    ///
    /// # Panics
    ///
    /// Panics if no references remain.
    pub fn release_reference(&self) {
        self.shared.release();
    }

    pub fn reference_count(&self) -> usize {
        self.shared.reference_count()
    }

    pub fn is_released(&self) -> bool {
        self.shared.is_released()
    }

    /// Releases this holder's own reference. Calling it again is a no-op.
    pub fn close(&self) {
        if self.holds_reference.swap(false, Ordering::AcqRel) {
            self.shared.try_release();
        }
    }

    pub fn is_closed(&self) -> bool {
        !self.holds_reference.load(Ordering::Acquire)
    }

    /// Runs `callback` once the storage is freed, or immediately if it
    /// already has been.
    pub fn on_released(&self, callback: impl FnOnce(WindowId) + Send + 'static) {
        self.shared.on_released(Box::new(callback));
    }
}

impl Drop for RowWindow {
    fn drop(&mut self) {
        if self.holds_reference.swap(false, Ordering::AcqRel) {
            self.shared.try_release();
        }
    }
}

fn mismatch(row: usize, column: usize, stored: FieldType, requested: &'static str) -> Report {
    Report::new(WindowError::TypeMismatch {
        row,
        column,
        stored,
        requested,
    })
}

fn parse_long(text: &str) -> i64 {
    let text = text.trim();
    match text.parse::<i64>() {
        Ok(v) => v,
        Err(_) => text.parse::<f64>().map(|v| v as i64).unwrap_or(0),
    }
}
