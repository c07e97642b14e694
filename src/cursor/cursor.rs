//! # PositionedCursor
//!
//! Position state machine, column lookup, typed getters and window filling
//! over any [`RowSource`].
//!
//! ## Filling a Window
//!
//! `fill_window(position, window)` copies rows `position, position + 1, ..`
//! into `window` until the source runs out or the window is full:
//!
//! 1. Clear the window, set its start position and column count.
//! 2. Move to the next row and allocate a row in the window. Running past
//!    the count ends the fill as exhausted; a source that refuses an
//!    in-range row ends it with [`FillOutcome::SourceError`].
//! 3. Read every column from the source, then write it with the matching
//!    typed `put_*`. A value that does not fit trims the row and stops.
//! 4. Restore the cursor position.
//!
//! The window is held by a reference guard for the whole fill, so the
//! reference is released on every exit path. A source error while reading a
//! row trims that row and ends the fill with [`FillOutcome::SourceError`];
//! the rows before it stay in the window.

use std::sync::Arc;

use eyre::{bail, ensure, Result};
use smallvec::SmallVec;

use super::observer::{
    ChangeNotifier, ContentObserver, CursorNotifications, DataSetObservable, DataSetObserver,
};
use super::{CursorError, RowSource};
use crate::types::{FieldType, OwnedValue};
use crate::window::RowWindow;

const BEFORE_FIRST: isize = -1;

/// Why a [`fill_window`](PositionedCursor::fill_window) call stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FillOutcome {
    /// The requested position was outside the source; nothing was written.
    OutOfRange,
    /// Every row from the start position on was copied.
    Exhausted,
    /// The window ran out of space after at least one row.
    WindowFull,
    /// The first row did not fit in the empty window.
    RowTooLarge,
    /// The source failed while producing a row, or refused to move to a
    /// row inside its count. Rows after it were not copied.
    SourceError(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillReport {
    pub start_position: usize,
    pub rows: usize,
    pub outcome: FillOutcome,
}

impl FillReport {
    /// First position not covered by this fill.
    pub fn next_position(&self) -> usize {
        self.start_position + self.rows
    }
}

pub struct PositionedCursor<S: RowSource> {
    source: S,
    position: isize,
    closed: bool,
    row_id_column: Option<usize>,
    current_row_id: Option<i64>,
    data_set: DataSetObservable,
    notifications: Arc<CursorNotifications>,
}

impl<S: RowSource> std::fmt::Debug for PositionedCursor<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PositionedCursor")
            .field("position", &self.position)
            .field("count", &self.source.count())
            .field("closed", &self.closed)
            .field("row_id_column", &self.row_id_column)
            .finish()
    }
}

impl<S: RowSource> PositionedCursor<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            position: BEFORE_FIRST,
            closed: false,
            row_id_column: None,
            current_row_id: None,
            data_set: DataSetObservable::new(),
            notifications: CursorNotifications::new(),
        }
    }

    /// Caches the value of `column` as the row id after every successful move.
    pub fn with_row_id_column(mut self, column: usize) -> Self {
        self.row_id_column = Some(column);
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn count(&self) -> usize {
        self.source.count()
    }

    pub fn position(&self) -> isize {
        self.position
    }

    pub fn current_row_id(&self) -> Option<i64> {
        self.current_row_id
    }

    /// Moves to an absolute position.
    ///
    /// Positions past the end park the cursor after the last row and negative
    /// positions park it before the first; both return `false`. Moving to the
    /// current position returns `true` without consulting the source.
    pub fn move_to_position(&mut self, position: isize) -> bool {
        if self.closed {
            return false;
        }

        let count = self.source.count() as isize;
        if position >= count {
            self.position = count;
            self.current_row_id = None;
            return false;
        }
        if position < 0 {
            self.position = BEFORE_FIRST;
            self.current_row_id = None;
            return false;
        }
        if position == self.position {
            return true;
        }

        let old = usize::try_from(self.position).ok();
        if !self.source.on_move(old, position as usize) {
            self.position = BEFORE_FIRST;
            self.current_row_id = None;
            return false;
        }

        self.position = position;
        self.current_row_id = self.read_row_id();
        true
    }

    fn read_row_id(&self) -> Option<i64> {
        let column = self.row_id_column?;
        let position = self.position as usize;
        match self.source.get_type(position, column) {
            Ok(FieldType::Null) | Err(_) => None,
            Ok(_) => self.source.get_long(position, column).ok(),
        }
    }

    pub fn move_by(&mut self, offset: isize) -> bool {
        self.move_to_position(self.position.saturating_add(offset))
    }

    pub fn move_to_first(&mut self) -> bool {
        self.move_to_position(0)
    }

    pub fn move_to_last(&mut self) -> bool {
        self.move_to_position(self.source.count() as isize - 1)
    }

    pub fn move_to_next(&mut self) -> bool {
        self.move_by(1)
    }

    pub fn move_to_previous(&mut self) -> bool {
        self.move_by(-1)
    }

    pub fn is_first(&self) -> bool {
        self.position == 0 && self.source.count() != 0
    }

    pub fn is_last(&self) -> bool {
        let count = self.source.count() as isize;
        count != 0 && self.position == count - 1
    }

    pub fn is_before_first(&self) -> bool {
        self.source.count() == 0 || self.position == BEFORE_FIRST
    }

    pub fn is_after_last(&self) -> bool {
        let count = self.source.count();
        count == 0 || self.position == count as isize
    }

    pub fn column_names(&self) -> &[String] {
        self.source.column_names()
    }

    pub fn column_count(&self) -> usize {
        self.source.column_count()
    }

    /// Case-insensitive lookup. A `table.column` name is looked up by its
    /// column part.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let name = match name.rfind('.') {
            Some(dot) => {
                log::warn!("requesting column name with table name -- {}", name);
                &name[dot + 1..]
            }
            None => name,
        };
        self.source
            .column_names()
            .iter()
            .position(|column| column.eq_ignore_ascii_case(name))
    }

    pub fn column_index_or_throw(&self, name: &str) -> Result<usize> {
        match self.column_index(name) {
            Some(index) => Ok(index),
            None => bail!(CursorError::ColumnNotFound(name.to_string())),
        }
    }

    pub fn column_name(&self, column: usize) -> Option<&str> {
        self.source.column_names().get(column).map(String::as_str)
    }

    fn check_position(&self) -> Result<usize> {
        if self.closed {
            bail!(CursorError::Closed);
        }
        let count = self.source.count();
        match usize::try_from(self.position) {
            Ok(position) if position < count => Ok(position),
            _ => bail!(CursorError::IndexOutOfBounds {
                position: self.position,
                count,
            }),
        }
    }

    pub fn get_type(&self, column: usize) -> Result<FieldType> {
        let position = self.check_position()?;
        self.source.get_type(position, column)
    }

    pub fn is_null(&self, column: usize) -> Result<bool> {
        Ok(self.get_type(column)? == FieldType::Null)
    }

    pub fn get_string(&self, column: usize) -> Result<Option<String>> {
        let position = self.check_position()?;
        self.source.get_string(position, column)
    }

    pub fn get_long(&self, column: usize) -> Result<i64> {
        let position = self.check_position()?;
        self.source.get_long(position, column)
    }

    pub fn get_int(&self, column: usize) -> Result<i32> {
        Ok(self.get_long(column)? as i32)
    }

    pub fn get_short(&self, column: usize) -> Result<i16> {
        Ok(self.get_long(column)? as i16)
    }

    pub fn get_double(&self, column: usize) -> Result<f64> {
        let position = self.check_position()?;
        self.source.get_double(position, column)
    }

    pub fn get_float(&self, column: usize) -> Result<f32> {
        Ok(self.get_double(column)? as f32)
    }

    pub fn get_blob(&self, column: usize) -> Result<Option<Vec<u8>>> {
        let position = self.check_position()?;
        self.source.get_blob(position, column)
    }

    /// Reads a column as the type the source reports for it.
    pub fn get_value(&self, column: usize) -> Result<OwnedValue> {
        let position = self.check_position()?;
        self.read_value(position, column)
    }

    fn read_value(&self, position: usize, column: usize) -> Result<OwnedValue> {
        let value = match self.source.get_type(position, column)? {
            FieldType::Null => OwnedValue::Null,
            FieldType::Integer => OwnedValue::Int(self.source.get_long(position, column)?),
            FieldType::Float => OwnedValue::Float(self.source.get_double(position, column)?),
            FieldType::String => match self.source.get_string(position, column)? {
                Some(text) => OwnedValue::Text(text),
                None => OwnedValue::Null,
            },
            FieldType::Blob => match self.source.get_blob(position, column)? {
                Some(bytes) => OwnedValue::Blob(bytes),
                None => OwnedValue::Null,
            },
        };
        Ok(value)
    }

    /// The window backing the source, if it pages through one.
    pub fn window(&self) -> Option<&RowWindow> {
        self.source.window()
    }

    /// Copies rows from `position` on into `window`.
    ///
    /// Capacity exhaustion and source failures end the fill normally and are
    /// reported in the returned [`FillReport`]; an `Err` means the window
    /// itself was misused.
    pub fn fill_window(&mut self, position: usize, window: &RowWindow) -> Result<FillReport> {
        if self.closed {
            bail!(CursorError::Closed);
        }
        if position >= self.source.count() {
            return Ok(FillReport {
                start_position: position,
                rows: 0,
                outcome: FillOutcome::OutOfRange,
            });
        }

        let _reference = window.reference();
        let old_position = self.position;
        let old_row_id = self.current_row_id;

        let result = self.fill_rows(position, window);

        self.position = old_position;
        self.current_row_id = old_row_id;
        if let Ok(restored) = usize::try_from(old_position) {
            if restored < self.source.count() && !self.source.on_move(None, restored) {
                self.position = BEFORE_FIRST;
                self.current_row_id = None;
            }
        }

        let outcome = result?;
        Ok(FillReport {
            start_position: window.start_position(),
            rows: window.num_rows(),
            outcome,
        })
    }

    fn fill_rows(&mut self, position: usize, window: &RowWindow) -> Result<FillOutcome> {
        window.clear();
        window.set_start_position(position)?;
        let num_columns = self.source.column_count();
        ensure!(
            window.set_num_columns(num_columns),
            "window '{}' refused {} columns",
            window.name(),
            num_columns
        );

        let count = self.source.count();
        self.position = position as isize - 1;
        let mut row = position;
        loop {
            if row >= count {
                return Ok(FillOutcome::Exhausted);
            }
            if !self.move_to_position(row as isize) {
                log::warn!("source refused to move to row {} of {} while filling window", row, count);
                return Ok(FillOutcome::SourceError(format!(
                    "source refused to move to row {}",
                    row
                )));
            }
            if !window.alloc_row() {
                return Ok(full_outcome(window));
            }

            let values = match self.read_row(row, num_columns) {
                Ok(values) => values,
                Err(e) => {
                    window.free_last_row();
                    log::warn!("source failed at row {} while filling window: {:#}", row, e);
                    return Ok(FillOutcome::SourceError(format!("{:#}", e)));
                }
            };

            for (column, value) in values.iter().enumerate() {
                if !window.put_value(&value.to_value(), row, column)? {
                    window.free_last_row();
                    return Ok(full_outcome(window));
                }
            }
            row += 1;
        }
    }

    fn read_row(&self, row: usize, num_columns: usize) -> Result<SmallVec<[OwnedValue; 8]>> {
        (0..num_columns)
            .map(|column| self.read_value(row, column))
            .collect()
    }

    pub fn register_data_set_observer(&self, observer: Arc<dyn DataSetObserver>) -> Result<()> {
        self.data_set.register(observer)
    }

    pub fn unregister_data_set_observer(&self, observer: &Arc<dyn DataSetObserver>) -> Result<()> {
        self.data_set.unregister(observer)
    }

    pub fn register_content_observer(&self, observer: Arc<dyn ContentObserver>) -> Result<()> {
        self.notifications.content.register(observer)
    }

    pub fn unregister_content_observer(&self, observer: &Arc<dyn ContentObserver>) -> Result<()> {
        self.notifications.content.unregister(observer)
    }

    /// Watches `uri` on `notifier`; changes to it reach this cursor's content
    /// observers.
    pub fn set_notification_uri(&self, notifier: Arc<dyn ChangeNotifier>, uri: &str) {
        self.notifications.set_notification_uri(notifier, uri);
    }

    pub fn notification_uri(&self) -> Option<String> {
        self.notifications.notification_uri()
    }

    /// Dispatches a change to content observers. A self-originated change is
    /// also broadcast on the notification URI, excluding this cursor.
    pub fn on_change(&self, self_change: bool) {
        self.notifications.on_change(self_change);
    }

    pub fn deactivate(&mut self) {
        self.source.deactivate();
        self.deactivate_internal();
    }

    fn deactivate_internal(&mut self) {
        self.notifications.unregister_self();
        self.data_set.notify_invalidated();
    }

    /// Re-runs the source and moves before the first row.
    pub fn requery(&mut self) -> Result<bool> {
        if self.closed {
            return Ok(false);
        }
        if !self.source.requery()? {
            return Ok(false);
        }
        self.position = BEFORE_FIRST;
        self.current_row_id = None;
        self.notifications.reregister_self();
        self.data_set.notify_changed();
        Ok(true)
    }

    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.notifications.content.unregister_all();
        self.source.close();
        self.deactivate_internal();
        self.data_set.unregister_all();
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl<S: RowSource> Drop for PositionedCursor<S> {
    fn drop(&mut self) {
        self.close();
    }
}

fn full_outcome(window: &RowWindow) -> FillOutcome {
    if window.num_rows() == 0 {
        FillOutcome::RowTooLarge
    } else {
        FillOutcome::WindowFull
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct Numbers {
        names: Vec<String>,
        count: usize,
        moves: usize,
        reject_from: Option<usize>,
    }

    impl Numbers {
        fn new(count: usize) -> Self {
            Self {
                names: vec!["_id".to_string(), "Label".to_string()],
                count,
                moves: 0,
                reject_from: None,
            }
        }
    }

    impl RowSource for Numbers {
        fn count(&self) -> usize {
            self.count
        }

        fn column_names(&self) -> &[String] {
            &self.names
        }

        fn get_type(&self, _position: usize, column: usize) -> Result<FieldType> {
            Ok(if column == 0 { FieldType::Integer } else { FieldType::String })
        }

        fn get_string(&self, position: usize, column: usize) -> Result<Option<String>> {
            Ok(Some(if column == 0 {
                (position * 10).to_string()
            } else {
                format!("row {}", position)
            }))
        }

        fn get_long(&self, position: usize, _column: usize) -> Result<i64> {
            Ok(position as i64 * 10)
        }

        fn get_double(&self, position: usize, _column: usize) -> Result<f64> {
            Ok(position as f64 * 10.0)
        }

        fn on_move(&mut self, _old: Option<usize>, new: usize) -> bool {
            self.moves += 1;
            self.reject_from.map_or(true, |limit| new < limit)
        }
    }

    #[test]
    fn starts_before_first() {
        let cursor = PositionedCursor::new(Numbers::new(3));
        assert_eq!(cursor.position(), -1);
        assert!(cursor.is_before_first());
        assert!(!cursor.is_after_last());
        assert!(!cursor.is_first());
    }

    #[test]
    fn moves_clamp_to_the_ends() {
        let mut cursor = PositionedCursor::new(Numbers::new(10));

        assert!(!cursor.move_to_position(-1));
        assert!(cursor.is_before_first());

        assert!(!cursor.move_to_position(10));
        assert_eq!(cursor.position(), 10);
        assert!(cursor.is_after_last());

        assert!(!cursor.move_to_position(-7));
        assert_eq!(cursor.position(), -1);

        assert!(cursor.move_to_position(5));
        assert_eq!(cursor.position(), 5);
        assert!(!cursor.is_before_first() && !cursor.is_after_last());
    }

    #[test]
    fn repeated_move_does_not_reach_the_source() {
        let mut cursor = PositionedCursor::new(Numbers::new(10));
        assert!(cursor.move_to_position(4));
        let moves = cursor.source().moves;

        assert!(cursor.move_to_position(4));
        assert_eq!(cursor.position(), 4);
        assert_eq!(cursor.source().moves, moves);
    }

    #[test]
    fn relative_moves_walk_the_sequence() {
        let mut cursor = PositionedCursor::new(Numbers::new(3));
        let mut seen = Vec::new();
        while cursor.move_to_next() {
            seen.push(cursor.get_long(0).unwrap());
        }
        assert_eq!(seen, vec![0, 10, 20]);
        assert!(cursor.is_after_last());

        assert!(cursor.move_to_previous());
        assert!(cursor.is_last());
        assert!(cursor.move_by(-2));
        assert!(cursor.is_first());
        assert!(!cursor.move_by(-1));
        assert!(cursor.is_before_first());

        assert!(cursor.move_to_last());
        assert_eq!(cursor.position(), 2);
        assert!(cursor.move_to_first());
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn empty_cursor_is_both_before_first_and_after_last() {
        let mut cursor = PositionedCursor::new(Numbers::new(0));
        assert!(cursor.is_before_first());
        assert!(cursor.is_after_last());
        assert!(!cursor.move_to_first());
        assert!(!cursor.move_to_last());
        assert!(!cursor.is_first());
        assert!(!cursor.is_last());
    }

    #[test]
    fn rejected_move_parks_before_first() {
        let mut source = Numbers::new(10);
        source.reject_from = Some(6);
        let mut cursor = PositionedCursor::new(source);

        assert!(cursor.move_to_position(3));
        assert!(!cursor.move_to_position(8));
        assert_eq!(cursor.position(), -1);
    }

    #[test]
    fn reading_off_row_is_out_of_bounds() {
        let mut cursor = PositionedCursor::new(Numbers::new(2));
        let err = cursor.get_string(0).unwrap_err();
        assert_eq!(
            err.downcast_ref::<CursorError>(),
            Some(&CursorError::IndexOutOfBounds {
                position: -1,
                count: 2
            })
        );

        cursor.move_to_position(2);
        assert!(cursor.get_long(0).is_err());
    }

    #[test]
    fn narrowing_getters_cast() {
        let mut cursor = PositionedCursor::new(Numbers::new(5));
        cursor.move_to_position(4);
        assert_eq!(cursor.get_int(0).unwrap(), 40);
        assert_eq!(cursor.get_short(0).unwrap(), 40);
        assert_eq!(cursor.get_float(0).unwrap(), 40.0);
        assert!(!cursor.is_null(1).unwrap());
        assert_eq!(cursor.get_value(1).unwrap(), OwnedValue::from("row 4"));
        assert!(cursor.get_blob(1).is_err());
    }

    #[test]
    fn row_id_follows_position() {
        let mut cursor = PositionedCursor::new(Numbers::new(5)).with_row_id_column(0);
        assert_eq!(cursor.current_row_id(), None);
        cursor.move_to_position(3);
        assert_eq!(cursor.current_row_id(), Some(30));
        cursor.move_to_position(9);
        assert_eq!(cursor.current_row_id(), None);
    }

    #[test]
    fn column_lookup_ignores_case_and_table_prefix() {
        let cursor = PositionedCursor::new(Numbers::new(1));
        assert_eq!(cursor.column_count(), 2);
        assert_eq!(cursor.column_index("label"), Some(1));
        assert_eq!(cursor.column_index("items._ID"), Some(0));
        assert_eq!(cursor.column_index("missing"), None);
        assert_eq!(cursor.column_name(1), Some("Label"));
        assert_eq!(cursor.column_name(2), None);

        let err = cursor.column_index_or_throw("missing").unwrap_err();
        assert_eq!(
            err.downcast_ref::<CursorError>(),
            Some(&CursorError::ColumnNotFound("missing".to_string()))
        );
    }

    #[test]
    fn fill_window_copies_typed_rows_and_restores_position() {
        let mut cursor = PositionedCursor::new(Numbers::new(6)).with_row_id_column(0);
        cursor.move_to_position(1);
        let window = RowWindow::new("fill", 4096).unwrap();

        let report = cursor.fill_window(3, &window).unwrap();

        assert_eq!(report.outcome, FillOutcome::Exhausted);
        assert_eq!(report.start_position, 3);
        assert_eq!(report.rows, 3);
        assert_eq!(report.next_position(), 6);
        assert_eq!(window.get_type(4, 0).unwrap(), FieldType::Integer);
        assert_eq!(window.get_long(4, 0).unwrap(), 40);
        assert_eq!(window.get_string(5, 1).unwrap().as_deref(), Some("row 5"));
        assert_eq!(cursor.position(), 1);
        assert_eq!(cursor.current_row_id(), Some(10));
        assert_eq!(window.reference_count(), 1);
    }

    #[test]
    fn fill_window_outside_the_source_is_a_no_op() {
        let mut cursor = PositionedCursor::new(Numbers::new(3));
        let window = RowWindow::new("fill", 1024).unwrap();
        let report = cursor.fill_window(3, &window).unwrap();
        assert_eq!(report.outcome, FillOutcome::OutOfRange);
        assert_eq!(window.num_rows(), 0);
    }

    #[test]
    fn fill_window_stops_when_the_window_is_full() {
        let mut cursor = PositionedCursor::new(Numbers::new(100));
        let window = RowWindow::new("small", 256).unwrap();

        let report = cursor.fill_window(0, &window).unwrap();

        assert_eq!(report.outcome, FillOutcome::WindowFull);
        assert!(report.rows > 0 && report.rows < 100);
        let last = report.next_position() - 1;
        assert_eq!(window.get_string(last, 1).unwrap(), Some(format!("row {}", last)));
        assert!(window.get_long(last + 1, 0).is_err());
    }

    #[test]
    fn fill_window_reports_rows_too_large_for_an_empty_window() {
        let mut cursor = PositionedCursor::new(Numbers::new(5));
        let window = RowWindow::new("tiny", 64).unwrap();
        let report = cursor.fill_window(0, &window).unwrap();
        assert_eq!(report.outcome, FillOutcome::RowTooLarge);
        assert_eq!(report.rows, 0);
    }

    #[test]
    fn closed_cursor_refuses_work() {
        let mut cursor = PositionedCursor::new(Numbers::new(5));
        cursor.move_to_first();
        cursor.close();
        cursor.close();

        assert!(cursor.is_closed());
        assert!(!cursor.move_to_position(2));
        let err = cursor.get_long(0).unwrap_err();
        assert_eq!(err.downcast_ref::<CursorError>(), Some(&CursorError::Closed));
        assert!(!cursor.requery().unwrap());
        let window = RowWindow::new("closed", 1024).unwrap();
        assert!(cursor.fill_window(0, &window).is_err());
    }

    #[derive(Default)]
    struct Events {
        changed: AtomicUsize,
        invalidated: AtomicUsize,
    }

    impl DataSetObserver for Events {
        fn on_changed(&self) {
            self.changed.fetch_add(1, Ordering::SeqCst);
        }

        fn on_invalidated(&self) {
            self.invalidated.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl ContentObserver for Events {
        fn on_change(&self, _self_change: bool) {
            self.changed.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn lifecycle_notifies_data_set_observers() {
        let mut cursor = PositionedCursor::new(Numbers::new(5));
        let events = Arc::new(Events::default());
        cursor.register_data_set_observer(events.clone()).unwrap();
        cursor.move_to_position(2);

        cursor.deactivate();
        assert_eq!(events.invalidated.load(Ordering::SeqCst), 1);

        assert!(cursor.requery().unwrap());
        assert_eq!(events.changed.load(Ordering::SeqCst), 1);
        assert_eq!(cursor.position(), -1);

        cursor.close();
        cursor.close();
        assert_eq!(events.invalidated.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn close_unregisters_every_observer() {
        let mut cursor = PositionedCursor::new(Numbers::new(1));
        let events = Arc::new(Events::default());
        let as_content: Arc<dyn ContentObserver> = events.clone();
        let as_data_set: Arc<dyn DataSetObserver> = events.clone();
        cursor.register_content_observer(as_content.clone()).unwrap();
        cursor.register_data_set_observer(as_data_set.clone()).unwrap();

        cursor.close();

        cursor.on_change(false);
        assert_eq!(events.changed.load(Ordering::SeqCst), 0);
        assert!(cursor.unregister_content_observer(&as_content).is_err());
        assert!(cursor.unregister_data_set_observer(&as_data_set).is_err());
    }
}
