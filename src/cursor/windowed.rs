//! # Windowed Row Sources
//!
//! [`WindowedSource`] adapts a stepwise [`RowProducer`] (a prepared
//! statement, a scan, an in-memory table) to [`RowSource`] by paging its rows
//! through one [`RowWindow`]. The producer can only move forward, so every
//! page is produced by rewinding it and skipping to the page start.
//!
//! ## Paging Policy
//!
//! | Event                         | Action                                           |
//! |-------------------------------|--------------------------------------------------|
//! | construction, `requery`       | fill from 0 and count every row                  |
//! | move inside the current page  | nothing                                          |
//! | move outside the current page | refill from `max(target - rows_per_page / 3, 0)` |
//! | `deactivate`, `close`         | release the page                                 |
//!
//! `rows_per_page` is the number of rows the first fill fitted. Starting a
//! third of a page before the target keeps a short backwards scroll inside
//! the new page.
//!
//! When a page fills up before reaching the row that was asked for, the
//! window is cleared and filling restarts at that row, so the requested row
//! is always in the page after a successful fill.

use eyre::{bail, ensure, Result, WrapErr};

use super::RowSource;
use crate::config::FILL_LOOKBEHIND_DIVISOR;
use crate::types::{FieldType, Value};
use crate::window::{RowWindow, WindowBuilder};

/// Forward-only row producer.
pub trait RowProducer {
    fn column_names(&self) -> &[String];

    /// Restarts production before the first row.
    fn rewind(&mut self) -> Result<()>;

    /// Advances to the next row. `Ok(false)` once the rows are exhausted.
    fn step(&mut self) -> Result<bool>;

    /// Reads a column of the current row.
    fn value(&self, column: usize) -> Result<Value<'_>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProducerFill {
    /// Absolute position of the window's first row.
    pub start_position: usize,
    pub rows: usize,
    /// Total rows produced, when counting was requested.
    pub total: Option<usize>,
}

/// Fills `window` from `producer`, starting at row `start`.
///
/// If the window fills up before reaching row `required`, it is cleared and
/// filled again starting from the row that did not fit. With `count_all`,
/// the producer is drained after the window is full to count every row.
pub fn fill_from_producer<P: RowProducer + ?Sized>(
    producer: &mut P,
    window: &RowWindow,
    start: usize,
    required: usize,
    count_all: bool,
) -> Result<ProducerFill> {
    let _reference = window.reference();
    let num_columns = producer.column_names().len();

    reset_window(window, start, num_columns)?;
    producer.rewind()?;

    let mut start = start;
    let mut total = 0usize;
    let mut added = 0usize;
    let mut full = false;

    while !full || count_all {
        if !producer.step()? {
            break;
        }
        let row = total;
        total += 1;
        if row < start || full {
            continue;
        }

        let mut copied = copy_row(producer, window, row, num_columns)?;
        if !copied && added > 0 && start + added <= required {
            reset_window(window, row, num_columns)?;
            start = row;
            added = 0;
            copied = copy_row(producer, window, row, num_columns)?;
        }

        if copied {
            added += 1;
        } else if added == 0 {
            bail!(
                "row {} does not fit in an empty window of {} bytes",
                row,
                window.capacity()
            );
        } else {
            full = true;
        }
    }

    Ok(ProducerFill {
        start_position: start,
        rows: added,
        total: count_all.then_some(total),
    })
}

fn reset_window(window: &RowWindow, start: usize, num_columns: usize) -> Result<()> {
    window.clear();
    window.set_start_position(start)?;
    ensure!(
        window.set_num_columns(num_columns),
        "window '{}' refused {} columns",
        window.name(),
        num_columns
    );
    Ok(())
}

fn copy_row<P: RowProducer + ?Sized>(
    producer: &P,
    window: &RowWindow,
    row: usize,
    num_columns: usize,
) -> Result<bool> {
    if !window.alloc_row() {
        return Ok(false);
    }
    for column in 0..num_columns {
        let value = match producer.value(column) {
            Ok(value) => value,
            Err(e) => {
                window.free_last_row();
                return Err(e).wrap_err_with(|| format!("failed to read row {} column {}", row, column));
            }
        };
        if !window.put_value(&value, row, column)? {
            window.free_last_row();
            return Ok(false);
        }
    }
    Ok(true)
}

/// A [`RowSource`] that pages a [`RowProducer`] through a single window.
pub struct WindowedSource<P: RowProducer> {
    producer: P,
    template: WindowBuilder,
    column_names: Vec<String>,
    window: Option<RowWindow>,
    count: usize,
    rows_per_page: usize,
}

impl<P: RowProducer> std::fmt::Debug for WindowedSource<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowedSource")
            .field("column_names", &self.column_names)
            .field("count", &self.count)
            .field("rows_per_page", &self.rows_per_page)
            .field("window", &self.window)
            .finish()
    }
}

impl<P: RowProducer> WindowedSource<P> {
    /// Builds the source and fills its first page, counting every row.
    /// `template` configures the window allocated for the pages.
    pub fn new(producer: P, template: WindowBuilder) -> Result<Self> {
        let column_names = producer.column_names().to_vec();
        let mut source = Self {
            producer,
            template,
            column_names,
            window: None,
            count: 0,
            rows_per_page: 0,
        };
        source.fill_counting()?;
        Ok(source)
    }

    pub fn producer(&self) -> &P {
        &self.producer
    }

    pub fn rows_per_page(&self) -> usize {
        self.rows_per_page
    }

    fn ensure_page(&mut self) -> Result<()> {
        if self.window.is_none() {
            self.window = Some(self.template.build()?);
        }
        Ok(())
    }

    fn fill_counting(&mut self) -> Result<()> {
        self.ensure_page()?;
        let Some(window) = self.window.as_ref() else {
            bail!("window was not allocated");
        };
        let fill = fill_from_producer(&mut self.producer, window, 0, 0, true)?;
        self.count = fill.total.unwrap_or(fill.rows);
        self.rows_per_page = fill.rows;
        log::debug!(
            "counted {} rows, {} per page of window '{}'",
            self.count,
            self.rows_per_page,
            window.name()
        );
        Ok(())
    }

    fn fill(&mut self, required: usize) -> Result<()> {
        let start = required.saturating_sub(self.rows_per_page / FILL_LOOKBEHIND_DIVISOR);
        self.ensure_page()?;
        let Some(window) = self.window.as_ref() else {
            bail!("window was not allocated");
        };
        let fill = fill_from_producer(&mut self.producer, window, start, required, false)?;
        log::debug!(
            "refilled window '{}' with rows [{}, {}) for position {}",
            window.name(),
            fill.start_position,
            fill.start_position + fill.rows,
            required
        );
        Ok(())
    }

    fn loaded(&self, position: usize) -> Result<&RowWindow> {
        match &self.window {
            Some(window) => Ok(window),
            None => bail!("no page is loaded for position {}", position),
        }
    }
}

impl<P: RowProducer> RowSource for WindowedSource<P> {
    fn count(&self) -> usize {
        self.count
    }

    fn column_names(&self) -> &[String] {
        &self.column_names
    }

    fn get_type(&self, position: usize, column: usize) -> Result<FieldType> {
        self.loaded(position)?.get_type(position, column)
    }

    fn get_string(&self, position: usize, column: usize) -> Result<Option<String>> {
        self.loaded(position)?.get_string(position, column)
    }

    fn get_long(&self, position: usize, column: usize) -> Result<i64> {
        self.loaded(position)?.get_long(position, column)
    }

    fn get_double(&self, position: usize, column: usize) -> Result<f64> {
        self.loaded(position)?.get_double(position, column)
    }

    fn get_blob(&self, position: usize, column: usize) -> Result<Option<Vec<u8>>> {
        self.loaded(position)?.get_blob(position, column)
    }

    fn on_move(&mut self, _old_position: Option<usize>, new_position: usize) -> bool {
        if let Some(window) = &self.window {
            if window.contains_row(new_position) {
                return true;
            }
        }
        match self.fill(new_position) {
            Ok(()) => self
                .window
                .as_ref()
                .is_some_and(|window| window.contains_row(new_position)),
            Err(e) => {
                log::warn!("failed to page in row {}: {:#}", new_position, e);
                false
            }
        }
    }

    fn window(&self) -> Option<&RowWindow> {
        self.window.as_ref()
    }

    fn deactivate(&mut self) {
        self.window = None;
    }

    fn requery(&mut self) -> Result<bool> {
        self.fill_counting()?;
        Ok(true)
    }

    fn close(&mut self) {
        self.window = None;
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::cursor::{FillOutcome, MemoryProducer, PositionedCursor};
    use crate::types::OwnedValue;

    /// Fails to read the row at `failing` once armed.
    struct FlakyProducer {
        inner: MemoryProducer,
        row: Option<usize>,
        failing: Cell<Option<usize>>,
    }

    impl FlakyProducer {
        fn new(rows: usize) -> Self {
            Self {
                inner: producer(rows),
                row: None,
                failing: Cell::new(None),
            }
        }
    }

    impl RowProducer for FlakyProducer {
        fn column_names(&self) -> &[String] {
            self.inner.column_names()
        }

        fn rewind(&mut self) -> Result<()> {
            self.row = None;
            self.inner.rewind()
        }

        fn step(&mut self) -> Result<bool> {
            let stepped = self.inner.step()?;
            if stepped {
                self.row = Some(self.row.map_or(0, |row| row + 1));
            }
            Ok(stepped)
        }

        fn value(&self, column: usize) -> Result<Value<'_>> {
            if self.row.is_some() && self.row == self.failing.get() {
                bail!("disk I/O error at row {}", self.failing.get().unwrap_or_default());
            }
            self.inner.value(column)
        }
    }

    fn flaky_cursor(rows: usize) -> PositionedCursor<WindowedSource<FlakyProducer>> {
        let source =
            WindowedSource::new(FlakyProducer::new(rows), RowWindow::builder().capacity(1024)).unwrap();
        PositionedCursor::new(source)
    }

    fn producer(rows: usize) -> MemoryProducer {
        MemoryProducer::new(
            ["id", "name"],
            (0..rows)
                .map(|i| vec![OwnedValue::Int(i as i64), OwnedValue::Text(format!("name-{:03}", i))])
                .collect(),
        )
        .unwrap()
    }

    fn window(capacity: usize) -> RowWindow {
        RowWindow::new("producer", capacity).unwrap()
    }

    #[test]
    fn fills_from_the_start_and_counts() {
        let mut p = producer(50);
        let w = window(64 * 1024);
        let fill = fill_from_producer(&mut p, &w, 0, 0, true).unwrap();
        assert_eq!(fill, ProducerFill { start_position: 0, rows: 50, total: Some(50) });
        assert_eq!(w.get_string(49, 1).unwrap().as_deref(), Some("name-049"));
    }

    #[test]
    fn skips_to_the_start_position() {
        let mut p = producer(50);
        let w = window(64 * 1024);
        let fill = fill_from_producer(&mut p, &w, 20, 20, false).unwrap();
        assert_eq!(fill.start_position, 20);
        assert_eq!(fill.rows, 30);
        assert_eq!(fill.total, None);
        assert_eq!(w.start_position(), 20);
        assert_eq!(w.get_long(20, 0).unwrap(), 20);
    }

    #[test]
    fn counting_continues_after_the_window_is_full() {
        let mut p = producer(500);
        let w = window(1024);
        let fill = fill_from_producer(&mut p, &w, 0, 0, true).unwrap();
        assert!(fill.rows < 500);
        assert_eq!(fill.total, Some(500));
    }

    #[test]
    fn restarts_at_the_required_row_when_full_too_early() {
        let mut p = producer(500);
        let w = window(1024);
        let per_page = fill_from_producer(&mut p, &w, 0, 0, false).unwrap().rows;

        let required = per_page * 3;
        let fill = fill_from_producer(&mut p, &w, 0, required, false).unwrap();
        assert!(fill.start_position <= required);
        assert!(w.contains_row(required));
        assert_eq!(w.get_long(required, 0).unwrap(), required as i64);
    }

    #[test]
    fn row_larger_than_the_window_is_an_error() {
        let mut p = MemoryProducer::new(["blob"], vec![vec![OwnedValue::Blob(vec![0; 4096])]]).unwrap();
        let w = window(1024);
        let err = fill_from_producer(&mut p, &w, 0, 0, false).unwrap_err();
        assert!(err.to_string().contains("does not fit"));
        assert_eq!(w.num_rows(), 0);
    }

    #[test]
    fn source_pages_on_move() {
        let source = WindowedSource::new(producer(300), RowWindow::builder().capacity(1024)).unwrap();
        let per_page = source.rows_per_page();
        assert!(per_page > 0 && per_page < 300);
        assert_eq!(source.count(), 300);

        let mut cursor = PositionedCursor::new(source);
        assert!(cursor.move_to_position(250));
        assert_eq!(cursor.get_long(0).unwrap(), 250);

        let window = cursor.window().unwrap();
        assert_eq!(window.start_position(), 250 - per_page / FILL_LOOKBEHIND_DIVISOR);
        assert!(window.contains_row(250));

        assert!(cursor.move_to_position(0));
        assert_eq!(cursor.get_string(1).unwrap().as_deref(), Some("name-000"));
    }

    #[test]
    fn moves_inside_the_page_do_not_refill() {
        let source = WindowedSource::new(producer(100), RowWindow::builder().capacity(64 * 1024)).unwrap();
        let rewinds = source.producer().rewinds();
        let mut cursor = PositionedCursor::new(source);

        while cursor.move_to_next() {}
        assert_eq!(cursor.source().producer().rewinds(), rewinds);
    }

    #[test]
    fn deactivate_releases_the_page_and_requery_restores_it() {
        let source = WindowedSource::new(producer(10), RowWindow::builder().capacity(4096)).unwrap();
        let mut cursor = PositionedCursor::new(source);
        assert!(cursor.move_to_position(3));

        cursor.deactivate();
        assert!(cursor.window().is_none());

        assert!(cursor.requery().unwrap());
        assert!(cursor.window().is_some());
        assert!(cursor.move_to_position(3));
        assert_eq!(cursor.get_long(0).unwrap(), 3);
    }

    #[test]
    fn failed_refill_rejects_the_move() {
        let mut cursor = flaky_cursor(300);
        assert!(cursor.move_to_position(3));
        let per_page = cursor.source().rows_per_page();
        let target = 260;
        let start = target - per_page / FILL_LOOKBEHIND_DIVISOR;
        cursor.source().producer().failing.set(Some(start + 1));

        assert!(!cursor.move_to_position(target as isize));
        assert_eq!(cursor.position(), -1);
        assert!(cursor.is_before_first());
        assert!(cursor.get_long(0).is_err());

        cursor.source().producer().failing.set(None);
        assert!(cursor.move_to_position(target as isize));
        assert_eq!(cursor.get_long(0).unwrap(), target as i64);
    }

    #[test]
    fn fill_window_reports_failed_refill() {
        let mut cursor = flaky_cursor(300);
        cursor.source().producer().failing.set(Some(200));
        let target = RowWindow::new("export", 64 * 1024).unwrap();

        let report = cursor.fill_window(150, &target).unwrap();

        assert!(matches!(report.outcome, FillOutcome::SourceError(_)));
        assert_eq!(report.start_position, 150);
        assert!(report.rows > 0);
        assert!(report.next_position() <= 200);
        for row in 150..report.next_position() {
            assert_eq!(target.get_long(row, 0).unwrap(), row as i64);
        }
        assert_eq!(cursor.position(), -1);
    }
}
