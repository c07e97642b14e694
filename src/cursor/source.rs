//! The row-producing collaborator behind a [`PositionedCursor`](super::PositionedCursor).

use eyre::{bail, Result};

use crate::types::FieldType;
use crate::window::RowWindow;

/// Supplies rows by absolute position.
///
/// The cursor only calls the typed readers for positions in `[0, count)`,
/// and only after `on_move` reported success for that position.
pub trait RowSource {
    fn count(&self) -> usize;

    fn column_names(&self) -> &[String];

    fn column_count(&self) -> usize {
        self.column_names().len()
    }

    fn get_type(&self, position: usize, column: usize) -> Result<FieldType>;

    fn get_string(&self, position: usize, column: usize) -> Result<Option<String>>;

    fn get_long(&self, position: usize, column: usize) -> Result<i64>;

    fn get_double(&self, position: usize, column: usize) -> Result<f64>;

    fn get_blob(&self, position: usize, column: usize) -> Result<Option<Vec<u8>>> {
        let _ = (position, column);
        bail!("blob reads are not supported by this source")
    }

    /// Called before the cursor commits a move. Returning `false` rejects the
    /// move and leaves the cursor before the first row.
    fn on_move(&mut self, old_position: Option<usize>, new_position: usize) -> bool {
        let _ = (old_position, new_position);
        true
    }

    /// The window currently backing this source, if it pages through one.
    fn window(&self) -> Option<&RowWindow> {
        None
    }

    fn deactivate(&mut self) {}

    /// Re-runs the source. Returns `false` if it could not be refreshed.
    fn requery(&mut self) -> Result<bool> {
        Ok(true)
    }

    fn close(&mut self) {}
}
