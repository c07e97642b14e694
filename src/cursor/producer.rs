//! In-memory [`RowProducer`].

use eyre::{bail, ensure, Result};

use super::RowProducer;
use crate::types::{OwnedValue, Value};

#[derive(Debug, Clone)]
pub struct MemoryProducer {
    column_names: Vec<String>,
    rows: Vec<Vec<OwnedValue>>,
    current: Option<usize>,
    rewinds: usize,
}

impl MemoryProducer {
    pub fn new<I, N>(column_names: I, rows: Vec<Vec<OwnedValue>>) -> Result<Self>
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        let column_names: Vec<String> = column_names.into_iter().map(Into::into).collect();
        for (index, row) in rows.iter().enumerate() {
            ensure!(
                row.len() == column_names.len(),
                "row {} has {} values but there are {} columns",
                index,
                row.len(),
                column_names.len()
            );
        }
        Ok(Self {
            column_names,
            rows,
            current: None,
            rewinds: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of times production was restarted.
    pub fn rewinds(&self) -> usize {
        self.rewinds
    }
}

impl RowProducer for MemoryProducer {
    fn column_names(&self) -> &[String] {
        &self.column_names
    }

    fn rewind(&mut self) -> Result<()> {
        self.current = None;
        self.rewinds += 1;
        Ok(())
    }

    fn step(&mut self) -> Result<bool> {
        let next = self.current.map_or(0, |row| row + 1);
        if next >= self.rows.len() {
            self.current = Some(self.rows.len());
            return Ok(false);
        }
        self.current = Some(next);
        Ok(true)
    }

    fn value(&self, column: usize) -> Result<Value<'_>> {
        let Some(row) = self.current.and_then(|row| self.rows.get(row)) else {
            bail!("producer is not positioned on a row");
        };
        match row.get(column) {
            Some(value) => Ok(value.to_value()),
            None => bail!(
                "column {} is out of range for {} columns",
                column,
                self.column_names.len()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_ragged_rows() {
        let err = MemoryProducer::new(
            ["a", "b"],
            vec![vec![OwnedValue::Int(1), OwnedValue::Null], vec![OwnedValue::Int(2)]],
        )
        .unwrap_err();
        assert!(err.to_string().contains("row 1 has 1 values"));
    }

    #[test]
    fn steps_through_rows_and_rewinds() {
        let mut p = MemoryProducer::new(["n"], vec![vec![1i64.into()], vec![2i64.into()]]).unwrap();
        assert!(p.value(0).is_err());

        assert!(p.step().unwrap());
        assert_eq!(p.value(0).unwrap(), Value::Int(1));
        assert!(p.step().unwrap());
        assert_eq!(p.value(0).unwrap(), Value::Int(2));
        assert!(!p.step().unwrap());
        assert!(!p.step().unwrap());
        assert!(p.value(0).is_err());

        p.rewind().unwrap();
        assert_eq!(p.rewinds(), 1);
        assert!(p.step().unwrap());
        assert_eq!(p.value(0).unwrap(), Value::Int(1));
        assert!(p.value(1).is_err());
    }
}
