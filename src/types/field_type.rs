//! # Field Type Tags
//!
//! The tag byte stored in each field slot. The numeric values are part of the
//! window's binary layout and must never be renumbered: a zeroed slot reads as
//! `Null`, which is what `alloc_row` relies on.

use std::fmt;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Null = 0,
    Integer = 1,
    Float = 2,
    String = 3,
    Blob = 4,
}

impl FieldType {
    /// Decodes a tag byte. Unknown tags indicate a corrupted buffer.
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(FieldType::Null),
            1 => Some(FieldType::Integer),
            2 => Some(FieldType::Float),
            3 => Some(FieldType::String),
            4 => Some(FieldType::Blob),
            _ => None,
        }
    }

    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// True for types whose payload lives in the variable data area.
    pub fn is_variable(self) -> bool {
        matches!(self, FieldType::String | FieldType::Blob)
    }

    pub fn name(self) -> &'static str {
        match self {
            FieldType::Null => "NULL",
            FieldType::Integer => "INTEGER",
            FieldType::Float => "FLOAT",
            FieldType::String => "STRING",
            FieldType::Blob => "BLOB",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_round_trip_through_bytes() {
        for ty in [
            FieldType::Null,
            FieldType::Integer,
            FieldType::Float,
            FieldType::String,
            FieldType::Blob,
        ] {
            assert_eq!(FieldType::from_byte(ty.as_byte()), Some(ty));
        }
    }

    #[test]
    fn zero_byte_is_null_and_unknown_tags_are_rejected() {
        assert_eq!(FieldType::from_byte(0), Some(FieldType::Null));
        assert_eq!(FieldType::from_byte(5), None);
        assert_eq!(FieldType::from_byte(0xFF), None);
    }

    #[test]
    fn only_strings_and_blobs_are_variable() {
        assert!(FieldType::String.is_variable());
        assert!(FieldType::Blob.is_variable());
        assert!(!FieldType::Integer.is_variable());
        assert!(!FieldType::Null.is_variable());
    }
}
