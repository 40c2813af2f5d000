//! Values returned by a program's entry point.

use std::fmt;

/// Success payload of a cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// `main` returned nothing
    Void,
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    V128(u128),
    /// Reference types are shown by description only
    Reference(String),
    /// Multi-value return
    Multiple(Vec<Value>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Void => f.write_str("()"),
            Self::I32(value) => write!(f, "{value}"),
            Self::I64(value) => write!(f, "{value}"),
            Self::F32(value) => write!(f, "{value}"),
            Self::F64(value) => write!(f, "{value}"),
            Self::V128(value) => write!(f, "0x{value:032x}"),
            Self::Reference(description) => f.write_str(description),
            Self::Multiple(values) => {
                for (index, value) in values.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{value}")?;
                }
                Ok(())
            }
        }
    }
}
