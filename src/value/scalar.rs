use super::Value;

/// Width-specific numeric scalars, as produced by numeric array libraries.
///
/// These never cross the wire: encoding unwraps them to the nearest portable
/// [`Value::Int`] or [`Value::Float`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumericScalar {
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
}

impl NumericScalar {
    /// Converts the scalar to the nearest portable primitive.
    pub fn to_portable(self) -> Value {
        match self {
            NumericScalar::Int8(v) => Value::Int(v.into()),
            NumericScalar::Int16(v) => Value::Int(v.into()),
            NumericScalar::Int32(v) => Value::Int(v.into()),
            NumericScalar::Int64(v) => Value::Int(v),
            NumericScalar::UInt8(v) => Value::Int(v.into()),
            NumericScalar::UInt16(v) => Value::Int(v.into()),
            NumericScalar::UInt32(v) => Value::Int(v.into()),
            // Values beyond i64 lose precision rather than wrapping.
            NumericScalar::UInt64(v) => i64::try_from(v)
                .map(Value::Int)
                .unwrap_or(Value::Float(v as f64)),
            NumericScalar::Float32(v) => Value::Float(v.into()),
            NumericScalar::Float64(v) => Value::Float(v),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            NumericScalar::Int8(_) => "int8",
            NumericScalar::Int16(_) => "int16",
            NumericScalar::Int32(_) => "int32",
            NumericScalar::Int64(_) => "int64",
            NumericScalar::UInt8(_) => "uint8",
            NumericScalar::UInt16(_) => "uint16",
            NumericScalar::UInt32(_) => "uint32",
            NumericScalar::UInt64(_) => "uint64",
            NumericScalar::Float32(_) => "float32",
            NumericScalar::Float64(_) => "float64",
        }
    }

    pub fn is_integer(&self) -> bool {
        !matches!(self, NumericScalar::Float32(_) | NumericScalar::Float64(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwraps_to_portable_primitives() {
        assert_eq!(NumericScalar::Int32(-4).to_portable(), Value::Int(-4));
        assert_eq!(NumericScalar::Float32(0.5).to_portable(), Value::Float(0.5));
        assert_eq!(
            NumericScalar::UInt64(u64::MAX).to_portable(),
            Value::Float(u64::MAX as f64)
        );
    }
}
