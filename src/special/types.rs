use crate::error::CodecError;
use std::fmt;

/// Type objects that can appear as parameter values, e.g. a scaler's `dtype`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    Bool,
    Int,
    Float,
    Str,
    Int32,
    Int64,
    Float32,
    Float64,
}

impl ScalarType {
    /// The canonical wire name. Only numeric types are part of the table.
    pub fn wire_name(self) -> Result<&'static str, CodecError> {
        match self {
            ScalarType::Int => Ok("int"),
            ScalarType::Float => Ok("float"),
            ScalarType::Int32 => Ok("np.int32"),
            ScalarType::Int64 => Ok("np.int64"),
            ScalarType::Float32 => Ok("np.float32"),
            ScalarType::Float64 => Ok("np.float64"),
            other => Err(CodecError::UnknownTypeName(other.to_string())),
        }
    }

    pub fn from_wire_name(name: &str) -> Result<Self, CodecError> {
        match name {
            "int" | "np.int" => Ok(ScalarType::Int),
            "float" | "np.float" => Ok(ScalarType::Float),
            "np.int32" => Ok(ScalarType::Int32),
            "np.int64" => Ok(ScalarType::Int64),
            "np.float32" => Ok(ScalarType::Float32),
            "np.float64" => Ok(ScalarType::Float64),
            _ => Err(CodecError::UnknownTypeName(name.to_string())),
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScalarType::Bool => "bool",
            ScalarType::Int => "int",
            ScalarType::Float => "float",
            ScalarType::Str => "str",
            ScalarType::Int32 => "int32",
            ScalarType::Int64 => "int64",
            ScalarType::Float32 => "float32",
            ScalarType::Float64 => "float64",
        };
        f.write_str(name)
    }
}
