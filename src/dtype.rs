//! Floating-point widths and casting between them.
//!
//! Output widths are named in configuration (`"float16"`, `"float32"`).
//! Inputs may additionally arrive as `f64`, which is a valid array width but
//! not a width a transform can be asked to produce.

use crate::batch::FeatureArray;
use crate::error::{Result, TransformError};
use half::f16;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Floating-point element width of a [`FeatureArray`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DType {
    #[serde(rename = "float16")]
    Float16,
    #[serde(rename = "float32")]
    Float32,
    #[serde(rename = "float64")]
    Float64,
}

impl DType {
    /// Resolve a configured output width by name.
    ///
    /// Only half and single precision are accepted; every other name,
    /// including integer widths and `float64`, fails with
    /// [`TransformError::UnsupportedDType`].
    pub fn resolve(name: &str) -> Result<Self> {
        match name {
            "float16" => Ok(DType::Float16),
            "float32" => Ok(DType::Float32),
            other => Err(TransformError::UnsupportedDType(other.to_string())),
        }
    }

    /// Canonical configuration name.
    pub fn name(&self) -> &'static str {
        match self {
            DType::Float16 => "float16",
            DType::Float32 => "float32",
            DType::Float64 => "float64",
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Cast an array to the requested width.
///
/// Narrowing rounds to nearest and overflows to infinity, exactly as the
/// target float type does. Values are never clamped.
pub fn cast(array: &FeatureArray, dtype: DType) -> FeatureArray {
    if array.dtype() == dtype {
        return array.clone();
    }
    match (array, dtype) {
        (FeatureArray::F16(a), DType::Float32) => FeatureArray::F32(a.mapv(f32::from)),
        (FeatureArray::F16(a), DType::Float64) => FeatureArray::F64(a.mapv(f64::from)),
        (FeatureArray::F32(a), DType::Float16) => FeatureArray::F16(a.mapv(f16::from_f32)),
        (FeatureArray::F32(a), DType::Float64) => FeatureArray::F64(a.mapv(f64::from)),
        (FeatureArray::F64(a), DType::Float16) => FeatureArray::F16(a.mapv(f16::from_f64)),
        (FeatureArray::F64(a), DType::Float32) => FeatureArray::F32(a.mapv(|v| v as f32)),
        // Same-width pairs returned above.
        _ => array.clone(),
    }
}
