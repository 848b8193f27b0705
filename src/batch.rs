//! Feature batches: the per-partition input and output containers.
//!
//! A numeric batch is always handled as a 2-D `rows × columns` array. A flat
//! sequence of scalars is a single-column batch and is reshaped to
//! `(n, 1)` on the way in, so extrema vectors always have one entry per
//! column.

use crate::dtype::DType;
use crate::error::{Result, TransformError};
use half::f16;
use ndarray::{Array1, Array2, ArrayD, Axis, Ix1, Ix2};

/// A 2-D float tensor at one of the supported widths.
#[derive(Clone, Debug, PartialEq)]
pub enum FeatureArray {
    F16(Array2<f16>),
    F32(Array2<f32>),
    F64(Array2<f64>),
}

impl FeatureArray {
    /// Element width of the array.
    pub fn dtype(&self) -> DType {
        match self {
            FeatureArray::F16(_) => DType::Float16,
            FeatureArray::F32(_) => DType::Float32,
            FeatureArray::F64(_) => DType::Float64,
        }
    }

    /// `(rows, columns)`.
    pub fn shape(&self) -> (usize, usize) {
        match self {
            FeatureArray::F16(a) => a.dim(),
            FeatureArray::F32(a) => a.dim(),
            FeatureArray::F64(a) => a.dim(),
        }
    }

    pub fn nrows(&self) -> usize {
        self.shape().0
    }

    pub fn ncols(&self) -> usize {
        self.shape().1
    }

    /// Widen every element to `f64`. Exact for all supported widths.
    pub fn to_f64(&self) -> Array2<f64> {
        match self {
            FeatureArray::F16(a) => a.mapv(f64::from),
            FeatureArray::F32(a) => a.mapv(f64::from),
            FeatureArray::F64(a) => a.clone(),
        }
    }

    /// Build an array of the given width from `f64` values.
    pub fn from_f64(values: Array2<f64>, dtype: DType) -> Self {
        match dtype {
            DType::Float16 => FeatureArray::F16(values.mapv(f16::from_f64)),
            DType::Float32 => FeatureArray::F32(values.mapv(|v| v as f32)),
            DType::Float64 => FeatureArray::F64(values),
        }
    }

    /// Accept a dynamic-rank array, reshaping 1-D input into one column.
    pub fn from_dyn(values: ArrayD<f64>) -> Result<Self> {
        Ok(FeatureArray::F64(to_2d(values)?))
    }
}

/// Reshape a rank-1 or rank-2 array into 2-D column shape.
pub fn to_2d<T>(values: ArrayD<T>) -> Result<Array2<T>> {
    match values.ndim() {
        1 => {
            let flat = values
                .into_dimensionality::<Ix1>()
                .map_err(|_| TransformError::InvalidShape { ndim: 1 })?;
            Ok(column(flat))
        }
        2 => values
            .into_dimensionality::<Ix2>()
            .map_err(|_| TransformError::InvalidShape { ndim: 2 }),
        ndim => Err(TransformError::InvalidShape { ndim }),
    }
}

/// A flat sequence as an `(n, 1)` column.
pub fn column<T>(values: Array1<T>) -> Array2<T> {
    values.insert_axis(Axis(1))
}

impl From<Array2<f16>> for FeatureArray {
    fn from(a: Array2<f16>) -> Self {
        FeatureArray::F16(a)
    }
}

impl From<Array2<f32>> for FeatureArray {
    fn from(a: Array2<f32>) -> Self {
        FeatureArray::F32(a)
    }
}

impl From<Array2<f64>> for FeatureArray {
    fn from(a: Array2<f64>) -> Self {
        FeatureArray::F64(a)
    }
}

impl From<Array1<f16>> for FeatureArray {
    fn from(a: Array1<f16>) -> Self {
        FeatureArray::F16(column(a))
    }
}

impl From<Array1<f32>> for FeatureArray {
    fn from(a: Array1<f32>) -> Self {
        FeatureArray::F32(column(a))
    }
}

impl From<Array1<f64>> for FeatureArray {
    fn from(a: Array1<f64>) -> Self {
        FeatureArray::F64(column(a))
    }
}

/// Raw values of one attribute for the rows of one partition.
#[derive(Clone, Debug, PartialEq)]
pub enum FeatureBatch {
    /// Numeric values, rows × feature dimensions.
    Numeric(FeatureArray),
    /// One string per row; categorical input.
    Text(Vec<String>),
}

impl FeatureBatch {
    /// Number of rows (entities) in the batch.
    pub fn len(&self) -> usize {
        match self {
            FeatureBatch::Numeric(a) => a.nrows(),
            FeatureBatch::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Human-readable kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            FeatureBatch::Numeric(_) => "numeric",
            FeatureBatch::Text(_) => "text",
        }
    }
}

impl From<FeatureArray> for FeatureBatch {
    fn from(values: FeatureArray) -> Self {
        FeatureBatch::Numeric(values)
    }
}

macro_rules! numeric_batch_from {
    ($($t:ty),*) => {
        $(
            impl From<$t> for FeatureBatch {
                fn from(values: $t) -> Self {
                    FeatureBatch::Numeric(values.into())
                }
            }
        )*
    };
}

numeric_batch_from!(
    Array1<f16>,
    Array1<f32>,
    Array1<f64>,
    Array2<f16>,
    Array2<f32>,
    Array2<f64>
);

impl From<Vec<String>> for FeatureBatch {
    fn from(values: Vec<String>) -> Self {
        FeatureBatch::Text(values)
    }
}

impl From<Vec<&str>> for FeatureBatch {
    fn from(values: Vec<&str>) -> Self {
        FeatureBatch::Text(values.into_iter().map(str::to_string).collect())
    }
}
