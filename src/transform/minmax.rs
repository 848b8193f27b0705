//! Min-max normalization over globally merged column extrema.
//!
//! Each partition reports per-column maxima and minima (optionally tightened
//! by configured bounds). Merging takes the elementwise max of maxima and
//! min of minima. Applying clips every value into `[min, max]` and rescales:
//!
//! ```text
//! x_scaled = (clip(x, min, max) - min) / (max - min)
//! ```
//!
//! When `max - min` overflows `f64`, the same quotient is computed on halved
//! terms, so extreme but finite columns still land in `[0, 1]`.
//!
//! A merged column with `max <= min` has no usable range. Every value in
//! such a column maps to `0.0`, on every call.

use crate::batch::{FeatureArray, FeatureBatch};
use crate::dtype::DType;
use crate::error::{Result, TransformError};
use crate::transform::TwoPhaseTransform;
use ndarray::{Array1, Axis, Zip};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Per-partition column extrema.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Extrema {
    /// Column maxima, after clipping to `max_bound`.
    pub max: Array1<f64>,
    /// Column minima, after clipping to `min_bound`.
    pub min: Array1<f64>,
}

impl Extrema {
    /// Number of columns the extrema describe.
    pub fn len(&self) -> usize {
        self.max.len()
    }

    pub fn is_empty(&self) -> bool {
        self.max.is_empty()
    }
}

impl From<(Array1<f64>, Array1<f64>)> for Extrema {
    fn from((max, min): (Array1<f64>, Array1<f64>)) -> Self {
        Self { max, min }
    }
}

/// Merged normalization bounds, one entry per column.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MinMaxParams {
    pub max: Array1<f64>,
    pub min: Array1<f64>,
}

impl MinMaxParams {
    /// Number of columns seen during merge.
    pub fn n_features(&self) -> usize {
        self.max.len()
    }

    /// Indices of columns whose range is empty or inverted.
    pub fn degenerate_columns(&self) -> Vec<usize> {
        self.max
            .iter()
            .zip(self.min.iter())
            .enumerate()
            .filter(|(_, (hi, lo))| !(hi > lo))
            .map(|(j, _)| j)
            .collect()
    }
}

/// Numeric feature transform scaling each column into `[0, 1]`.
#[derive(Clone, Debug)]
pub struct MinMaxNormalizer {
    feature_name: String,
    output_name: String,
    max_bound: Option<f64>,
    min_bound: Option<f64>,
    out_dtype: Option<DType>,
    params: Option<MinMaxParams>,
}

impl MinMaxNormalizer {
    /// Create a normalizer without bounds, keeping the input width.
    pub fn new(feature_name: impl Into<String>, output_name: impl Into<String>) -> Self {
        Self {
            feature_name: feature_name.into(),
            output_name: output_name.into(),
            max_bound: None,
            min_bound: None,
            out_dtype: None,
            params: None,
        }
    }

    /// Set the bounds that tighten observed extrema.
    ///
    /// Bounds only ever narrow the observed range. Rejects NaN bounds and
    /// `max_bound <= min_bound`.
    pub fn with_bounds(mut self, max_bound: Option<f64>, min_bound: Option<f64>) -> Result<Self> {
        if max_bound.is_some_and(f64::is_nan) || min_bound.is_some_and(f64::is_nan) {
            return Err(TransformError::InvalidConfig(format!(
                "bounds for '{}' must not be NaN",
                self.feature_name
            )));
        }
        if let (Some(hi), Some(lo)) = (max_bound, min_bound) {
            if hi <= lo {
                return Err(TransformError::DegenerateRange {
                    feature: self.feature_name.clone(),
                    max_bound: hi,
                    min_bound: lo,
                });
            }
        }
        self.max_bound = max_bound;
        self.min_bound = min_bound;
        Ok(self)
    }

    /// Cast outputs to `dtype` instead of keeping the input width.
    pub fn with_out_dtype(mut self, dtype: DType) -> Self {
        self.out_dtype = Some(dtype);
        self
    }

    /// Install previously merged parameters, e.g. loaded from storage.
    pub fn with_params(mut self, params: MinMaxParams) -> Result<Self> {
        if params.max.len() != params.min.len() {
            return Err(TransformError::ShapeMismatch {
                feature: self.feature_name.clone(),
                expected: params.max.len(),
                got: params.min.len(),
            });
        }
        self.params = Some(params);
        Ok(self)
    }

    pub fn max_bound(&self) -> Option<f64> {
        self.max_bound
    }

    pub fn min_bound(&self) -> Option<f64> {
        self.min_bound
    }

    fn numeric<'a>(&self, batch: &'a FeatureBatch) -> Result<&'a FeatureArray> {
        match batch {
            FeatureBatch::Numeric(array) => Ok(array),
            FeatureBatch::Text(_) => Err(TransformError::UnsupportedInput {
                feature: self.feature_name.clone(),
                expected: "numeric",
            }),
        }
    }
}

impl TwoPhaseTransform for MinMaxNormalizer {
    type Partial = Extrema;
    type Params = MinMaxParams;

    fn feature_name(&self) -> &str {
        &self.feature_name
    }

    fn output_name(&self) -> &str {
        &self.output_name
    }

    fn out_dtype(&self) -> Option<DType> {
        self.out_dtype
    }

    fn pre_process(&self, batch: &FeatureBatch) -> Result<Option<Extrema>> {
        let values = self.numeric(batch)?.to_f64();
        if values.nrows() == 0 {
            debug!(feature = %self.feature_name, "empty partition, no extrema");
            return Ok(None);
        }

        let mut max = values.fold_axis(Axis(0), f64::NEG_INFINITY, |&acc, &v| acc.max(v));
        let mut min = values.fold_axis(Axis(0), f64::INFINITY, |&acc, &v| acc.min(v));
        if let Some(bound) = self.max_bound {
            max.mapv_inplace(|v| v.min(bound));
        }
        if let Some(bound) = self.min_bound {
            min.mapv_inplace(|v| v.max(bound));
        }

        debug!(
            feature = %self.feature_name,
            rows = values.nrows(),
            columns = values.ncols(),
            "computed partition extrema"
        );
        Ok(Some(Extrema { max, min }))
    }

    fn merge(&mut self, partials: Vec<Extrema>) -> Result<Option<MinMaxParams>> {
        let mut iter = partials.into_iter();
        let first = iter
            .next()
            .ok_or_else(|| TransformError::EmptyPartials(self.feature_name.clone()))?;
        let n = first.max.len();
        if first.min.len() != n {
            return Err(TransformError::ShapeMismatch {
                feature: self.feature_name.clone(),
                expected: n,
                got: first.min.len(),
            });
        }

        let Extrema {
            max: mut global_max,
            min: mut global_min,
        } = first;
        let mut count = 1usize;
        for part in iter {
            for len in [part.max.len(), part.min.len()] {
                if len != n {
                    return Err(TransformError::ShapeMismatch {
                        feature: self.feature_name.clone(),
                        expected: n,
                        got: len,
                    });
                }
            }
            Zip::from(&mut global_max)
                .and(&part.max)
                .for_each(|g, &v| *g = (*g).max(v));
            Zip::from(&mut global_min)
                .and(&part.min)
                .for_each(|g, &v| *g = (*g).min(v));
            count += 1;
        }

        let params = MinMaxParams {
            max: global_max,
            min: global_min,
        };
        let degenerate = params.degenerate_columns();
        if !degenerate.is_empty() {
            warn!(
                feature = %self.feature_name,
                columns = ?degenerate,
                "degenerate columns will normalize to 0"
            );
        }
        debug!(feature = %self.feature_name, partitions = count, columns = n, "merged extrema");

        self.params = Some(params.clone());
        Ok(Some(params))
    }

    fn apply(&self, batch: &FeatureBatch) -> Result<FeatureArray> {
        let params = self
            .params
            .as_ref()
            .ok_or_else(|| TransformError::NotMerged(self.feature_name.clone()))?;
        let array = self.numeric(batch)?;
        if array.ncols() != params.n_features() {
            return Err(TransformError::ShapeMismatch {
                feature: self.feature_name.clone(),
                expected: params.n_features(),
                got: array.ncols(),
            });
        }

        let mut values = array.to_f64();
        for (j, mut col) in values.axis_iter_mut(Axis(1)).enumerate() {
            let (hi, lo) = (params.max[j], params.min[j]);
            if hi > lo {
                let range = hi - lo;
                if range.is_finite() {
                    col.mapv_inplace(|x| (x.max(lo).min(hi) - lo) / range);
                } else {
                    // hi - lo overflowed; halve every term first.
                    let half_range = hi / 2.0 - lo / 2.0;
                    col.mapv_inplace(|x| {
                        ((x.max(lo).min(hi) / 2.0 - lo / 2.0) / half_range).clamp(0.0, 1.0)
                    });
                }
            } else {
                col.fill(0.0);
            }
        }

        let dtype = self.out_dtype.unwrap_or_else(|| array.dtype());
        Ok(FeatureArray::from_f64(values, dtype))
    }

    fn params(&self) -> Option<&MinMaxParams> {
        self.params.as_ref()
    }
}
