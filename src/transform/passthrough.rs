//! Identity transform with an optional width cast.

use crate::batch::{FeatureArray, FeatureBatch};
use crate::dtype::{cast, DType};
use crate::error::{Result, TransformError};
use crate::transform::TwoPhaseTransform;

/// Passes numeric features through, casting when a width is configured.
///
/// Holds no global state: `pre_process` reports nothing and `merge` is a
/// no-op.
#[derive(Clone, Debug)]
pub struct PassthroughTransform {
    feature_name: String,
    output_name: String,
    out_dtype: Option<DType>,
}

impl PassthroughTransform {
    pub fn new(feature_name: impl Into<String>, output_name: impl Into<String>) -> Self {
        Self {
            feature_name: feature_name.into(),
            output_name: output_name.into(),
            out_dtype: None,
        }
    }

    pub fn with_out_dtype(mut self, dtype: DType) -> Self {
        self.out_dtype = Some(dtype);
        self
    }
}

impl TwoPhaseTransform for PassthroughTransform {
    type Partial = ();
    type Params = ();

    fn feature_name(&self) -> &str {
        &self.feature_name
    }

    fn output_name(&self) -> &str {
        &self.output_name
    }

    fn out_dtype(&self) -> Option<DType> {
        self.out_dtype
    }

    fn pre_process(&self, _batch: &FeatureBatch) -> Result<Option<()>> {
        Ok(None)
    }

    fn merge(&mut self, _partials: Vec<()>) -> Result<Option<()>> {
        Ok(None)
    }

    fn apply(&self, batch: &FeatureBatch) -> Result<FeatureArray> {
        let array = match batch {
            FeatureBatch::Numeric(array) => array,
            FeatureBatch::Text(_) => {
                return Err(TransformError::UnsupportedInput {
                    feature: self.feature_name.clone(),
                    expected: "numeric",
                })
            }
        };
        Ok(match self.out_dtype {
            Some(dtype) => cast(array, dtype),
            None => array.clone(),
        })
    }

    fn params(&self) -> Option<&()> {
        None
    }
}
