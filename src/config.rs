//! Feature transform configuration.
//!
//! A feature configuration names the input column, the output tensor, an
//! optional output width and an optional transform:
//!
//! ```json
//! [
//!   {"feature_col": "age", "feature_name": "age_norm", "out_dtype": "float16",
//!    "transform": {"name": "max_min_norm", "max_bound": 90.0, "min_bound": 0.0}},
//!   {"feature_col": "genres",
//!    "transform": {"name": "to_categorical", "separator": "|"}},
//!   {"feature_col": "embedding"}
//! ]
//! ```
//!
//! The width is kept as a string so that an unknown name surfaces as
//! [`TransformError::UnsupportedDType`] when the transform is built.

use crate::dtype::DType;
use crate::error::{Result, TransformError};
use crate::transform::Vocabulary;
use serde::{Deserialize, Serialize};

/// Construction-time settings of one feature transform.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransformConfig {
    /// Input attribute name.
    pub feature_col: String,
    /// Output tensor name; defaults to `feature_col`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_name: Option<String>,
    /// Output width name (`"float16"` or `"float32"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out_dtype: Option<String>,
    /// Transform kind; absent means passthrough.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<TransformKind>,
}

/// Transform kind with its kind-specific settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum TransformKind {
    /// Min-max normalization into `[0, 1]`.
    MaxMinNorm {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_bound: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min_bound: Option<f64>,
    },
    /// One-hot / multi-hot categorical encoding.
    ToCategorical {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        separator: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mapping: Option<Vocabulary>,
    },
}

impl TransformConfig {
    /// Passthrough configuration for `feature_col`.
    pub fn new(feature_col: impl Into<String>) -> Self {
        Self {
            feature_col: feature_col.into(),
            feature_name: None,
            out_dtype: None,
            transform: None,
        }
    }

    pub fn with_feature_name(mut self, name: impl Into<String>) -> Self {
        self.feature_name = Some(name.into());
        self
    }

    pub fn with_out_dtype(mut self, dtype: impl Into<String>) -> Self {
        self.out_dtype = Some(dtype.into());
        self
    }

    pub fn with_transform(mut self, transform: TransformKind) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Record a discovered vocabulary so later runs can skip discovery.
    ///
    /// Only valid for `to_categorical` configurations.
    pub fn with_mapping(mut self, vocabulary: Vocabulary) -> Result<Self> {
        match &mut self.transform {
            Some(TransformKind::ToCategorical { mapping, .. }) => {
                *mapping = Some(vocabulary);
                Ok(self)
            }
            _ => Err(TransformError::InvalidConfig(format!(
                "feature '{}' is not categorical; cannot attach a mapping",
                self.feature_col
            ))),
        }
    }

    /// Name of the produced tensor.
    pub fn output_name(&self) -> &str {
        self.feature_name.as_deref().unwrap_or(&self.feature_col)
    }

    /// Resolve the configured width, if any.
    pub fn resolve_out_dtype(&self) -> Result<Option<DType>> {
        self.out_dtype.as_deref().map(DType::resolve).transpose()
    }

    /// Parse a JSON array of feature configurations.
    pub fn load_all(json: &str) -> Result<Vec<Self>> {
        Ok(serde_json::from_str(json)?)
    }

    /// Render configurations as pretty JSON.
    pub fn to_json(configs: &[Self]) -> Result<String> {
        Ok(serde_json::to_string_pretty(configs)?)
    }
}
