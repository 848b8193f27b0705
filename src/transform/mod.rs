//! The two-phase transform protocol and its variants.
//!
//! Every feature transform implements three steps:
//!
//! 1. `pre_process` on each partition, producing partial statistics. Calls on
//!    disjoint partitions are independent and may run in parallel.
//! 2. `merge` exactly once over all partial results, producing the global
//!    parameters. This is the only step that mutates the transform.
//! 3. `apply` on each partition (possibly re-partitioned), a read-only
//!    function of the global parameters and the batch.
//!
//! Calling `apply` before `merge` is a caller error and reported as
//! [`TransformError::NotMerged`].
//!
//! The set of variants is closed: [`FeatureTransform`] dispatches over
//! [`MinMaxNormalizer`], [`CategoricalEncoder`] and [`PassthroughTransform`].

pub mod categorical;
pub mod minmax;
pub mod passthrough;

pub use categorical::{split_record, CategoricalEncoder, TokenSet, Vocabulary};
pub use minmax::{Extrema, MinMaxNormalizer, MinMaxParams};
pub use passthrough::PassthroughTransform;

use crate::batch::{FeatureArray, FeatureBatch};
use crate::config::{TransformConfig, TransformKind};
use crate::dtype::DType;
use crate::error::{Result, TransformError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One feature transform following the two-phase protocol.
///
/// # Type Parameters
/// - `Partial`: per-partition statistics returned by `pre_process`.
/// - `Params`: global parameters produced by `merge`.
pub trait TwoPhaseTransform {
    /// Per-partition statistics.
    type Partial: Clone + Send + Sync;
    /// Global parameters, persistable by the caller.
    type Params: Clone + Serialize + DeserializeOwned;

    /// Name of the input attribute.
    fn feature_name(&self) -> &str;

    /// Name of the produced tensor.
    fn output_name(&self) -> &str;

    /// Configured output width, if any.
    fn out_dtype(&self) -> Option<DType>;

    /// Compute partial statistics for one partition.
    ///
    /// `None` means the partition contributes nothing to `merge`.
    fn pre_process(&self, batch: &FeatureBatch) -> Result<Option<Self::Partial>>;

    /// Aggregate every partition's partial statistics into global parameters.
    ///
    /// Replaces any parameters held before. Returns the new parameters, or
    /// `None` when the transform has nothing to merge.
    fn merge(&mut self, partials: Vec<Self::Partial>) -> Result<Option<Self::Params>>;

    /// Transform one partition using the global parameters.
    fn apply(&self, batch: &FeatureBatch) -> Result<FeatureArray>;

    /// Global parameters currently held.
    fn params(&self) -> Option<&Self::Params>;
}

/// Partial statistics of any variant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PartialStats {
    Extrema(Extrema),
    Tokens(TokenSet),
}

impl PartialStats {
    fn kind(&self) -> &'static str {
        match self {
            PartialStats::Extrema(_) => "extrema",
            PartialStats::Tokens(_) => "tokens",
        }
    }
}

/// Global parameters of any variant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum GlobalParams {
    MinMax(MinMaxParams),
    Vocabulary(Vocabulary),
}

/// A feature transform of one of the supported kinds.
#[derive(Clone, Debug)]
pub enum FeatureTransform {
    MinMax(MinMaxNormalizer),
    Categorical(CategoricalEncoder),
    Passthrough(PassthroughTransform),
}

impl FeatureTransform {
    /// Build the transform described by a feature configuration.
    pub fn from_config(config: &TransformConfig) -> Result<Self> {
        let out_dtype = config.resolve_out_dtype()?;
        let feature = config.feature_col.as_str();
        let output = config.output_name();

        let transform = match &config.transform {
            Some(TransformKind::MaxMinNorm {
                max_bound,
                min_bound,
            }) => {
                let mut t =
                    MinMaxNormalizer::new(feature, output).with_bounds(*max_bound, *min_bound)?;
                if let Some(dtype) = out_dtype {
                    t = t.with_out_dtype(dtype);
                }
                FeatureTransform::MinMax(t)
            }
            Some(TransformKind::ToCategorical { separator, mapping }) => {
                let mut t = CategoricalEncoder::new(feature, output);
                if let Some(sep) = separator {
                    t = t.with_separator(sep.as_str())?;
                }
                if let Some(vocab) = mapping {
                    t = t.with_mapping(vocab.clone());
                }
                if let Some(dtype) = out_dtype {
                    t = t.with_out_dtype(dtype);
                }
                FeatureTransform::Categorical(t)
            }
            None => {
                let mut t = PassthroughTransform::new(feature, output);
                if let Some(dtype) = out_dtype {
                    t = t.with_out_dtype(dtype);
                }
                FeatureTransform::Passthrough(t)
            }
        };
        Ok(transform)
    }

    /// Configuration that rebuilds this transform, including any mapping
    /// discovered by `merge`.
    pub fn export_config(&self) -> TransformConfig {
        let config = TransformConfig::new(self.feature_name()).with_feature_name(self.output_name());
        let config = match self.out_dtype() {
            Some(dtype) => config.with_out_dtype(dtype.name()),
            None => config,
        };
        match self {
            FeatureTransform::MinMax(t) => config.with_transform(TransformKind::MaxMinNorm {
                max_bound: t.max_bound(),
                min_bound: t.min_bound(),
            }),
            FeatureTransform::Categorical(t) => {
                config.with_transform(TransformKind::ToCategorical {
                    separator: t.separator().map(str::to_string),
                    mapping: t.vocabulary().cloned(),
                })
            }
            FeatureTransform::Passthrough(_) => config,
        }
    }

    /// Short name of the variant, matching the configuration name.
    pub fn kind_name(&self) -> &'static str {
        match self {
            FeatureTransform::MinMax(_) => "max_min_norm",
            FeatureTransform::Categorical(_) => "to_categorical",
            FeatureTransform::Passthrough(_) => "noop",
        }
    }

    pub fn feature_name(&self) -> &str {
        match self {
            FeatureTransform::MinMax(t) => t.feature_name(),
            FeatureTransform::Categorical(t) => t.feature_name(),
            FeatureTransform::Passthrough(t) => t.feature_name(),
        }
    }

    pub fn output_name(&self) -> &str {
        match self {
            FeatureTransform::MinMax(t) => t.output_name(),
            FeatureTransform::Categorical(t) => t.output_name(),
            FeatureTransform::Passthrough(t) => t.output_name(),
        }
    }

    pub fn out_dtype(&self) -> Option<DType> {
        match self {
            FeatureTransform::MinMax(t) => t.out_dtype(),
            FeatureTransform::Categorical(t) => t.out_dtype(),
            FeatureTransform::Passthrough(t) => t.out_dtype(),
        }
    }

    /// Partial statistics for one partition, if this transform produces any.
    pub fn partial_stats(&self, batch: &FeatureBatch) -> Result<Option<PartialStats>> {
        Ok(match self {
            FeatureTransform::MinMax(t) => t.pre_process(batch)?.map(PartialStats::Extrema),
            FeatureTransform::Categorical(t) => t.pre_process(batch)?.map(PartialStats::Tokens),
            FeatureTransform::Passthrough(t) => {
                t.pre_process(batch)?;
                None
            }
        })
    }

    /// `{output_name: partial}`, or an empty map when there is nothing to
    /// report.
    ///
    /// Keyed by output name so that two transforms reading the same column
    /// never collide when keyed results are combined.
    pub fn pre_process(&self, batch: &FeatureBatch) -> Result<HashMap<String, PartialStats>> {
        let mut out = HashMap::new();
        if let Some(stats) = self.partial_stats(batch)? {
            out.insert(self.output_name().to_string(), stats);
        }
        Ok(out)
    }

    /// Merge partial statistics gathered from every partition.
    ///
    /// Statistics of another variant's kind are rejected with
    /// [`TransformError::InvalidConfig`].
    pub fn merge(&mut self, partials: Vec<PartialStats>) -> Result<Option<GlobalParams>> {
        match self {
            FeatureTransform::MinMax(t) => {
                let extrema = partials
                    .into_iter()
                    .map(|p| match p {
                        PartialStats::Extrema(e) => Ok(e),
                        other => Err(mismatched(t.feature_name(), "extrema", &other)),
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(t.merge(extrema)?.map(GlobalParams::MinMax))
            }
            FeatureTransform::Categorical(t) => {
                let tokens = partials
                    .into_iter()
                    .map(|p| match p {
                        PartialStats::Tokens(set) => Ok(set),
                        other => Err(mismatched(t.feature_name(), "tokens", &other)),
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(t.merge(tokens)?.map(GlobalParams::Vocabulary))
            }
            FeatureTransform::Passthrough(t) => match partials.first() {
                Some(other) => Err(mismatched(t.feature_name(), "nothing", other)),
                None => Ok(None),
            },
        }
    }

    /// Transform one partition into the output tensor.
    pub fn transform(&self, batch: &FeatureBatch) -> Result<FeatureArray> {
        match self {
            FeatureTransform::MinMax(t) => t.apply(batch),
            FeatureTransform::Categorical(t) => t.apply(batch),
            FeatureTransform::Passthrough(t) => t.apply(batch),
        }
    }

    /// `{output_name: tensor}` for one partition.
    pub fn apply(&self, batch: &FeatureBatch) -> Result<HashMap<String, FeatureArray>> {
        let out = self.transform(batch)?;
        Ok(HashMap::from([(self.output_name().to_string(), out)]))
    }

    /// Global parameters currently held, for persistence.
    pub fn global_params(&self) -> Option<GlobalParams> {
        match self {
            FeatureTransform::MinMax(t) => t.params().cloned().map(GlobalParams::MinMax),
            FeatureTransform::Categorical(t) => {
                t.params().cloned().map(GlobalParams::Vocabulary)
            }
            FeatureTransform::Passthrough(_) => None,
        }
    }

    /// Reinstall persisted global parameters, skipping the first phase.
    pub fn restore(&mut self, params: GlobalParams) -> Result<()> {
        match (&mut *self, params) {
            (FeatureTransform::MinMax(t), GlobalParams::MinMax(p)) => {
                *t = t.clone().with_params(p)?;
                Ok(())
            }
            (FeatureTransform::Categorical(t), GlobalParams::Vocabulary(v)) => {
                *t = t.clone().with_mapping(v);
                Ok(())
            }
            (t, _) => Err(TransformError::InvalidConfig(format!(
                "cannot restore parameters of another kind into {} transform '{}'",
                t.kind_name(),
                t.feature_name()
            ))),
        }
    }
}

impl From<MinMaxNormalizer> for FeatureTransform {
    fn from(t: MinMaxNormalizer) -> Self {
        FeatureTransform::MinMax(t)
    }
}

impl From<CategoricalEncoder> for FeatureTransform {
    fn from(t: CategoricalEncoder) -> Self {
        FeatureTransform::Categorical(t)
    }
}

impl From<PassthroughTransform> for FeatureTransform {
    fn from(t: PassthroughTransform) -> Self {
        FeatureTransform::Passthrough(t)
    }
}

fn mismatched(feature: &str, expected: &str, got: &PartialStats) -> TransformError {
    TransformError::InvalidConfig(format!(
        "transform '{}' expects {} partial stats, got {}",
        feature,
        expected,
        got.kind()
    ))
}
