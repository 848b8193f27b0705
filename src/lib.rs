//! # graph-feature-transform
//!
//! Distributed feature transforms for building graph datasets. Raw
//! per-entity attribute values, split across partitions, become normalized
//! numeric tensors with transform parameters that are consistent across all
//! partitions, without the full dataset ever being in one place.
//!
//! ## The two-phase protocol
//!
//! Every transform is driven in three steps by an external orchestrator:
//!
//! 1. `pre_process` each partition into partial statistics (column extrema,
//!    token sets). Independent per partition.
//! 2. `merge` all partial statistics once into global parameters
//!    (normalization bounds, vocabulary). Deterministic and independent of
//!    partition order.
//! 3. `apply` the global parameters to each partition. Independent per
//!    partition and read-only.
//!
//! ## Quick Start
//!
//! ```rust
//! use graph_feature_transform::{FeatureBatch, MinMaxNormalizer, TwoPhaseTransform};
//! use ndarray::array;
//!
//! let mut norm = MinMaxNormalizer::new("age", "age_norm");
//! let parts = [
//!     FeatureBatch::from(array![20.0f64, 35.0]),
//!     FeatureBatch::from(array![60.0f64]),
//! ];
//!
//! let partials = parts
//!     .iter()
//!     .filter_map(|p| norm.pre_process(p).transpose())
//!     .collect::<Result<Vec<_>, _>>()
//!     .unwrap();
//! norm.merge(partials).unwrap();
//!
//! let out = norm.apply(&parts[0]).unwrap().to_f64();
//! assert_eq!(out[[0, 0]], 0.0);
//! ```
//!
//! ## Module Structure
//!
//! - `dtype`: output widths and casting
//! - `batch`: input batches and typed output tensors
//! - `transform`: the protocol trait and the normalizer, encoder and
//!   passthrough variants
//! - `config`: JSON feature configuration
//! - `pipeline`: running many transforms over many partitions
//! - `serialization`: byte encoding of phase-one results and global
//!   parameters

/// Input batches and typed 2-D float tensors.
pub mod batch;

/// Feature configuration records.
pub mod config;

/// Floating-point widths and casts.
pub mod dtype;

/// Error type shared by every operation.
pub mod error;

/// Multi-feature, multi-partition driver.
pub mod pipeline;

/// Byte encoding of phase-one results and merged parameters.
pub mod serialization;

/// Two-phase transforms.
pub mod transform;

pub use batch::{FeatureArray, FeatureBatch};
pub use config::{TransformConfig, TransformKind};
pub use dtype::{cast, DType};
pub use error::{Result, TransformError};
pub use pipeline::{FeaturePipeline, Partition, PhaseOneResult};
pub use transform::{
    CategoricalEncoder, Extrema, FeatureTransform, GlobalParams, MinMaxNormalizer, MinMaxParams,
    PartialStats, PassthroughTransform, TokenSet, TwoPhaseTransform, Vocabulary,
};
