//! Running the two-phase protocol over many features and partitions.
//!
//! A [`FeaturePipeline`] owns one transform per configured feature. The
//! caller drives it partition by partition:
//!
//! ```text
//!  partition 1 ──pre_process──┐
//!  partition 2 ──pre_process──┼──> merge (once) ──> apply on every partition
//!  partition N ──pre_process──┘
//! ```
//!
//! Phase-one results are positional (one slot per transform), so they can be
//! shipped between processes as plain data and merged anywhere. For the
//! single-process case, [`FeaturePipeline::run_local`] does all three steps
//! with rayon.

use crate::batch::{FeatureArray, FeatureBatch};
use crate::config::TransformConfig;
use crate::error::{Result, TransformError};
use crate::transform::{FeatureTransform, GlobalParams, PartialStats};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// Raw attribute batches of one partition, keyed by column name.
pub type Partition = HashMap<String, FeatureBatch>;

/// Phase-one output of one partition: one slot per pipeline transform.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseOneResult {
    stats: Vec<Option<PartialStats>>,
}

impl PhaseOneResult {
    /// Partial statistics of the `index`-th transform.
    pub fn get(&self, index: usize) -> Option<&PartialStats> {
        self.stats.get(index).and_then(Option::as_ref)
    }

    pub fn len(&self) -> usize {
        self.stats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }
}

/// An ordered set of feature transforms with unique output names.
#[derive(Clone, Debug)]
pub struct FeaturePipeline {
    ops: Vec<FeatureTransform>,
}

impl FeaturePipeline {
    /// Create a pipeline, rejecting duplicate output names.
    pub fn new(ops: Vec<FeatureTransform>) -> Result<Self> {
        let mut seen = HashSet::new();
        for op in &ops {
            if !seen.insert(op.output_name()) {
                return Err(TransformError::InvalidConfig(format!(
                    "duplicate output name '{}'",
                    op.output_name()
                )));
            }
        }
        Ok(Self { ops })
    }

    /// Build one transform per configuration record.
    pub fn from_configs(configs: &[TransformConfig]) -> Result<Self> {
        let ops = configs
            .iter()
            .map(FeatureTransform::from_config)
            .collect::<Result<Vec<_>>>()?;
        Self::new(ops)
    }

    pub fn ops(&self) -> &[FeatureTransform] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    fn batch<'a>(
        &self,
        partition: &'a Partition,
        op: &FeatureTransform,
    ) -> Result<&'a FeatureBatch> {
        partition
            .get(op.feature_name())
            .ok_or_else(|| TransformError::MissingFeature(op.feature_name().to_string()))
    }

    /// Phase one: partial statistics of every transform for one partition.
    pub fn pre_process(&self, partition: &Partition) -> Result<PhaseOneResult> {
        let stats = self
            .ops
            .iter()
            .map(|op| op.partial_stats(self.batch(partition, op)?))
            .collect::<Result<Vec<_>>>()?;
        Ok(PhaseOneResult { stats })
    }

    /// Phase two: merge every partition's results, once per transform.
    ///
    /// Results are merged in the order given. Returns the new global
    /// parameters keyed by output name. On error no transform changes.
    pub fn merge(
        &mut self,
        results: Vec<PhaseOneResult>,
    ) -> Result<HashMap<String, GlobalParams>> {
        let mut per_op: Vec<Vec<PartialStats>> = vec![Vec::new(); self.ops.len()];
        let n_results = results.len();
        for result in results {
            if result.stats.len() != self.ops.len() {
                return Err(TransformError::InvalidConfig(format!(
                    "phase-one result has {} slots, pipeline has {} transforms",
                    result.stats.len(),
                    self.ops.len()
                )));
            }
            for (slot, stats) in per_op.iter_mut().zip(result.stats) {
                slot.extend(stats);
            }
        }

        // Ops are replaced only after every merge succeeds.
        let mut staged = self.ops.clone();
        let mut merged = HashMap::new();
        for (op, partials) in staged.iter_mut().zip(per_op) {
            if let Some(params) = op.merge(partials)? {
                merged.insert(op.output_name().to_string(), params);
            }
        }
        self.ops = staged;
        debug!(partitions = n_results, merged = merged.len(), "pipeline merge complete");
        Ok(merged)
    }

    /// Phase three: every output tensor for one partition.
    pub fn apply(&self, partition: &Partition) -> Result<HashMap<String, FeatureArray>> {
        self.ops
            .iter()
            .map(|op| -> Result<(String, FeatureArray)> {
                let out = op.transform(self.batch(partition, op)?)?;
                Ok((op.output_name().to_string(), out))
            })
            .collect()
    }

    /// Run all three phases in-process over `partitions`.
    ///
    /// Phases one and three run in parallel across partitions; merge runs
    /// once in between. Outputs are returned in partition order. The first
    /// error aborts the run.
    pub fn run_local(
        &mut self,
        partitions: &[Partition],
    ) -> Result<Vec<HashMap<String, FeatureArray>>> {
        let phase_one = {
            let this = &*self;
            partitions
                .par_iter()
                .map(|p| this.pre_process(p))
                .collect::<Result<Vec<_>>>()?
        };
        self.merge(phase_one)?;

        let this = &*self;
        let outputs = partitions
            .par_iter()
            .map(|p| this.apply(p))
            .collect::<Result<Vec<_>>>()?;
        info!(
            partitions = partitions.len(),
            features = self.ops.len(),
            "transformed partitions"
        );
        Ok(outputs)
    }

    /// Configurations of every transform, with discovered mappings attached.
    pub fn export_configs(&self) -> Vec<TransformConfig> {
        self.ops.iter().map(FeatureTransform::export_config).collect()
    }
}
