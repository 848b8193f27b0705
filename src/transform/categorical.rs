//! Categorical and multi-valued feature encoding.
//!
//! Partitions report the distinct tokens they contain. Merging takes the
//! union and assigns contiguous indices in lexicographic (byte) order, so
//! the same token universe always yields the same vocabulary regardless of
//! how rows were partitioned. Applying produces a one-hot row per record,
//! or multi-hot when a separator splits a record into several tokens.
//!
//! A token that is not in the vocabulary fails the call with
//! [`TransformError::UnknownToken`].

use crate::batch::{FeatureArray, FeatureBatch};
use crate::dtype::{cast, DType};
use crate::error::{Result, TransformError};
use crate::transform::TwoPhaseTransform;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, warn};

/// Distinct tokens observed in one partition.
pub type TokenSet = BTreeSet<String>;

/// Injective token → index mapping with indices `0..len`.
///
/// Serializes as a plain `{token: index}` object, the shape the mapping
/// takes inside a feature configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, usize>",
    into = "BTreeMap<String, usize>"
)]
pub struct Vocabulary {
    index: HashMap<String, usize>,
    tokens: Vec<String>,
}

impl Vocabulary {
    /// Build a vocabulary from any tokens, indexing them in sorted order.
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let sorted: BTreeSet<String> = tokens.into_iter().map(Into::into).collect();
        let tokens: Vec<String> = sorted.into_iter().collect();
        let index = tokens
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i))
            .collect();
        Self { index, tokens }
    }

    /// Index of `token`, if present.
    pub fn index_of(&self, token: &str) -> Option<usize> {
        self.index.get(token).copied()
    }

    /// Tokens ordered by index.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl TryFrom<BTreeMap<String, usize>> for Vocabulary {
    type Error = TransformError;

    /// Validate an externally supplied mapping.
    fn try_from(mapping: BTreeMap<String, usize>) -> Result<Self> {
        let n = mapping.len();
        let mut slots: Vec<Option<String>> = vec![None; n];
        for (token, &idx) in &mapping {
            let slot = slots.get_mut(idx).ok_or_else(|| {
                TransformError::InvalidConfig(format!(
                    "mapping index {} for '{}' is outside 0..{}",
                    idx, token, n
                ))
            })?;
            if let Some(other) = slot {
                return Err(TransformError::InvalidConfig(format!(
                    "mapping assigns index {} to both '{}' and '{}'",
                    idx, other, token
                )));
            }
            *slot = Some(token.clone());
        }
        // Every slot is filled: n distinct indices below n.
        let tokens: Vec<String> = slots.into_iter().flatten().collect();
        let index = mapping.into_iter().collect();
        Ok(Self { index, tokens })
    }
}

impl From<Vocabulary> for BTreeMap<String, usize> {
    fn from(vocab: Vocabulary) -> Self {
        vocab.index.into_iter().collect()
    }
}

/// Split a record into tokens.
///
/// Without a separator the whole record is one token. With a separator,
/// empty pieces are discarded.
pub fn split_record<'a>(record: &'a str, separator: Option<&str>) -> Vec<&'a str> {
    match separator {
        Some(sep) => record.split(sep).filter(|t| !t.is_empty()).collect(),
        None => vec![record],
    }
}

/// Categorical feature transform producing one-hot or multi-hot rows.
#[derive(Clone, Debug)]
pub struct CategoricalEncoder {
    feature_name: String,
    output_name: String,
    separator: Option<String>,
    out_dtype: Option<DType>,
    vocabulary: Option<Vocabulary>,
}

impl CategoricalEncoder {
    pub fn new(feature_name: impl Into<String>, output_name: impl Into<String>) -> Self {
        Self {
            feature_name: feature_name.into(),
            output_name: output_name.into(),
            separator: None,
            out_dtype: None,
            vocabulary: None,
        }
    }

    /// Treat each record as a `separator`-delimited list of tokens.
    pub fn with_separator(mut self, separator: impl Into<String>) -> Result<Self> {
        let separator = separator.into();
        if separator.is_empty() {
            return Err(TransformError::InvalidConfig(format!(
                "separator for '{}' must not be empty",
                self.feature_name
            )));
        }
        self.separator = Some(separator);
        Ok(self)
    }

    /// Use a known vocabulary; discovery is skipped from then on.
    pub fn with_mapping(mut self, vocabulary: Vocabulary) -> Self {
        self.vocabulary = Some(vocabulary);
        self
    }

    /// Output width; the default is `float32`.
    pub fn with_out_dtype(mut self, dtype: DType) -> Self {
        self.out_dtype = Some(dtype);
        self
    }

    pub fn separator(&self) -> Option<&str> {
        self.separator.as_deref()
    }

    /// The current vocabulary, for external persistence.
    pub fn vocabulary(&self) -> Option<&Vocabulary> {
        self.vocabulary.as_ref()
    }

    fn text<'a>(&self, batch: &'a FeatureBatch) -> Result<&'a [String]> {
        match batch {
            FeatureBatch::Text(records) => Ok(records),
            FeatureBatch::Numeric(_) => Err(TransformError::UnsupportedInput {
                feature: self.feature_name.clone(),
                expected: "text",
            }),
        }
    }
}

impl TwoPhaseTransform for CategoricalEncoder {
    type Partial = TokenSet;
    type Params = Vocabulary;

    fn feature_name(&self) -> &str {
        &self.feature_name
    }

    fn output_name(&self) -> &str {
        &self.output_name
    }

    fn out_dtype(&self) -> Option<DType> {
        self.out_dtype
    }

    fn pre_process(&self, batch: &FeatureBatch) -> Result<Option<TokenSet>> {
        if self.vocabulary.is_some() {
            return Ok(None);
        }
        let records = self.text(batch)?;
        let sep = self.separator.as_deref();
        let tokens: TokenSet = records
            .iter()
            .flat_map(|r| split_record(r, sep))
            .map(str::to_string)
            .collect();
        debug!(
            feature = %self.feature_name,
            rows = records.len(),
            distinct = tokens.len(),
            "collected partition tokens"
        );
        Ok(Some(tokens))
    }

    fn merge(&mut self, partials: Vec<TokenSet>) -> Result<Option<Vocabulary>> {
        if partials.is_empty() {
            debug!(feature = %self.feature_name, "no token sets, keeping vocabulary");
            return Ok(None);
        }
        if self.vocabulary.is_some() {
            warn!(feature = %self.feature_name, "re-deriving an existing vocabulary");
        }

        let n_parts = partials.len();
        let union: TokenSet = partials.into_iter().flatten().collect();
        let vocab = Vocabulary::from_tokens(union);
        debug!(
            feature = %self.feature_name,
            partitions = n_parts,
            size = vocab.len(),
            "merged vocabulary"
        );

        self.vocabulary = Some(vocab.clone());
        Ok(Some(vocab))
    }

    fn apply(&self, batch: &FeatureBatch) -> Result<FeatureArray> {
        let vocab = self
            .vocabulary
            .as_ref()
            .ok_or_else(|| TransformError::NotMerged(self.feature_name.clone()))?;
        let records = self.text(batch)?;
        let sep = self.separator.as_deref();

        let mut encoded = Array2::<f32>::zeros((records.len(), vocab.len()));
        for (row, record) in records.iter().enumerate() {
            for token in split_record(record, sep) {
                let idx = vocab
                    .index_of(token)
                    .ok_or_else(|| TransformError::UnknownToken {
                        feature: self.feature_name.clone(),
                        token: token.to_string(),
                    })?;
                encoded[[row, idx]] = 1.0;
            }
        }

        let encoded = FeatureArray::F32(encoded);
        Ok(match self.out_dtype {
            Some(dtype) => cast(&encoded, dtype),
            None => encoded,
        })
    }

    fn params(&self) -> Option<&Vocabulary> {
        self.vocabulary.as_ref()
    }
}
