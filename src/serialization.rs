//! Byte encoding of state that crosses process boundaries.
//!
//! Two things leave a transform: phase-one results travel from workers to
//! the merging process, and merged global parameters are stored so a later
//! run can skip discovery. Both are encoded with bincode. Where the bytes
//! go is up to the caller.

use crate::error::Result;
use crate::pipeline::PhaseOneResult;
use crate::transform::GlobalParams;

impl GlobalParams {
    /// Encode merged parameters for storage.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Decode parameters written by [`GlobalParams::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

impl PhaseOneResult {
    /// Encode one partition's statistics for shipping to the merger.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}
