//! Error types for the harvesting inversion.

use glam::DVec3;
use thiserror::Error;

use crate::types::CellId;

#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("invalid norm {0}: must be 1 or 2")]
    InvalidNorm(u8),

    #[error("{0} is not implemented")]
    NotImplemented(&'static str),

    #[error("couldn't find a mesh cell at location {0}")]
    LocationNotFound(DVec3),

    #[error("seeds must all be of the same kind")]
    MixedSeedKinds,

    #[error("seed at {point} shares cell {cell} with an earlier seed")]
    DuplicateSeed { point: DVec3, cell: CellId },

    #[error("no seeds were given")]
    NoSeeds,

    #[error("invalid mesh: {0}")]
    InvalidMesh(String),

    #[error("observed data has {data} values but there are {points} observation points")]
    DataLength { data: usize, points: usize },

    #[error("observed data has zero norm, cannot weight the misfit")]
    ZeroData,

    #[error("property '{0}' has {1} values but there are {2} points")]
    PropertyLength(String, usize, usize),

    #[error("parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HarvestError>;
