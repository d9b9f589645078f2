// ─────────────────────────────────────────────────────────────────────
// SCPN PIC — Error
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PicError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Particle range [{start}, {stop}) out of bounds for tile with {len} particles")]
    RangeOutOfBounds {
        start: usize,
        stop: usize,
        len: usize,
    },

    #[error("Tile/schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Physics constraint violated: {0}")]
    PhysicsViolation(String),

    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type PicResult<T> = Result<T, PicError>;
