// ─────────────────────────────────────────────────────────────────────
// SCPN PIC — Resampling Algorithms
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use crate::cell_merge::CellAverageMerge;
use crate::coincidence_merge::VelocityCoincidenceMerge;
use crate::initializer::InitContext;
use crate::species::SpeciesContext;
use pic_types::config::ResamplingConfig;
use pic_types::error::{PicError, PicResult};
use pic_types::state::ParticleTile;

/// Closed set of particle-count reduction strategies.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ResamplingAlgorithm {
    #[default]
    NoOp,
    CellAverage(CellAverageMerge),
    VelocityCoincidence(VelocityCoincidenceMerge),
}

impl ResamplingAlgorithm {
    pub const NOOP_NAME: &'static str = "noop";

    pub fn from_config(config: &ResamplingConfig, refinement_ratio: u32) -> PicResult<Self> {
        match config.resampling_algorithm.trim().to_ascii_lowercase().as_str() {
            "noop" | "none" => Ok(ResamplingAlgorithm::NoOp),
            CellAverageMerge::NAME => Ok(ResamplingAlgorithm::CellAverage(
                CellAverageMerge::from_config(config, refinement_ratio)?,
            )),
            VelocityCoincidenceMerge::NAME => Ok(ResamplingAlgorithm::VelocityCoincidence(
                VelocityCoincidenceMerge::from_config(config, refinement_ratio)?,
            )),
            other => Err(PicError::ConfigError(format!(
                "unknown resampling algorithm '{other}' (expected noop, {}, {})",
                CellAverageMerge::NAME,
                VelocityCoincidenceMerge::NAME
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ResamplingAlgorithm::NoOp => Self::NOOP_NAME,
            ResamplingAlgorithm::CellAverage(_) => CellAverageMerge::NAME,
            ResamplingAlgorithm::VelocityCoincidence(_) => VelocityCoincidenceMerge::NAME,
        }
    }

    /// Reduce the particle count of one tile. Never increases total weight
    /// and leaves every column initialized.
    pub fn apply(
        &self,
        tile: &mut ParticleTile,
        level: usize,
        species: &SpeciesContext,
        init_ctx: &InitContext,
    ) -> PicResult<()> {
        match self {
            ResamplingAlgorithm::NoOp => Ok(()),
            ResamplingAlgorithm::CellAverage(merge) => merge.apply(tile, level, species, init_ctx),
            ResamplingAlgorithm::VelocityCoincidence(merge) => {
                merge.apply(tile, level, species, init_ctx)
            }
        }
    }
}
