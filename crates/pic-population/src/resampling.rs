// ─────────────────────────────────────────────────────────────────────
// SCPN PIC — Resampling
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Per-species pairing of a trigger with an algorithm.

use crate::algorithm::ResamplingAlgorithm;
use crate::initializer::InitContext;
use crate::species::SpeciesContext;
use crate::trigger::ResamplingTrigger;
use pic_types::config::ResamplingConfig;
use pic_types::error::{PicError, PicResult};
use pic_types::state::ParticleTile;
use tracing::debug;

/// Relative weight drift tolerated after a merge.
const WEIGHT_TOLERANCE: f64 = 1e-10;

/// Where a species is inside the current step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResamplingPhase {
    #[default]
    Idle,
    Triggered,
}

/// Before/after bookkeeping of one resampled tile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileResampleOutcome {
    pub level: usize,
    pub tile: usize,
    pub particles_before: usize,
    pub particles_after: usize,
    pub weight_before: f64,
    pub weight_after: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resampling {
    species: String,
    enabled: bool,
    trigger: Option<ResamplingTrigger>,
    algorithm: ResamplingAlgorithm,
}

impl Resampling {
    /// Permanently inactive resampling.
    pub fn disabled(species: &str) -> Self {
        Self {
            species: species.to_string(),
            enabled: false,
            trigger: None,
            algorithm: ResamplingAlgorithm::NoOp,
        }
    }

    pub fn new(species: &str, trigger: ResamplingTrigger, algorithm: ResamplingAlgorithm) -> Self {
        Self {
            species: species.to_string(),
            enabled: true,
            trigger: Some(trigger),
            algorithm,
        }
    }

    pub fn from_config(
        species: &str,
        config: &ResamplingConfig,
        global_num_cells: Option<u64>,
        refinement_ratio: u32,
    ) -> PicResult<Self> {
        if !config.resampling.is_on() {
            return Ok(Self::disabled(species));
        }
        let trigger = ResamplingTrigger::from_config(config, global_num_cells)?;
        let algorithm = ResamplingAlgorithm::from_config(config, refinement_ratio)?;
        Ok(Self::new(species, trigger, algorithm))
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn trigger(&self) -> Option<&ResamplingTrigger> {
        self.trigger.as_ref()
    }

    pub fn algorithm(&self) -> &ResamplingAlgorithm {
        &self.algorithm
    }

    pub fn triggered(&self, step: u64, global_count: u64) -> bool {
        self.enabled
            && self
                .trigger
                .is_some_and(|trigger| trigger.triggered(step, global_count))
    }

    /// Run the algorithm on one tile and check that total weight survived.
    pub fn apply(
        &self,
        tile: &mut ParticleTile,
        level: usize,
        tile_index: usize,
        species: &SpeciesContext,
        init_ctx: &InitContext,
    ) -> PicResult<TileResampleOutcome> {
        let particles_before = tile.len();
        let weight_before = tile.total_weight();
        if self.enabled {
            self.algorithm.apply(tile, level, species, init_ctx)?;
        }
        let outcome = TileResampleOutcome {
            level,
            tile: tile_index,
            particles_before,
            particles_after: tile.len(),
            weight_before,
            weight_after: tile.total_weight(),
        };
        self.check_weight(&outcome)?;
        debug!(
            species = %self.species,
            algorithm = self.algorithm.name(),
            level,
            tile = tile_index,
            before = particles_before,
            after = outcome.particles_after,
            "tile resampled"
        );
        Ok(outcome)
    }

    fn check_weight(&self, outcome: &TileResampleOutcome) -> PicResult<()> {
        let scale = outcome.weight_before.abs().max(f64::MIN_POSITIVE);
        let drift = (outcome.weight_after - outcome.weight_before) / scale;
        if !drift.is_finite() || drift.abs() > WEIGHT_TOLERANCE {
            return Err(PicError::InvariantViolation(format!(
                "species '{}': {} changed tile ({}, {}) weight from {} to {}",
                self.species,
                self.algorithm.name(),
                outcome.level,
                outcome.tile,
                outcome.weight_before,
                outcome.weight_after
            )));
        }
        Ok(())
    }
}
