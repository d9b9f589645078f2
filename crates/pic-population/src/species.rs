// ─────────────────────────────────────────────────────────────────────
// SCPN PIC — Species
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Particle containers of one species and their population control.
//!
//! A species owns its tiles per refinement level, the runtime attribute
//! initializer built from its schema, and its resampling configuration.
//! Particles enter through [`Species::add_particles`], which initializes
//! exactly the appended range, and leave through [`Species::resample`].

use crate::expression::ExpressionCompiler;
use crate::initializer::{ExternalAttributes, InitContext, RuntimeAttributeInitializer};
use crate::particles::{tile_moments, validate_particle_state, TileMoments};
use crate::qed::QedEngines;
use crate::random::RandomStream;
use crate::resampling::{Resampling, ResamplingPhase, TileResampleOutcome};
use crate::schema::AttributeSchema;
use pic_types::config::{SimulationConfig, SpeciesConfig};
use pic_types::error::{PicError, PicResult};
use pic_types::state::{CoreParticle, MemoryResidency, ParticleTile};
use rayon::prelude::*;
use std::collections::HashSet;
use std::ops::Range;
use std::sync::Arc;
use tracing::{debug, info};

const PURPOSE_CREATE: u64 = 0;
const PURPOSE_RESAMPLE: u64 = 1;

/// Read-only species data handed to algorithms.
#[derive(Debug, Clone)]
pub struct SpeciesContext {
    name: String,
    mass: f64,
    charge: f64,
    initializer: Arc<RuntimeAttributeInitializer>,
    seed: u64,
}

impl SpeciesContext {
    pub fn new(
        name: &str,
        mass: f64,
        charge: f64,
        initializer: Arc<RuntimeAttributeInitializer>,
        seed: u64,
    ) -> Self {
        Self {
            name: name.to_string(),
            mass,
            charge,
            initializer,
            seed,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    pub fn charge(&self) -> f64 {
        self.charge
    }

    pub fn initializer(&self) -> &RuntimeAttributeInitializer {
        &self.initializer
    }

    pub fn schema(&self) -> &AttributeSchema {
        self.initializer.schema()
    }

    /// Stream unique to one (step, level, tile, purpose) work item.
    pub fn random_stream(&self, step: u64, level: usize, tile: usize, purpose: u64) -> RandomStream {
        RandomStream::new(self.seed)
            .derive(step)
            .derive(level as u64)
            .derive(tile as u64)
            .derive(purpose)
    }

    /// Initializer context for particles created by resampling.
    pub fn init_context(&self, time: f64, step: u64, level: usize, tile: usize) -> InitContext {
        InitContext {
            time,
            do_qed_comps: true,
            random: self.random_stream(step, level, tile, PURPOSE_RESAMPLE),
        }
    }
}

/// Run-wide inputs shared by every species.
#[derive(Debug, Clone)]
pub struct RunSetup {
    pub seed: u64,
    pub num_levels: usize,
    pub refinement_ratio: u32,
    pub global_num_cells: Option<u64>,
    pub residency: MemoryResidency,
    pub qed: QedEngines,
}

impl RunSetup {
    pub fn from_config(config: &SimulationConfig) -> PicResult<Self> {
        if config.num_levels == 0 {
            return Err(PicError::ConfigError("num_levels must be >= 1".to_string()));
        }
        if config.refinement_ratio == 0 {
            return Err(PicError::ConfigError(
                "refinement_ratio must be >= 1".to_string(),
            ));
        }
        Ok(Self {
            seed: config.seed,
            num_levels: config.num_levels,
            refinement_ratio: config.refinement_ratio,
            global_num_cells: config.global_num_cells()?,
            residency: config.tile_residency,
            qed: QedEngines::from_config(&config.qed),
        })
    }
}

/// Result of one [`Species::resample`] call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResamplingReport {
    pub step: u64,
    pub triggered: bool,
    pub outcomes: Vec<TileResampleOutcome>,
}

impl ResamplingReport {
    pub fn particles_before(&self) -> usize {
        self.outcomes.iter().map(|o| o.particles_before).sum()
    }

    pub fn particles_after(&self) -> usize {
        self.outcomes.iter().map(|o| o.particles_after).sum()
    }
}

#[derive(Debug, Clone)]
pub struct Species {
    context: SpeciesContext,
    resampling: Resampling,
    residency: MemoryResidency,
    levels: Vec<Vec<ParticleTile>>,
    phase: ResamplingPhase,
}

fn validate_species_config(config: &SpeciesConfig) -> PicResult<()> {
    if config.name.trim().is_empty() {
        return Err(PicError::ConfigError(
            "species name must be non-empty".to_string(),
        ));
    }
    if !config.mass.is_finite() || config.mass <= 0.0 {
        return Err(PicError::ConfigError(format!(
            "species '{}': mass must be finite and > 0",
            config.name
        )));
    }
    if !config.charge.is_finite() {
        return Err(PicError::ConfigError(format!(
            "species '{}': charge must be finite",
            config.name
        )));
    }
    if let Some(level) = config.ionization_initial_level {
        if level < 0 {
            return Err(PicError::ConfigError(format!(
                "species '{}': ionization_initial_level must be >= 0, got {level}",
                config.name
            )));
        }
    }
    Ok(())
}

impl Species {
    /// Build species `index` of the run. Every configuration error of the
    /// species surfaces here.
    pub fn from_config(
        config: &SpeciesConfig,
        index: usize,
        run: &RunSetup,
        compiler: &dyn ExpressionCompiler,
    ) -> PicResult<Self> {
        validate_species_config(config)?;
        let schema = Arc::new(AttributeSchema::from_species_config(config, compiler)?);
        let initializer = RuntimeAttributeInitializer::new(
            schema,
            run.qed.clone(),
            config.ionization_initial_level.unwrap_or(0),
        );
        let resampling = Resampling::from_config(
            &config.name,
            &config.resampling,
            run.global_num_cells,
            run.refinement_ratio,
        )?;
        let seed = RandomStream::new(run.seed).derive(index as u64).seed();
        info!(
            species = %config.name,
            real_comps = initializer.schema().num_real_comps(),
            int_comps = initializer.schema().num_int_comps(),
            resampling = resampling.is_enabled(),
            algorithm = resampling.algorithm().name(),
            "species configured"
        );
        Ok(Self {
            context: SpeciesContext::new(
                &config.name,
                config.mass,
                config.charge,
                Arc::new(initializer),
                seed,
            ),
            resampling,
            residency: run.residency,
            levels: vec![Vec::new(); run.num_levels],
            phase: ResamplingPhase::Idle,
        })
    }

    pub fn name(&self) -> &str {
        self.context.name()
    }

    pub fn context(&self) -> &SpeciesContext {
        &self.context
    }

    pub fn schema(&self) -> &AttributeSchema {
        self.context.schema()
    }

    pub fn resampling(&self) -> &Resampling {
        &self.resampling
    }

    pub fn phase(&self) -> ResamplingPhase {
        self.phase
    }

    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    fn check_level(&self, level: usize) -> PicResult<()> {
        if level >= self.levels.len() {
            return Err(PicError::RangeOutOfBounds {
                start: level,
                stop: level + 1,
                len: self.levels.len(),
            });
        }
        Ok(())
    }

    /// Append an empty tile on `level`; returns its index.
    pub fn add_tile(&mut self, level: usize) -> PicResult<usize> {
        self.check_level(level)?;
        let tile = self.schema().new_tile(self.residency)?;
        let tiles = &mut self.levels[level];
        tiles.push(tile);
        Ok(tiles.len() - 1)
    }

    pub fn tiles(&self, level: usize) -> &[ParticleTile] {
        self.levels.get(level).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn tile(&self, level: usize, tile: usize) -> Option<&ParticleTile> {
        self.levels.get(level).and_then(|tiles| tiles.get(tile))
    }

    /// Append `particles` to a tile and initialize every runtime attribute
    /// of the new range. Nothing is appended if any particle is invalid.
    pub fn add_particles(
        &mut self,
        level: usize,
        tile_index: usize,
        particles: &[CoreParticle],
        time: f64,
        step: u64,
    ) -> PicResult<Range<usize>> {
        self.check_level(level)?;
        for (i, particle) in particles.iter().enumerate() {
            validate_particle_state(particle, &format!("{}[{i}]", self.context.name))?;
        }
        let ctx = InitContext {
            time,
            do_qed_comps: true,
            random: self
                .context
                .random_stream(step, level, tile_index, PURPOSE_CREATE),
        };
        let num_tiles = self.levels[level].len();
        let tile = self.levels[level]
            .get_mut(tile_index)
            .ok_or(PicError::RangeOutOfBounds {
                start: tile_index,
                stop: tile_index + 1,
                len: num_tiles,
            })?;
        let start = tile.len();
        for particle in particles {
            tile.push_core(particle);
        }
        let range = start..tile.len();
        self.context.initializer().initialize(
            tile,
            ExternalAttributes::core_only(),
            range.clone(),
            &ctx,
        )?;
        debug!(
            species = %self.context.name,
            level,
            tile = tile_index,
            added = particles.len(),
            "particles added"
        );
        Ok(range)
    }

    pub fn local_particle_count(&self) -> usize {
        self.levels.iter().flatten().map(ParticleTile::len).sum()
    }

    pub fn total_weight(&self) -> f64 {
        self.levels.iter().flatten().map(ParticleTile::total_weight).sum()
    }

    pub fn moments(&self) -> TileMoments {
        let mut total = TileMoments::default();
        for tile in self.levels.iter().flatten() {
            total.accumulate(&tile_moments(tile));
        }
        total
    }

    /// Step-loop entry point: resample every tile if the trigger fires for
    /// `step` and the globally reduced `global_count`.
    pub fn resample(&mut self, step: u64, global_count: u64, time: f64) -> PicResult<ResamplingReport> {
        if !self.resampling.triggered(step, global_count) {
            self.phase = ResamplingPhase::Idle;
            return Ok(ResamplingReport {
                step,
                triggered: false,
                outcomes: Vec::new(),
            });
        }
        self.phase = ResamplingPhase::Triggered;

        let context = &self.context;
        let resampling = &self.resampling;
        let work: Vec<(usize, usize, &mut ParticleTile)> = self
            .levels
            .iter_mut()
            .enumerate()
            .flat_map(|(level, tiles)| {
                tiles
                    .iter_mut()
                    .enumerate()
                    .map(move |(index, tile)| (level, index, tile))
            })
            .collect();
        let outcomes = work
            .into_par_iter()
            .map(|(level, index, tile)| {
                let init_ctx = context.init_context(time, step, level, index);
                resampling.apply(tile, level, index, context, &init_ctx)
            })
            .collect::<PicResult<Vec<_>>>()?;

        let report = ResamplingReport {
            step,
            triggered: true,
            outcomes,
        };
        info!(
            species = %self.context.name,
            step,
            global_count,
            algorithm = self.resampling.algorithm().name(),
            before = report.particles_before(),
            after = report.particles_after(),
            "resampling applied"
        );
        self.phase = ResamplingPhase::Idle;
        Ok(report)
    }
}

/// Build every species of a run, rejecting duplicate names.
pub fn build_species(
    config: &SimulationConfig,
    compiler: &dyn ExpressionCompiler,
) -> PicResult<Vec<Species>> {
    let run = RunSetup::from_config(config)?;
    let mut seen = HashSet::new();
    let mut species = Vec::with_capacity(config.species.len());
    for (index, species_config) in config.species.iter().enumerate() {
        if !seen.insert(species_config.name.as_str()) {
            return Err(PicError::ConfigError(format!(
                "species '{}' is defined more than once",
                species_config.name
            )));
        }
        species.push(Species::from_config(species_config, index, &run, compiler)?);
    }
    info!(run = %config.run_name, species = species.len(), "species built");
    Ok(species)
}
