// ─────────────────────────────────────────────────────────────────────
// SCPN PIC — Runtime Attribute Initializer
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Default initialization of runtime attributes on a particle range.
//!
//! The first `n_external` real and integer columns are assumed to be set
//! by whoever created the particles and are never written. Every other
//! column is filled according to its schema rule. The per-particle kernel
//! is pure, so the sequential and the data-parallel paths produce
//! identical results.

use crate::expression::PhaseSpacePoint;
use crate::qed::QedEngines;
use crate::random::RandomStream;
use crate::schema::{AttributeSchema, IntRule, RealRule};
use pic_types::error::{PicError, PicResult};
use pic_types::state::{PIdx, ParticleTile};
use rayon::prelude::*;
use std::ops::Range;
use std::sync::Arc;
use tracing::trace;

/// Backend used to run the per-particle kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionPath {
    Sequential,
    /// One rayon work item per particle.
    DataParallel,
}

impl ExecutionPath {
    pub fn for_tile(tile: &ParticleTile) -> Self {
        if tile.residency().is_device_accessible() {
            ExecutionPath::DataParallel
        } else {
            ExecutionPath::Sequential
        }
    }
}

/// Number of leading columns already set by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExternalAttributes {
    pub real: usize,
    pub int: usize,
}

impl ExternalAttributes {
    /// Only position, momentum and weight are set.
    pub fn core_only() -> Self {
        Self {
            real: PIdx::COUNT,
            int: 0,
        }
    }
}

/// Per-call inputs of the initializer.
#[derive(Debug, Clone, Copy)]
pub struct InitContext {
    /// Simulation time passed to user expressions.
    pub time: f64,
    /// Sample QED optical depths; off when the caller copies them itself.
    pub do_qed_comps: bool,
    pub random: RandomStream,
}

struct CoreColumns<'a> {
    x: &'a [f64],
    y: &'a [f64],
    z: &'a [f64],
    ux: &'a [f64],
    uy: &'a [f64],
    uz: &'a [f64],
}

impl<'a> CoreColumns<'a> {
    fn new(core: &'a [Vec<f64>]) -> Self {
        Self {
            x: &core[PIdx::X],
            y: &core[PIdx::Y],
            z: &core[PIdx::Z],
            ux: &core[PIdx::UX],
            uy: &core[PIdx::UY],
            uz: &core[PIdx::UZ],
        }
    }

    #[inline]
    fn point(&self, ip: usize, t: f64) -> PhaseSpacePoint {
        PhaseSpacePoint {
            x: self.x[ip],
            y: self.y[ip],
            z: self.z[ip],
            ux: self.ux[ip],
            uy: self.uy[ip],
            uz: self.uz[ip],
            t,
        }
    }
}

/// Run `kernel(ip)` for every slot of `column`, which starts at particle
/// index `start`.
fn fill_column<T, F>(column: &mut [T], start: usize, path: ExecutionPath, kernel: F)
where
    T: Send,
    F: Fn(usize) -> T + Sync,
{
    match path {
        ExecutionPath::Sequential => {
            for (offset, slot) in column.iter_mut().enumerate() {
                *slot = kernel(start + offset);
            }
        }
        ExecutionPath::DataParallel => {
            column
                .par_iter_mut()
                .enumerate()
                .for_each(|(offset, slot)| *slot = kernel(start + offset));
        }
    }
}

#[derive(Debug, Clone)]
pub struct RuntimeAttributeInitializer {
    schema: Arc<AttributeSchema>,
    qed: QedEngines,
    ionization_initial_level: i32,
    path_override: Option<ExecutionPath>,
}

impl RuntimeAttributeInitializer {
    pub fn new(schema: Arc<AttributeSchema>, qed: QedEngines, ionization_initial_level: i32) -> Self {
        Self {
            schema,
            qed,
            ionization_initial_level,
            path_override: None,
        }
    }

    /// Force one backend regardless of tile residency.
    pub fn with_execution_path(mut self, path: ExecutionPath) -> Self {
        self.path_override = Some(path);
        self
    }

    pub fn schema(&self) -> &Arc<AttributeSchema> {
        &self.schema
    }

    pub fn qed(&self) -> &QedEngines {
        &self.qed
    }

    pub fn ionization_initial_level(&self) -> i32 {
        self.ionization_initial_level
    }

    pub fn execution_path(&self, tile: &ParticleTile) -> ExecutionPath {
        self.path_override
            .unwrap_or_else(|| ExecutionPath::for_tile(tile))
    }

    fn validate(
        &self,
        tile: &ParticleTile,
        external: ExternalAttributes,
        range: &Range<usize>,
    ) -> PicResult<()> {
        self.schema.check_tile(tile)?;
        if range.start > range.end || range.end > tile.len() {
            return Err(PicError::RangeOutOfBounds {
                start: range.start,
                stop: range.end,
                len: tile.len(),
            });
        }
        if external.real < PIdx::COUNT || external.real > tile.num_real_comps() {
            return Err(PicError::SchemaMismatch(format!(
                "external real attributes must be in [{}, {}], got {}",
                PIdx::COUNT,
                tile.num_real_comps(),
                external.real
            )));
        }
        if external.int > tile.num_int_comps() {
            return Err(PicError::SchemaMismatch(format!(
                "external int attributes must be <= {}, got {}",
                tile.num_int_comps(),
                external.int
            )));
        }
        for comp in external.real..tile.num_real_comps() {
            if matches!(self.schema.real_rule(comp), RealRule::Core) {
                return Err(PicError::InvariantViolation(format!(
                    "core rule on runtime column {comp} ({})",
                    self.schema.real_name(comp)
                )));
            }
        }
        Ok(())
    }

    /// Fill every non-external column of particles `range` in `tile`.
    pub fn initialize(
        &self,
        tile: &mut ParticleTile,
        external: ExternalAttributes,
        range: Range<usize>,
        ctx: &InitContext,
    ) -> PicResult<()> {
        self.validate(tile, external, &range)?;
        if range.is_empty() {
            return Ok(());
        }

        let path = self.execution_path(tile);
        let Range { start, end: stop } = range;
        let t = ctx.time;
        let (real_cols, int_cols) = tile.columns_mut();
        let (core_cols, runtime_cols) = real_cols.split_at_mut(PIdx::COUNT);
        let core = CoreColumns::new(core_cols);

        let first_runtime = external.real - PIdx::COUNT;
        for (offset, column) in runtime_cols.iter_mut().enumerate().skip(first_runtime) {
            let comp = PIdx::COUNT + offset;
            let column = &mut column[start..stop];
            let stream = ctx.random.derive(comp as u64);
            match self.schema.real_rule(comp) {
                // rejected by validate
                RealRule::Core => {}
                RealRule::OpticalDepth(process) => {
                    if !ctx.do_qed_comps {
                        continue;
                    }
                    let Some(sampler) = self.qed.sampler(*process) else {
                        continue;
                    };
                    fill_column(column, start, path, |ip| {
                        sampler.sample(&mut stream.particle_rng(ip))
                    });
                }
                RealRule::Expression(expr) => {
                    fill_column(column, start, path, |ip| expr.eval(&core.point(ip, t)));
                }
                RealRule::Policy(policy) => match policy.constant() {
                    Some(value) => fill_column(column, start, path, |_| value),
                    None => {
                        let policy = *policy;
                        fill_column(column, start, path, |ip| {
                            policy.real_value(&mut stream.particle_rng(ip))
                        });
                    }
                },
            }
        }

        for (comp, column) in int_cols.iter_mut().enumerate().skip(external.int) {
            let column = &mut column[start..stop];
            match self.schema.int_rule(comp) {
                IntRule::IonizationLevel => {
                    let level = self.ionization_initial_level;
                    fill_column(column, start, path, |_| level);
                }
                // Truncates toward zero, like a C cast.
                IntRule::Expression(expr) => {
                    fill_column(column, start, path, |ip| expr.eval(&core.point(ip, t)) as i32);
                }
                IntRule::Constant(value) => {
                    let value = *value;
                    fill_column(column, start, path, |_| value);
                }
            }
        }

        trace!(start, stop, ?path, "runtime attributes initialized");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::{ExpressionCompiler, ExpressionRegistry, SharedExpression};
    use crate::policy::InitializationPolicy;
    use crate::qed::QedProcess;
    use pic_types::config::QedConfig;
    use pic_types::constants::{IONIZATION_LEVEL, OPTICAL_DEPTH_BW, OPTICAL_DEPTH_QSR};
    use pic_types::state::{CoreParticle, MemoryResidency};

    const SENTINEL: f64 = -12345.0;
    const INT_SENTINEL: i32 = -777;

    fn qed_on() -> QedEngines {
        QedEngines::from_config(&QedConfig {
            quantum_synchrotron: true,
            breit_wheeler: true,
        })
    }

    fn ctx(seed: u64) -> InitContext {
        InitContext {
            time: 2.5e-15,
            do_qed_comps: true,
            random: RandomStream::new(seed),
        }
    }

    fn full_schema() -> Arc<AttributeSchema> {
        let x_plus_t: SharedExpression = Arc::new(|p: &PhaseSpacePoint| p.x + p.t);
        let uz_int: SharedExpression = Arc::new(|p: &PhaseSpacePoint| p.uz);
        Arc::new(
            AttributeSchema::builder()
                .real_attribute(OPTICAL_DEPTH_QSR)
                .unwrap()
                .real_attribute(OPTICAL_DEPTH_BW)
                .unwrap()
                .real_expression("x_plus_t", x_plus_t)
                .unwrap()
                .real_policy("ones", InitializationPolicy::One)
                .unwrap()
                .real_attribute("untouched_default")
                .unwrap()
                .int_attribute(IONIZATION_LEVEL)
                .unwrap()
                .int_expression("uz_int", uz_int)
                .unwrap()
                .int_policy("flag", InitializationPolicy::One)
                .unwrap()
                .build(),
        )
    }

    fn sentinel_tile(schema: &AttributeSchema, n: usize, residency: MemoryResidency) -> ParticleTile {
        let mut tile = schema.new_tile(residency).unwrap();
        for i in 0..n {
            tile.push_core(&CoreParticle {
                x: 0.1 * i as f64,
                y: -0.2 * i as f64,
                z: 1.0,
                ux: 1.0e6 * i as f64,
                uy: -3.0e5,
                uz: 2.7 + i as f64,
                w: 1.0e10,
            });
        }
        for comp in PIdx::COUNT..tile.num_real_comps() {
            tile.real_mut(comp).fill(SENTINEL);
        }
        for comp in 0..tile.num_int_comps() {
            tile.int_mut(comp).fill(INT_SENTINEL);
        }
        tile
    }

    #[test]
    fn test_every_column_is_initialized() {
        let schema = full_schema();
        let init = RuntimeAttributeInitializer::new(schema.clone(), qed_on(), 3);
        let mut tile = sentinel_tile(&schema, 16, MemoryResidency::Host);
        init.initialize(&mut tile, ExternalAttributes::core_only(), 0..16, &ctx(5))
            .unwrap();

        for comp in PIdx::COUNT..tile.num_real_comps() {
            assert!(
                tile.real(comp).iter().all(|&v| v != SENTINEL && v.is_finite()),
                "real column {} left uninitialized",
                schema.real_name(comp)
            );
        }
        for comp in 0..tile.num_int_comps() {
            assert!(tile.int(comp).iter().all(|&v| v != INT_SENTINEL));
        }

        let ip = 7;
        let core = tile.core(ip);
        let x_plus_t = schema.real_index("x_plus_t").unwrap();
        assert_eq!(tile.real(x_plus_t)[ip], core.x + 2.5e-15);
        assert!(tile.real(schema.real_index("ones").unwrap()).iter().all(|&v| v == 1.0));
        assert!(tile
            .real(schema.real_index("untouched_default").unwrap())
            .iter()
            .all(|&v| v == 0.0));
        assert!(tile.int(0).iter().all(|&v| v == 3));
        assert_eq!(tile.int(1)[ip], 9);
        assert!(tile.int(2).iter().all(|&v| v == 1));
        assert!(tile
            .real(schema.real_index(OPTICAL_DEPTH_QSR).unwrap())
            .iter()
            .all(|&v| v >= 0.0));
    }

    #[test]
    fn test_external_columns_are_never_written() {
        let schema = full_schema();
        let init = RuntimeAttributeInitializer::new(schema.clone(), qed_on(), 0);
        let mut tile = sentinel_tile(&schema, 10, MemoryResidency::Host);
        let external = ExternalAttributes {
            real: PIdx::COUNT + 2,
            int: 1,
        };
        let before = tile.clone();
        init.initialize(&mut tile, external, 0..10, &ctx(1)).unwrap();

        for comp in 0..external.real {
            assert_eq!(tile.real(comp), before.real(comp));
        }
        assert_eq!(tile.int(0), before.int(0));
        assert!(tile.real(external.real).iter().all(|&v| v != SENTINEL));
        assert!(tile.int(1).iter().all(|&v| v != INT_SENTINEL));
    }

    #[test]
    fn test_only_requested_range_is_written() {
        let schema = full_schema();
        let init = RuntimeAttributeInitializer::new(schema.clone(), qed_on(), 0);
        let mut tile = sentinel_tile(&schema, 12, MemoryResidency::Host);
        init.initialize(&mut tile, ExternalAttributes::core_only(), 4..9, &ctx(2))
            .unwrap();
        let ones = schema.real_index("ones").unwrap();
        for ip in 0..12 {
            let expected = if (4..9).contains(&ip) { 1.0 } else { SENTINEL };
            assert_eq!(tile.real(ones)[ip], expected);
        }
    }

    #[test]
    fn test_parallel_and_sequential_paths_agree() {
        let schema = full_schema();
        let base = RuntimeAttributeInitializer::new(schema.clone(), qed_on(), 4);
        let seq = base.clone().with_execution_path(ExecutionPath::Sequential);
        let par = base.with_execution_path(ExecutionPath::DataParallel);

        let mut a = sentinel_tile(&schema, 257, MemoryResidency::Host);
        let mut b = sentinel_tile(&schema, 257, MemoryResidency::Device);
        seq.initialize(&mut a, ExternalAttributes::core_only(), 3..250, &ctx(77))
            .unwrap();
        par.initialize(&mut b, ExternalAttributes::core_only(), 3..250, &ctx(77))
            .unwrap();

        for comp in 0..a.num_real_comps() {
            assert_eq!(a.real(comp), b.real(comp), "real column {comp} differs");
        }
        for comp in 0..a.num_int_comps() {
            assert_eq!(a.int(comp), b.int(comp), "int column {comp} differs");
        }
    }

    #[test]
    fn test_path_follows_residency() {
        let schema = full_schema();
        let init = RuntimeAttributeInitializer::new(schema.clone(), qed_on(), 0);
        let host = schema.new_tile(MemoryResidency::Pinned).unwrap();
        let device = schema.new_tile(MemoryResidency::Device).unwrap();
        assert_eq!(init.execution_path(&host), ExecutionPath::Sequential);
        assert_eq!(init.execution_path(&device), ExecutionPath::DataParallel);
        let forced = init.with_execution_path(ExecutionPath::Sequential);
        assert_eq!(forced.execution_path(&device), ExecutionPath::Sequential);
    }

    #[test]
    fn test_disabled_qed_columns_are_skipped() {
        let schema = full_schema();
        let engines = QedEngines::from_config(&QedConfig {
            quantum_synchrotron: true,
            breit_wheeler: false,
        });
        let init = RuntimeAttributeInitializer::new(schema.clone(), engines, 0);
        let qsr = schema.real_index(OPTICAL_DEPTH_QSR).unwrap();
        let bw = schema.real_index(OPTICAL_DEPTH_BW).unwrap();

        let mut tile = sentinel_tile(&schema, 8, MemoryResidency::Host);
        init.initialize(&mut tile, ExternalAttributes::core_only(), 0..8, &ctx(3))
            .unwrap();
        assert!(tile.real(qsr).iter().all(|&v| v != SENTINEL));
        assert!(tile.real(bw).iter().all(|&v| v == SENTINEL));

        let mut tile = sentinel_tile(&schema, 8, MemoryResidency::Host);
        let no_qed = InitContext {
            do_qed_comps: false,
            ..ctx(3)
        };
        init.initialize(&mut tile, ExternalAttributes::core_only(), 0..8, &no_qed)
            .unwrap();
        assert!(tile.real(qsr).iter().all(|&v| v == SENTINEL));
        assert!(!init.qed().is_enabled(QedProcess::BreitWheeler));
    }

    #[test]
    fn test_user_attributes_end_to_end() {
        let compiler = ExpressionRegistry::new()
            .with("x", |p| p.x)
            .with("ux*2", |p| p.ux * 2.0)
            .with("1", |_| 1.0);
        let mut builder = AttributeSchema::builder();
        for (name, source) in [("a", "x"), ("b", "ux*2"), ("c", "1")] {
            let expr = compiler.compile(name, source).unwrap();
            builder = builder.real_expression(name, expr).unwrap();
        }
        let schema = Arc::new(builder.build());
        let init = RuntimeAttributeInitializer::new(schema.clone(), QedEngines::disabled(), 0);

        let mut tile = schema.new_tile(MemoryResidency::Host).unwrap();
        let particles = [(0.5, 1.0e5), (-1.25, -2.0e6), (3.0, 0.0), (7.75, 4.5e7)];
        for &(x, ux) in &particles {
            tile.push_core(&CoreParticle {
                x,
                y: 0.0,
                z: 0.0,
                ux,
                uy: 1.0,
                uz: 2.0,
                w: 1.0,
            });
        }
        init.initialize(&mut tile, ExternalAttributes::core_only(), 0..4, &ctx(0))
            .unwrap();

        let (a, b, c) = (
            schema.real_index("a").unwrap(),
            schema.real_index("b").unwrap(),
            schema.real_index("c").unwrap(),
        );
        for (ip, &(x, ux)) in particles.iter().enumerate() {
            assert_eq!(tile.real(a)[ip], x);
            assert_eq!(tile.real(b)[ip], 2.0 * ux);
            assert_eq!(tile.real(c)[ip], 1.0);
        }
    }

    #[test]
    fn test_invalid_ranges_and_externals_are_rejected() {
        let schema = full_schema();
        let init = RuntimeAttributeInitializer::new(schema.clone(), qed_on(), 0);
        let mut tile = sentinel_tile(&schema, 4, MemoryResidency::Host);
        let before = tile.clone();

        let err = init
            .initialize(&mut tile, ExternalAttributes::core_only(), 2..5, &ctx(0))
            .expect_err("range past the end must fail");
        assert!(matches!(
            err,
            PicError::RangeOutOfBounds {
                start: 2,
                stop: 5,
                len: 4
            }
        ));
        let external = ExternalAttributes {
            real: PIdx::COUNT - 1,
            int: 0,
        };
        assert!(init.initialize(&mut tile, external, 0..4, &ctx(0)).is_err());
        let external = ExternalAttributes {
            real: PIdx::COUNT,
            int: 9,
        };
        assert!(init.initialize(&mut tile, external, 0..4, &ctx(0)).is_err());
        assert_eq!(tile, before);
    }
}
