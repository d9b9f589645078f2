// ─────────────────────────────────────────────────────────────────────
// SCPN PIC — Property-Based Tests (proptest) for pic-population
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Property-based tests for pic-population using proptest.
//!
//! Covers: trigger predicate, initializer sentinel columns, execution path
//! equivalence, merge conservation laws.

use pic_population::expression::{ExpressionRegistry, PhaseSpacePoint, SharedExpression};
use pic_population::initializer::{
    ExecutionPath, ExternalAttributes, InitContext, RuntimeAttributeInitializer,
};
use pic_population::policy::InitializationPolicy;
use pic_population::qed::QedEngines;
use pic_population::random::RandomStream;
use pic_population::schema::AttributeSchema;
use pic_population::species::{build_species, Species};
use pic_population::trigger::ResamplingTrigger;
use pic_types::config::{
    AttributeKind, QedConfig, ResamplingConfig, SimulationConfig, SpeciesConfig, Switch,
    UserAttributeConfig,
};
use pic_types::constants::{M_ELECTRON, OPTICAL_DEPTH_BW, OPTICAL_DEPTH_QSR, Q_ELECTRON};
use pic_types::state::{CoreParticle, MemoryResidency, PIdx, ParticleTile};
use proptest::prelude::*;
use std::sync::Arc;

const SENTINEL: f64 = -4242.0;

fn qed_all() -> QedEngines {
    QedEngines::from_config(&QedConfig {
        quantum_synchrotron: true,
        breit_wheeler: true,
    })
}

fn wide_schema() -> Arc<AttributeSchema> {
    let x2: SharedExpression = Arc::new(|p: &PhaseSpacePoint| 2.0 * p.x);
    let charge_state: SharedExpression = Arc::new(|p: &PhaseSpacePoint| p.ux.abs().sqrt());
    Arc::new(
        AttributeSchema::builder()
            .real_attribute(OPTICAL_DEPTH_QSR)
            .and_then(|b| b.real_attribute(OPTICAL_DEPTH_BW))
            .and_then(|b| b.real_expression("x2", x2))
            .and_then(|b| b.real_policy("spin", InitializationPolicy::One))
            .and_then(|b| b.int_expression("charge_state", charge_state))
            .and_then(|b| b.int_policy("tag", InitializationPolicy::One))
            .expect("valid schema")
            .build(),
    )
}

fn particle_strategy() -> impl Strategy<Value = CoreParticle> {
    (
        0.0f64..4.0e-6,
        0.0f64..4.0e-6,
        0.0f64..4.0e-6,
        -3.0e8f64..3.0e8,
        -3.0e8f64..3.0e8,
        -3.0e8f64..3.0e8,
        0.1f64..10.0,
    )
        .prop_map(|(x, y, z, ux, uy, uz, w)| CoreParticle {
            x,
            y,
            z,
            ux,
            uy,
            uz,
            w,
        })
}

fn filled_tile(schema: &AttributeSchema, particles: &[CoreParticle]) -> ParticleTile {
    let mut tile = schema.new_tile(MemoryResidency::Host).expect("valid schema");
    for p in particles {
        tile.push_core(p);
    }
    tile
}

fn merging_species(algorithm: &str) -> Species {
    let config = SimulationConfig {
        run_name: "prop".into(),
        seed: 9,
        num_levels: 1,
        refinement_ratio: 2,
        domain_cells: None,
        tile_residency: MemoryResidency::Host,
        qed: QedConfig::default(),
        species: vec![SpeciesConfig {
            name: "electrons".into(),
            mass: M_ELECTRON,
            charge: -Q_ELECTRON,
            do_qed_quantum_sync: false,
            do_qed_breit_wheeler: false,
            ionization_initial_level: Some(1),
            attributes: vec![UserAttributeConfig {
                name: "a".into(),
                kind: AttributeKind::Real,
                expression: "x".into(),
            }],
            resampling: ResamplingConfig {
                resampling: Switch::On,
                resampling_algorithm: algorithm.to_string(),
                resampling_merge_cell_size: Some([4.0e-6; 3]),
                resampling_merge_momentum_bin: Some(1.0e9),
                ..ResamplingConfig::default()
            },
        }],
    };
    let compiler = ExpressionRegistry::new().with("x", |p: &PhaseSpacePoint| p.x);
    build_species(&config, &compiler)
        .expect("valid species")
        .remove(0)
}

// ── Trigger Properties ───────────────────────────────────────────────

proptest! {
    /// The trigger matches its closed-form definition and is pure.
    #[test]
    fn trigger_matches_definition(
        interval in 1u64..50,
        threshold in proptest::option::of(0u64..1000),
        step in 0u64..10_000,
        count in 0u64..2000,
    ) {
        let trigger = ResamplingTrigger::new(interval, threshold, None).expect("valid trigger");
        let expected = (step + 1) % interval == 0 && threshold.map_or(true, |t| count > t);
        prop_assert_eq!(trigger.triggered(step, count), expected);
        prop_assert_eq!(trigger.triggered(step, count), trigger.triggered(step, count));
    }
}

// ── Initializer Properties ───────────────────────────────────────────

proptest! {
    /// Columns below `n_external` keep their sentinel; every other column
    /// is written.
    #[test]
    fn initializer_respects_external_columns(
        particles in proptest::collection::vec(particle_strategy(), 1..40),
        extra_real in 0usize..5,
        n_int in 0usize..3,
    ) {
        let schema = wide_schema();
        let initializer = RuntimeAttributeInitializer::new(schema.clone(), qed_all(), 0);
        let mut tile = filled_tile(&schema, &particles);
        for comp in PIdx::COUNT..tile.num_real_comps() {
            tile.real_mut(comp).fill(SENTINEL);
        }
        for comp in 0..tile.num_int_comps() {
            tile.int_mut(comp).fill(-1);
        }
        let external = ExternalAttributes { real: PIdx::COUNT + extra_real, int: n_int };
        let ctx = InitContext { time: 0.0, do_qed_comps: true, random: RandomStream::new(1) };
        initializer
            .initialize(&mut tile, external, 0..particles.len(), &ctx)
            .expect("valid initialization");

        for comp in PIdx::COUNT..tile.num_real_comps() {
            let untouched = tile.real(comp).iter().all(|&v| v == SENTINEL);
            prop_assert_eq!(untouched, comp < external.real, "real column {}", comp);
        }
        for comp in 0..tile.num_int_comps() {
            let untouched = tile.int(comp).iter().all(|&v| v == -1);
            prop_assert_eq!(untouched, comp < external.int, "int column {}", comp);
        }
        for (ip, p) in particles.iter().enumerate() {
            prop_assert_eq!(tile.core(ip), *p);
        }
    }

    /// Sequential and data-parallel execution give identical tiles.
    #[test]
    fn initializer_paths_are_bit_identical(
        particles in proptest::collection::vec(particle_strategy(), 0..80),
        seed in any::<u64>(),
    ) {
        let schema = wide_schema();
        let ctx = InitContext { time: 1.0e-15, do_qed_comps: true, random: RandomStream::new(seed) };
        let mut tiles = Vec::new();
        for path in [ExecutionPath::Sequential, ExecutionPath::DataParallel] {
            let initializer = RuntimeAttributeInitializer::new(schema.clone(), qed_all(), 0)
                .with_execution_path(path);
            let mut tile = filled_tile(&schema, &particles);
            initializer
                .initialize(&mut tile, ExternalAttributes::core_only(), 0..particles.len(), &ctx)
                .expect("valid initialization");
            tiles.push(tile);
        }
        prop_assert_eq!(&tiles[0], &tiles[1]);
    }
}

// ── Merge Properties ─────────────────────────────────────────────────

fn run_merge(algorithm: &str, particles: &[CoreParticle]) -> (Species, Species) {
    let mut species = merging_species(algorithm);
    let tile = species.add_tile(0).expect("level 0 exists");
    species
        .add_particles(0, tile, particles, 0.0, 0)
        .expect("valid particles");
    let before = species.clone();
    species
        .resample(0, particles.len() as u64, 0.0)
        .expect("resampling succeeds");
    (before, species)
}

proptest! {
    /// Merging conserves total weight and never adds particles, for any
    /// set including the empty and the single-particle one.
    #[test]
    fn merge_conserves_weight(
        particles in proptest::collection::vec(particle_strategy(), 0..60),
        energy_conserving in any::<bool>(),
    ) {
        let algorithm = if energy_conserving { "velocity_coincidence" } else { "cell_average" };
        let (before, after) = run_merge(algorithm, &particles);
        let w0 = before.total_weight();
        let w1 = after.total_weight();
        prop_assert!((w1 - w0).abs() <= 1e-12 * w0.max(1.0), "weight {} -> {}", w0, w1);
        prop_assert!(after.local_particle_count() <= before.local_particle_count());
        if particles.len() <= 1 {
            prop_assert_eq!(after.tiles(0), before.tiles(0));
        }

        let tile = &after.tiles(0)[0];
        for comp in 0..tile.num_real_comps() {
            prop_assert_eq!(tile.real(comp).len(), tile.len());
        }
        let a = after.schema().real_index("a").expect("user column");
        prop_assert_eq!(tile.real(a), tile.real(PIdx::X));
        prop_assert!(tile.int(0).iter().all(|&level| level == 1));
    }

    /// Both merges conserve momentum; the pair merge also conserves energy.
    #[test]
    fn merge_conservation_laws(
        particles in proptest::collection::vec(particle_strategy(), 3..60),
    ) {
        for algorithm in ["cell_average", "velocity_coincidence"] {
            let (before, after) = run_merge(algorithm, &particles);
            let m0 = before.moments();
            let m1 = after.moments();
            let p_scale = m0.total_weight * 3.0e8;
            for axis in 0..3 {
                prop_assert!((m1.momentum[axis] - m0.momentum[axis]).abs() <= 1e-9 * p_scale);
            }
            if algorithm == "velocity_coincidence" {
                prop_assert!((m1.energy - m0.energy).abs() <= 1e-9 * m0.energy.max(1.0));
            } else {
                prop_assert!(m1.energy <= m0.energy * (1.0 + 1e-12));
            }
        }
    }
}
