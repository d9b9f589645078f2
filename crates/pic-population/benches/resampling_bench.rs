// ─────────────────────────────────────────────────────────────────────
// SCPN PIC — Resampling Benchmark
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use pic_population::expression::ExpressionRegistry;
use pic_population::species::{build_species, Species};
use pic_types::config::{QedConfig, ResamplingConfig, SimulationConfig, SpeciesConfig, Switch};
use pic_types::constants::{M_ELECTRON, Q_ELECTRON};
use pic_types::state::{CoreParticle, MemoryResidency};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, StandardNormal};
use std::hint::black_box;

const TILES: usize = 8;

fn make_species(algorithm: &str, per_tile: usize) -> Species {
    let config = SimulationConfig {
        run_name: format!("bench-{algorithm}"),
        seed: 1,
        num_levels: 1,
        refinement_ratio: 2,
        domain_cells: Some([32, 32, 32]),
        tile_residency: MemoryResidency::Host,
        qed: QedConfig::default(),
        species: vec![SpeciesConfig {
            name: "electrons".into(),
            mass: M_ELECTRON,
            charge: -Q_ELECTRON,
            do_qed_quantum_sync: false,
            do_qed_breit_wheeler: false,
            ionization_initial_level: None,
            attributes: Vec::new(),
            resampling: ResamplingConfig {
                resampling: Switch::On,
                resampling_algorithm: algorithm.to_string(),
                resampling_merge_cell_size: Some([1.0e-6; 3]),
                resampling_merge_momentum_bin: Some(5.0e6),
                ..ResamplingConfig::default()
            },
        }],
    };
    let mut species = build_species(&config, &ExpressionRegistry::new())
        .expect("benchmark species should be valid")
        .remove(0);

    let mut rng = StdRng::seed_from_u64(11);
    for t in 0..TILES {
        let tile = species.add_tile(0).expect("level 0 exists");
        let particles: Vec<CoreParticle> = (0..per_tile)
            .map(|_| {
                let mut u = || -> f64 {
                    let v: f64 = StandardNormal.sample(&mut rng);
                    1.0e7 * v
                };
                let (ux, uy, uz) = (u(), u(), u());
                CoreParticle {
                    x: rng.gen_range(0.0..8.0e-6),
                    y: rng.gen_range(0.0..8.0e-6),
                    z: 1.0e-5 * t as f64,
                    ux,
                    uy,
                    uz,
                    w: rng.gen_range(0.5..2.0),
                }
            })
            .collect();
        species
            .add_particles(0, tile, &particles, 0.0, 0)
            .expect("benchmark particles should be valid");
    }
    species
}

fn bench_resampling_algorithms(c: &mut Criterion) {
    let mut group = c.benchmark_group("resampling_algorithms");
    group.sample_size(10);

    for algorithm in ["cell_average", "velocity_coincidence"] {
        for per_tile in [2_000usize, 20_000usize] {
            let species = make_species(algorithm, per_tile);
            group.bench_function(format!("{algorithm}_{TILES}x{per_tile}"), |b| {
                b.iter_batched(
                    || species.clone(),
                    |mut s| {
                        let report = s
                            .resample(0, u64::MAX, 0.0)
                            .expect("benchmark resampling should succeed");
                        black_box(report.particles_after())
                    },
                    BatchSize::LargeInput,
                )
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_resampling_algorithms);
criterion_main!(benches);
