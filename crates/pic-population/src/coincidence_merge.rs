// ─────────────────────────────────────────────────────────────────────
// SCPN PIC — Velocity-Coincidence Merge
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Energy-conserving merge of each group into a symmetric particle pair.
//!
//! A group of total weight W, momentum P and kinetic energy E becomes two
//! particles of weight W/2 at the group centroid with momenta
//!
//!   u± = u_t (cos θ e₁ ± sin θ e₂),   cos θ = |P| / (W u_t)
//!
//! where e₁ = P/|P|, e₂ ⟂ e₁, and u_t is the momentum of a particle whose
//! γ equals the weighted mean γ of the group. Weight, momentum and
//! relativistic energy are conserved.

use crate::initializer::InitContext;
use crate::merge::{group_centroid, group_ints, replace_groups, MergeBinning, MergedParticle};
use crate::particles::{cross, kinetic_energy_per_mass, norm};
use crate::species::SpeciesContext;
use pic_types::config::ResamplingConfig;
use pic_types::constants::SPEED_OF_LIGHT;
use pic_types::error::PicResult;
use pic_types::state::{CoreParticle, ParticleTile};

/// Unit vector orthogonal to `e1`, built from the least aligned axis.
fn orthogonal_unit(e1: [f64; 3]) -> [f64; 3] {
    let abs = e1.map(f64::abs);
    let axis = if abs[0] <= abs[1] && abs[0] <= abs[2] {
        [1.0, 0.0, 0.0]
    } else if abs[1] <= abs[2] {
        [0.0, 1.0, 0.0]
    } else {
        [0.0, 0.0, 1.0]
    };
    let v = cross(e1, axis);
    let n = norm(v);
    v.map(|c| c / n)
}

#[derive(Debug, Clone, PartialEq)]
pub struct VelocityCoincidenceMerge {
    binning: MergeBinning,
}

impl VelocityCoincidenceMerge {
    pub const NAME: &'static str = "velocity_coincidence";
    pub const MIN_GROUP_SIZE: usize = 3;

    pub fn new(binning: MergeBinning) -> Self {
        Self { binning }
    }

    pub fn from_config(config: &ResamplingConfig, refinement_ratio: u32) -> PicResult<Self> {
        MergeBinning::from_config(
            config,
            refinement_ratio,
            Self::MIN_GROUP_SIZE,
            Self::MIN_GROUP_SIZE,
            Self::NAME,
        )
        .map(Self::new)
    }

    pub fn binning(&self) -> &MergeBinning {
        &self.binning
    }

    fn merge_group(tile: &ParticleTile, members: &[usize]) -> [MergedParticle; 2] {
        let (pos, weight, momentum) = group_centroid(tile, members);
        let c2 = SPEED_OF_LIGHT * SPEED_OF_LIGHT;
        let epsilon = members
            .iter()
            .map(|&ip| {
                let p = tile.core(ip);
                p.w * kinetic_energy_per_mass(&p) / c2
            })
            .sum::<f64>()
            / weight;
        let u_t = SPEED_OF_LIGHT * (epsilon * (epsilon + 2.0)).sqrt();

        let p_norm = norm(momentum);
        let e1 = if p_norm > 0.0 {
            momentum.map(|p| p / p_norm)
        } else {
            [1.0, 0.0, 0.0]
        };
        let e2 = orthogonal_unit(e1);
        let cos_theta = if u_t > 0.0 {
            (p_norm / (weight * u_t)).clamp(-1.0, 1.0)
        } else {
            1.0
        };
        let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();

        let ints = group_ints(tile, members[0]);
        [1.0, -1.0].map(|sign| {
            let u: [f64; 3] =
                std::array::from_fn(|k| u_t * (cos_theta * e1[k] + sign * sin_theta * e2[k]));
            MergedParticle {
                core: CoreParticle {
                    x: pos[0],
                    y: pos[1],
                    z: pos[2],
                    ux: u[0],
                    uy: u[1],
                    uz: u[2],
                    w: 0.5 * weight,
                },
                ints: ints.clone(),
            }
        })
    }

    pub fn apply(
        &self,
        tile: &mut ParticleTile,
        level: usize,
        species: &SpeciesContext,
        init_ctx: &InitContext,
    ) -> PicResult<()> {
        let groups = self.binning.groups(tile, level);
        let products: Vec<MergedParticle> = groups
            .iter()
            .flat_map(|members| Self::merge_group(tile, members))
            .collect();
        replace_groups(tile, &groups, &products, species, init_ctx)
    }
}
