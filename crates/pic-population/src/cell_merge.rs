// ─────────────────────────────────────────────────────────────────────
// SCPN PIC — Cell-Average Merge
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Merge each phase-space group into one particle at its weighted mean.
//!
//! Conserves weight and momentum. Kinetic energy drops by the thermal
//! spread of the group.

use crate::initializer::InitContext;
use crate::merge::{group_centroid, group_ints, replace_groups, MergeBinning, MergedParticle};
use crate::species::SpeciesContext;
use pic_types::config::ResamplingConfig;
use pic_types::error::PicResult;
use pic_types::state::{CoreParticle, ParticleTile};

#[derive(Debug, Clone, PartialEq)]
pub struct CellAverageMerge {
    binning: MergeBinning,
}

impl CellAverageMerge {
    pub const NAME: &'static str = "cell_average";
    pub const MIN_GROUP_SIZE: usize = 2;

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
            .map(|members| {
                let (pos, weight, momentum) = group_centroid(tile, members);
                let [ux, uy, uz] = momentum.map(|p| p / weight);
                MergedParticle {
                    core: CoreParticle {
                        x: pos[0],
                        y: pos[1],
                        z: pos[2],
                        ux,
                        uy,
                        uz,
                        w: weight,
                    },
                    ints: group_ints(tile, members[0]),
                }
            })
            .collect();
        replace_groups(tile, &groups, &products, species, init_ctx)
    }
}
