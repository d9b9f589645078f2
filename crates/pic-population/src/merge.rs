// ─────────────────────────────────────────────────────────────────────
// SCPN PIC — Merge Binning
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Phase-space binning shared by the merging algorithms.
//!
//! Particles are grouped by spatial cell, momentum bin and identical
//! integer attributes. Groups are visited in key order and list their
//! particle indices in ascending order, so merging is deterministic.

use crate::initializer::{ExternalAttributes, InitContext};
use crate::species::SpeciesContext;
use pic_types::config::ResamplingConfig;
use pic_types::error::{PicError, PicResult};
use pic_types::state::{CoreParticle, PIdx, ParticleTile};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct GroupKey {
    cell: [i64; 3],
    momentum: [i64; 3],
    ints: Vec<i32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergeBinning {
    cell_size: [f64; 3],
    momentum_bin: f64,
    min_group_size: usize,
    refinement_ratio: u32,
}

impl MergeBinning {
    pub fn new(
        cell_size: [f64; 3],
        momentum_bin: f64,
        min_group_size: usize,
        refinement_ratio: u32,
    ) -> PicResult<Self> {
        if cell_size.iter().any(|d| !d.is_finite() || *d <= 0.0) {
            return Err(PicError::ConfigError(format!(
                "resampling_merge_cell_size must be finite and > 0, got {cell_size:?}"
            )));
        }
        if !momentum_bin.is_finite() || momentum_bin <= 0.0 {
            return Err(PicError::ConfigError(format!(
                "resampling_merge_momentum_bin must be finite and > 0, got {momentum_bin}"
            )));
        }
        if refinement_ratio == 0 {
            return Err(PicError::ConfigError(
                "refinement_ratio must be >= 1".to_string(),
            ));
        }
        Ok(Self {
            cell_size,
            momentum_bin,
            min_group_size,
            refinement_ratio,
        })
    }

    /// Read the merge keys of one species. `min_group_size` falls back to
    /// `default_min` and may not go below `floor`.
    pub fn from_config(
        config: &ResamplingConfig,
        refinement_ratio: u32,
        default_min: usize,
        floor: usize,
        algorithm: &str,
    ) -> PicResult<Self> {
        let cell_size = config.resampling_merge_cell_size.ok_or_else(|| {
            PicError::ConfigError(format!(
                "resampling algorithm '{algorithm}' requires resampling_merge_cell_size"
            ))
        })?;
        let momentum_bin = config.resampling_merge_momentum_bin.ok_or_else(|| {
            PicError::ConfigError(format!(
                "resampling algorithm '{algorithm}' requires resampling_merge_momentum_bin"
            ))
        })?;
        let min_group_size = config
            .resampling_merge_min_group_size
            .unwrap_or(default_min);
        if min_group_size < floor {
            return Err(PicError::ConfigError(format!(
                "resampling algorithm '{algorithm}' needs groups of at least {floor}, got {min_group_size}"
            )));
        }
        Self::new(cell_size, momentum_bin, min_group_size, refinement_ratio)
    }

    pub fn min_group_size(&self) -> usize {
        self.min_group_size
    }

    pub fn momentum_bin(&self) -> f64 {
        self.momentum_bin
    }

    /// Merge cell size on refinement level `level`.
    pub fn cell_size_at(&self, level: usize) -> [f64; 3] {
        let scale = (self.refinement_ratio as f64).powi(level as i32);
        self.cell_size.map(|d| d / scale)
    }

    fn key(&self, tile: &ParticleTile, ip: usize, cell: [f64; 3]) -> GroupKey {
        let p = tile.core(ip);
        let pos = [p.x, p.y, p.z];
        GroupKey {
            cell: std::array::from_fn(|axis| (pos[axis] / cell[axis]).floor() as i64),
            momentum: p.momentum().map(|u| (u / self.momentum_bin).floor() as i64),
            ints: (0..tile.num_int_comps())
                .map(|comp| tile.int(comp)[ip])
                .collect(),
        }
    }

    /// Groups of at least `min_group_size` particles.
    pub fn groups(&self, tile: &ParticleTile, level: usize) -> Vec<Vec<usize>> {
        if tile.len() < self.min_group_size {
            return Vec::new();
        }
        let cell = self.cell_size_at(level);
        let mut bins: BTreeMap<GroupKey, Vec<usize>> = BTreeMap::new();
        for ip in 0..tile.len() {
            bins.entry(self.key(tile, ip, cell)).or_default().push(ip);
        }
        bins.into_values()
            .filter(|members| members.len() >= self.min_group_size)
            .collect()
    }
}

/// One particle produced by a merge, with the integer attributes of its
/// group.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedParticle {
    pub core: CoreParticle,
    pub ints: Vec<i32>,
}

pub(crate) fn group_ints(tile: &ParticleTile, ip: usize) -> Vec<i32> {
    (0..tile.num_int_comps())
        .map(|comp| tile.int(comp)[ip])
        .collect()
}

/// Weight-averaged position, total weight and total momentum Σ w·u.
pub(crate) fn group_centroid(tile: &ParticleTile, members: &[usize]) -> ([f64; 3], f64, [f64; 3]) {
    let mut pos = [0.0; 3];
    let mut momentum = [0.0; 3];
    let mut weight = 0.0;
    for &ip in members {
        let p = tile.core(ip);
        weight += p.w;
        for (axis, (x, u)) in [p.x, p.y, p.z].into_iter().zip(p.momentum()).enumerate() {
            pos[axis] += p.w * x;
            momentum[axis] += p.w * u;
        }
    }
    (pos.map(|s| s / weight), weight, momentum)
}

/// Drop every particle of `groups`, append `products` and initialize their
/// runtime real columns.
pub(crate) fn replace_groups(
    tile: &mut ParticleTile,
    groups: &[Vec<usize>],
    products: &[MergedParticle],
    species: &SpeciesContext,
    init_ctx: &InitContext,
) -> PicResult<()> {
    if groups.is_empty() {
        return Ok(());
    }
    let mut consumed = vec![false; tile.len()];
    for &ip in groups.iter().flatten() {
        consumed[ip] = true;
    }
    let keep: Vec<usize> = consumed
        .iter()
        .enumerate()
        .filter_map(|(ip, &gone)| (!gone).then_some(ip))
        .collect();
    tile.retain_indices(&keep)?;

    let start = tile.len();
    for product in products {
        tile.push_with_ints(&product.core, &product.ints)?;
    }
    let external = ExternalAttributes {
        real: PIdx::COUNT,
        int: tile.num_int_comps(),
    };
    species
        .initializer()
        .initialize(tile, external, start..tile.len(), init_ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pic_types::state::MemoryResidency;

    fn binning(min: usize) -> MergeBinning {
        MergeBinning::new([1.0, 1.0, 1.0], 10.0, min, 2).unwrap()
    }

    fn tile_with(points: &[(f64, f64, i32)]) -> ParticleTile {
        let mut tile = ParticleTile::new(PIdx::COUNT, 1, MemoryResidency::Host).unwrap();
        for &(x, ux, tag) in points {
            tile.push_with_ints(
                &CoreParticle {
                    x,
                    ux,
                    w: 1.0,
                    ..CoreParticle::default()
                },
                &[tag],
            )
            .unwrap();
        }
        tile
    }

    #[test]
    fn test_groups_split_by_cell_momentum_and_ints() {
        let tile = tile_with(&[
            (0.1, 1.0, 0),
            (0.9, 2.0, 0),
            (1.5, 1.0, 0),
            (0.2, 15.0, 0),
            (0.3, 3.0, 1),
            (0.4, 4.0, 0),
        ]);
        let groups = binning(2).groups(&tile, 0);
        assert_eq!(groups, vec![vec![0, 1, 5]]);
        assert!(binning(4).groups(&tile, 0).is_empty());
    }

    #[test]
    fn test_finer_levels_use_smaller_cells() {
        let b = binning(2);
        assert_eq!(b.cell_size_at(0), [1.0, 1.0, 1.0]);
        assert_eq!(b.cell_size_at(2), [0.25, 0.25, 0.25]);
        let tile = tile_with(&[(0.1, 1.0, 0), (0.4, 1.0, 0)]);
        assert_eq!(b.groups(&tile, 0).len(), 1);
        assert!(b.groups(&tile, 2).is_empty());
    }

    #[test]
    fn test_negative_coordinates_bin_with_floor() {
        let tile = tile_with(&[(-0.1, -1.0, 0), (-0.9, -2.0, 0), (0.1, 1.0, 0)]);
        assert_eq!(binning(2).groups(&tile, 0), vec![vec![0, 1]]);
    }

    #[test]
    fn test_centroid_is_weighted() {
        let mut tile = tile_with(&[(0.0, 2.0, 0)]);
        tile.push_with_ints(
            &CoreParticle {
                x: 1.0,
                ux: -1.0,
                w: 3.0,
                ..CoreParticle::default()
            },
            &[0],
        )
        .unwrap();
        let (pos, w, p) = group_centroid(&tile, &[0, 1]);
        assert!((pos[0] - 0.75).abs() < 1e-15);
        assert!((w - 4.0).abs() < 1e-15);
        assert!((p[0] + 1.0).abs() < 1e-15);
    }

    #[test]
    fn test_from_config_validates_keys() {
        let mut cfg = ResamplingConfig::default();
        assert!(MergeBinning::from_config(&cfg, 2, 2, 2, "cell_average").is_err());
        cfg.resampling_merge_cell_size = Some([1.0, 1.0, 1.0]);
        assert!(MergeBinning::from_config(&cfg, 2, 2, 2, "cell_average").is_err());
        cfg.resampling_merge_momentum_bin = Some(1.0e6);
        let b = MergeBinning::from_config(&cfg, 2, 3, 3, "velocity_coincidence").unwrap();
        assert_eq!(b.min_group_size(), 3);
        cfg.resampling_merge_min_group_size = Some(2);
        let err = MergeBinning::from_config(&cfg, 2, 3, 3, "velocity_coincidence")
            .expect_err("group size below floor must fail");
        match err {
            PicError::ConfigError(msg) => assert!(msg.contains("at least 3")),
            other => panic!("Unexpected error: {other:?}"),
        }
        cfg.resampling_merge_cell_size = Some([1.0, 0.0, 1.0]);
        assert!(MergeBinning::from_config(&cfg, 2, 2, 2, "cell_average").is_err());
        assert!(MergeBinning::new([1.0; 3], 1.0, 2, 0).is_err());
    }
}
