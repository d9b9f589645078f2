// ─────────────────────────────────────────────────────────────────────
// SCPN PIC — State
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use crate::constants::SPEED_OF_LIGHT;
use crate::error::{PicError, PicResult};
use serde::{Deserialize, Serialize};

/// Column indices of the core real components.
/// Every tile stores these first; runtime real attributes follow.
pub struct PIdx;

impl PIdx {
    pub const X: usize = 0;
    pub const Y: usize = 1;
    pub const Z: usize = 2;
    pub const W: usize = 3;
    pub const UX: usize = 4;
    pub const UY: usize = 5;
    pub const UZ: usize = 6;
    pub const COUNT: usize = 7;
    pub const NAMES: [&'static str; PIdx::COUNT] = ["x", "y", "z", "w", "ux", "uy", "uz"];
}

/// Where the backing storage of a tile lives.
/// Only `Device` storage is eligible for the data-parallel kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryResidency {
    #[default]
    Host,
    Pinned,
    Device,
}

impl MemoryResidency {
    pub fn is_device_accessible(self) -> bool {
        matches!(self, MemoryResidency::Device)
    }
}

/// Position [m], momentum per unit mass u = γv [m/s] and statistical weight
/// of one macro-particle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CoreParticle {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub ux: f64,
    pub uy: f64,
    pub uz: f64,
    pub w: f64,
}

impl CoreParticle {
    pub fn momentum(&self) -> [f64; 3] {
        [self.ux, self.uy, self.uz]
    }

    /// Relativistic Lorentz factor γ = sqrt(1 + u²/c²).
    pub fn lorentz_factor(&self) -> f64 {
        let u2 = self.ux * self.ux + self.uy * self.uy + self.uz * self.uz;
        (1.0 + u2 / (SPEED_OF_LIGHT * SPEED_OF_LIGHT)).sqrt()
    }

    fn components(&self) -> [f64; PIdx::COUNT] {
        let mut out = [0.0; PIdx::COUNT];
        out[PIdx::X] = self.x;
        out[PIdx::Y] = self.y;
        out[PIdx::Z] = self.z;
        out[PIdx::W] = self.w;
        out[PIdx::UX] = self.ux;
        out[PIdx::UY] = self.uy;
        out[PIdx::UZ] = self.uz;
        out
    }
}

/// Structure-of-arrays particle storage for one species, one refinement
/// level and one decomposition unit.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleTile {
    real: Vec<Vec<f64>>,
    int: Vec<Vec<i32>>,
    residency: MemoryResidency,
}

impl ParticleTile {
    /// Create an empty tile. `num_real_comps` counts the core components.
    pub fn new(
        num_real_comps: usize,
        num_int_comps: usize,
        residency: MemoryResidency,
    ) -> PicResult<Self> {
        if num_real_comps < PIdx::COUNT {
            return Err(PicError::SchemaMismatch(format!(
                "tile needs at least {} real components, got {num_real_comps}",
                PIdx::COUNT
            )));
        }
        Ok(Self {
            real: vec![Vec::new(); num_real_comps],
            int: vec![Vec::new(); num_int_comps],
            residency,
        })
    }

    pub fn len(&self) -> usize {
        self.real[PIdx::X].len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn num_real_comps(&self) -> usize {
        self.real.len()
    }

    pub fn num_int_comps(&self) -> usize {
        self.int.len()
    }

    pub fn residency(&self) -> MemoryResidency {
        self.residency
    }

    pub fn real(&self, comp: usize) -> &[f64] {
        &self.real[comp]
    }

    pub fn real_mut(&mut self, comp: usize) -> &mut [f64] {
        &mut self.real[comp]
    }

    pub fn int(&self, comp: usize) -> &[i32] {
        &self.int[comp]
    }

    pub fn int_mut(&mut self, comp: usize) -> &mut [i32] {
        &mut self.int[comp]
    }

    /// Mutable access to all real and integer columns at once, so that
    /// kernels can read core components while writing runtime ones.
    pub fn columns_mut(&mut self) -> (&mut [Vec<f64>], &mut [Vec<i32>]) {
        (&mut self.real, &mut self.int)
    }

    pub fn core(&self, ip: usize) -> CoreParticle {
        CoreParticle {
            x: self.real[PIdx::X][ip],
            y: self.real[PIdx::Y][ip],
            z: self.real[PIdx::Z][ip],
            ux: self.real[PIdx::UX][ip],
            uy: self.real[PIdx::UY][ip],
            uz: self.real[PIdx::UZ][ip],
            w: self.real[PIdx::W][ip],
        }
    }

    /// Append one particle. Runtime columns are zero-filled and must be
    /// initialized by the caller before the particle is used.
    pub fn push_core(&mut self, particle: &CoreParticle) {
        for (comp, value) in particle.components().into_iter().enumerate() {
            self.real[comp].push(value);
        }
        for column in self.real.iter_mut().skip(PIdx::COUNT) {
            column.push(0.0);
        }
        for column in self.int.iter_mut() {
            column.push(0);
        }
    }

    /// Append one particle with explicit integer attributes.
    pub fn push_with_ints(&mut self, particle: &CoreParticle, ints: &[i32]) -> PicResult<()> {
        if ints.len() != self.int.len() {
            return Err(PicError::SchemaMismatch(format!(
                "expected {} integer attributes, got {}",
                self.int.len(),
                ints.len()
            )));
        }
        self.push_core(particle);
        let ip = self.len() - 1;
        for (column, &value) in self.int.iter_mut().zip(ints) {
            column[ip] = value;
        }
        Ok(())
    }

    /// Keep only the particles at `keep` (strictly increasing), in order.
    pub fn retain_indices(&mut self, keep: &[usize]) -> PicResult<()> {
        let len = self.len();
        for pair in keep.windows(2) {
            if pair[1] <= pair[0] {
                return Err(PicError::InvariantViolation(format!(
                    "retain indices must be strictly increasing, got {} after {}",
                    pair[1], pair[0]
                )));
            }
        }
        if let Some(&last) = keep.last() {
            if last >= len {
                return Err(PicError::RangeOutOfBounds {
                    start: last,
                    stop: last + 1,
                    len,
                });
            }
        }
        for column in self.real.iter_mut() {
            *column = keep.iter().map(|&ip| column[ip]).collect();
        }
        for column in self.int.iter_mut() {
            *column = keep.iter().map(|&ip| column[ip]).collect();
        }
        Ok(())
    }

    pub fn total_weight(&self) -> f64 {
        self.real[PIdx::W].iter().sum()
    }
}
