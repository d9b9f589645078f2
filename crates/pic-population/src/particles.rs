//! Macro-particle checks and conserved moments of a tile.
//!
//! Resampling must leave total weight and momentum unchanged; the
//! energy-conserving merge also keeps the relativistic kinetic energy.
//! [`tile_moments`] is the measurement used by those checks.

use pic_types::error::{PicError, PicResult};
use pic_types::state::{CoreParticle, PIdx, ParticleTile};

pub(crate) fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

pub(crate) fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

pub(crate) fn norm(a: [f64; 3]) -> f64 {
    dot(a, a).sqrt()
}

pub fn validate_particle_state(particle: &CoreParticle, label: &str) -> PicResult<()> {
    if !particle.x.is_finite() || !particle.y.is_finite() || !particle.z.is_finite() {
        return Err(PicError::PhysicsViolation(format!(
            "{label} position components must be finite"
        )));
    }
    if !particle.ux.is_finite() || !particle.uy.is_finite() || !particle.uz.is_finite() {
        return Err(PicError::PhysicsViolation(format!(
            "{label} momentum components must be finite"
        )));
    }
    if !particle.w.is_finite() || particle.w <= 0.0 {
        return Err(PicError::PhysicsViolation(format!(
            "{label}.w must be finite and > 0"
        )));
    }
    Ok(())
}

/// Kinetic energy per unit mass (γ-1)c², evaluated as u²/(γ+1) so that
/// slow particles do not lose precision.
pub fn kinetic_energy_per_mass(particle: &CoreParticle) -> f64 {
    let u2 = dot(particle.momentum(), particle.momentum());
    u2 / (particle.lorentz_factor() + 1.0)
}

/// Weighted sums over all particles of a tile, per unit mass.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TileMoments {
    pub count: usize,
    pub total_weight: f64,
    /// Σ w·u [m/s]
    pub momentum: [f64; 3],
    /// Σ w·(γ-1)c² [m²/s²]
    pub energy: f64,
}

impl TileMoments {
    pub fn accumulate(&mut self, other: &TileMoments) {
        self.count += other.count;
        self.total_weight += other.total_weight;
        for axis in 0..3 {
            self.momentum[axis] += other.momentum[axis];
        }
        self.energy += other.energy;
    }
}

pub fn tile_moments(tile: &ParticleTile) -> TileMoments {
    let mut moments = TileMoments {
        count: tile.len(),
        total_weight: tile.total_weight(),
        ..TileMoments::default()
    };
    let w = tile.real(PIdx::W);
    for ip in 0..tile.len() {
        let particle = tile.core(ip);
        for (axis, u) in particle.momentum().into_iter().enumerate() {
            moments.momentum[axis] += w[ip] * u;
        }
        moments.energy += w[ip] * kinetic_energy_per_mass(&particle);
    }
    moments
}
