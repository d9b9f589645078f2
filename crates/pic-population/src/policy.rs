// ─────────────────────────────────────────────────────────────────────
// SCPN PIC — Initialization Policies
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Default value rules for particle components created by elementary
//! processes (ionization products, QED pairs, merged particles).

use pic_types::constants::{OPTICAL_DEPTH_BW, OPTICAL_DEPTH_QSR};
use pic_types::error::{PicError, PicResult};
use rand::Rng;
use std::str::FromStr;

/// How a component is filled when nobody sets it explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InitializationPolicy {
    Zero,
    One,
    /// Exponentially distributed optical depth of a Poisson process.
    RandomExponential,
}

/// Process-wide default policies, keyed by component name.
const DEFAULT_POLICIES: [(&str, InitializationPolicy); 6] = [
    ("w", InitializationPolicy::Zero),
    ("ux", InitializationPolicy::Zero),
    ("uy", InitializationPolicy::Zero),
    ("uz", InitializationPolicy::Zero),
    (OPTICAL_DEPTH_BW, InitializationPolicy::RandomExponential),
    (OPTICAL_DEPTH_QSR, InitializationPolicy::RandomExponential),
];

/// Draw `-ln(U)` with `U` uniform in (0, 1].
pub fn sample_exponential<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let u = 1.0 - rng.gen::<f64>();
    -u.ln()
}

impl InitializationPolicy {
    /// Default policy registered for `name`, if any.
    pub fn default_for(name: &str) -> Option<Self> {
        DEFAULT_POLICIES
            .iter()
            .find(|(component, _)| *component == name)
            .map(|&(_, policy)| policy)
    }

    /// Deterministic value of the policy, `None` for random policies.
    pub fn constant(self) -> Option<f64> {
        match self {
            InitializationPolicy::Zero => Some(0.0),
            InitializationPolicy::One => Some(1.0),
            InitializationPolicy::RandomExponential => None,
        }
    }

    pub fn real_value<R: Rng + ?Sized>(self, rng: &mut R) -> f64 {
        match self.constant() {
            Some(value) => value,
            None => sample_exponential(rng),
        }
    }

    /// Integer components only accept `Zero` and `One`.
    pub fn int_value(self) -> PicResult<i32> {
        match self {
            InitializationPolicy::Zero => Ok(0),
            InitializationPolicy::One => Ok(1),
            InitializationPolicy::RandomExponential => Err(PicError::ConfigError(
                "RandomExponential policy is not valid for integer attributes".to_string(),
            )),
        }
    }
}

impl FromStr for InitializationPolicy {
    type Err = PicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zero" => Ok(InitializationPolicy::Zero),
            "one" => Ok(InitializationPolicy::One),
            "random_exponential" | "randomexp" => Ok(InitializationPolicy::RandomExponential),
            other => Err(PicError::ConfigError(format!(
                "Initialization policy not recognized: '{other}'"
            ))),
        }
    }
}
