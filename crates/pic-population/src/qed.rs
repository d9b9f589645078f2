// ─────────────────────────────────────────────────────────────────────
// SCPN PIC — QED Optical Depth Engines
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Stochastic optical-depth samplers of the QED processes.

use crate::policy::InitializationPolicy;
use pic_types::config::QedConfig;
use pic_types::constants::{OPTICAL_DEPTH_BW, OPTICAL_DEPTH_QSR};
use rand::rngs::StdRng;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QedProcess {
    QuantumSynchrotron,
    BreitWheeler,
}

impl QedProcess {
    pub fn optical_depth_attribute(self) -> &'static str {
        match self {
            QedProcess::QuantumSynchrotron => OPTICAL_DEPTH_QSR,
            QedProcess::BreitWheeler => OPTICAL_DEPTH_BW,
        }
    }

    /// Process owning the reserved optical-depth column `name`.
    pub fn from_attribute(name: &str) -> Option<Self> {
        match name {
            OPTICAL_DEPTH_QSR => Some(QedProcess::QuantumSynchrotron),
            OPTICAL_DEPTH_BW => Some(QedProcess::BreitWheeler),
            _ => None,
        }
    }
}

/// One optical-depth draw per call.
pub trait OpticalDepthSampler: Send + Sync {
    fn sample(&self, rng: &mut StdRng) -> f64;
}

/// Optical depth drawn from the unit exponential distribution.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExponentialOpticalDepth;

impl OpticalDepthSampler for ExponentialOpticalDepth {
    fn sample(&self, rng: &mut StdRng) -> f64 {
        InitializationPolicy::RandomExponential.real_value(rng)
    }
}

/// Samplers of the processes enabled for this run.
#[derive(Clone, Default)]
pub struct QedEngines {
    quantum_synchrotron: Option<Arc<dyn OpticalDepthSampler>>,
    breit_wheeler: Option<Arc<dyn OpticalDepthSampler>>,
}

impl QedEngines {
    /// No process enabled.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn from_config(config: &QedConfig) -> Self {
        let mut engines = Self::disabled();
        if config.quantum_synchrotron {
            engines = engines.with_sampler(
                QedProcess::QuantumSynchrotron,
                Arc::new(ExponentialOpticalDepth),
            );
        }
        if config.breit_wheeler {
            engines =
                engines.with_sampler(QedProcess::BreitWheeler, Arc::new(ExponentialOpticalDepth));
        }
        engines
    }

    pub fn with_sampler(
        mut self,
        process: QedProcess,
        sampler: Arc<dyn OpticalDepthSampler>,
    ) -> Self {
        match process {
            QedProcess::QuantumSynchrotron => self.quantum_synchrotron = Some(sampler),
            QedProcess::BreitWheeler => self.breit_wheeler = Some(sampler),
        }
        self
    }

    pub fn sampler(&self, process: QedProcess) -> Option<&dyn OpticalDepthSampler> {
        match process {
            QedProcess::QuantumSynchrotron => self.quantum_synchrotron.as_deref(),
            QedProcess::BreitWheeler => self.breit_wheeler.as_deref(),
        }
    }

    pub fn is_enabled(&self, process: QedProcess) -> bool {
        self.sampler(process).is_some()
    }
}

impl fmt::Debug for QedEngines {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QedEngines")
            .field(
                "quantum_synchrotron",
                &self.is_enabled(QedProcess::QuantumSynchrotron),
            )
            .field("breit_wheeler", &self.is_enabled(QedProcess::BreitWheeler))
            .finish()
    }
}
