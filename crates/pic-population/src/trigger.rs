// ─────────────────────────────────────────────────────────────────────
// SCPN PIC — Resampling Trigger
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! When a species should be resampled.

use pic_types::config::ResamplingConfig;
use pic_types::error::{PicError, PicResult};

/// Pure step/count predicate with immutable configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResamplingTrigger {
    interval: u64,
    max_count: Option<u64>,
    target_count: Option<u64>,
}

impl ResamplingTrigger {
    pub fn new(interval: u64, max_count: Option<u64>, target_count: Option<u64>) -> PicResult<Self> {
        if interval == 0 {
            return Err(PicError::ConfigError(
                "resampling_trigger_interval must be >= 1".to_string(),
            ));
        }
        if let (Some(max), Some(target)) = (max_count, target_count) {
            if target > max {
                return Err(PicError::ConfigError(format!(
                    "resampling target count {target} exceeds max count {max}"
                )));
            }
        }
        Ok(Self {
            interval,
            max_count,
            target_count,
        })
    }

    /// Build from species keys. `global_num_cells` resolves
    /// `resampling_trigger_max_avg_ppc` into an absolute count.
    pub fn from_config(config: &ResamplingConfig, global_num_cells: Option<u64>) -> PicResult<Self> {
        let max_count = match (
            config.resampling_trigger_max_count,
            config.resampling_trigger_max_avg_ppc,
        ) {
            (Some(_), Some(_)) => {
                return Err(PicError::ConfigError(
                    "set either resampling_trigger_max_count or resampling_trigger_max_avg_ppc, not both"
                        .to_string(),
                ));
            }
            (Some(max), None) => Some(max),
            (None, Some(ppc)) => {
                if !ppc.is_finite() || ppc <= 0.0 {
                    return Err(PicError::ConfigError(format!(
                        "resampling_trigger_max_avg_ppc must be finite and > 0, got {ppc}"
                    )));
                }
                let cells = global_num_cells.ok_or_else(|| {
                    PicError::ConfigError(
                        "resampling_trigger_max_avg_ppc requires domain_cells".to_string(),
                    )
                })?;
                // count > floor(ppc * cells) iff count > ppc * cells
                Some((ppc * cells as f64).floor() as u64)
            }
            (None, None) => None,
        };
        Self::new(
            config.resampling_trigger_interval,
            max_count,
            config.resampling_trigger_target_count,
        )
    }

    pub fn interval(&self) -> u64 {
        self.interval
    }

    pub fn max_count(&self) -> Option<u64> {
        self.max_count
    }

    pub fn target_count(&self) -> Option<u64> {
        self.target_count
    }

    /// Count above which resampling becomes eligible: the max count when
    /// configured, else the target count.
    pub fn count_threshold(&self) -> Option<u64> {
        self.max_count.or(self.target_count)
    }

    /// True when `(step + 1)` is a multiple of the interval and the global
    /// count exceeds the threshold, if any.
    pub fn triggered(&self, step: u64, global_count: u64) -> bool {
        if step % self.interval != self.interval - 1 {
            return false;
        }
        match self.count_threshold() {
            None => true,
            Some(threshold) => global_count > threshold,
        }
    }
}
