// ─────────────────────────────────────────────────────────────────────
// SCPN PIC — Config
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use crate::state::MemoryResidency;
use serde::{Deserialize, Serialize};

/// Top-level run configuration: run-wide switches plus one entry per species.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub run_name: String,
    /// Base seed of all per-particle random streams.
    #[serde(default)]
    pub seed: u64,
    /// Number of refinement levels holding particle tiles (default: 1)
    #[serde(default = "default_num_levels")]
    pub num_levels: usize,
    /// Refinement ratio between consecutive levels (default: 2)
    #[serde(default = "default_refinement_ratio")]
    pub refinement_ratio: u32,
    /// Global level-0 cell counts, needed by `resampling_trigger_max_avg_ppc`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_cells: Option<[u64; 3]>,
    /// Memory arena newly created tiles are allocated in.
    #[serde(default)]
    pub tile_residency: MemoryResidency,
    #[serde(default)]
    pub qed: QedConfig,
    pub species: Vec<SpeciesConfig>,
}

fn default_num_levels() -> usize {
    1
}
fn default_refinement_ratio() -> u32 {
    2
}

/// Run-level enable flags of the stochastic QED processes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QedConfig {
    #[serde(default)]
    pub quantum_synchrotron: bool,
    #[serde(default)]
    pub breit_wheeler: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeciesConfig {
    pub name: String,
    pub mass: f64,
    pub charge: f64,
    /// Species emits photons through quantum synchrotron radiation.
    #[serde(default)]
    pub do_qed_quantum_sync: bool,
    /// Species decays into pairs through Breit-Wheeler.
    #[serde(default)]
    pub do_qed_breit_wheeler: bool,
    /// Present when the species carries an ionization level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ionization_initial_level: Option<i32>,
    /// User attributes, in column order.
    #[serde(default)]
    pub attributes: Vec<UserAttributeConfig>,
    #[serde(flatten)]
    pub resampling: ResamplingConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeKind {
    #[default]
    Real,
    Int,
}

/// `<name>: <expression>` initializer of a user attribute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAttributeConfig {
    pub name: String,
    #[serde(default)]
    pub kind: AttributeKind,
    pub expression: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Switch {
    On,
    #[default]
    Off,
}

impl Switch {
    pub fn is_on(self) -> bool {
        self == Switch::On
    }
}

/// Per-species resampling keys, flattened into the species object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResamplingConfig {
    #[serde(default)]
    pub resampling: Switch,
    #[serde(default = "default_algorithm")]
    pub resampling_algorithm: String,
    #[serde(default = "default_trigger_interval")]
    pub resampling_trigger_interval: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resampling_trigger_max_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resampling_trigger_target_count: Option<u64>,
    /// Maximum average number of particles per level-0 cell.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resampling_trigger_max_avg_ppc: Option<f64>,
    /// Level-0 merge cell size [m]; required by merging algorithms.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resampling_merge_cell_size: Option<[f64; 3]>,
    /// Momentum bin width [m/s]; required by merging algorithms.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resampling_merge_momentum_bin: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resampling_merge_min_group_size: Option<usize>,
}

fn default_algorithm() -> String {
    "noop".to_string()
}
fn default_trigger_interval() -> u64 {
    1
}

impl Default for ResamplingConfig {
    fn default() -> Self {
        ResamplingConfig {
            resampling: Switch::Off,
            resampling_algorithm: default_algorithm(),
            resampling_trigger_interval: default_trigger_interval(),
            resampling_trigger_max_count: None,
            resampling_trigger_target_count: None,
            resampling_trigger_max_avg_ppc: None,
            resampling_merge_cell_size: None,
            resampling_merge_momentum_bin: None,
            resampling_merge_min_group_size: None,
        }
    }
}

impl SimulationConfig {
    /// Load from a JSON file.
    pub fn from_file(path: &str) -> crate::error::PicResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// Total number of level-0 cells, if the domain is known.
    pub fn global_num_cells(&self) -> crate::error::PicResult<Option<u64>> {
        let Some([nx, ny, nz]) = self.domain_cells else {
            return Ok(None);
        };
        nx.checked_mul(ny)
            .and_then(|n| n.checked_mul(nz))
            .map(Some)
            .ok_or_else(|| {
                crate::error::PicError::ConfigError(format!(
                    "domain_cells {nx}x{ny}x{nz} overflows the global cell count"
                ))
            })
    }
}
