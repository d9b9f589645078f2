// ─────────────────────────────────────────────────────────────────────
// SCPN PIC — Constants
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
/// Speed of light in vacuum (m/s)
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Elementary charge (C)
pub const Q_ELECTRON: f64 = 1.602176634e-19;

/// Electron mass (kg)
pub const M_ELECTRON: f64 = 9.1093837015e-31;

/// Proton mass (kg)
pub const M_PROTON: f64 = 1.67262192369e-27;

/// Optical depth of the quantum synchrotron photon emission process.
pub const OPTICAL_DEPTH_QSR: &str = "opticalDepthQSR";

/// Optical depth of the Breit-Wheeler pair production process.
pub const OPTICAL_DEPTH_BW: &str = "opticalDepthBW";

/// Integer ionization state of ion species with field ionization.
pub const IONIZATION_LEVEL: &str = "ionizationLevel";
