//! Dynamic particle population control for the PIC engine.
//!
//! Runtime attribute initialization of newly created particles, and
//! resampling (trigger plus merge algorithm) of over-populated species.

pub mod algorithm;
pub mod cell_merge;
pub mod coincidence_merge;
pub mod expression;
pub mod initializer;
pub mod merge;
pub mod particles;
pub mod policy;
pub mod qed;
pub mod random;
pub mod resampling;
pub mod schema;
pub mod smart_copy;
pub mod species;
pub mod trigger;
