// ─────────────────────────────────────────────────────────────────────
// SCPN PIC — Smart Copy
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Copy particles between species with different attribute layouts.
//!
//! The destination slot is first initialized by the destination species'
//! initializer; components present in both schemas are then copied by
//! name.

use crate::initializer::{ExternalAttributes, InitContext, RuntimeAttributeInitializer};
use crate::schema::AttributeSchema;
use pic_types::error::{PicError, PicResult};
use pic_types::state::{PIdx, ParticleTile};

/// Column mapping from a source schema to a destination schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmartCopy {
    /// Source column of every destination runtime real column, if any.
    real: Vec<Option<usize>>,
    int: Vec<Option<usize>>,
    src_real: usize,
    src_int: usize,
}

impl SmartCopy {
    pub fn new(src: &AttributeSchema, dst: &AttributeSchema) -> Self {
        Self {
            real: dst
                .real_names()
                .skip(PIdx::COUNT)
                .map(|name| src.real_index(name))
                .collect(),
            int: dst.int_names().map(|name| src.int_index(name)).collect(),
            src_real: src.num_real_comps(),
            src_int: src.num_int_comps(),
        }
    }

    fn check_source(&self, src: &ParticleTile, src_ip: usize) -> PicResult<()> {
        if src.num_real_comps() != self.src_real || src.num_int_comps() != self.src_int {
            return Err(PicError::SchemaMismatch(
                "smart copy used with a source tile of a different layout".to_string(),
            ));
        }
        if src_ip >= src.len() {
            return Err(PicError::RangeOutOfBounds {
                start: src_ip,
                stop: src_ip + 1,
                len: src.len(),
            });
        }
        Ok(())
    }

    fn check_destination(&self, dst: &ParticleTile) -> PicResult<()> {
        if dst.num_real_comps() != PIdx::COUNT + self.real.len()
            || dst.num_int_comps() != self.int.len()
        {
            return Err(PicError::SchemaMismatch(
                "smart copy used with a destination tile of a different layout".to_string(),
            ));
        }
        Ok(())
    }

    fn copy_shared(&self, src: &ParticleTile, src_ip: usize, dst: &mut ParticleTile, dst_ip: usize) {
        for (offset, source) in self.real.iter().enumerate() {
            if let Some(src_comp) = *source {
                dst.real_mut(PIdx::COUNT + offset)[dst_ip] = src.real(src_comp)[src_ip];
            }
        }
        for (comp, source) in self.int.iter().enumerate() {
            if let Some(src_comp) = *source {
                dst.int_mut(comp)[dst_ip] = src.int(src_comp)[src_ip];
            }
        }
    }

    /// Overwrite particle `dst_ip` of `dst` with particle `src_ip` of `src`.
    /// `initializer` must belong to the destination species.
    pub fn copy(
        &self,
        src: &ParticleTile,
        src_ip: usize,
        dst: &mut ParticleTile,
        dst_ip: usize,
        initializer: &RuntimeAttributeInitializer,
        ctx: &InitContext,
    ) -> PicResult<()> {
        self.check_source(src, src_ip)?;
        self.check_destination(dst)?;
        if dst_ip >= dst.len() {
            return Err(PicError::RangeOutOfBounds {
                start: dst_ip,
                stop: dst_ip + 1,
                len: dst.len(),
            });
        }
        let core = src.core(src_ip);
        for (comp, value) in [
            (PIdx::X, core.x),
            (PIdx::Y, core.y),
            (PIdx::Z, core.z),
            (PIdx::W, core.w),
            (PIdx::UX, core.ux),
            (PIdx::UY, core.uy),
            (PIdx::UZ, core.uz),
        ] {
            dst.real_mut(comp)[dst_ip] = value;
        }
        initializer.initialize(dst, ExternalAttributes::core_only(), dst_ip..dst_ip + 1, ctx)?;
        self.copy_shared(src, src_ip, dst, dst_ip);
        Ok(())
    }

    /// Append a copy of particle `src_ip` to `dst`; returns its index.
    /// Nothing is appended on error.
    pub fn append(
        &self,
        src: &ParticleTile,
        src_ip: usize,
        dst: &mut ParticleTile,
        initializer: &RuntimeAttributeInitializer,
        ctx: &InitContext,
    ) -> PicResult<usize> {
        self.check_source(src, src_ip)?;
        self.check_destination(dst)?;
        initializer.schema().check_tile(dst)?;
        dst.push_core(&src.core(src_ip));
        let dst_ip = dst.len() - 1;
        initializer.initialize(dst, ExternalAttributes::core_only(), dst_ip..dst_ip + 1, ctx)?;
        self.copy_shared(src, src_ip, dst, dst_ip);
        Ok(dst_ip)
    }
}
