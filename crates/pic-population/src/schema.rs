// ─────────────────────────────────────────────────────────────────────
// SCPN PIC — Attribute Schema
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Per-species attribute layout.
//!
//! The schema maps every component name to a column and resolves, once,
//! which rule fills that column when particles are created:
//! optical depth > ionization level > user expression > default policy.

use crate::expression::{ExpressionCompiler, SharedExpression};
use crate::policy::InitializationPolicy;
use crate::qed::QedProcess;
use pic_types::config::{AttributeKind, SpeciesConfig};
use pic_types::constants::{IONIZATION_LEVEL, OPTICAL_DEPTH_BW, OPTICAL_DEPTH_QSR};
use pic_types::error::{PicError, PicResult};
use pic_types::state::{MemoryResidency, PIdx, ParticleTile};
use std::collections::HashMap;
use std::fmt;

/// Fill rule of a real column.
#[derive(Clone)]
pub enum RealRule {
    /// Position, momentum or weight; always set by the creator.
    Core,
    OpticalDepth(QedProcess),
    Expression(SharedExpression),
    Policy(InitializationPolicy),
}

/// Fill rule of an integer column.
#[derive(Clone)]
pub enum IntRule {
    IonizationLevel,
    Expression(SharedExpression),
    Constant(i32),
}

impl fmt::Debug for RealRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RealRule::Core => write!(f, "Core"),
            RealRule::OpticalDepth(process) => write!(f, "OpticalDepth({process:?})"),
            RealRule::Expression(_) => write!(f, "Expression"),
            RealRule::Policy(policy) => write!(f, "Policy({policy:?})"),
        }
    }
}

impl fmt::Debug for IntRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntRule::IonizationLevel => write!(f, "IonizationLevel"),
            IntRule::Expression(_) => write!(f, "Expression"),
            IntRule::Constant(value) => write!(f, "Constant({value})"),
        }
    }
}

fn resolve_real(name: &str, expression: Option<SharedExpression>) -> RealRule {
    if let Some(process) = QedProcess::from_attribute(name) {
        return RealRule::OpticalDepth(process);
    }
    if let Some(expr) = expression {
        return RealRule::Expression(expr);
    }
    RealRule::Policy(InitializationPolicy::default_for(name).unwrap_or(InitializationPolicy::Zero))
}

fn resolve_int(
    name: &str,
    expression: Option<SharedExpression>,
    policy: InitializationPolicy,
) -> PicResult<IntRule> {
    if name == IONIZATION_LEVEL {
        return Ok(IntRule::IonizationLevel);
    }
    if let Some(expr) = expression {
        return Ok(IntRule::Expression(expr));
    }
    let value = policy.int_value().map_err(|err| match err {
        PicError::ConfigError(msg) => PicError::ConfigError(format!("attribute '{name}': {msg}")),
        other => other,
    })?;
    Ok(IntRule::Constant(value))
}

#[derive(Debug, Clone)]
struct Column<R> {
    name: String,
    rule: R,
}

/// Immutable name → column map of one species.
#[derive(Debug, Clone)]
pub struct AttributeSchema {
    real: Vec<Column<RealRule>>,
    int: Vec<Column<IntRule>>,
    real_index: HashMap<String, usize>,
    int_index: HashMap<String, usize>,
}

impl AttributeSchema {
    /// Builder pre-populated with the core components.
    pub fn builder() -> AttributeSchemaBuilder {
        let mut schema = AttributeSchema {
            real: Vec::new(),
            int: Vec::new(),
            real_index: HashMap::new(),
            int_index: HashMap::new(),
        };
        for name in PIdx::NAMES {
            schema.real_index.insert(name.to_string(), schema.real.len());
            schema.real.push(Column {
                name: name.to_string(),
                rule: RealRule::Core,
            });
        }
        AttributeSchemaBuilder { schema }
    }

    /// Schema of a configured species. Runtime real columns are laid out as
    /// QED optical depths then user attributes; integer columns as the
    /// ionization level then user attributes.
    pub fn from_species_config(
        config: &SpeciesConfig,
        compiler: &dyn ExpressionCompiler,
    ) -> PicResult<Self> {
        let mut builder = Self::builder();
        if config.do_qed_quantum_sync {
            builder = builder.real_attribute(OPTICAL_DEPTH_QSR)?;
        }
        if config.do_qed_breit_wheeler {
            builder = builder.real_attribute(OPTICAL_DEPTH_BW)?;
        }
        if config.ionization_initial_level.is_some() {
            builder = builder.int_attribute(IONIZATION_LEVEL)?;
        }
        for attribute in &config.attributes {
            let expr = compiler.compile(&attribute.name, &attribute.expression)?;
            builder = match attribute.kind {
                AttributeKind::Real => builder.real_expression(&attribute.name, expr)?,
                AttributeKind::Int => builder.int_expression(&attribute.name, expr)?,
            };
        }
        Ok(builder.build())
    }

    pub fn num_real_comps(&self) -> usize {
        self.real.len()
    }

    pub fn num_int_comps(&self) -> usize {
        self.int.len()
    }

    pub fn real_index(&self, name: &str) -> Option<usize> {
        self.real_index.get(name).copied()
    }

    pub fn int_index(&self, name: &str) -> Option<usize> {
        self.int_index.get(name).copied()
    }

    pub fn real_name(&self, comp: usize) -> &str {
        &self.real[comp].name
    }

    pub fn int_name(&self, comp: usize) -> &str {
        &self.int[comp].name
    }

    pub fn real_rule(&self, comp: usize) -> &RealRule {
        &self.real[comp].rule
    }

    pub fn int_rule(&self, comp: usize) -> &IntRule {
        &self.int[comp].rule
    }

    pub fn real_names(&self) -> impl Iterator<Item = &str> {
        self.real.iter().map(|c| c.name.as_str())
    }

    pub fn int_names(&self) -> impl Iterator<Item = &str> {
        self.int.iter().map(|c| c.name.as_str())
    }

    /// Empty tile with one column per schema entry.
    pub fn new_tile(&self, residency: MemoryResidency) -> PicResult<ParticleTile> {
        ParticleTile::new(self.num_real_comps(), self.num_int_comps(), residency)
    }

    pub fn check_tile(&self, tile: &ParticleTile) -> PicResult<()> {
        if tile.num_real_comps() != self.num_real_comps()
            || tile.num_int_comps() != self.num_int_comps()
        {
            return Err(PicError::SchemaMismatch(format!(
                "tile has {} real / {} int components, schema expects {} / {}",
                tile.num_real_comps(),
                tile.num_int_comps(),
                self.num_real_comps(),
                self.num_int_comps()
            )));
        }
        Ok(())
    }
}

pub struct AttributeSchemaBuilder {
    schema: AttributeSchema,
}

impl AttributeSchemaBuilder {
    fn check_unique(&self, name: &str) -> PicResult<()> {
        if name.trim().is_empty() {
            return Err(PicError::ConfigError(
                "attribute name must be non-empty".to_string(),
            ));
        }
        if self.schema.real_index.contains_key(name) || self.schema.int_index.contains_key(name) {
            return Err(PicError::ConfigError(format!(
                "attribute '{name}' is declared more than once"
            )));
        }
        Ok(())
    }

    fn push_real(mut self, name: &str, rule: RealRule) -> PicResult<Self> {
        self.check_unique(name)?;
        let s = &mut self.schema;
        s.real_index.insert(name.to_string(), s.real.len());
        s.real.push(Column {
            name: name.to_string(),
            rule,
        });
        Ok(self)
    }

    fn push_int(mut self, name: &str, rule: IntRule) -> PicResult<Self> {
        self.check_unique(name)?;
        let s = &mut self.schema;
        s.int_index.insert(name.to_string(), s.int.len());
        s.int.push(Column {
            name: name.to_string(),
            rule,
        });
        Ok(self)
    }

    /// Real attribute filled by its default rule.
    pub fn real_attribute(self, name: &str) -> PicResult<Self> {
        let rule = resolve_real(name, None);
        self.push_real(name, rule)
    }

    /// Real attribute with an explicit fallback policy.
    pub fn real_policy(self, name: &str, policy: InitializationPolicy) -> PicResult<Self> {
        let rule = match resolve_real(name, None) {
            RealRule::OpticalDepth(process) => RealRule::OpticalDepth(process),
            _ => RealRule::Policy(policy),
        };
        self.push_real(name, rule)
    }

    pub fn real_expression(self, name: &str, expr: SharedExpression) -> PicResult<Self> {
        let rule = resolve_real(name, Some(expr));
        self.push_real(name, rule)
    }

    pub fn int_attribute(self, name: &str) -> PicResult<Self> {
        let policy = InitializationPolicy::default_for(name).unwrap_or(InitializationPolicy::Zero);
        let rule = resolve_int(name, None, policy)?;
        self.push_int(name, rule)
    }

    pub fn int_policy(self, name: &str, policy: InitializationPolicy) -> PicResult<Self> {
        let rule = resolve_int(name, None, policy)?;
        self.push_int(name, rule)
    }

    pub fn int_expression(self, name: &str, expr: SharedExpression) -> PicResult<Self> {
        let rule = resolve_int(name, Some(expr), InitializationPolicy::Zero)?;
        self.push_int(name, rule)
    }

    pub fn build(self) -> AttributeSchema {
        self.schema
    }
}
