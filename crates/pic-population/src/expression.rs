// ─────────────────────────────────────────────────────────────────────
// SCPN PIC — Attribute Expressions
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Compiled user expressions `f(x, y, z, ux, uy, uz, t)`.
//!
//! The expression grammar lives outside this crate: an [`ExpressionCompiler`]
//! turns source text into a pure callable once, at species setup.

use pic_types::error::{PicError, PicResult};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Inputs of a user attribute expression.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PhaseSpacePoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub ux: f64,
    pub uy: f64,
    pub uz: f64,
    pub t: f64,
}

/// Pure per-particle evaluator.
pub trait AttributeExpression: Send + Sync {
    fn eval(&self, point: &PhaseSpacePoint) -> f64;
}

impl<F> AttributeExpression for F
where
    F: Fn(&PhaseSpacePoint) -> f64 + Send + Sync,
{
    fn eval(&self, point: &PhaseSpacePoint) -> f64 {
        self(point)
    }
}

pub type SharedExpression = Arc<dyn AttributeExpression>;

/// Setup-time compilation of expression source text.
pub trait ExpressionCompiler {
    /// Compile `source` for `attribute`; malformed input is a `ConfigError`.
    fn compile(&self, attribute: &str, source: &str) -> PicResult<SharedExpression>;
}

/// Compiler backed by a fixed table of pre-built evaluators.
#[derive(Clone, Default)]
pub struct ExpressionRegistry {
    entries: HashMap<String, SharedExpression>,
}

impl ExpressionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, source: &str, f: F)
    where
        F: Fn(&PhaseSpacePoint) -> f64 + Send + Sync + 'static,
    {
        self.entries.insert(source.trim().to_string(), Arc::new(f));
    }

    pub fn with<F>(mut self, source: &str, f: F) -> Self
    where
        F: Fn(&PhaseSpacePoint) -> f64 + Send + Sync + 'static,
    {
        self.register(source, f);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for ExpressionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sources: Vec<&String> = self.entries.keys().collect();
        sources.sort();
        f.debug_struct("ExpressionRegistry")
            .field("sources", &sources)
            .finish()
    }
}

impl ExpressionCompiler for ExpressionRegistry {
    fn compile(&self, attribute: &str, source: &str) -> PicResult<SharedExpression> {
        self.entries
            .get(source.trim())
            .cloned()
            .ok_or_else(|| {
                PicError::ConfigError(format!(
                    "attribute '{attribute}': cannot compile expression '{source}'"
                ))
            })
    }
}
