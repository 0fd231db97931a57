//! Symbolic variable registry.
//!
//! Every variable a method description mentions is declared here exactly
//! once, before any phase refers to it. The registry owns the temporary
//! name counter, so compiling the same description twice yields the same
//! generated names.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use cadence_foundation::VarId;

use crate::error::{CompileError, Result};

/// How a variable persists across phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VarRole {
    /// Persistent solver state, carried across steps.
    State,
    /// Phase-local scratch value. Reading one before an in-phase write is
    /// an error.
    Temporary,
    /// A lagged snapshot of another variable, addressed as `name@-k`.
    History,
}

/// Declaration record for a single variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarInfo {
    /// Persistence role.
    pub role: VarRole,
    /// How many past values are retained. Zero for everything but
    /// multistep state.
    pub history_depth: u32,
}

/// Registry of every symbolic variable in one compilation unit.
///
/// Declaring a variable with history depth `k` also registers the slots
/// `name@-1` through `name@-k` as [`VarRole::History`] variables, so later
/// lookups and graph building treat lagged reads like any other variable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VariableRegistry {
    entries: IndexMap<VarId, VarInfo>,
    temp_counter: u64,
}

impl VariableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a variable, failing if the name (or any history slot name
    /// it implies) is already taken.
    ///
    /// On failure nothing is registered, not even slots whose names were
    /// still free.
    pub fn declare(
        &mut self,
        name: impl Into<VarId>,
        role: VarRole,
        history_depth: u32,
    ) -> Result<VarId> {
        let name = name.into();
        let slots: Vec<VarId> = (1..=history_depth)
            .map(|offset| VarId::new(format!("{name}@-{offset}")))
            .collect();

        if self.entries.contains_key(&name) {
            return Err(CompileError::DuplicateName { name });
        }
        for slot in &slots {
            if self.entries.contains_key(slot) {
                return Err(CompileError::DuplicateName { name: slot.clone() });
            }
        }

        self.entries.insert(name.clone(), VarInfo { role, history_depth });
        for slot in slots {
            self.entries.insert(
                slot,
                VarInfo {
                    role: VarRole::History,
                    history_depth: 0,
                },
            );
        }
        Ok(name)
    }

    /// Look up a declared variable by name.
    pub fn resolve(&self, name: &str) -> Result<VarId> {
        let name = VarId::from(name);
        if self.entries.contains_key(&name) {
            Ok(name)
        } else {
            Err(CompileError::UnknownVariable { name, phase: None })
        }
    }

    /// Resolve the history slot of `name` at `offset` steps back.
    ///
    /// Offset zero is the variable itself. Offsets beyond the declared
    /// depth fail statically, regardless of how many steps a runtime
    /// would have taken by the time the read executes.
    pub fn history(&self, name: &str, offset: u32) -> Result<VarId> {
        let base = self.resolve(name)?;
        if offset == 0 {
            return Ok(base);
        }
        let depth = self.entries[&base].history_depth;
        if offset > depth {
            return Err(CompileError::HistoryOutOfRange {
                name: base,
                offset,
                depth,
            });
        }
        Ok(VarId::new(format!("{base}@-{offset}")))
    }

    /// Mint a fresh temporary with a unique `prefix_N` name.
    ///
    /// The counter lives in the registry, so a rebuilt description
    /// generates the same sequence of names. Names already declared by
    /// hand are skipped rather than collided with.
    pub fn fresh_temp(&mut self, prefix: &str) -> VarId {
        loop {
            let candidate = VarId::new(format!("{prefix}_{}", self.temp_counter));
            self.temp_counter += 1;
            if !self.entries.contains_key(&candidate) {
                self.entries.insert(
                    candidate.clone(),
                    VarInfo {
                        role: VarRole::Temporary,
                        history_depth: 0,
                    },
                );
                return candidate;
            }
        }
    }

    /// Declaration record for a variable, if it exists.
    pub fn info(&self, name: &VarId) -> Option<&VarInfo> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &VarId) -> bool {
        self.entries.contains_key(name)
    }

    /// Iterate declarations in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&VarId, &VarInfo)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
