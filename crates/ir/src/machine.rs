//! Phase state machine.
//!
//! Collects built phases, wires each to its successor, and finalizes the
//! whole method in one shot. A phase's next target resolves with this
//! precedence:
//!
//! 1. an explicit [`StepMachine::set_transition`] override,
//! 2. the transition statement inside the phase itself,
//! 3. the [`StepMachine::set_default_next`] fallback.
//!
//! A phase none of the three applies to is terminal. Finalization
//! validates every target, rejects phases unreachable from the entry, and
//! schedules every phase body. It either succeeds completely or returns
//! the first error; a half-wired machine never escapes.

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, info};

use cadence_foundation::PhaseId;

use crate::build::Phase;
use crate::error::{CompileError, Result};
use crate::graph::{CompiledMethod, CompiledPhase};
use crate::registry::VariableRegistry;
use crate::schedule::order_sequence;

/// Mutable collection of phases being wired into a method.
#[derive(Debug)]
pub struct StepMachine {
    entry: PhaseId,
    phases: IndexMap<PhaseId, Phase>,
    overrides: IndexMap<PhaseId, PhaseId>,
    defaults: IndexMap<PhaseId, PhaseId>,
}

impl StepMachine {
    pub fn new(entry: impl Into<PhaseId>) -> Self {
        Self {
            entry: entry.into(),
            phases: IndexMap::new(),
            overrides: IndexMap::new(),
            defaults: IndexMap::new(),
        }
    }

    /// Add a built phase under its own name.
    pub fn add_phase(&mut self, phase: Phase) -> Result<()> {
        if self.phases.contains_key(&phase.id) {
            return Err(CompileError::DuplicatePhase { phase: phase.id });
        }
        self.phases.insert(phase.id.clone(), phase);
        Ok(())
    }

    /// Force `phase` to transition to `next`, overriding any transition
    /// statement the phase body declares.
    pub fn set_transition(
        &mut self,
        phase: impl Into<PhaseId>,
        next: impl Into<PhaseId>,
    ) -> Result<()> {
        let phase = self.known(phase.into())?;
        self.overrides.insert(phase, next.into());
        Ok(())
    }

    /// Give `phase` a fallback successor, used only when neither an
    /// override nor an in-phase transition names one.
    pub fn set_default_next(
        &mut self,
        phase: impl Into<PhaseId>,
        next: impl Into<PhaseId>,
    ) -> Result<()> {
        let phase = self.known(phase.into())?;
        self.defaults.insert(phase, next.into());
        Ok(())
    }

    /// The phase being configured must already exist; transition targets
    /// are allowed to dangle until [`StepMachine::finalize`].
    fn known(&self, phase: PhaseId) -> Result<PhaseId> {
        if self.phases.contains_key(&phase) {
            Ok(phase)
        } else {
            Err(CompileError::UnknownPhase {
                target: phase,
                referenced_from: None,
            })
        }
    }

    /// Validate the wiring, schedule every phase, and produce the
    /// finalized method.
    pub fn finalize(self, variables: VariableRegistry) -> Result<CompiledMethod> {
        if !self.phases.contains_key(&self.entry) {
            return Err(CompileError::UnknownPhase {
                target: self.entry,
                referenced_from: None,
            });
        }

        let mut resolved: IndexMap<PhaseId, Option<PhaseId>> = IndexMap::new();
        for (id, phase) in &self.phases {
            let next = self
                .overrides
                .get(id)
                .or(phase.declared_next.as_ref())
                .or(self.defaults.get(id))
                .cloned();
            if let Some(target) = &next {
                if !self.phases.contains_key(target) {
                    return Err(CompileError::UnknownPhase {
                        target: target.clone(),
                        referenced_from: Some(id.clone()),
                    });
                }
            }
            resolved.insert(id.clone(), next);
        }

        // Each phase has at most one successor, so reachability is a walk
        // along the transition chain until it terminates or closes a loop.
        let mut visited: IndexSet<PhaseId> = IndexSet::new();
        let mut cursor = Some(self.entry.clone());
        while let Some(id) = cursor {
            if !visited.insert(id.clone()) {
                break;
            }
            cursor = resolved[&id].clone();
        }

        let unreachable: Vec<PhaseId> = self
            .phases
            .keys()
            .filter(|id| !visited.contains(*id))
            .cloned()
            .collect();
        if !unreachable.is_empty() {
            return Err(CompileError::UnreachablePhase {
                phases: unreachable,
                entry: self.entry,
            });
        }

        let mut phases = IndexMap::new();
        for (id, phase) in self.phases {
            let next = resolved.shift_remove(&id).unwrap();
            let instructions = order_sequence(&id, phase.instructions)?;
            debug!(
                phase = %id,
                instructions = instructions.len(),
                next = next.as_ref().map(|n| n.as_str()).unwrap_or("(terminal)"),
                "scheduled phase"
            );
            phases.insert(id.clone(), CompiledPhase { id, instructions, next });
        }

        let method = CompiledMethod {
            entry: self.entry,
            phases,
            variables,
        };
        info!(
            entry = %method.entry,
            phases = method.phases.len(),
            instructions = method.instruction_count(),
            "finalized step machine"
        );
        Ok(method)
    }
}
