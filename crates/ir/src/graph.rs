//! Finalized method graph.
//!
//! These types are the compiler's output: phases already scheduled into
//! execution order, transitions resolved to concrete targets, and the
//! registry that gives every mentioned variable its meaning. Everything
//! here is plain data with read-only accessors, ready to hand to a
//! runtime or serialize for inspection.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use cadence_foundation::PhaseId;

use crate::instruction::{self, Instruction, InstructionId};
use crate::registry::VariableRegistry;

/// A fully compiled time-stepping method.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompiledMethod {
    /// Phase execution starts in.
    pub entry: PhaseId,
    /// Phases in declaration order, each scheduled and wired to its
    /// successor.
    pub phases: IndexMap<PhaseId, CompiledPhase>,
    /// Declarations for every variable the instructions mention.
    pub variables: VariableRegistry,
}

impl CompiledMethod {
    /// Look up a phase by name.
    pub fn phase(&self, id: &str) -> Option<&CompiledPhase> {
        self.phases.get(&PhaseId::from(id))
    }

    /// Total instruction count across all phases, including instructions
    /// nested in branch arms.
    pub fn instruction_count(&self) -> usize {
        let mut count = 0;
        for phase in self.phases.values() {
            instruction::walk(&phase.instructions, &mut |_| count += 1);
        }
        count
    }
}

/// One phase of a compiled method, in execution order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompiledPhase {
    pub id: PhaseId,
    /// Top-level instructions in the order they should run. Branch arms
    /// are ordered the same way inside their own bodies.
    pub instructions: Vec<Instruction>,
    /// Phase that runs after this one. `None` marks a terminal phase:
    /// reaching its end halts the method.
    pub next: Option<PhaseId>,
}

impl CompiledPhase {
    pub fn is_terminal(&self) -> bool {
        self.next.is_none()
    }

    /// Ids of the top-level instructions in execution order.
    pub fn instruction_ids(&self) -> Vec<InstructionId> {
        self.instructions.iter().map(|insn| insn.id).collect()
    }
}
