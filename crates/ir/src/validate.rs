//! Post-compile validation.
//!
//! Non-fatal checks that run over a finalized method. Findings come back
//! as structured warnings and are also logged, but they never fail the
//! compile: everything here describes a method that will run, just
//! probably not the one its author meant to write.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use tracing::warn;

use cadence_foundation::VarId;

use crate::graph::CompiledMethod;
use crate::instruction::{self, InstructionKind};
use crate::registry::VarRole;

/// Machine-readable warning category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningCode {
    /// A declared variable is never read or written by any instruction.
    UnusedVariable,
    /// A state variable is assigned within phases but never committed
    /// with a state update, so it never actually advances.
    StateNeverUpdated,
    /// A phase contains no instructions at all.
    EmptyPhase,
}

/// One validation finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompileWarning {
    pub code: WarningCode,
    pub message: String,
    /// The variable or phase the finding is about.
    pub entity: String,
}

/// Run all validation checks over a compiled method.
pub fn validate(method: &CompiledMethod) -> Vec<CompileWarning> {
    let mut warnings = Vec::new();
    check_unused_variables(method, &mut warnings);
    check_state_updates(method, &mut warnings);
    check_empty_phases(method, &mut warnings);

    for warning in &warnings {
        warn!(
            code = ?warning.code,
            entity = %warning.entity,
            "{}",
            warning.message
        );
    }
    warnings
}

/// Every variable an instruction mentions, in any role.
fn referenced_variables(method: &CompiledMethod) -> IndexSet<VarId> {
    let mut seen = IndexSet::new();
    for phase in method.phases.values() {
        instruction::walk(&phase.instructions, &mut |insn| {
            seen.extend(insn.read_variables());
            match &insn.kind {
                InstructionKind::Assign { target, .. }
                | InstructionKind::EvalRhs { target, .. } => {
                    seen.insert(target.clone());
                }
                InstructionKind::StateUpdate { state, value } => {
                    seen.insert(state.clone());
                    seen.insert(value.clone());
                }
                _ => {}
            }
        });
    }
    seen
}

fn check_unused_variables(method: &CompiledMethod, warnings: &mut Vec<CompileWarning>) {
    let referenced = referenced_variables(method);
    for (var, _) in method.variables.iter() {
        if !referenced.contains(var) {
            warnings.push(CompileWarning {
                code: WarningCode::UnusedVariable,
                message: format!("variable '{var}' is declared but never referenced"),
                entity: var.to_string(),
            });
        }
    }
}

fn check_state_updates(method: &CompiledMethod, warnings: &mut Vec<CompileWarning>) {
    let mut assigned: IndexSet<VarId> = IndexSet::new();
    let mut updated: IndexSet<VarId> = IndexSet::new();
    for phase in method.phases.values() {
        instruction::walk(&phase.instructions, &mut |insn| match &insn.kind {
            InstructionKind::Assign { target, .. }
            | InstructionKind::EvalRhs { target, .. } => {
                assigned.insert(target.clone());
            }
            InstructionKind::StateUpdate { state, .. } => {
                updated.insert(state.clone());
            }
            _ => {}
        });
    }

    for var in &assigned {
        let is_state = method
            .variables
            .info(var)
            .is_some_and(|info| info.role == VarRole::State);
        if is_state && !updated.contains(var) {
            warnings.push(CompileWarning {
                code: WarningCode::StateNeverUpdated,
                message: format!(
                    "state variable '{var}' is assigned but never committed with a state update"
                ),
                entity: var.to_string(),
            });
        }
    }
}

fn check_empty_phases(method: &CompiledMethod, warnings: &mut Vec<CompileWarning>) {
    for (id, phase) in &method.phases {
        if phase.instructions.is_empty() {
            warnings.push(CompileWarning {
                code: WarningCode::EmptyPhase,
                message: format!("phase '{id}' contains no instructions"),
                entity: id.to_string(),
            });
        }
    }
}
