//! Deterministic instruction scheduling.
//!
//! Kahn's algorithm over the dependency edges, with one refinement: the
//! ready set is a min-heap keyed on instruction id, so among instructions
//! whose dependencies are all satisfied, the earliest-declared one runs
//! first. Equally valid schedules therefore never vary between runs or
//! hosts, which keeps compiled output diffable.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use indexmap::IndexMap;

use cadence_foundation::PhaseId;

use crate::build::Phase;
use crate::error::{CompileError, Result};
use crate::instruction::{Instruction, InstructionId, InstructionKind};

/// Compute the execution order of a phase's top-level instructions
/// without consuming the phase.
pub fn schedule(phase: &Phase) -> Result<Vec<InstructionId>> {
    kahn(&phase.id, &phase.instructions)
}

/// Reorder a sequence into execution order, recursing into branch arms.
///
/// Arms are ordered independently: their instructions depend only on each
/// other, with outside needs already lifted onto the branch record.
pub(crate) fn order_sequence(
    phase: &PhaseId,
    instructions: Vec<Instruction>,
) -> Result<Vec<Instruction>> {
    let order = kahn(phase, &instructions)?;
    let mut by_id: IndexMap<InstructionId, Instruction> =
        instructions.into_iter().map(|insn| (insn.id, insn)).collect();

    let mut ordered = Vec::with_capacity(order.len());
    for id in order {
        let mut insn = by_id.shift_remove(&id).unwrap();
        if let InstructionKind::Branch {
            then_body,
            else_body,
            ..
        } = &mut insn.kind
        {
            *then_body = order_sequence(phase, std::mem::take(then_body))?;
            *else_body = order_sequence(phase, std::mem::take(else_body))?;
        }
        ordered.push(insn);
    }
    Ok(ordered)
}

fn kahn(phase: &PhaseId, instructions: &[Instruction]) -> Result<Vec<InstructionId>> {
    if instructions.is_empty() {
        return Ok(Vec::new());
    }

    let mut in_degree: IndexMap<InstructionId, usize> = IndexMap::new();
    let mut dependents: IndexMap<InstructionId, Vec<InstructionId>> = IndexMap::new();
    for insn in instructions {
        in_degree.insert(insn.id, 0);
        dependents.insert(insn.id, Vec::new());
    }

    for insn in instructions {
        for dep in &insn.depends_on {
            if in_degree.contains_key(dep) {
                *in_degree.get_mut(&insn.id).unwrap() += 1;
                dependents.get_mut(dep).unwrap().push(insn.id);
            }
        }
    }

    let mut ready: BinaryHeap<Reverse<InstructionId>> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(id, _)| Reverse(*id))
        .collect();

    let mut order = Vec::with_capacity(instructions.len());
    while let Some(Reverse(id)) = ready.pop() {
        order.push(id);
        for dependent in &dependents[&id] {
            let degree = in_degree.get_mut(dependent).unwrap();
            *degree -= 1;
            if *degree == 0 {
                ready.push(Reverse(*dependent));
            }
        }
    }

    if order.len() != instructions.len() {
        let stuck: Vec<InstructionId> = in_degree
            .iter()
            .filter(|(_, degree)| **degree > 0)
            .map(|(id, _)| *id)
            .collect();
        return Err(CompileError::DependencyCycle {
            phase: phase.clone(),
            instructions: stuck,
        });
    }
    Ok(order)
}
