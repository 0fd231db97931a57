//! Phase graph builder.
//!
//! Turns one phase's statement list into an instruction graph whose edges
//! are read-after-write dependencies. The builder keeps a write-tracking
//! table per statement sequence: resolving a read means looking up the
//! most recent writer of that variable and adding an edge to it.
//!
//! Two rules shape the graph:
//!
//! - **No program-order edges.** Statements that share no data are not
//!   ordered relative to each other, no matter how they were written down.
//!   Authors who need extra ordering say so with labels and `after`
//!   annotations.
//! - **Branch arms are separate sequences.** Each arm starts from a
//!   snapshot of the write table at the branch point and resolves its own
//!   reads. Whatever an arm needs from outside itself becomes a dependency
//!   of the branch instruction, so the branch schedules as one unit.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use tracing::debug;

use cadence_foundation::{PhaseId, VarId};

use crate::error::{CompileError, Result};
use crate::instruction::{Instruction, InstructionId, InstructionKind};
use crate::language::{Stmt, StmtOp};
use crate::registry::{VarRole, VariableRegistry};

/// Finished graph of one phase.
///
/// Fields are crate-private: once built, instruction operands and edges
/// never change. The scheduler reorders whole records and the machine
/// wires up transitions, and neither goes through public mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Phase {
    pub id: PhaseId,
    pub(crate) instructions: Vec<Instruction>,
    pub(crate) declared_next: Option<PhaseId>,
}

impl Phase {
    /// Instructions in declaration order, before scheduling.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Transition target named by this phase's own statements, if any.
    pub fn declared_next(&self) -> Option<&PhaseId> {
        self.declared_next.as_ref()
    }
}

/// Result of building one statement sequence (a phase body or one branch
/// arm).
struct SequenceBuild {
    instructions: Vec<Instruction>,
    /// Last in-sequence writer of each variable.
    writes: IndexMap<VarId, InstructionId>,
    /// Writers outside this sequence that reads resolved to. For a branch
    /// arm these are lifted onto the branch instruction.
    external: IndexSet<InstructionId>,
    transition: Option<PhaseId>,
}

/// Builds the instruction graph for a single phase.
pub struct PhaseBuilder<'a> {
    registry: &'a VariableRegistry,
    phase: PhaseId,
}

impl<'a> PhaseBuilder<'a> {
    pub fn new(phase: impl Into<PhaseId>, registry: &'a VariableRegistry) -> Self {
        Self {
            registry,
            phase: phase.into(),
        }
    }

    /// Build the phase graph, consuming the builder.
    ///
    /// Fails without partial output: callers get the whole graph or an
    /// error naming the phase and the offending identifiers.
    pub fn build(self, statements: &[Stmt]) -> Result<Phase> {
        debug!(
            phase = %self.phase,
            statements = statements.len(),
            "building phase graph"
        );
        let mut next_id = 0;
        let body = self.build_sequence(statements, &mut next_id, &IndexMap::new(), true)?;
        debug!(
            phase = %self.phase,
            instructions = body.instructions.len(),
            "phase graph complete"
        );
        Ok(Phase {
            id: self.phase,
            instructions: body.instructions,
            declared_next: body.transition,
        })
    }

    fn build_sequence(
        &self,
        statements: &[Stmt],
        next_id: &mut u32,
        inherited: &IndexMap<VarId, InstructionId>,
        top_level: bool,
    ) -> Result<SequenceBuild> {
        // First pass: allocate ids in statement order and collect labels,
        // so `after` annotations can point forward as well as backward.
        let mut ids = Vec::with_capacity(statements.len());
        let mut labels: IndexMap<&str, InstructionId> = IndexMap::new();
        for stmt in statements {
            let id = InstructionId(*next_id);
            *next_id += 1;
            if let Some(label) = &stmt.label {
                if labels.insert(label.as_str(), id).is_some() {
                    return Err(CompileError::DuplicateLabel {
                        phase: self.phase.clone(),
                        label: label.clone(),
                    });
                }
            }
            ids.push(id);
        }

        let mut seq = SequenceBuild {
            instructions: Vec::with_capacity(statements.len()),
            writes: IndexMap::new(),
            external: IndexSet::new(),
            transition: None,
        };

        // Second pass: construct instructions and resolve dependencies.
        for (stmt, &id) in statements.iter().zip(&ids) {
            let kind = match &stmt.op {
                StmtOp::Assign { target, value } => {
                    self.check_declared(target)?;
                    InstructionKind::Assign {
                        target: target.clone(),
                        value: value.clone(),
                    }
                }
                StmtOp::EvalRhs { target, rhs, args } => {
                    self.check_declared(target)?;
                    InstructionKind::EvalRhs {
                        target: target.clone(),
                        rhs: rhs.clone(),
                        args: args.clone(),
                    }
                }
                StmtOp::StateUpdate { state, value } => {
                    self.check_declared(state)?;
                    InstructionKind::StateUpdate {
                        state: state.clone(),
                        value: value.clone(),
                    }
                }
                StmtOp::Transition { target } => {
                    if !top_level {
                        return Err(CompileError::MisplacedTransition {
                            phase: self.phase.clone(),
                            target: target.clone(),
                        });
                    }
                    if let Some(first) = &seq.transition {
                        return Err(CompileError::ConflictingTransition {
                            phase: self.phase.clone(),
                            first: first.clone(),
                            second: target.clone(),
                        });
                    }
                    seq.transition = Some(target.clone());
                    InstructionKind::Transition {
                        target: target.clone(),
                    }
                }
                StmtOp::Nop => InstructionKind::Nop,
                StmtOp::If {
                    condition,
                    then_body,
                    else_body,
                } => {
                    // Arms inherit the write table as it stands at the
                    // branch point. Neither arm sees the other's writes.
                    let mut snapshot = inherited.clone();
                    snapshot.extend(
                        seq.writes.iter().map(|(v, w)| (v.clone(), *w)),
                    );
                    let then_build =
                        self.build_sequence(then_body, next_id, &snapshot, false)?;
                    let else_build =
                        self.build_sequence(else_body, next_id, &snapshot, false)?;

                    let then_writes: IndexSet<VarId> =
                        then_build.writes.keys().cloned().collect();
                    let else_writes: IndexSet<VarId> =
                        else_build.writes.keys().cloned().collect();
                    if then_writes != else_writes {
                        return Err(CompileError::BranchOutputMismatch {
                            phase: self.phase.clone(),
                            then_writes: then_writes.into_iter().collect(),
                            else_writes: else_writes.into_iter().collect(),
                        });
                    }

                    // Downstream code only ever sees the merged outcome,
                    // so whichever arm ran, the same variables exist.
                    let mut insn = Instruction::new(
                        id,
                        InstructionKind::Branch {
                            condition: condition.clone(),
                            then_body: then_build.instructions,
                            else_body: else_build.instructions,
                        },
                    );
                    for dep in then_build.external.iter().chain(&else_build.external) {
                        if ids.contains(dep) {
                            insn.add_dep(*dep);
                        } else {
                            seq.external.insert(*dep);
                        }
                    }
                    self.link(&mut insn, stmt, &labels, inherited, &mut seq)?;
                    seq.instructions.push(insn);
                    continue;
                }
            };

            let mut insn = Instruction::new(id, kind);
            self.link(&mut insn, stmt, &labels, inherited, &mut seq)?;
            seq.instructions.push(insn);
        }
        Ok(seq)
    }

    /// Resolve an instruction's reads against the write tables, apply its
    /// ordering annotations, then record its own writes.
    fn link(
        &self,
        insn: &mut Instruction,
        stmt: &Stmt,
        labels: &IndexMap<&str, InstructionId>,
        inherited: &IndexMap<VarId, InstructionId>,
        seq: &mut SequenceBuild,
    ) -> Result<()> {
        for var in insn.read_variables() {
            let info = self.registry.info(&var).ok_or_else(|| {
                CompileError::UnknownVariable {
                    name: var.clone(),
                    phase: Some(self.phase.clone()),
                }
            })?;
            if let Some(writer) = seq.writes.get(&var) {
                insn.add_dep(*writer);
            } else if let Some(writer) = inherited.get(&var) {
                seq.external.insert(*writer);
            } else if info.role == VarRole::Temporary {
                // State and history persist across phases and may be read
                // bare; a temporary read with no writer is a defect.
                return Err(CompileError::UninitializedRead {
                    phase: self.phase.clone(),
                    name: var,
                });
            }
        }

        for label in &stmt.after {
            match labels.get(label.as_str()) {
                Some(dep) => insn.add_dep(*dep),
                None => {
                    return Err(CompileError::UnknownLabel {
                        phase: self.phase.clone(),
                        label: label.clone(),
                    });
                }
            }
        }

        for var in insn.written_variables() {
            seq.writes.insert(var, insn.id);
        }
        Ok(())
    }

    fn check_declared(&self, var: &VarId) -> Result<()> {
        if self.registry.contains(var) {
            Ok(())
        } else {
            Err(CompileError::UnknownVariable {
                name: var.clone(),
                phase: Some(self.phase.clone()),
            })
        }
    }
}
