//! Instruction records.
//!
//! Instructions are the nodes of the dependency graph. Once constructed,
//! a record never changes operands or kind; the builder only appends to
//! its dependency set, and the scheduler only reorders whole records.

use std::fmt;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use cadence_foundation::{Expr, PhaseId, RhsId, VarId};

/// Dense instruction identifier, allocated in declaration order within a
/// phase. Scheduling breaks ties by comparing these, which is what makes
/// the emitted order reproducible.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct InstructionId(pub u32);

impl fmt::Display for InstructionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether reordering an instruction past its dependency edges could be
/// observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    /// Value-only computation. Free to schedule anywhere its data
    /// dependencies allow.
    Pure,
    /// Touches the world outside the expression graph: evaluates a
    /// user-supplied callable, commits state, or moves the machine.
    SideEffecting,
}

impl Effect {
    fn of(kind: &InstructionKind) -> Self {
        match kind {
            InstructionKind::Assign { .. }
            | InstructionKind::Branch { .. }
            | InstructionKind::Nop => Effect::Pure,
            InstructionKind::EvalRhs { .. }
            | InstructionKind::StateUpdate { .. }
            | InstructionKind::Transition { .. } => Effect::SideEffecting,
        }
    }
}

/// The closed set of operation kinds.
///
/// Downstream passes match exhaustively on this enum, so adding a kind is
/// a deliberate, compiler-checked event rather than a registration at a
/// distance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InstructionKind {
    /// Bind a symbolic expression to a variable.
    Assign { target: VarId, value: Expr },
    /// Evaluate a named right-hand-side callable and bind its result.
    EvalRhs {
        target: VarId,
        rhs: RhsId,
        args: Vec<Expr>,
    },
    /// Commit `value` into persistent `state` when the phase exits.
    ///
    /// Deferral is the point: reads of `state` elsewhere in the phase see
    /// the pre-update value, so update order within a phase cannot matter.
    StateUpdate { state: VarId, value: VarId },
    /// Conditional over two internally ordered arms.
    ///
    /// Arm instructions depend only on each other; anything an arm needs
    /// from the enclosing phase is lifted onto this record's dependency
    /// set, so the branch schedules as one unit.
    Branch {
        condition: Expr,
        then_body: Vec<Instruction>,
        else_body: Vec<Instruction>,
    },
    /// Select the phase that runs after this one.
    Transition { target: PhaseId },
    /// Placeholder with no operands. Useful as a labeled anchor for
    /// ordering annotations.
    Nop,
}

impl InstructionKind {
    /// Stable lowercase kind name, used in rendered output.
    pub fn name(&self) -> &'static str {
        match self {
            InstructionKind::Assign { .. } => "assign",
            InstructionKind::EvalRhs { .. } => "eval_rhs",
            InstructionKind::StateUpdate { .. } => "state_update",
            InstructionKind::Branch { .. } => "branch",
            InstructionKind::Transition { .. } => "transition",
            InstructionKind::Nop => "nop",
        }
    }
}

impl fmt::Display for InstructionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstructionKind::Assign { target, value } => {
                write!(f, "{target} = {value}")
            }
            InstructionKind::EvalRhs { target, rhs, args } => {
                let args = args
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "{target} = {rhs}({args})")
            }
            InstructionKind::StateUpdate { state, value } => {
                write!(f, "update {state} <- {value}")
            }
            InstructionKind::Branch { condition, .. } => {
                write!(f, "branch on {condition}")
            }
            InstructionKind::Transition { target } => {
                write!(f, "transition -> {target}")
            }
            InstructionKind::Nop => write!(f, "nop"),
        }
    }
}

/// A single node of a phase's dependency graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub id: InstructionId,
    pub kind: InstructionKind,
    /// Instructions that must run before this one, in discovery order.
    pub depends_on: IndexSet<InstructionId>,
    pub effect: Effect,
}

impl Instruction {
    pub fn new(id: InstructionId, kind: InstructionKind) -> Self {
        let effect = Effect::of(&kind);
        Self {
            id,
            kind,
            depends_on: IndexSet::new(),
            effect,
        }
    }

    pub(crate) fn add_dep(&mut self, dep: InstructionId) {
        self.depends_on.insert(dep);
    }

    /// Variables this instruction reads, in first-occurrence order.
    ///
    /// A branch reads only its condition here; arm reads are resolved
    /// inside the arm or lifted onto `depends_on` during graph building.
    pub fn read_variables(&self) -> Vec<VarId> {
        match &self.kind {
            InstructionKind::Assign { value, .. } => value.variables(),
            InstructionKind::EvalRhs { args, .. } => {
                let mut vars = Vec::new();
                for arg in args {
                    for var in arg.variables() {
                        if !vars.contains(&var) {
                            vars.push(var);
                        }
                    }
                }
                vars
            }
            InstructionKind::StateUpdate { value, .. } => vec![value.clone()],
            InstructionKind::Branch { condition, .. } => condition.variables(),
            InstructionKind::Transition { .. } | InstructionKind::Nop => Vec::new(),
        }
    }

    /// Variables this instruction makes visible to later instructions in
    /// the same sequence.
    ///
    /// State updates write nothing: they commit at phase exit, invisible
    /// to the current phase. A branch writes what its arms agree on, which
    /// after validation is both arms' full output set.
    pub fn written_variables(&self) -> IndexSet<VarId> {
        match &self.kind {
            InstructionKind::Assign { target, .. }
            | InstructionKind::EvalRhs { target, .. } => {
                IndexSet::from([target.clone()])
            }
            InstructionKind::Branch {
                then_body,
                else_body,
                ..
            } => {
                let then_writes = sequence_writes(then_body);
                let else_writes = sequence_writes(else_body);
                then_writes.intersection(&else_writes).cloned().collect()
            }
            InstructionKind::StateUpdate { .. }
            | InstructionKind::Transition { .. }
            | InstructionKind::Nop => IndexSet::new(),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

/// Union of everything a statement sequence writes.
pub(crate) fn sequence_writes(instructions: &[Instruction]) -> IndexSet<VarId> {
    let mut writes = IndexSet::new();
    for insn in instructions {
        writes.extend(insn.written_variables());
    }
    writes
}

/// Visit every instruction in a sequence, including those nested inside
/// branch arms, in declaration order.
pub(crate) fn walk<'a>(instructions: &'a [Instruction], f: &mut impl FnMut(&'a Instruction)) {
    for insn in instructions {
        f(insn);
        if let InstructionKind::Branch {
            then_body,
            else_body,
            ..
        } = &insn.kind
        {
            walk(then_body, f);
            walk(else_body, f);
        }
    }
}
