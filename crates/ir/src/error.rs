//! Compile-time errors for method compilation.
//!
//! Every failure the compiler can produce is a construction-time defect in
//! the method description. Nothing here is raised during later execution;
//! the compiler hands the finalized graph to an external runtime and is
//! done.
//!
//! # Error Categories
//!
//! - **Registry errors**: [`CompileError::DuplicateName`],
//!   [`CompileError::UnknownVariable`], [`CompileError::HistoryOutOfRange`]
//! - **Graph-building errors**: [`CompileError::UninitializedRead`],
//!   [`CompileError::BranchOutputMismatch`], [`CompileError::UnknownLabel`],
//!   [`CompileError::DuplicateLabel`], [`CompileError::ConflictingTransition`],
//!   [`CompileError::MisplacedTransition`]
//! - **Machine errors**: [`CompileError::DuplicatePhase`],
//!   [`CompileError::UnknownPhase`], [`CompileError::UnreachablePhase`]
//! - **Scheduling errors**: [`CompileError::DependencyCycle`]
//!
//! # Error Handling Policy
//!
//! Errors surface immediately to the caller of the operation that detected
//! them. There is no recovery, no retry and no partial result: a failed
//! compilation never hands back a half-built graph. Messages carry the
//! phase name and the offending identifiers, because the method description
//! is source code to this compiler and the author has to find the defect.

use std::fmt;

use thiserror::Error;

use cadence_foundation::{PhaseId, VarId};

use crate::instruction::InstructionId;

/// Compile result type alias.
pub type Result<T> = std::result::Result<T, CompileError>;

fn join<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn in_phase(phase: &Option<PhaseId>) -> String {
    match phase {
        Some(p) => format!(" in phase '{p}'"),
        None => String::new(),
    }
}

fn transition_source(phase: &Option<PhaseId>) -> String {
    match phase {
        Some(p) => format!(" (transition target of phase '{p}')"),
        None => String::new(),
    }
}

/// Errors raised while compiling a method description.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    /// A variable name was declared twice in one compilation unit.
    ///
    /// Also raised when a declaration collides with an auto-registered
    /// history slot of an earlier declaration.
    #[error("duplicate variable name '{name}'")]
    DuplicateName {
        /// The name that was already taken.
        name: VarId,
    },

    /// A statement or lookup referenced a variable that was never declared.
    #[error("unknown variable '{name}'{}", in_phase(.phase))]
    UnknownVariable {
        /// The undeclared name.
        name: VarId,
        /// The phase whose statements referenced it, when known.
        phase: Option<PhaseId>,
    },

    /// A history access asked for more lag than the variable declares.
    ///
    /// This is a static check: it fails even if the runtime step count
    /// would have supplied that history by the time the phase runs.
    #[error("history offset {offset} exceeds declared depth {depth} for variable '{name}'")]
    HistoryOutOfRange {
        /// The variable whose history was accessed.
        name: VarId,
        /// The requested offset.
        offset: u32,
        /// The declared history depth.
        depth: u32,
    },

    /// A phase-local temporary was read before anything wrote it.
    ///
    /// State and history variables persist across phases and may be read
    /// without an in-phase writer; temporaries may not.
    #[error("phase '{phase}': read of uninitialized temporary '{name}'")]
    UninitializedRead {
        /// The phase containing the offending read.
        phase: PhaseId,
        /// The temporary that was read.
        name: VarId,
    },

    /// The two arms of a branch write different variable sets.
    ///
    /// Downstream instructions would see a variable that only sometimes
    /// exists, so both arms must produce the same outputs.
    #[error(
        "phase '{phase}': branch arms write different variable sets (then writes [{}], else writes [{}])",
        join(.then_writes),
        join(.else_writes)
    )]
    BranchOutputMismatch {
        /// The phase containing the branch.
        phase: PhaseId,
        /// Variables written by the then-arm.
        then_writes: Vec<VarId>,
        /// Variables written by the else-arm.
        else_writes: Vec<VarId>,
    },

    /// A phase name was referenced but never added to the machine.
    #[error("unknown phase '{target}'{}", transition_source(.referenced_from))]
    UnknownPhase {
        /// The phase name that does not exist.
        target: PhaseId,
        /// The phase whose transition referenced it, if the reference came
        /// from a transition rather than the entry declaration or a direct
        /// machine call.
        referenced_from: Option<PhaseId>,
    },

    /// Declared phases cannot be reached from the entry phase.
    ///
    /// Unreachable phases almost always indicate a mistake in the method
    /// description, so they are reported rather than silently dropped.
    #[error("phase(s) [{}] are not reachable from entry phase '{entry}'", join(.phases))]
    UnreachablePhase {
        /// Every phase that reachability analysis could not reach.
        phases: Vec<PhaseId>,
        /// The entry phase the analysis started from.
        entry: PhaseId,
    },

    /// The dependency graph of one phase contains a cycle.
    ///
    /// Instructions must form a directed acyclic graph for a schedule to
    /// exist. The listed instructions are the ones that could not be
    /// scheduled when the ready set drained.
    #[error("phase '{phase}': dependency cycle involving instructions [{}]", join(.instructions))]
    DependencyCycle {
        /// The phase whose graph is cyclic.
        phase: PhaseId,
        /// Ids of the instructions stuck in the cycle.
        instructions: Vec<InstructionId>,
    },

    /// A phase with this name was already added to the machine.
    #[error("duplicate phase '{phase}'")]
    DuplicatePhase {
        /// The name that was already taken.
        phase: PhaseId,
    },

    /// A phase declared more than one transition.
    ///
    /// Each phase resolves to exactly one next-phase target, so a second
    /// transition statement is a contradiction, not an override.
    #[error(
        "phase '{phase}': conflicting transitions (to '{first}', then to '{second}')"
    )]
    ConflictingTransition {
        /// The phase with two transition statements.
        phase: PhaseId,
        /// Target of the first transition.
        first: PhaseId,
        /// Target of the second transition.
        second: PhaseId,
    },

    /// A transition statement appeared inside a branch arm.
    ///
    /// Arms taking different targets could not resolve to a single next
    /// phase, so transitions are only legal at the top level of a phase.
    #[error("phase '{phase}': transition to '{target}' inside a branch arm")]
    MisplacedTransition {
        /// The phase containing the branch.
        phase: PhaseId,
        /// The target the nested transition named.
        target: PhaseId,
    },

    /// An ordering annotation referenced a label no statement carries.
    ///
    /// Labels are scoped to their enclosing statement sequence: the top
    /// level of a phase, or a single branch arm.
    #[error("phase '{phase}': ordering annotation references unknown label '{label}'")]
    UnknownLabel {
        /// The phase containing the annotation.
        phase: PhaseId,
        /// The label that did not resolve.
        label: String,
    },

    /// Two statements in one sequence carry the same label.
    #[error("phase '{phase}': duplicate statement label '{label}'")]
    DuplicateLabel {
        /// The phase containing the labels.
        phase: PhaseId,
        /// The repeated label.
        label: String,
    },
}
