//! Cadence IR: the method-description-to-instruction-graph compiler.
//!
//! This crate takes a symbolic description of a numerical time-stepping
//! method (explicit Runge-Kutta, Adams-style multistep, adaptive schemes)
//! and compiles it into an executable intermediate representation: per-phase
//! instruction graphs with explicit dependency edges, deterministically
//! scheduled, plus a resolved phase transition table. A separate runtime
//! interprets the result; this crate never executes it.
//!
//! # Architecture
//!
//! - [`language`](MethodDescription) - the typed input boundary produced by
//!   a method-description front end
//! - [`registry`](VariableRegistry) - symbolic variable declarations,
//!   history slots, fresh temporaries
//! - [`instruction`](Instruction) - the closed instruction vocabulary with
//!   dependency-id sets
//! - [`build`](PhaseBuilder) - read/write analysis turning statements into
//!   per-phase instruction graphs
//! - [`machine`](StepMachine) - phase assembly, transition resolution and
//!   finalization into an immutable [`CompiledMethod`]
//! - [`schedule`](schedule()) - deterministic topological ordering
//! - [`emit`] - JSON and Graphviz renderings of a compiled method
//! - [`validate`](validate()) - post-compile lint warnings
//!
//! # Usage
//!
//! ```ignore
//! use cadence_ir::{compile, emit, MethodDescription};
//!
//! let description: MethodDescription = front_end_output();
//! let method = compile(&description)?;
//! println!("{}", emit::to_json(&method)?);
//! ```
//!
//! Compilation is synchronous, single-threaded and deterministic: the same
//! description always produces byte-identical output. Every failure is
//! reported through [`CompileError`] before any graph is handed back.

mod build;
mod compile;
pub mod emit;
mod error;
mod graph;
mod instruction;
mod language;
mod machine;
mod registry;
mod schedule;
mod validate;

pub use build::{Phase, PhaseBuilder};
pub use compile::compile;
pub use error::{CompileError, Result};
pub use graph::{CompiledMethod, CompiledPhase};
pub use instruction::{Effect, Instruction, InstructionId, InstructionKind};
pub use language::{MethodDescription, PhaseDescription, Stmt, StmtOp};
pub use machine::StepMachine;
pub use registry::{VarInfo, VarRole, VariableRegistry};
pub use schedule::schedule;
pub use validate::{CompileWarning, WarningCode, validate};
