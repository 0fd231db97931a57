//! Test harness for end-to-end method compilation.
//!
//! Wraps the compile pipeline with assertion-friendly accessors so
//! integration tests can state expectations about schedules, transitions
//! and warnings without re-deriving lookups every time.

use cadence_ir::{
    CompileWarning, CompiledMethod, CompiledPhase, MethodDescription, compile, emit,
    validate,
};

/// A compiled method plus its validation findings.
pub struct TestHarness {
    pub method: CompiledMethod,
    pub warnings: Vec<CompileWarning>,
}

impl TestHarness {
    /// Compile a description and validate the result.
    ///
    /// # Panics
    ///
    /// Panics if compilation fails.
    pub fn from_description(description: &MethodDescription) -> Self {
        let method = match compile(description) {
            Ok(method) => method,
            Err(err) => panic!("compilation failed: {err}"),
        };
        let warnings = validate(&method);
        Self { method, warnings }
    }

    /// Look up a phase, panicking if it does not exist.
    pub fn phase(&self, id: &str) -> &CompiledPhase {
        match self.method.phase(id) {
            Some(phase) => phase,
            None => panic!("no phase named '{id}'"),
        }
    }

    /// Instruction kind names of a phase, in execution order.
    pub fn schedule_of(&self, phase: &str) -> Vec<String> {
        self.phase(phase)
            .instructions
            .iter()
            .map(|insn| insn.kind.name().to_string())
            .collect()
    }

    /// Instruction ids of a phase, in execution order.
    pub fn ids_of(&self, phase: &str) -> Vec<u32> {
        self.phase(phase)
            .instructions
            .iter()
            .map(|insn| insn.id.0)
            .collect()
    }

    /// Dependency ids of the instruction at `index` of a phase's
    /// execution order.
    pub fn deps_of(&self, phase: &str, index: usize) -> Vec<u32> {
        self.phase(phase).instructions[index]
            .depends_on
            .iter()
            .map(|id| id.0)
            .collect()
    }

    /// Resolved successor of a phase, as a plain string.
    pub fn next_of(&self, phase: &str) -> Option<String> {
        self.phase(phase)
            .next
            .as_ref()
            .map(|id| id.as_str().to_string())
    }

    /// The method rendered as pretty JSON.
    pub fn emitted_json(&self) -> String {
        match emit::to_json(&self.method) {
            Ok(json) => json,
            Err(err) => panic!("emit failed: {err}"),
        }
    }
}
