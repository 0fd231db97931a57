//! Top-level compilation driver.
//!
//! Runs the whole pipeline over a [`MethodDescription`]: build each
//! phase's dependency graph, wire the phases into a state machine, then
//! finalize into a scheduled [`CompiledMethod`]. The first error aborts
//! the run; there is no partial output to clean up after.

use tracing::info;

use crate::build::PhaseBuilder;
use crate::error::Result;
use crate::graph::CompiledMethod;
use crate::language::MethodDescription;
use crate::machine::StepMachine;

/// Compile a method description into an executable graph.
pub fn compile(description: &MethodDescription) -> Result<CompiledMethod> {
    Compiler::new(description).compile()
}

struct Compiler<'a> {
    description: &'a MethodDescription,
}

impl<'a> Compiler<'a> {
    fn new(description: &'a MethodDescription) -> Self {
        Self { description }
    }

    fn compile(self) -> Result<CompiledMethod> {
        info!(
            entry = %self.description.entry,
            phases = self.description.phases.len(),
            variables = self.description.registry.len(),
            "compiling method description"
        );

        let mut machine = StepMachine::new(self.description.entry.clone());
        for phase in &self.description.phases {
            let built = PhaseBuilder::new(phase.id.clone(), &self.description.registry)
                .build(&phase.statements)?;
            machine.add_phase(built)?;
            if let Some(next) = &phase.default_next {
                machine.set_default_next(phase.id.clone(), next.clone())?;
            }
        }
        machine.finalize(self.description.registry.clone())
    }
}
