//! Output rendering for compiled methods.
//!
//! Two formats: the full graph as pretty-printed JSON, and a Graphviz
//! view for eyeballing dependency structure. Both render from the same
//! finalized data, in its deterministic order, so regenerated output
//! diffs cleanly against a previous run.

use cadence_foundation::PhaseId;

use crate::graph::{CompiledMethod, CompiledPhase};
use crate::instruction::{Instruction, InstructionKind};

/// Serialize the whole method, registry included, as pretty JSON.
pub fn to_json(method: &CompiledMethod) -> serde_json::Result<String> {
    serde_json::to_string_pretty(method)
}

/// Render the method as a Graphviz digraph.
///
/// Each phase becomes a cluster holding its instruction nodes and
/// dependency edges; branch arms appear inside the same cluster, hung off
/// their branch node with dotted edges. Dashed edges between phase
/// anchors show the transition chain.
pub fn to_dot(method: &CompiledMethod) -> String {
    let mut out = String::new();
    out.push_str("digraph method {\n");
    out.push_str("  rankdir=TB;\n");
    out.push_str("  node [shape=box, fontname=\"monospace\"];\n");

    for (index, phase) in method.phases.values().enumerate() {
        render_phase(&mut out, index, phase);
    }

    if let Some(entry) = method.phases.get_index_of(&method.entry) {
        out.push_str("  entry [shape=point];\n");
        out.push_str(&format!("  entry -> p{entry};\n"));
    }
    for (index, phase) in method.phases.values().enumerate() {
        if let Some(next) = &phase.next {
            if let Some(target) = phase_index(method, next) {
                out.push_str(&format!(
                    "  p{index} -> p{target} [style=dashed, label=\"next\"];\n"
                ));
            }
        }
    }

    out.push_str("}\n");
    out
}

fn phase_index(method: &CompiledMethod, id: &PhaseId) -> Option<usize> {
    method.phases.get_index_of(id)
}

fn render_phase(out: &mut String, index: usize, phase: &CompiledPhase) {
    out.push_str(&format!("  subgraph cluster_{index} {{\n"));
    out.push_str(&format!("    label=\"{}\";\n", escape(phase.id.as_str())));
    out.push_str(&format!(
        "    p{index} [shape=ellipse, label=\"{}\"];\n",
        escape(phase.id.as_str())
    ));
    render_instructions(out, index, &phase.instructions);
    out.push_str("  }\n");
}

fn render_instructions(out: &mut String, phase: usize, instructions: &[Instruction]) {
    for insn in instructions {
        out.push_str(&format!(
            "    p{phase}_i{} [label=\"{}: {}\"];\n",
            insn.id,
            insn.id,
            escape(&insn.kind.to_string())
        ));
        for dep in &insn.depends_on {
            out.push_str(&format!("    p{phase}_i{dep} -> p{phase}_i{};\n", insn.id));
        }

        if let InstructionKind::Branch {
            then_body,
            else_body,
            ..
        } = &insn.kind
        {
            render_instructions(out, phase, then_body);
            render_instructions(out, phase, else_body);
            render_arm_entries(out, phase, insn.id.0, then_body, "then");
            render_arm_entries(out, phase, insn.id.0, else_body, "else");
        }
    }
}

/// Dotted edges from a branch node to the arm instructions nothing else
/// in the arm orders first.
fn render_arm_entries(
    out: &mut String,
    phase: usize,
    branch: u32,
    arm: &[Instruction],
    which: &str,
) {
    for insn in arm {
        if insn.depends_on.is_empty() {
            out.push_str(&format!(
                "    p{phase}_i{branch} -> p{phase}_i{} [style=dotted, label=\"{which}\"];\n",
                insn.id
            ));
        }
    }
}

fn escape(text: &str) -> String {
    text.replace('"', "\\\"")
}
