//! End-to-end tests for method compilation.
//!
//! Each test describes a real integrator shape (forward Euler, midpoint,
//! Adams-Bashforth, adaptive step control) and checks the compiled graph:
//! dependency edges, deterministic schedules, transition wiring and the
//! errors or warnings a flawed description should produce.

use cadence_foundation::{BinaryOp, Expr};
use cadence_ir::{
    CompileError, InstructionId, InstructionKind, MethodDescription, PhaseDescription,
    Stmt, VarRole, VariableRegistry, WarningCode, compile, emit,
};
use cadence_tests::TestHarness;

/// Forward Euler, split into an init phase and a self-looping step phase.
fn euler() -> MethodDescription {
    let mut registry = VariableRegistry::new();
    registry.declare("y0", VarRole::State, 0).unwrap();
    registry.declare("dt", VarRole::State, 0).unwrap();
    registry.declare("f", VarRole::Temporary, 0).unwrap();
    registry.declare("y1", VarRole::Temporary, 0).unwrap();

    MethodDescription::new(registry, "init")
        .with_phase(
            PhaseDescription::new("init")
                .with_statement(Stmt::assign("y0", Expr::number(1.0)))
                .with_statement(Stmt::transition("step")),
        )
        .with_phase(
            PhaseDescription::new("step")
                .with_statement(Stmt::eval_rhs("f", "f", vec![Expr::var("y0")]))
                .with_statement(Stmt::assign(
                    "y1",
                    Expr::binary(
                        BinaryOp::Add,
                        Expr::var("y0"),
                        Expr::binary(BinaryOp::Mul, Expr::var("dt"), Expr::var("f")),
                    ),
                ))
                .with_statement(Stmt::state_update("y0", "y1"))
                .with_statement(Stmt::transition("step")),
        )
}

/// Explicit midpoint (RK2), with its stage slots minted from the
/// registry's temporary counter.
fn midpoint() -> MethodDescription {
    let mut registry = VariableRegistry::new();
    registry.declare("y", VarRole::State, 0).unwrap();
    registry.declare("dt", VarRole::State, 0).unwrap();
    registry.declare("y_half", VarRole::Temporary, 0).unwrap();
    registry.declare("y1", VarRole::Temporary, 0).unwrap();
    let k1 = registry.fresh_temp("k");
    let k2 = registry.fresh_temp("k");

    let half_step = Expr::binary(
        BinaryOp::Add,
        Expr::var("y"),
        Expr::binary(
            BinaryOp::Mul,
            Expr::binary(BinaryOp::Mul, Expr::var("dt"), Expr::number(0.5)),
            Expr::var(k1.clone()),
        ),
    );
    let full_step = Expr::binary(
        BinaryOp::Add,
        Expr::var("y"),
        Expr::binary(BinaryOp::Mul, Expr::var("dt"), Expr::var(k2.clone())),
    );

    MethodDescription::new(registry, "step").with_phase(
        PhaseDescription::new("step")
            .with_statement(Stmt::eval_rhs(k1, "rhs", vec![Expr::var("y")]))
            .with_statement(Stmt::assign("y_half", half_step))
            .with_statement(Stmt::eval_rhs(k2, "rhs", vec![Expr::var("y_half")]))
            .with_statement(Stmt::assign("y1", full_step))
            .with_statement(Stmt::state_update("y", "y1"))
            .with_statement(Stmt::transition("step")),
    )
}

/// The forward Euler description compiles to exactly the expected
/// two-phase graph: data-flow edges only, declaration-order schedule,
/// and a self-loop on the step phase.
#[test]
fn euler_compiles_to_the_expected_two_phase_graph() {
    let harness = TestHarness::from_description(&euler());

    assert_eq!(harness.method.entry, "init");
    assert_eq!(harness.schedule_of("init"), vec!["assign", "transition"]);
    assert_eq!(harness.next_of("init"), Some("step".to_string()));

    assert_eq!(
        harness.schedule_of("step"),
        vec!["eval_rhs", "assign", "state_update", "transition"]
    );
    assert_eq!(harness.ids_of("step"), vec![0, 1, 2, 3]);
    assert_eq!(harness.deps_of("step", 0), Vec::<u32>::new());
    assert_eq!(harness.deps_of("step", 1), vec![0]);
    assert_eq!(harness.deps_of("step", 2), vec![1]);
    assert_eq!(harness.deps_of("step", 3), Vec::<u32>::new());
    assert_eq!(harness.next_of("step"), Some("step".to_string()));

    assert!(harness.warnings.is_empty());
}

/// Stage temporaries come out of the registry's counter, so the two RK2
/// stages land in k_0 and k_1 and chain through the half-step value.
#[test]
fn midpoint_stages_chain_through_minted_temporaries() {
    let harness = TestHarness::from_description(&midpoint());

    assert_eq!(
        harness.schedule_of("step"),
        vec![
            "eval_rhs",
            "assign",
            "eval_rhs",
            "assign",
            "state_update",
            "transition"
        ]
    );
    assert_eq!(harness.ids_of("step"), vec![0, 1, 2, 3, 4, 5]);
    // Each stage waits on the one before it through y_half and k_1.
    assert_eq!(harness.deps_of("step", 1), vec![0]);
    assert_eq!(harness.deps_of("step", 2), vec![1]);
    assert_eq!(harness.deps_of("step", 3), vec![2]);
    assert_eq!(harness.deps_of("step", 4), vec![3]);

    let step = harness.phase("step");
    let InstructionKind::EvalRhs { target, .. } = &step.instructions[0].kind else {
        panic!("expected an eval_rhs instruction");
    };
    assert_eq!(target.as_str(), "k_0");
    let InstructionKind::EvalRhs { target, .. } = &step.instructions[2].kind else {
        panic!("expected an eval_rhs instruction");
    };
    assert_eq!(target.as_str(), "k_1");
}

/// Two-step Adams-Bashforth: the blend reads the lagged slope `f@-1`
/// while the rotation commits this step's slope into that slot. Because
/// state updates apply at phase exit, the read needs no edge to the
/// rotation and the slot still advances every step.
#[test]
fn adams_bashforth_blends_history_and_rotates_at_phase_exit() {
    let mut registry = VariableRegistry::new();
    registry.declare("y", VarRole::State, 0).unwrap();
    registry.declare("dt", VarRole::State, 0).unwrap();
    registry.declare("f", VarRole::Temporary, 1).unwrap();
    registry.declare("y1", VarRole::Temporary, 0).unwrap();
    let lagged = registry.history("f", 1).unwrap();

    let blend = Expr::binary(
        BinaryOp::Add,
        Expr::var("y"),
        Expr::binary(
            BinaryOp::Mul,
            Expr::var("dt"),
            Expr::binary(
                BinaryOp::Sub,
                Expr::binary(BinaryOp::Mul, Expr::number(1.5), Expr::var("f")),
                Expr::binary(BinaryOp::Mul, Expr::number(0.5), Expr::var(lagged.clone())),
            ),
        ),
    );
    let description = MethodDescription::new(registry, "step").with_phase(
        PhaseDescription::new("step")
            .with_statement(Stmt::eval_rhs("f", "rhs", vec![Expr::var("y")]))
            .with_statement(Stmt::assign("y1", blend))
            .with_statement(Stmt::state_update("y", "y1"))
            .with_statement(Stmt::state_update(lagged.clone(), "f"))
            .with_statement(Stmt::transition("step")),
    );

    let harness = TestHarness::from_description(&description);
    assert_eq!(harness.ids_of("step"), vec![0, 1, 2, 3, 4]);
    // The blend depends only on the fresh slope; the lagged slot arrives
    // from the previous step with no in-phase writer.
    assert_eq!(harness.deps_of("step", 1), vec![0]);
    // The rotation waits on the slope evaluation, nothing else.
    assert_eq!(harness.deps_of("step", 3), vec![0]);

    let info = harness.method.variables.info(&lagged).unwrap();
    assert_eq!(info.role, VarRole::History);
    assert!(harness.warnings.is_empty());
}

/// Data flow alone leaves two side-effecting evaluations unordered; an
/// `after` annotation pins them down.
#[test]
fn ordering_annotations_sequence_independent_side_effects() {
    let mut registry = VariableRegistry::new();
    registry.declare("y", VarRole::State, 0).unwrap();
    registry.declare("probe", VarRole::Temporary, 0).unwrap();
    registry.declare("ctrl", VarRole::Temporary, 0).unwrap();

    let description = MethodDescription::new(registry, "step").with_phase(
        PhaseDescription::new("step")
            .with_statement(
                Stmt::eval_rhs("probe", "sensor", vec![Expr::var("y")])
                    .with_label("sense"),
            )
            .with_statement(
                Stmt::eval_rhs("ctrl", "controller", vec![Expr::var("y")])
                    .with_after("sense"),
            ),
    );

    let harness = TestHarness::from_description(&description);
    assert_eq!(harness.deps_of("step", 1), vec![0]);
    assert_eq!(harness.ids_of("step"), vec![0, 1]);
}

/// Step-size control: both arms of the accept/reject branch write the
/// same output, outside needs are lifted onto the branch record, and the
/// commit downstream depends on the branch as a whole.
#[test]
fn adaptive_branch_merges_arm_writes_conservatively() {
    let mut registry = VariableRegistry::new();
    registry.declare("y", VarRole::State, 0).unwrap();
    registry.declare("tol", VarRole::State, 0).unwrap();
    registry.declare("y_trial", VarRole::Temporary, 0).unwrap();
    registry.declare("err", VarRole::Temporary, 0).unwrap();
    registry.declare("y_next", VarRole::Temporary, 0).unwrap();

    let description = MethodDescription::new(registry, "step").with_phase(
        PhaseDescription::new("step")
            .with_statement(Stmt::eval_rhs("y_trial", "attempt", vec![Expr::var("y")]))
            .with_statement(Stmt::assign(
                "err",
                Expr::call(
                    "abs",
                    vec![Expr::binary(
                        BinaryOp::Sub,
                        Expr::var("y_trial"),
                        Expr::var("y"),
                    )],
                ),
            ))
            .with_statement(Stmt::branch(
                Expr::binary(BinaryOp::Lt, Expr::var("err"), Expr::var("tol")),
                vec![Stmt::assign("y_next", Expr::var("y_trial"))],
                vec![Stmt::assign("y_next", Expr::var("y"))],
            ))
            .with_statement(Stmt::state_update("y", "y_next"))
            .with_statement(Stmt::transition("step")),
    );

    let harness = TestHarness::from_description(&description);
    assert_eq!(
        harness.schedule_of("step"),
        vec!["eval_rhs", "assign", "branch", "state_update", "transition"]
    );
    // The branch carries the then-arm's need for y_trial plus its own
    // condition's need for err.
    assert_eq!(harness.deps_of("step", 2), vec![0, 1]);
    // The commit sees the branch as the writer of y_next.
    assert_eq!(harness.deps_of("step", 3), vec![2]);

    let step = harness.phase("step");
    let InstructionKind::Branch {
        then_body,
        else_body,
        ..
    } = &step.instructions[2].kind
    else {
        panic!("expected a branch instruction");
    };
    assert_eq!(then_body[0].id, InstructionId(5));
    assert!(then_body[0].depends_on.is_empty());
    assert_eq!(else_body[0].id, InstructionId(6));

    assert!(harness.warnings.is_empty());
}

/// Branches nest: an arm may itself branch, as long as every level
/// agrees on its outputs.
#[test]
fn nested_branches_compile_and_count() {
    let mut registry = VariableRegistry::new();
    registry.declare("flag", VarRole::State, 0).unwrap();
    registry.declare("mode", VarRole::State, 0).unwrap();
    registry.declare("u", VarRole::Temporary, 0).unwrap();

    let inner = Stmt::branch(
        Expr::var("mode"),
        vec![Stmt::assign("u", Expr::number(1.0))],
        vec![Stmt::assign("u", Expr::number(2.0))],
    );
    let description = MethodDescription::new(registry, "step").with_phase(
        PhaseDescription::new("step").with_statement(Stmt::branch(
            Expr::var("flag"),
            vec![inner],
            vec![Stmt::assign("u", Expr::number(3.0))],
        )),
    );

    let harness = TestHarness::from_description(&description);
    assert_eq!(harness.schedule_of("step"), vec!["branch"]);
    assert_eq!(harness.method.instruction_count(), 5);

    let step = harness.phase("step");
    let InstructionKind::Branch { then_body, .. } = &step.instructions[0].kind else {
        panic!("expected a branch instruction");
    };
    let InstructionKind::Branch { then_body, .. } = &then_body[0].kind else {
        panic!("expected a nested branch instruction");
    };
    assert_eq!(then_body[0].id, InstructionId(2));
}

/// Compiling the same description twice yields byte-identical output, in
/// both emitted formats.
#[test]
fn emitted_output_is_deterministic() {
    let first = TestHarness::from_description(&midpoint());
    let second = TestHarness::from_description(&midpoint());

    assert_eq!(first.emitted_json(), second.emitted_json());
    assert_eq!(emit::to_dot(&first.method), emit::to_dot(&second.method));
}

/// The JSON dump carries the whole method: entry, wired phases with
/// tagged instructions, and the registry the identifiers resolve
/// against.
#[test]
fn emitted_json_exposes_phases_and_variables() {
    let harness = TestHarness::from_description(&euler());
    let value: serde_json::Value =
        serde_json::from_str(&harness.emitted_json()).unwrap();

    assert_eq!(value["entry"], "init");
    assert_eq!(value["phases"]["step"]["next"], "step");

    let first = &value["phases"]["step"]["instructions"][0];
    assert_eq!(first["id"], 0);
    assert_eq!(first["kind"]["EvalRhs"]["target"], "f");
    assert_eq!(first["effect"], "SideEffecting");

    assert_eq!(value["variables"]["entries"]["y0"]["role"], "State");
}

/// An `after` annotation pointing forward at a statement that reads the
/// annotated one closes a loop, and the scheduler names the instructions
/// stuck in it.
#[test]
fn annotation_cycles_are_reported_with_instruction_ids() {
    let mut registry = VariableRegistry::new();
    registry.declare("a", VarRole::Temporary, 0).unwrap();
    registry.declare("b", VarRole::Temporary, 0).unwrap();

    let description = MethodDescription::new(registry, "step").with_phase(
        PhaseDescription::new("step")
            .with_statement(Stmt::assign("a", Expr::number(1.0)).with_after("later"))
            .with_statement(Stmt::assign("b", Expr::var("a")).with_label("later")),
    );

    let err = compile(&description).unwrap_err();
    assert_eq!(
        err,
        CompileError::DependencyCycle {
            phase: "step".into(),
            instructions: vec![InstructionId(0), InstructionId(1)],
        }
    );
}

/// A phase no transition chain reaches is reported, not silently
/// dropped.
#[test]
fn unreachable_phases_fail_compilation() {
    let mut registry = VariableRegistry::new();
    registry.declare("y", VarRole::State, 0).unwrap();

    let description = MethodDescription::new(registry, "init")
        .with_phase(
            PhaseDescription::new("init")
                .with_statement(Stmt::nop())
                .with_statement(Stmt::transition("step")),
        )
        .with_phase(
            PhaseDescription::new("step")
                .with_statement(Stmt::state_update("y", "y"))
                .with_statement(Stmt::transition("step")),
        )
        .with_phase(
            PhaseDescription::new("leftover").with_statement(Stmt::nop()),
        );

    let err = compile(&description).unwrap_err();
    assert_eq!(
        err,
        CompileError::UnreachablePhase {
            phases: vec!["leftover".into()],
            entry: "init".into(),
        }
    );
}

/// A phase with no transition, no default and no override is terminal:
/// the compiled chain simply ends there.
#[test]
fn missing_transition_marks_a_terminal_phase() {
    let mut registry = VariableRegistry::new();
    registry.declare("y", VarRole::State, 0).unwrap();

    let description = MethodDescription::new(registry, "run")
        .with_phase(
            PhaseDescription::new("run")
                .with_statement(Stmt::assign("y", Expr::number(2.0)))
                .with_statement(Stmt::state_update("y", "y"))
                .with_statement(Stmt::transition("drain")),
        )
        .with_phase(PhaseDescription::new("drain").with_statement(Stmt::nop()));

    let harness = TestHarness::from_description(&description);
    assert_eq!(harness.next_of("run"), Some("drain".to_string()));
    assert_eq!(harness.next_of("drain"), None);
    assert!(harness.phase("drain").is_terminal());
}

/// Asking for more history than a variable declares fails when the
/// access is resolved, long before any step could have run.
#[test]
fn history_beyond_declared_depth_fails_statically() {
    let mut registry = VariableRegistry::new();
    registry.declare("f", VarRole::Temporary, 2).unwrap();

    assert!(registry.history("f", 2).is_ok());
    let err = registry.history("f", 3).unwrap_err();
    assert_eq!(
        err,
        CompileError::HistoryOutOfRange {
            name: "f".into(),
            offset: 3,
            depth: 2,
        }
    );
}

/// Validation reports declared-but-unreferenced variables without
/// failing the compile.
#[test]
fn validation_flags_unused_variables() {
    let mut description = euler();
    description
        .registry
        .declare("leftover", VarRole::Temporary, 0)
        .unwrap();

    let harness = TestHarness::from_description(&description);
    assert_eq!(harness.warnings.len(), 1);
    assert_eq!(harness.warnings[0].code, WarningCode::UnusedVariable);
    assert_eq!(harness.warnings[0].entity, "leftover");
}
