//! Method description types.
//!
//! This is the input vocabulary of the compiler: an ordered list of
//! statements per phase, plus the registry the statements refer to.
//! Statements carry no dependency information. Ordering falls out of the
//! data flow during graph building, with optional labels for the few cases
//! where data flow alone is not enough.

use serde::{Deserialize, Serialize};

use cadence_foundation::{Expr, PhaseId, RhsId, VarId};

use crate::registry::VariableRegistry;

/// Complete symbolic description of a time-stepping method.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodDescription {
    /// Declarations for every variable the phases mention.
    pub registry: VariableRegistry,
    /// Phases in declaration order.
    pub phases: Vec<PhaseDescription>,
    /// Phase the compiled method starts in.
    pub entry: PhaseId,
}

impl MethodDescription {
    pub fn new(registry: VariableRegistry, entry: impl Into<PhaseId>) -> Self {
        Self {
            registry,
            phases: Vec::new(),
            entry: entry.into(),
        }
    }

    pub fn with_phase(mut self, phase: PhaseDescription) -> Self {
        self.phases.push(phase);
        self
    }
}

/// One named phase of a method description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseDescription {
    pub id: PhaseId,
    /// Statements in authoring order. Authoring order seeds instruction
    /// ids, which is all it influences; execution order comes from the
    /// dependency graph.
    pub statements: Vec<Stmt>,
    /// Fallback next phase, used when no statement transitions and no
    /// machine-level override applies.
    pub default_next: Option<PhaseId>,
}

impl PhaseDescription {
    pub fn new(id: impl Into<PhaseId>) -> Self {
        Self {
            id: id.into(),
            statements: Vec::new(),
            default_next: None,
        }
    }

    pub fn with_statement(mut self, stmt: Stmt) -> Self {
        self.statements.push(stmt);
        self
    }

    pub fn with_default_next(mut self, next: impl Into<PhaseId>) -> Self {
        self.default_next = Some(next.into());
        self
    }
}

/// A single statement: an operation plus optional ordering annotations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stmt {
    /// Name other statements in the same sequence can order against.
    pub label: Option<String>,
    /// Labels of statements that must run before this one, on top of
    /// whatever data flow already requires.
    pub after: Vec<String>,
    pub op: StmtOp,
}

impl Stmt {
    fn from_op(op: StmtOp) -> Self {
        Self {
            label: None,
            after: Vec::new(),
            op,
        }
    }

    pub fn assign(target: impl Into<VarId>, value: Expr) -> Self {
        Self::from_op(StmtOp::Assign {
            target: target.into(),
            value,
        })
    }

    pub fn eval_rhs(
        target: impl Into<VarId>,
        rhs: impl Into<RhsId>,
        args: Vec<Expr>,
    ) -> Self {
        Self::from_op(StmtOp::EvalRhs {
            target: target.into(),
            rhs: rhs.into(),
            args,
        })
    }

    pub fn state_update(state: impl Into<VarId>, value: impl Into<VarId>) -> Self {
        Self::from_op(StmtOp::StateUpdate {
            state: state.into(),
            value: value.into(),
        })
    }

    pub fn branch(condition: Expr, then_body: Vec<Stmt>, else_body: Vec<Stmt>) -> Self {
        Self::from_op(StmtOp::If {
            condition,
            then_body,
            else_body,
        })
    }

    pub fn transition(target: impl Into<PhaseId>) -> Self {
        Self::from_op(StmtOp::Transition {
            target: target.into(),
        })
    }

    pub fn nop() -> Self {
        Self::from_op(StmtOp::Nop)
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Append an ordering constraint on the labeled statement.
    pub fn with_after(mut self, label: impl Into<String>) -> Self {
        self.after.push(label.into());
        self
    }
}

/// Statement operations, mirroring the instruction kinds one-to-one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StmtOp {
    Assign {
        target: VarId,
        value: Expr,
    },
    EvalRhs {
        target: VarId,
        rhs: RhsId,
        args: Vec<Expr>,
    },
    StateUpdate {
        state: VarId,
        value: VarId,
    },
    If {
        condition: Expr,
        then_body: Vec<Stmt>,
        else_body: Vec<Stmt>,
    },
    Transition {
        target: PhaseId,
    },
    Nop,
}
