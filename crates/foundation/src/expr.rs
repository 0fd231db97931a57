//! Opaque symbolic expressions.
//!
//! Method descriptions carry the right-hand sides of assignments and branch
//! conditions as symbolic expression trees. The compiler treats them as
//! opaque values: it never evaluates, simplifies or type-checks them. The
//! only operations the compiler performs are dependency-variable extraction
//! and substitution, plus rendering for diagnostics.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::ids::VarId;

/// A symbolic expression over method variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Numeric literal (method coefficients, constants).
    Number(f64),
    /// Reference to a symbolic variable by id.
    Var(VarId),
    /// Unary operation.
    Unary {
        /// The operator.
        op: UnaryOp,
        /// The operand expression.
        operand: Box<Expr>,
    },
    /// Binary operation.
    Binary {
        /// The operator.
        op: BinaryOp,
        /// Left operand.
        left: Box<Expr>,
        /// Right operand.
        right: Box<Expr>,
    },
    /// Call to a named function symbol (e.g. `sqrt`, `norm`).
    ///
    /// The callee is not resolved by the compiler; it is part of the opaque
    /// algebra the downstream runtime interprets.
    Call {
        /// Function name.
        function: String,
        /// Argument expressions.
        args: Vec<Expr>,
    },
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    /// Arithmetic negation.
    Neg,
    /// Logical negation.
    Not,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    /// Addition.
    Add,
    /// Subtraction.
    Sub,
    /// Multiplication.
    Mul,
    /// Division.
    Div,
    /// Exponentiation.
    Pow,
    /// Equality comparison.
    Eq,
    /// Inequality comparison.
    Ne,
    /// Less-than comparison.
    Lt,
    /// Less-or-equal comparison.
    Le,
    /// Greater-than comparison.
    Gt,
    /// Greater-or-equal comparison.
    Ge,
    /// Logical conjunction.
    And,
    /// Logical disjunction.
    Or,
}

impl Expr {
    /// Numeric literal shorthand.
    pub fn number(value: f64) -> Self {
        Expr::Number(value)
    }

    /// Variable reference shorthand.
    pub fn var(name: impl Into<VarId>) -> Self {
        Expr::Var(name.into())
    }

    /// Builds a unary expression.
    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Expr::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    /// Builds a binary expression.
    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Builds a function call expression.
    pub fn call(function: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Call {
            function: function.into(),
            args,
        }
    }

    /// Collects every variable the expression reads.
    ///
    /// Order follows the first occurrence in a depth-first walk, and each
    /// variable appears once. This is the dependency-extraction surface the
    /// graph builder relies on.
    pub fn variables(&self) -> Vec<VarId> {
        let mut refs = Vec::new();
        self.collect_variables(&mut refs);
        refs
    }

    fn collect_variables(&self, refs: &mut Vec<VarId>) {
        match self {
            Expr::Number(_) => {}
            Expr::Var(id) => {
                if !refs.contains(id) {
                    refs.push(id.clone());
                }
            }
            Expr::Unary { operand, .. } => operand.collect_variables(refs),
            Expr::Binary { left, right, .. } => {
                left.collect_variables(refs);
                right.collect_variables(refs);
            }
            Expr::Call { args, .. } => {
                for arg in args {
                    arg.collect_variables(refs);
                }
            }
        }
    }

    /// Returns a copy of the expression with variables replaced.
    ///
    /// Variables without a binding are left untouched. Substituted
    /// expressions are not re-visited, so bindings cannot chain.
    pub fn substitute(&self, bindings: &IndexMap<VarId, Expr>) -> Expr {
        match self {
            Expr::Number(v) => Expr::Number(*v),
            Expr::Var(id) => match bindings.get(id) {
                Some(replacement) => replacement.clone(),
                None => Expr::Var(id.clone()),
            },
            Expr::Unary { op, operand } => Expr::Unary {
                op: *op,
                operand: Box::new(operand.substitute(bindings)),
            },
            Expr::Binary { op, left, right } => Expr::Binary {
                op: *op,
                left: Box::new(left.substitute(bindings)),
                right: Box::new(right.substitute(bindings)),
            },
            Expr::Call { function, args } => Expr::Call {
                function: function.clone(),
                args: args.iter().map(|a| a.substitute(bindings)).collect(),
            },
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(v) => write!(f, "{v}"),
            Expr::Var(id) => write!(f, "{id}"),
            Expr::Unary { op, operand } => write!(f, "{op}{operand}"),
            Expr::Binary { op, left, right } => write!(f, "({left} {op} {right})"),
            Expr::Call { function, args } => {
                write!(f, "{function}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
        }
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOp::Neg => write!(f, "-"),
            UnaryOp::Not => write!(f, "!"),
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Pow => "^",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        };
        write!(f, "{s}")
    }
}
