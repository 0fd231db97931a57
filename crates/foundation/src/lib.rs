//! Cadence foundation types.
//!
//! Shared vocabulary for the method compiler: typed string identifiers for
//! variables, phases and right-hand-side function symbols, plus the opaque
//! symbolic expression tree that method descriptions carry.
//!
//! The compiler never evaluates or simplifies expressions. It only extracts
//! the variables an expression reads ([`Expr::variables`]), substitutes
//! variables for other expressions ([`Expr::substitute`]), and renders them
//! for diagnostics and graph dumps.

mod expr;
mod ids;

pub use expr::{BinaryOp, Expr, UnaryOp};
pub use ids::{PhaseId, RhsId, VarId};
