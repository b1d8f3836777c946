//! Sandboxed formula language.
//!
//! Formulas are parsed once when a pipeline is built and evaluated per row
//! against the coerced values of the step's declared input fields. The
//! language has literals, field references, arithmetic, concatenation and
//! comparisons. There are no function calls, attribute lookups or control
//! flow, so evaluation cannot reach anything but its inputs.

mod ast;
mod eval;
mod lexer;
mod parser;

pub use ast::{BinaryOp, Expr};
pub use parser::ExpressionError;

use tabflow_model::Value;

use crate::error::EvaluationError;

/// A parsed formula bound to an ordered list of input fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: String,
    root: Expr,
}

impl Expression {
    /// Parse `source` and resolve its field references against `inputs`.
    ///
    /// References to undeclared fields parse fine; they fail per row with
    /// [`EvaluationError::UnknownField`].
    ///
    /// # Examples
    /// ```
    /// use tabflow_model::Value;
    /// use tabflow_transform::expression::Expression;
    ///
    /// let inputs = vec!["A".to_string(), "B".to_string()];
    /// let expr = Expression::compile("A + B * 2", &inputs).unwrap();
    /// assert_eq!(expr.evaluate(&[Value::Int(1), Value::Int(4)]), Ok(Value::Int(9)));
    /// ```
    pub fn compile(source: &str, inputs: &[String]) -> Result<Self, ExpressionError> {
        let mut root = parser::Parser::new(source).parse()?;
        root.bind(inputs);
        Ok(Self {
            source: source.to_string(),
            root,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> &Expr {
        &self.root
    }

    /// Field names referenced by the formula.
    pub fn fields(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.root.field_names(&mut out);
        out
    }

    /// Referenced names that are not among the declared inputs.
    pub fn unbound_fields(&self) -> Vec<&str> {
        fn walk<'a>(expr: &'a Expr, out: &mut Vec<&'a str>) {
            match expr {
                Expr::Field { name, slot: None } if !out.contains(&name.as_str()) => {
                    out.push(name);
                }
                Expr::Negate(inner) => walk(inner, out),
                Expr::Binary { left, right, .. } => {
                    walk(left, out);
                    walk(right, out);
                }
                _ => {}
            }
        }
        let mut out = Vec::new();
        walk(&self.root, &mut out);
        out
    }

    /// Evaluate against input values given in declaration order.
    pub fn evaluate(&self, inputs: &[Value]) -> Result<Value, EvaluationError> {
        eval::evaluate(&self.root, inputs)
    }
}
