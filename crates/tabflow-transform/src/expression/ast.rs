//! Expression tree.

use std::fmt;

use tabflow_model::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Concat,
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Concat => "&",
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    /// A field reference. `slot` is the position of the field in the
    /// declared input list, or `None` if the field was not declared.
    Field { name: String, slot: Option<usize> },
    Negate(Box<Expr>),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

impl Expr {
    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Self::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Resolve field references against the declared inputs. Names match
    /// exactly first, then case-insensitively.
    pub fn bind(&mut self, inputs: &[String]) {
        match self {
            Self::Literal(_) => {}
            Self::Field { name, slot } => {
                *slot = inputs
                    .iter()
                    .position(|input| input == name)
                    .or_else(|| {
                        inputs
                            .iter()
                            .position(|input| input.eq_ignore_ascii_case(name))
                    });
            }
            Self::Negate(inner) => inner.bind(inputs),
            Self::Binary { left, right, .. } => {
                left.bind(inputs);
                right.bind(inputs);
            }
        }
    }

    /// Collect referenced field names in first-use order.
    pub fn field_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Literal(_) => {}
            Self::Field { name, .. } => {
                if !out.contains(&name.as_str()) {
                    out.push(name);
                }
            }
            Self::Negate(inner) => inner.field_names(out),
            Self::Binary { left, right, .. } => {
                left.field_names(out);
                right.field_names(out);
            }
        }
    }
}
