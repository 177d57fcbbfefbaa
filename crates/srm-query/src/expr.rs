//! Structured, parameterised conditions.
//!
//! Expressions render to SQL text with `$n` placeholders and a parallel parameter list,
//! so two filters that differ only in bound values render the same text and share one
//! cached statement. Column references are checked against the identifier grammar.
//!
//! ```ignore
//! let filter = Filter::new(Expr::col("o_master1.id").eq(1_i64)).order_by("o.name", Order::Asc);
//! let details = tx.query_where::<Detail>(&filter)?;
//! ```

use srm_core::identifiers::is_valid_column_path;
use srm_core::{Error, Result, Value};

/// Comparison and logical operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
    And,
    Or,
}

impl BinaryOp {
    pub const fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Eq => "=",
            BinaryOp::Ne => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Like => "like",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
        }
    }
}

/// A SQL expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Column reference, optionally alias-qualified (`o_master1.id`).
    Column(String),
    /// Bound parameter.
    Value(Value),
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    Not(Box<Expr>),
    IsNull {
        expr: Box<Expr>,
        negated: bool,
    },
    In {
        expr: Box<Expr>,
        values: Vec<Value>,
    },
}

impl Expr {
    /// Column reference.
    pub fn col(name: impl Into<String>) -> Self {
        Expr::Column(name.into())
    }

    /// Column under an explicit alias.
    pub fn qualified(alias: &str, column: &str) -> Self {
        Expr::Column(format!("{alias}.{column}"))
    }

    /// Bound value.
    pub fn val(value: impl Into<Value>) -> Self {
        Expr::Value(value.into())
    }

    fn binary(self, op: BinaryOp, right: Expr) -> Self {
        Expr::Binary {
            left: Box::new(self),
            op,
            right: Box::new(right),
        }
    }

    pub fn eq(self, value: impl Into<Value>) -> Self {
        self.binary(BinaryOp::Eq, Expr::val(value))
    }

    pub fn ne(self, value: impl Into<Value>) -> Self {
        self.binary(BinaryOp::Ne, Expr::val(value))
    }

    pub fn lt(self, value: impl Into<Value>) -> Self {
        self.binary(BinaryOp::Lt, Expr::val(value))
    }

    pub fn le(self, value: impl Into<Value>) -> Self {
        self.binary(BinaryOp::Le, Expr::val(value))
    }

    pub fn gt(self, value: impl Into<Value>) -> Self {
        self.binary(BinaryOp::Gt, Expr::val(value))
    }

    pub fn ge(self, value: impl Into<Value>) -> Self {
        self.binary(BinaryOp::Ge, Expr::val(value))
    }

    pub fn like(self, pattern: impl Into<String>) -> Self {
        self.binary(BinaryOp::Like, Expr::Value(Value::Text(pattern.into())))
    }

    /// Compare two columns, e.g. in a join-like predicate.
    pub fn eq_col(self, column: impl Into<String>) -> Self {
        self.binary(BinaryOp::Eq, Expr::col(column))
    }

    pub fn and(self, other: Expr) -> Self {
        self.binary(BinaryOp::And, other)
    }

    pub fn or(self, other: Expr) -> Self {
        self.binary(BinaryOp::Or, other)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Expr::Not(Box::new(self))
    }

    pub fn is_null(self) -> Self {
        Expr::IsNull {
            expr: Box::new(self),
            negated: false,
        }
    }

    pub fn is_not_null(self) -> Self {
        Expr::IsNull {
            expr: Box::new(self),
            negated: true,
        }
    }

    pub fn in_list<V: Into<Value>>(self, values: impl IntoIterator<Item = V>) -> Self {
        Expr::In {
            expr: Box::new(self),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Render to SQL, pushing bound values onto `params`.
    ///
    /// Placeholders are numbered from `offset + 1`.
    pub fn build(&self, params: &mut Vec<Value>, offset: usize) -> Result<String> {
        match self {
            Expr::Column(name) => {
                if is_valid_column_path(name) {
                    Ok(name.clone())
                } else {
                    Err(Error::Query(format!("invalid column reference `{name}`")))
                }
            }
            Expr::Value(value) => {
                params.push(value.clone());
                Ok(format!("${}", offset + params.len()))
            }
            Expr::Binary { left, op, right } => {
                let left = left.build(params, offset)?;
                let right = right.build(params, offset)?;
                match op {
                    BinaryOp::And | BinaryOp::Or => {
                        Ok(format!("({} {} {})", left, op.as_str(), right))
                    }
                    _ => Ok(format!("{} {} {}", left, op.as_str(), right)),
                }
            }
            Expr::Not(inner) => Ok(format!("not ({})", inner.build(params, offset)?)),
            Expr::IsNull { expr, negated } => {
                let inner = expr.build(params, offset)?;
                if *negated {
                    Ok(format!("{inner} is not null"))
                } else {
                    Ok(format!("{inner} is null"))
                }
            }
            Expr::In { expr, values } => {
                let inner = expr.build(params, offset)?;
                if values.is_empty() {
                    // Nothing is in an empty list.
                    return Ok("1 = 0".to_string());
                }
                let placeholders: Vec<String> = values
                    .iter()
                    .map(|v| {
                        params.push(v.clone());
                        format!("${}", offset + params.len())
                    })
                    .collect();
                Ok(format!("{} in ({})", inner, placeholders.join(", ")))
            }
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

impl Order {
    pub const fn as_str(self) -> &'static str {
        match self {
            Order::Asc => "asc",
            Order::Desc => "desc",
        }
    }
}

/// A complete condition suffix: optional `where` plus optional `order by`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    condition: Option<Expr>,
    order: Vec<(String, Order)>,
}

impl Filter {
    pub fn new(condition: Expr) -> Self {
        Self {
            condition: Some(condition),
            order: Vec::new(),
        }
    }

    /// No condition; every row.
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn order_by(mut self, column: impl Into<String>, order: Order) -> Self {
        self.order.push((column.into(), order));
        self
    }

    /// Render the suffix and its parameters.
    pub fn build(&self) -> Result<(String, Vec<Value>)> {
        let mut params = Vec::new();
        let mut parts = Vec::new();
        if let Some(condition) = &self.condition {
            parts.push(format!("where {}", condition.build(&mut params, 0)?));
        }
        if !self.order.is_empty() {
            let mut terms = Vec::with_capacity(self.order.len());
            for (column, order) in &self.order {
                if !is_valid_column_path(column) {
                    return Err(Error::Query(format!("invalid order column `{column}`")));
                }
                terms.push(format!("{} {}", column, order.as_str()));
            }
            parts.push(format!("order by {}", terms.join(", ")));
        }
        Ok((parts.join(" "), params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_equality() {
        let (sql, params) = Filter::new(Expr::col("o_master1.id").eq(1_i64)).build().unwrap();
        assert_eq!(sql, "where o_master1.id = $1");
        assert_eq!(params, vec![Value::BigInt(1)]);
    }

    #[test]
    fn test_compound_and_ordering() {
        let filter = Filter::new(
            Expr::col("o.name")
                .like("A%")
                .and(Expr::col("o.id").in_list([1_i64, 2, 3]))
                .or(Expr::col("o.id").is_null().not()),
        )
        .order_by("o.id", Order::Desc);
        let (sql, params) = filter.build().unwrap();
        assert_eq!(
            sql,
            "where ((o.name like $1 and o.id in ($2, $3, $4)) or not (o.id is null)) order by o.id desc"
        );
        assert_eq!(params.len(), 4);
    }

    #[test]
    fn test_same_shape_same_text() {
        let a = Filter::new(Expr::col("o.id").eq(1_i64)).build().unwrap();
        let b = Filter::new(Expr::col("o.id").eq(2_i64)).build().unwrap();
        assert_eq!(a.0, b.0);
        assert_ne!(a.1, b.1);
    }

    #[test]
    fn test_offset_numbering() {
        let mut params = vec![Value::Int(0)];
        let sql = Expr::col("o.id").ge(5_i64).build(&mut params, 0).unwrap();
        assert_eq!(sql, "o.id >= $2");
        let mut fresh = Vec::new();
        assert_eq!(Expr::col("o.id").ge(5_i64).build(&mut fresh, 3).unwrap(), "o.id >= $4");
    }

    #[test]
    fn test_rejects_injected_column() {
        let err = Filter::new(Expr::col("o.id = 1; drop table x").eq(1_i64))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Query(_)));
        let err = Filter::all().order_by("o.id desc", Order::Asc).build().unwrap_err();
        assert!(matches!(err, Error::Query(_)));
    }

    #[test]
    fn test_empty_filter() {
        assert_eq!(Filter::all().build().unwrap(), (String::new(), Vec::new()));
    }
}
