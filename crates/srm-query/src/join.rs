//! Multi-entity selects: several templates joined by caller-specified steps.
//!
//! Template `i` is selected under alias `o{i+1}`. The `i`-th join step connects
//! template `i + 1` to the templates before it:
//!
//! ```text
//! select <o1 columns>, <o2 columns>, <o3 columns>
//! from harness.master1 o1
//! left outer join harness.detail o2 on o2.master1_id = o1.id
//! left outer join (harness.yetanother o3 join harness.detail o3_detail on ...) on o3.detail_id = o2.id
//! ```
//!
//! A template with references of its own is wrapped in a parenthesised join group so
//! that its inner joins do not filter the outer join.

use std::fmt;

use srm_core::{DescriptorTree, Error, Result};

use crate::select::{mto_joins, select_columns};

/// Kind of one join step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinKind {
    Inner,
    LeftOuter,
}

impl JoinKind {
    pub const fn as_sql(self) -> &'static str {
        match self {
            JoinKind::Inner => "join",
            JoinKind::LeftOuter => "left outer join",
        }
    }
}

impl fmt::Display for JoinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// One join step: kind plus the trusted `on` predicate text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JoinStep {
    pub kind: JoinKind,
    pub on: String,
}

/// Ordered join steps, built fluently.
///
/// ```ignore
/// let joins = left_outer("o2.master1_id = o1.id").left_outer("o3.detail_id = o2.id");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Joins {
    steps: Vec<JoinStep>,
}

impl Joins {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an inner join step.
    #[must_use]
    pub fn inner(mut self, on: impl Into<String>) -> Self {
        self.steps.push(JoinStep {
            kind: JoinKind::Inner,
            on: on.into(),
        });
        self
    }

    /// Append a left outer join step.
    #[must_use]
    pub fn left_outer(mut self, on: impl Into<String>) -> Self {
        self.steps.push(JoinStep {
            kind: JoinKind::LeftOuter,
            on: on.into(),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[JoinStep] {
        &self.steps
    }
}

/// Joins starting with an inner join step.
pub fn inner(on: impl Into<String>) -> Joins {
    Joins::new().inner(on)
}

/// Joins starting with a left outer join step.
pub fn left_outer(on: impl Into<String>) -> Joins {
    Joins::new().left_outer(on)
}

/// Alias of the template at `index`.
pub fn template_alias(index: usize) -> String {
    format!("o{}", index + 1)
}

fn check_shape(trees: &[&DescriptorTree], joins: &Joins) -> Result<()> {
    if trees.is_empty() {
        return Err(Error::Query("at least one template is required".to_string()));
    }
    if joins.len() != trees.len() - 1 {
        return Err(Error::Query(format!(
            "{} templates need {} join steps, got {}",
            trees.len(),
            trees.len() - 1,
            joins.len()
        )));
    }
    Ok(())
}

/// SELECT spanning every template, with the caller condition appended.
pub fn multi_select_sql(trees: &[&DescriptorTree], joins: &Joins, condition: &str) -> Result<String> {
    check_shape(trees, joins)?;

    let columns: Vec<String> = trees
        .iter()
        .enumerate()
        .flat_map(|(i, tree)| select_columns(tree, &template_alias(i)))
        .collect();

    let first = trees[0];
    let mut sql = format!(
        "select {} from {} {}{}",
        columns.join(", "),
        first.entity().qualified_table_name(),
        template_alias(0),
        mto_joins(first, &template_alias(0))
    );

    for (i, step) in joins.steps().iter().enumerate() {
        let tree = trees[i + 1];
        let alias = template_alias(i + 1);
        let table = tree.entity().qualified_table_name();
        let inner_joins = mto_joins(tree, &alias);
        if inner_joins.is_empty() {
            sql.push_str(&format!(" {} {} {} on {}", step.kind, table, alias, step.on));
        } else {
            sql.push_str(&format!(
                " {} ({} {}{}) on {}",
                step.kind, table, alias, inner_joins, step.on
            ));
        }
    }

    let condition = condition.trim();
    if !condition.is_empty() {
        sql.push(' ');
        sql.push_str(condition);
    }
    tracing::trace!(templates = trees.len(), sql = %sql, "Built multi-entity select");
    Ok(sql)
}

/// Statement cache key for a multi-entity query: `.t1.t2;<kind> <on> ...;<condition>`.
///
/// Depends on the query shape only, never on bound values.
pub fn multi_statement_key(trees: &[&DescriptorTree], joins: &Joins, condition: &str) -> String {
    let mut key = String::new();
    for tree in trees {
        key.push('.');
        key.push_str(&tree.entity().qualified_table_name());
    }
    key.push(';');
    let steps: Vec<String> = joins
        .steps()
        .iter()
        .map(|s| format!("{} {}", s.kind, s.on))
        .collect();
    key.push_str(&steps.join(" "));
    key.push(';');
    key.push_str(condition.trim());
    key
}
