//! INSERT, UPDATE and DELETE for a single entity.
//!
//! The SQL text depends only on the entity type, so the transaction layer memoises it
//! per type. The builders pair that text with the parameter values of one instance.

use std::marker::PhantomData;

use srm_core::{Entity, EntityDescriptor, Value};

fn placeholders(range: std::ops::RangeInclusive<usize>) -> Vec<String> {
    range.map(|i| format!("${i}")).collect()
}

fn identity_column(desc: &EntityDescriptor) -> &'static str {
    desc.identity().map_or("id", |f| f.name)
}

/// `insert into <table> (id, <f1>, <ref>_id, ...) values ($1, $2, ...)`
pub fn insert_sql(desc: &EntityDescriptor) -> String {
    let columns: Vec<String> = desc.fields.iter().map(|f| f.column_name()).collect();
    format!(
        "insert into {} ({}) values ({})",
        desc.qualified_table_name(),
        columns.join(", "),
        placeholders(1..=columns.len()).join(", ")
    )
}

/// `update <table> set <f1> = $1, ... where id = $N`, identity bound last.
///
/// An identity-only entity has nothing to set; callers skip the statement.
pub fn update_sql(desc: &EntityDescriptor) -> String {
    let assignments: Vec<String> = desc
        .mutable_fields()
        .iter()
        .enumerate()
        .map(|(i, f)| format!("{} = ${}", f.column_name(), i + 1))
        .collect();
    format!(
        "update {} set {} where {} = ${}",
        desc.qualified_table_name(),
        assignments.join(", "),
        identity_column(desc),
        assignments.len() + 1
    )
}

/// `delete from <table> where id = $1`
pub fn delete_sql(desc: &EntityDescriptor) -> String {
    format!(
        "delete from {} where {} = $1",
        desc.qualified_table_name(),
        identity_column(desc)
    )
}

/// INSERT for one entity instance.
///
/// The identity must already be assigned; the store never generates it.
#[derive(Debug)]
pub struct InsertBuilder<'a, E: Entity> {
    entity: &'a E,
}

impl<'a, E: Entity> InsertBuilder<'a, E> {
    pub fn new(entity: &'a E) -> Self {
        Self { entity }
    }

    /// Parameters in declared field order, identity first.
    pub fn params(&self) -> Vec<Value> {
        self.entity.to_values()
    }

    pub fn build(&self) -> (String, Vec<Value>) {
        (insert_sql(E::descriptor()), self.params())
    }
}

/// UPDATE of every non-identity field, keyed by identity.
#[derive(Debug)]
pub struct UpdateBuilder<'a, E: Entity> {
    entity: &'a E,
}

impl<'a, E: Entity> UpdateBuilder<'a, E> {
    pub fn new(entity: &'a E) -> Self {
        Self { entity }
    }

    /// Non-identity values in declared order, then the identity.
    pub fn params(&self) -> Vec<Value> {
        let mut values = self.entity.to_values();
        if !values.is_empty() {
            let id = values.remove(0);
            values.push(id);
        }
        values
    }

    pub fn build(&self) -> (String, Vec<Value>) {
        (update_sql(E::descriptor()), self.params())
    }
}

/// DELETE by identity.
#[derive(Debug)]
pub struct DeleteBuilder<'a, E: Entity> {
    id: i64,
    _entity: PhantomData<&'a E>,
}

impl<'a, E: Entity> DeleteBuilder<'a, E> {
    pub fn from_entity(entity: &'a E) -> Self {
        Self::by_id(entity.id())
    }

    pub fn by_id(id: i64) -> Self {
        Self {
            id,
            _entity: PhantomData,
        }
    }

    pub fn params(&self) -> Vec<Value> {
        vec![Value::BigInt(self.id)]
    }

    pub fn build(&self) -> (String, Vec<Value>) {
        (delete_sql(E::descriptor()), self.params())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use srm_core::Decimal;
    use srm_macros::Entity;

    #[derive(Entity, Debug, Clone, Default)]
    struct Master1 {
        #[srm(schema = "harness")]
        id: i64,
        name: String,
    }

    #[derive(Entity, Debug, Clone, Default)]
    struct Detail {
        #[srm(schema = "harness")]
        id: i64,
        master1: Master1,
        #[srm(precision = "10,2")]
        amount: Decimal,
        name: String,
    }

    fn detail() -> Detail {
        Detail {
            id: 9,
            master1: Master1 {
                id: 1,
                name: "A".to_string(),
            },
            amount: Decimal::new("12.50"),
            name: "D".to_string(),
        }
    }

    #[test]
    fn test_insert() {
        let d = detail();
        let (sql, params) = InsertBuilder::new(&d).build();
        assert_eq!(
            sql,
            "insert into harness.detail (id, master1_id, amount, name) values ($1, $2, $3, $4)"
        );
        assert_eq!(
            params,
            vec![
                Value::BigInt(9),
                Value::BigInt(1),
                Value::Decimal("12.50".to_string()),
                Value::Text("D".to_string()),
            ]
        );
    }

    #[test]
    fn test_update_binds_identity_last() {
        let d = detail();
        let (sql, params) = UpdateBuilder::new(&d).build();
        assert_eq!(
            sql,
            "update harness.detail set master1_id = $1, amount = $2, name = $3 where id = $4"
        );
        assert_eq!(params.len(), 4);
        assert_eq!(params[0], Value::BigInt(1));
        assert_eq!(params[3], Value::BigInt(9));
    }

    #[test]
    fn test_delete() {
        let d = detail();
        let (sql, params) = DeleteBuilder::from_entity(&d).build();
        assert_eq!(sql, "delete from harness.detail where id = $1");
        assert_eq!(params, vec![Value::BigInt(9)]);
        assert_eq!(
            DeleteBuilder::<Master1>::by_id(3).build().0,
            "delete from harness.master1 where id = $1"
        );
    }
}
