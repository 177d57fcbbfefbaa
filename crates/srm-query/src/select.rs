//! SELECT generation for one entity type and its many-to-one closure.

use srm_core::DescriptorTree;

/// Alias of the root entity in single-entity selects.
pub const ROOT_ALIAS: &str = "o";

/// Column references for every node of `tree`, depth-first, under `root_alias`.
///
/// The order matches the slot layout expected by `srm_core::marshal`.
pub fn select_columns(tree: &DescriptorTree, root_alias: &str) -> Vec<String> {
    let mut columns = Vec::with_capacity(tree.width());
    for (index, node) in tree.nodes().iter().enumerate() {
        let alias = tree.alias(index, root_alias);
        columns.extend(
            node.entity
                .fields
                .iter()
                .filter(|f| f.is_scalar())
                .map(|f| format!("{}.{}", alias, f.name)),
        );
    }
    columns
}

/// Inner joins for every reference in `tree`, each with a leading space.
///
/// `join harness.master1 o_master1 on o_master1.id = o.master1_id`
pub fn mto_joins(tree: &DescriptorTree, root_alias: &str) -> String {
    let mut sql = String::new();
    for (index, node) in tree.nodes().iter().enumerate().skip(1) {
        let (Some(parent), Some(field)) = (node.parent, node.field) else {
            continue;
        };
        let alias = tree.alias(index, root_alias);
        let identity = node.entity.fields[0].name;
        sql.push_str(&format!(
            " join {} {} on {}.{} = {}.{}",
            node.entity.qualified_table_name(),
            alias,
            alias,
            identity,
            tree.alias(parent, root_alias),
            field.column_name()
        ));
    }
    sql
}

/// Full SELECT for the tree's root entity, without a condition.
pub fn select_sql(tree: &DescriptorTree) -> String {
    format!(
        "select {} from {} {}{}",
        select_columns(tree, ROOT_ALIAS).join(", "),
        tree.entity().qualified_table_name(),
        ROOT_ALIAS,
        mto_joins(tree, ROOT_ALIAS)
    )
}

/// Append a caller condition (`where ...`, `order by ...`) to a generated select.
pub fn with_condition(select: &str, condition: &str) -> String {
    let condition = condition.trim();
    if condition.is_empty() {
        select.to_string()
    } else {
        format!("{} {}", select, condition)
    }
}
