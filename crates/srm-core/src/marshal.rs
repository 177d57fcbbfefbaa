//! Rebuilding nested records from flat result rows.
//!
//! Slots arrive in SELECT order: for every node its scalar columns in declared order,
//! then each reference child depth-first. A node whose identity slot is null (an outer
//! joined branch with no match) is skipped by its precomputed width.

use crate::entity::{Record, Slot};
use crate::error::{Error, Result};
use crate::tree::DescriptorTree;
use crate::value::Value;

/// Read the record rooted at `node`, starting at `offset`.
///
/// Returns the record (or `None` when the identity slot is null) and the offset just
/// past this node's slots.
pub fn read_record(
    tree: &DescriptorTree,
    node: usize,
    slots: &[Value],
    offset: usize,
) -> Result<(Option<Record>, usize)> {
    let current = tree.node(node);
    let end = offset + current.width;
    if slots.len() < end {
        return Err(Error::Scan(format!(
            "{} needs {} slots at offset {}, row has {}",
            current.entity.name,
            current.width,
            offset,
            slots.len()
        )));
    }

    match &slots[offset] {
        Value::Null => return Ok((None, end)),
        id if id.as_i64().is_none() => {
            return Err(Error::Scan(format!(
                "{} identity slot holds {}",
                current.entity.name,
                id.type_name()
            )));
        }
        _ => {}
    }

    let fields = current.entity.fields;
    let mut out: Vec<Slot> = Vec::with_capacity(fields.len());
    let mut cursor = offset;
    for field in fields {
        if field.is_scalar() {
            out.push(Slot::Value(slots[cursor].clone()));
            cursor += 1;
        } else {
            out.push(Slot::Absent);
        }
    }

    for &child in &current.children {
        let (record, next) = read_record(tree, child, slots, cursor)?;
        if let (Some(record), Some(index)) = (record, tree.node(child).field_index) {
            out[index] = Slot::Entity(record);
        }
        cursor = next;
    }

    debug_assert_eq!(cursor, end);
    Ok((Some(Record::new(current.entity.name, out)), end))
}

/// Read a whole row for a single tree.
pub fn read_row(tree: &DescriptorTree, slots: &[Value]) -> Result<Option<Record>> {
    read_record(tree, 0, slots, 0).map(|(record, _)| record)
}

/// Read one row holding several trees side by side, as produced by a multi-entity join.
pub fn read_templates(trees: &[&DescriptorTree], slots: &[Value]) -> Result<Vec<Option<Record>>> {
    let mut offset = 0;
    let mut records = Vec::with_capacity(trees.len());
    for tree in trees {
        let (record, next) = read_record(tree, 0, slots, offset)?;
        records.push(record);
        offset = next;
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{EntityDescriptor, FieldDef};
    use crate::types::SqlType;

    static MASTER: EntityDescriptor = EntityDescriptor::new(
        "Master1",
        None,
        &[
            FieldDef::scalar("id", SqlType::BigInt),
            FieldDef::scalar("name", SqlType::Varchar),
        ],
    );
    fn master() -> &'static EntityDescriptor {
        &MASTER
    }

    static DETAIL: EntityDescriptor = EntityDescriptor::new(
        "Detail",
        None,
        &[
            FieldDef::scalar("id", SqlType::BigInt),
            FieldDef::reference("master1", master),
            FieldDef::scalar("name", SqlType::Varchar),
        ],
    );

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    #[test]
    fn test_nested_record_places_child_at_field_position() {
        let tree = DescriptorTree::build(&DETAIL).unwrap();
        let row = vec![Value::BigInt(7), text("D"), Value::BigInt(1), text("A")];
        let record = read_row(&tree, &row).unwrap().unwrap();
        assert_eq!(record.id(), Some(7));
        let slots = record.slots();
        assert_eq!(slots[2], Slot::Value(text("D")));
        match &slots[1] {
            Slot::Entity(master) => {
                assert_eq!(master.entity(), "Master1");
                assert_eq!(master.id(), Some(1));
            }
            other => panic!("expected nested master, got {other:?}"),
        }
    }

    #[test]
    fn test_null_subtree_is_skipped_by_width() {
        let master_tree = DescriptorTree::build(&MASTER).unwrap();
        let detail_tree = DescriptorTree::build(&DETAIL).unwrap();
        // Master1 present, Detail group absent, trailing Master1 present.
        let row = vec![
            Value::BigInt(1),
            text("A"),
            Value::Null,
            Value::Null,
            Value::Null,
            Value::Null,
            Value::BigInt(2),
            text("B"),
        ];
        let records =
            read_templates(&[&master_tree, &detail_tree, &master_tree], &row).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].as_ref().and_then(Record::id), Some(1));
        assert!(records[1].is_none());
        let last = records[2].as_ref().unwrap();
        assert_eq!(last.id(), Some(2));
        assert_eq!(last.slots()[1], Slot::Value(text("B")));
    }

    #[test]
    fn test_short_row_is_scan_error() {
        let tree = DescriptorTree::build(&DETAIL).unwrap();
        let row = vec![Value::BigInt(7), text("D")];
        assert!(matches!(read_row(&tree, &row), Err(Error::Scan(_))));
    }

    #[test]
    fn test_non_integer_identity_is_scan_error() {
        let tree = DescriptorTree::build(&MASTER).unwrap();
        let row = vec![text("seven"), text("A")];
        assert!(matches!(read_row(&tree, &row), Err(Error::Scan(_))));
    }
}
