//! Descriptor trees: an entity type expanded with all of its many-to-one references.
//!
//! Nodes are stored in pre-order in a flat arena, so the column list of a SELECT and the
//! slot layout of its result rows can both be derived by walking `nodes()` in order of
//! `children`. Every node knows its slot width, which lets the marshaller skip a null
//! branch without looking at its contents.

use crate::error::{Error, Result};
use crate::schema::{EntityDescriptor, FieldDef};

/// One entity occurrence in a descriptor tree.
#[derive(Debug, Clone)]
pub struct TreeNode {
    /// Descriptor of the entity at this position.
    pub entity: &'static EntityDescriptor,
    /// Arena index of the parent node; `None` for the root.
    pub parent: Option<usize>,
    /// Reference field in the parent that leads here.
    pub field: Option<&'static FieldDef>,
    /// Position of that field in the parent's declared fields.
    pub field_index: Option<usize>,
    /// Alias suffix appended to the root alias, e.g. `_detail_master1`.
    pub suffix: String,
    /// Arena indices of the reference children, in declared order.
    pub children: Vec<usize>,
    /// Result slots consumed by this node and all of its descendants.
    pub width: usize,
}

impl TreeNode {
    /// Number of scalar columns of this node alone, identity included.
    pub fn scalar_count(&self) -> usize {
        self.entity.fields.iter().filter(|f| f.is_scalar()).count()
    }
}

/// An entity type and its reference closure, laid out as an arena.
#[derive(Debug, Clone)]
pub struct DescriptorTree {
    nodes: Vec<TreeNode>,
}

impl DescriptorTree {
    /// Expand `root`, validating every reachable descriptor and rejecting cycles.
    pub fn build(root: &'static EntityDescriptor) -> Result<Self> {
        let mut nodes = Vec::new();
        let mut path = Vec::new();
        add_node(&mut nodes, &mut path, root, None, None, String::new())?;
        Ok(Self { nodes })
    }

    pub fn root(&self) -> &TreeNode {
        &self.nodes[0]
    }

    pub fn node(&self, index: usize) -> &TreeNode {
        &self.nodes[index]
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    /// Descriptor of the root entity.
    pub fn entity(&self) -> &'static EntityDescriptor {
        self.root().entity
    }

    /// Slot width of the whole tree.
    pub fn width(&self) -> usize {
        self.root().width
    }

    /// SQL alias of a node under the given root alias.
    pub fn alias(&self, index: usize, root_alias: &str) -> String {
        format!("{}{}", root_alias, self.nodes[index].suffix)
    }
}

fn add_node(
    nodes: &mut Vec<TreeNode>,
    path: &mut Vec<&'static str>,
    entity: &'static EntityDescriptor,
    parent: Option<usize>,
    via: Option<(usize, &'static FieldDef)>,
    suffix: String,
) -> Result<usize> {
    if path.contains(&entity.name) {
        return Err(Error::Schema(format!(
            "reference cycle: {} -> {}",
            path.join(" -> "),
            entity.name
        )));
    }
    entity.validate()?;

    let index = nodes.len();
    nodes.push(TreeNode {
        entity,
        parent,
        field: via.map(|(_, f)| f),
        field_index: via.map(|(i, _)| i),
        suffix: suffix.clone(),
        children: Vec::new(),
        width: 0,
    });
    path.push(entity.name);

    let mut width = nodes[index].scalar_count();
    for (field_index, field) in entity.fields.iter().enumerate() {
        let Some(target) = field.referenced() else {
            continue;
        };
        let child_suffix = format!("{}_{}", suffix, field.name);
        let child = add_node(
            nodes,
            path,
            target,
            Some(index),
            Some((field_index, field)),
            child_suffix,
        )?;
        width += nodes[child].width;
        nodes[index].children.push(child);
    }

    path.pop();
    nodes[index].width = width;
    Ok(index)
}
