//! Editable tree-table model for a condition container.
//!
//! The build side flattens the expression tree into indented, draggable
//! rows; each row carries a hidden own-id and parent-id field plus a weight
//! so a client-side drag only ever edits those three values. The submit
//! side regroups the flat rows by parent id, clones every expression into a
//! brand-new instance and re-attaches the rebuilt tree to the container.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::{debug, trace};
use uuid::Uuid;

use crate::error::RuleError;
use crate::expression::{
    ConditionContainer, ExpressionNode, EXPRESSION_AND, EXPRESSION_CONDITION, EXPRESSION_OR,
};
use crate::manager::PluginManager;

pub const ROUTE_EXPRESSION_ADD: &str = "expression.add";
pub const ROUTE_EXPRESSION_EDIT: &str = "expression.edit";
pub const ROUTE_EXPRESSION_DELETE: &str = "expression.delete";

/// Largest weight offset offered by the row weight selector.
pub const WEIGHT_DELTA: i32 = 50;

/// Css class marking a row's weight field for drag reordering.
pub const WEIGHT_CLASS: &str = "condition-weight";
/// Css class marking a row's hidden parent field.
pub const PARENT_CLASS: &str = "condition-parent";
/// Css class marking a row's hidden own-id field.
pub const ID_CLASS: &str = "condition-id";

/// Value of a row's hidden parent field. The root container is the
/// sentinel `"0"` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParentId {
    Root,
    Expression(Uuid),
}

impl fmt::Display for ParentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParentId::Root => f.write_str("0"),
            ParentId::Expression(uuid) => write!(f, "{uuid}"),
        }
    }
}

impl Serialize for ParentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ParentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if raw == "0" {
            return Ok(ParentId::Root);
        }
        Uuid::parse_str(&raw)
            .map(ParentId::Expression)
            .map_err(D::Error::custom)
    }
}

/// One drag behavior declared on the table, binding a client-side drag
/// implementation to the css classes of the row fields it may edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableDrag {
    pub action: &'static str,
    pub relationship: &'static str,
    pub group: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subgroup: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<&'static str>,
}

/// Per-node operation link (edit / delete).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationLink {
    pub title: &'static str,
    pub route: &'static str,
    pub uuid: Uuid,
}

/// Footer link adding a new expression of the given plugin type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddLink {
    pub title: &'static str,
    pub route: &'static str,
    pub plugin_id: &'static str,
}

/// One draggable table row. `id`, `parent` and `weight` are the only
/// fields a reorder submission changes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    pub id: Uuid,
    pub parent: ParentId,
    /// Indentation level; 0 for direct children of the root container.
    pub depth: usize,
    pub label: String,
    pub weight: i32,
    pub plugin_id: &'static str,
    /// Leaf rows may not receive children when dragged.
    pub leaf: bool,
    pub operations: Vec<OperationLink>,
    /// Css classes on the id / parent / weight fields, the handles the
    /// table's drag declarations bind to.
    pub id_class: &'static str,
    pub parent_class: &'static str,
    pub weight_class: &'static str,
}

/// Flattened, render-ready view of a condition container.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConditionTable {
    pub caption: &'static str,
    pub empty: &'static str,
    pub weight_delta: i32,
    pub tabledrag: Vec<TableDrag>,
    pub rows: Vec<TableRow>,
    pub footer: Vec<AddLink>,
}

/// Submitted values of one row, keyed by the row's own uuid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RowValues {
    pub id: Uuid,
    pub parent: ParentId,
    pub weight: i32,
}

/// Form view structure for a condition container.
pub struct ConditionTableForm<'a> {
    container: &'a ConditionContainer,
}

impl<'a> ConditionTableForm<'a> {
    pub fn new(container: &'a ConditionContainer) -> Self {
        Self { container }
    }

    /// Flatten the container into indented rows, siblings in weight order.
    pub fn build(&self) -> ConditionTable {
        let mut rows = Vec::new();
        for node in sorted_children(self.container) {
            build_row(&mut rows, node, 0, ParentId::Root);
        }

        ConditionTable {
            caption: "Conditions",
            empty: "None",
            weight_delta: WEIGHT_DELTA,
            tabledrag: build_tabledrag(),
            rows,
            footer: build_footer(),
        }
    }
}

/// Drag declarations: re-parenting matches on the parent field sourced from
/// the own-id field, sibling reordering edits the weight field.
fn build_tabledrag() -> Vec<TableDrag> {
    vec![
        TableDrag {
            action: "match",
            relationship: "parent",
            group: PARENT_CLASS,
            subgroup: Some(PARENT_CLASS),
            source: Some(ID_CLASS),
        },
        TableDrag {
            action: "order",
            relationship: "sibling",
            group: WEIGHT_CLASS,
            subgroup: None,
            source: None,
        },
    ]
}

fn sorted_children(container: &ConditionContainer) -> Vec<&ExpressionNode> {
    let mut children: Vec<&ExpressionNode> = container.iter().collect();
    children.sort_by_key(|node| node.weight());
    children
}

fn build_row(rows: &mut Vec<TableRow>, node: &ExpressionNode, depth: usize, parent: ParentId) {
    let uuid = node.uuid();
    rows.push(TableRow {
        id: uuid,
        parent,
        depth,
        label: node.label(),
        weight: node.weight(),
        plugin_id: node.plugin_id(),
        leaf: !node.is_container(),
        operations: vec![
            OperationLink {
                title: "Edit",
                route: ROUTE_EXPRESSION_EDIT,
                uuid,
            },
            OperationLink {
                title: "Delete",
                route: ROUTE_EXPRESSION_DELETE,
                uuid,
            },
        ],
        id_class: ID_CLASS,
        parent_class: PARENT_CLASS,
        weight_class: WEIGHT_CLASS,
    });

    if let ExpressionNode::Container(container) = node {
        for child in sorted_children(container) {
            build_row(rows, child, depth + 1, ParentId::Expression(uuid));
        }
    }
}

fn build_footer() -> Vec<AddLink> {
    vec![
        AddLink {
            title: "Add condition",
            route: ROUTE_EXPRESSION_ADD,
            plugin_id: EXPRESSION_CONDITION,
        },
        AddLink {
            title: "Add AND",
            route: ROUTE_EXPRESSION_ADD,
            plugin_id: EXPRESSION_AND,
        },
        AddLink {
            title: "Add OR",
            route: ROUTE_EXPRESSION_ADD,
            plugin_id: EXPRESSION_OR,
        },
    ]
}

/// Rebuild the container's expression tree from submitted rows.
///
/// Every submitted expression is cloned into a brand-new instance (fresh
/// uuid, submitted weight), the clones are regrouped by parent id into a
/// hierarchy, the new top-level nodes are attached to the container and the
/// original expressions are deleted. An empty submission skips the rebuild
/// entirely.
pub fn submit(
    container: &mut ConditionContainer,
    manager: &PluginManager,
    values: &BTreeMap<Uuid, RowValues>,
) -> Result<(), RuleError> {
    if values.is_empty() {
        trace!("no rows submitted, skipping rebuild");
        return Ok(());
    }

    let mut elements = mirror_elements(container, manager, values)?;

    let mut grouped: BTreeMap<ParentId, Vec<Uuid>> = BTreeMap::new();
    for (uuid, row) in values {
        grouped.entry(row.parent).or_default().push(*uuid);
    }

    let top_level = grouped.get(&ParentId::Root).cloned().unwrap_or_default();
    for uuid in &top_level {
        attach_children(*uuid, &grouped, &mut elements)?;
    }
    for uuid in &top_level {
        let node = elements
            .remove(uuid)
            .ok_or(RuleError::UnknownExpression(*uuid))?;
        container.add_expression_object(node);
    }

    // Rows whose parent chain never reaches the root are dropped.
    for uuid in elements.keys() {
        trace!(row_id = %uuid, "submitted row is unreachable from the root, dropping");
    }

    // The clones carry fresh uuids, so deleting by the submitted ids only
    // removes the original expressions.
    for row in values.values() {
        container.delete_expression(row.id);
    }

    container.sort_by_weight();
    debug!(rows = values.len(), "rebuilt condition tree from submission");
    Ok(())
}

/// Clone every submitted expression into a new instance keyed by its old
/// uuid, discarding the old identity and carrying over the submitted weight.
fn mirror_elements(
    container: &ConditionContainer,
    manager: &PluginManager,
    values: &BTreeMap<Uuid, RowValues>,
) -> Result<HashMap<Uuid, ExpressionNode>, RuleError> {
    let mut elements = HashMap::with_capacity(values.len());
    for (uuid, row) in values {
        let source = container
            .expression(row.id)
            .ok_or(RuleError::UnknownExpression(row.id))?;
        let mut configuration = source.configuration();
        if let Some(config) = configuration.as_object_mut() {
            config.remove("uuid");
            config.insert("weight".to_string(), row.weight.into());
        }
        let clone = manager.create_expression(source.plugin_id(), configuration)?;
        elements.insert(*uuid, clone);
    }
    Ok(elements)
}

/// Attach every mirrored child of `parent` (per the grouping map) to the
/// mirrored parent, depth first.
fn attach_children(
    parent: Uuid,
    grouped: &BTreeMap<ParentId, Vec<Uuid>>,
    elements: &mut HashMap<Uuid, ExpressionNode>,
) -> Result<(), RuleError> {
    // A row id with no entry in the grouping map is a leaf.
    let Some(children) = grouped.get(&ParentId::Expression(parent)) else {
        return Ok(());
    };

    for child in children {
        attach_children(*child, grouped, elements)?;
        let node = elements
            .remove(child)
            .ok_or(RuleError::UnknownExpression(*child))?;
        match elements.get_mut(&parent) {
            Some(ExpressionNode::Container(target)) => target.add_expression_object(node),
            Some(ExpressionNode::Condition(_)) => {
                return Err(RuleError::InvalidArgument(format!(
                    "expression {parent} cannot hold child expressions"
                )));
            }
            None => return Err(RuleError::UnknownExpression(parent)),
        }
    }
    Ok(())
}
