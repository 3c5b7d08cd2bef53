use std::sync::Arc;

use crate::names::apply_replacements;
use crate::sheet::{
    EquipmentModifierNode, EquipmentNode, SkillNode, SpellNode, TraitModifierNode, TraitNode,
};

/// Shared shape of the sheet's hierarchical lists.
pub trait TreeNode: Sized {
    fn node_id(&self) -> &str;
    fn children(&self) -> &[Arc<Self>];
    fn container_flag(&self) -> bool;
    fn raw_name(&self) -> &str;
    fn tags(&self) -> &[String];
    fn replacements(&self) -> &std::collections::BTreeMap<String, String>;

    fn is_enabled(&self) -> bool {
        true
    }

    fn is_container(&self) -> bool {
        self.container_flag() || !self.children().is_empty()
    }

    fn name_with_replacements(&self) -> String {
        apply_replacements(self.raw_name(), self.replacements())
    }
}

/// Visits nodes depth first until `visit` returns true. Disabled nodes and everything below
/// them are skipped when `only_enabled` is set; containers are still descended into when
/// `exclude_containers` hides them from `visit`.
pub fn traverse<T: TreeNode>(
    nodes: &[Arc<T>],
    only_enabled: bool,
    exclude_containers: bool,
    visit: &mut dyn FnMut(&Arc<T>) -> bool,
) -> bool {
    for node in nodes {
        if only_enabled && !node.is_enabled() {
            continue;
        }
        if !(exclude_containers && node.is_container()) && visit(node) {
            return true;
        }
        if traverse(node.children(), only_enabled, exclude_containers, visit) {
            return true;
        }
    }
    false
}

pub fn collect<T: TreeNode>(
    nodes: &[Arc<T>],
    only_enabled: bool,
    exclude_containers: bool,
    mut keep: impl FnMut(&Arc<T>) -> bool,
) -> Vec<Arc<T>> {
    let mut found = Vec::new();
    traverse(nodes, only_enabled, exclude_containers, &mut |node| {
        if keep(node) {
            found.push(Arc::clone(node));
        }
        false
    });
    found
}

pub fn find_by_id<T: TreeNode>(nodes: &[Arc<T>], id: &str) -> Option<Arc<T>> {
    let mut found = None;
    traverse(nodes, false, false, &mut |node| {
        if node.node_id() == id {
            found = Some(Arc::clone(node));
            return true;
        }
        false
    });
    found
}

/// Finds the container holding the node with `id`.
pub fn find_parent<T: TreeNode>(nodes: &[Arc<T>], id: &str) -> Option<Arc<T>> {
    for node in nodes {
        if node.children().iter().any(|child| child.node_id() == id) {
            return Some(Arc::clone(node));
        }
        if let Some(parent) = find_parent(node.children(), id) {
            return Some(parent);
        }
    }
    None
}

macro_rules! tree_node {
    ($node:ty) => {
        tree_node!($node, |_node: &$node| true);
    };
    ($node:ty, $enabled:expr) => {
        impl TreeNode for $node {
            fn node_id(&self) -> &str {
                &self.id
            }

            fn children(&self) -> &[Arc<Self>] {
                &self.children
            }

            fn container_flag(&self) -> bool {
                self.container
            }

            fn raw_name(&self) -> &str {
                &self.name
            }

            fn tags(&self) -> &[String] {
                &self.tags
            }

            fn replacements(&self) -> &std::collections::BTreeMap<String, String> {
                &self.replacements
            }

            fn is_enabled(&self) -> bool {
                let enabled: fn(&$node) -> bool = $enabled;
                enabled(self)
            }
        }
    };
}

tree_node!(TraitNode, |node: &TraitNode| !node.disabled);
tree_node!(TraitModifierNode, |node: &TraitModifierNode| !node.disabled);
tree_node!(SkillNode);
tree_node!(SpellNode);
tree_node!(EquipmentNode, |node: &EquipmentNode| node.equipped);
tree_node!(EquipmentModifierNode, |node: &EquipmentModifierNode| !node.disabled);

#[cfg(test)]
mod tree_tests {
    use super::*;

    fn trait_node(id: &str, disabled: bool, children: Vec<Arc<TraitNode>>) -> Arc<TraitNode> {
        Arc::new(TraitNode {
            id: id.to_string(),
            name: id.to_uppercase(),
            disabled,
            children,
            ..TraitNode::default()
        })
    }

    #[test]
    fn traversal_respects_enabled_and_container_filters() {
        let roots = vec![
            trait_node("a", false, vec![trait_node("b", false, vec![]), trait_node("c", true, vec![])]),
            trait_node("d", true, vec![trait_node("e", false, vec![])]),
        ];

        let ids = |only_enabled, exclude_containers| {
            collect(&roots, only_enabled, exclude_containers, |_| true)
                .iter()
                .map(|node| node.id.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(ids(false, false), vec!["a", "b", "c", "d", "e"]);
        assert_eq!(ids(true, false), vec!["a", "b"]);
        assert_eq!(ids(true, true), vec!["b"]);
        assert_eq!(ids(false, true), vec!["b", "c", "e"]);
    }

    #[test]
    fn parents_are_found_by_child_id() {
        let roots = vec![trait_node("a", false, vec![trait_node("b", false, vec![trait_node("c", false, vec![])])])];
        assert_eq!(find_parent(&roots, "c").map(|node| node.id.clone()).as_deref(), Some("b"));
        assert_eq!(find_parent(&roots, "b").map(|node| node.id.clone()).as_deref(), Some("a"));
        assert!(find_parent(&roots, "a").is_none());
        assert_eq!(find_by_id(&roots, "c").map(|node| node.name.clone()).as_deref(), Some("C"));
        assert!(find_by_id(&roots, "z").is_none());
    }
}
