use std::collections::{HashMap, HashSet};

use serde::Serialize;
use thiserror::Error;

use crate::models::{PackingContainer, Prop};
use crate::services::weight::{self, WeightSummary};

#[derive(Debug, Error)]
pub enum TreeError {
    #[error("container {0} not found")]
    ContainerNotFound(String),
    #[error("parent container {0} not found")]
    ParentNotFound(String),
    #[error("container {container_id} cannot be moved under {new_parent_id}: a container may not become its own descendant")]
    WouldCycle {
        container_id: String,
        new_parent_id: String,
    },
    #[error("container {0} is part of a parent cycle")]
    ParentCycle(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct ContainerNode {
    #[serde(flatten)]
    pub container: PackingContainer,
    /// Depth in the hierarchy, 0 for top-level containers.
    pub level: u32,
    pub prop_count: u32,
    pub total_weight: WeightSummary,
    pub children: Vec<ContainerNode>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContainerTree {
    pub nodes: Vec<ContainerNode>,
}

impl ContainerTree {
    /// Assembles the nested view from the flat containers array. Containers
    /// whose parent is missing, and containers stuck in a parent cycle that no
    /// root can reach, are promoted to top level so no container is ever
    /// dropped from the view.
    pub fn build(containers: &[PackingContainer], props: &HashMap<String, Prop>) -> ContainerTree {
        let ids: HashSet<&str> = containers.iter().map(|c| c.id.as_str()).collect();

        let mut children: HashMap<&str, Vec<&PackingContainer>> = HashMap::new();
        let mut roots: Vec<&PackingContainer> = Vec::new();
        for container in containers {
            let parent = container
                .parent_id
                .as_deref()
                .filter(|p| *p != container.id && ids.contains(p));
            match parent {
                Some(parent_id) => children.entry(parent_id).or_default().push(container),
                None => roots.push(container),
            }
        }

        let mut visited: HashSet<String> = HashSet::new();
        let mut nodes = Vec::with_capacity(roots.len());
        for root in roots {
            nodes.push(Self::attach(root, 0, &children, &mut visited, props));
        }
        for container in containers {
            if !visited.contains(container.id.as_str()) {
                nodes.push(Self::attach(container, 0, &children, &mut visited, props));
            }
        }

        ContainerTree { nodes }
    }

    fn attach(
        container: &PackingContainer,
        level: u32,
        children: &HashMap<&str, Vec<&PackingContainer>>,
        visited: &mut HashSet<String>,
        props: &HashMap<String, Prop>,
    ) -> ContainerNode {
        visited.insert(container.id.clone());

        let mut child_nodes = Vec::new();
        if let Some(kids) = children.get(container.id.as_str()) {
            for kid in kids {
                if !visited.contains(kid.id.as_str()) {
                    child_nodes.push(Self::attach(kid, level + 1, children, visited, props));
                }
            }
        }

        ContainerNode {
            container: container.clone(),
            level,
            prop_count: container.prop_count(),
            total_weight: weight::container_weight(container, props),
            children: child_nodes,
        }
    }

    /// Pre-order walk back to a flat array. Rebuilding the tree from the
    /// result yields the same hierarchy.
    pub fn flatten(&self) -> Vec<PackingContainer> {
        let mut flat = Vec::new();
        for node in &self.nodes {
            Self::collect(node, &mut flat);
        }
        flat
    }

    fn collect(node: &ContainerNode, flat: &mut Vec<PackingContainer>) {
        flat.push(node.container.clone());
        for child in &node.children {
            Self::collect(child, flat);
        }
    }
}

/// Checks that re-parenting `container_id` under `new_parent_id` keeps the
/// hierarchy acyclic. The ancestor walk is bounded by the container count so
/// a document that already contains a cycle cannot hang it.
pub fn validate_reparent(
    containers: &[PackingContainer],
    container_id: &str,
    new_parent_id: Option<&str>,
) -> Result<(), TreeError> {
    let by_id: HashMap<&str, &PackingContainer> =
        containers.iter().map(|c| (c.id.as_str(), c)).collect();

    if !by_id.contains_key(container_id) {
        return Err(TreeError::ContainerNotFound(container_id.to_string()));
    }
    let Some(target) = new_parent_id else {
        return Ok(());
    };
    if !by_id.contains_key(target) {
        return Err(TreeError::ParentNotFound(target.to_string()));
    }
    if target == container_id {
        return Err(TreeError::WouldCycle {
            container_id: container_id.to_string(),
            new_parent_id: target.to_string(),
        });
    }

    let mut hops = 0;
    let mut ancestor = by_id.get(target).and_then(|c| c.parent_id.as_deref());
    while let Some(current) = ancestor {
        if current == container_id {
            return Err(TreeError::WouldCycle {
                container_id: container_id.to_string(),
                new_parent_id: target.to_string(),
            });
        }
        hops += 1;
        if hops > containers.len() {
            break;
        }
        ancestor = by_id.get(current).and_then(|c| c.parent_id.as_deref());
    }

    Ok(())
}

/// Checks a whole submitted containers array for parent cycles. Parents
/// missing from the array are allowed (they surface as roots when the tree
/// is rendered), but a parent chain that loops back on itself is rejected.
pub fn validate_forest(containers: &[PackingContainer]) -> Result<(), TreeError> {
    let by_id: HashMap<&str, &PackingContainer> =
        containers.iter().map(|c| (c.id.as_str(), c)).collect();

    for container in containers {
        let mut hops = 0;
        let mut ancestor = container.parent_id.as_deref();
        while let Some(current) = ancestor {
            if current == container.id {
                return Err(TreeError::ParentCycle(container.id.clone()));
            }
            hops += 1;
            if hops > containers.len() {
                break;
            }
            ancestor = by_id.get(current).and_then(|c| c.parent_id.as_deref());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::models::ContainerStatus;

    fn container(id: &str, parent_id: Option<&str>) -> PackingContainer {
        PackingContainer {
            id: id.to_string(),
            parent_id: parent_id.map(str::to_string),
            name: id.to_uppercase(),
            container_type: None,
            description: None,
            location: None,
            dimensions: None,
            max_weight: None,
            props: vec![],
            labels: vec![],
            status: ContainerStatus::Empty,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            created_by: None,
            updated_by: None,
        }
    }

    fn no_props() -> HashMap<String, Prop> {
        HashMap::new()
    }

    #[test]
    fn nests_children_under_parents_with_levels() {
        let containers = vec![
            container("truck", None),
            container("case", Some("truck")),
            container("tray", Some("case")),
            container("hamper", None),
        ];

        let tree = ContainerTree::build(&containers, &no_props());

        assert_eq!(tree.nodes.len(), 2);
        let truck = &tree.nodes[0];
        assert_eq!(truck.container.id, "truck");
        assert_eq!(truck.level, 0);
        assert_eq!(truck.children.len(), 1);
        let case = &truck.children[0];
        assert_eq!(case.container.id, "case");
        assert_eq!(case.level, 1);
        assert_eq!(case.children[0].container.id, "tray");
        assert_eq!(case.children[0].level, 2);
        assert_eq!(tree.nodes[1].container.id, "hamper");
    }

    #[test]
    fn children_keep_array_order() {
        let containers = vec![
            container("case", None),
            container("tray_b", Some("case")),
            container("tray_a", Some("case")),
        ];

        let tree = ContainerTree::build(&containers, &no_props());
        let order: Vec<&str> = tree.nodes[0]
            .children
            .iter()
            .map(|n| n.container.id.as_str())
            .collect();
        assert_eq!(order, vec!["tray_b", "tray_a"]);
    }

    #[test]
    fn dangling_parent_promotes_to_root() {
        let containers = vec![container("orphan", Some("gone"))];

        let tree = ContainerTree::build(&containers, &no_props());
        assert_eq!(tree.nodes.len(), 1);
        assert_eq!(tree.nodes[0].level, 0);
        // The stored parent reference is preserved even though it dangles.
        assert_eq!(tree.nodes[0].container.parent_id.as_deref(), Some("gone"));
    }

    #[test]
    fn self_parent_promotes_to_root() {
        let containers = vec![container("loop", Some("loop"))];

        let tree = ContainerTree::build(&containers, &no_props());
        assert_eq!(tree.nodes.len(), 1);
        assert!(tree.nodes[0].children.is_empty());
    }

    #[test]
    fn parent_cycle_keeps_every_container() {
        let containers = vec![
            container("a", Some("b")),
            container("b", Some("a")),
            container("solo", None),
        ];

        let tree = ContainerTree::build(&containers, &no_props());
        let flat = tree.flatten();
        let mut ids: Vec<&str> = flat.iter().map(|c| c.id.as_str()).collect();
        ids.sort();
        assert_eq!(ids, vec!["a", "b", "solo"]);
    }

    #[test]
    fn flatten_round_trips_parent_links() {
        let containers = vec![
            container("truck", None),
            container("case", Some("truck")),
            container("tray", Some("case")),
            container("hamper", None),
        ];

        let flat = ContainerTree::build(&containers, &no_props()).flatten();

        assert_eq!(flat.len(), containers.len());
        for original in &containers {
            let round_tripped = flat
                .iter()
                .find(|c| c.id == original.id)
                .unwrap_or_else(|| panic!("{} missing after flatten", original.id));
            assert_eq!(round_tripped.parent_id, original.parent_id);
        }
    }

    #[test]
    fn reparent_to_own_descendant_is_rejected() {
        let containers = vec![
            container("a", None),
            container("b", Some("a")),
            container("c", Some("b")),
        ];

        let err = validate_reparent(&containers, "a", Some("c")).unwrap_err();
        assert!(matches!(err, TreeError::WouldCycle { .. }));

        let err = validate_reparent(&containers, "a", Some("a")).unwrap_err();
        assert!(matches!(err, TreeError::WouldCycle { .. }));
    }

    #[test]
    fn reparent_to_sibling_or_root_is_allowed() {
        let containers = vec![
            container("a", None),
            container("b", Some("a")),
            container("c", Some("a")),
        ];

        assert!(validate_reparent(&containers, "b", Some("c")).is_ok());
        assert!(validate_reparent(&containers, "b", None).is_ok());
    }

    #[test]
    fn reparent_under_missing_parent_is_rejected() {
        let containers = vec![container("a", None)];

        let err = validate_reparent(&containers, "a", Some("ghost")).unwrap_err();
        assert!(matches!(err, TreeError::ParentNotFound(_)));

        let err = validate_reparent(&containers, "ghost", None).unwrap_err();
        assert!(matches!(err, TreeError::ContainerNotFound(_)));
    }

    #[test]
    fn forest_with_parent_cycle_is_rejected() {
        let containers = vec![
            container("a", Some("b")),
            container("b", Some("a")),
            container("solo", None),
        ];
        let err = validate_forest(&containers).unwrap_err();
        assert!(matches!(err, TreeError::ParentCycle(_)));

        let looped = vec![container("loop", Some("loop"))];
        let err = validate_forest(&looped).unwrap_err();
        assert!(matches!(err, TreeError::ParentCycle(_)));
    }

    #[test]
    fn forest_allows_nesting_and_dangling_parents() {
        let containers = vec![
            container("truck", None),
            container("case", Some("truck")),
            container("tray", Some("case")),
            container("orphan", Some("gone")),
        ];
        assert!(validate_forest(&containers).is_ok());
        assert!(validate_forest(&[]).is_ok());
    }
}
