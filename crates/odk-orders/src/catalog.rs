//! Category tree as an id-indexed arena.
//!
//! The catalog is self-referential (a category's parent lives in the same
//! table), so categories are stored in a `BTreeMap` arena keyed by id with
//! parent/children expressed as id references — no embedded ownership, no
//! cycles of `Rc`s. The core mutation never touches categories; this type
//! backs the in-memory store and catalog seeding.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One catalog node. Root categories have `parent_id == None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
}

/// Id-indexed arena of catalog nodes supporting arbitrary nesting depth.
#[derive(Debug, Clone, Default)]
pub struct CategoryArena {
    nodes: BTreeMap<i64, Category>,
}

impl CategoryArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a category. Fails if the id is taken or the parent is unknown.
    pub fn insert(&mut self, category: Category) -> Result<(), String> {
        if self.nodes.contains_key(&category.id) {
            return Err(format!("category id {} already exists", category.id));
        }
        if let Some(parent_id) = category.parent_id {
            if !self.nodes.contains_key(&parent_id) {
                return Err(format!(
                    "parent category {parent_id} not found for category {}",
                    category.id
                ));
            }
        }
        self.nodes.insert(category.id, category);
        Ok(())
    }

    pub fn get(&self, id: i64) -> Option<&Category> {
        self.nodes.get(&id)
    }

    pub fn parent_of(&self, id: i64) -> Option<&Category> {
        let parent_id = self.nodes.get(&id)?.parent_id?;
        self.nodes.get(&parent_id)
    }

    /// First-level children of `id`, in id order.
    pub fn children_of(&self, id: i64) -> Vec<&Category> {
        self.nodes
            .values()
            .filter(|c| c.parent_id == Some(id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cat(id: i64, name: &str, parent_id: Option<i64>) -> Category {
        Category {
            id,
            name: name.to_string(),
            parent_id,
        }
    }

    #[test]
    fn nested_tree_resolves_parents_and_children() {
        let mut arena = CategoryArena::new();
        arena.insert(cat(1, "electronics", None)).unwrap();
        arena.insert(cat(2, "laptops", Some(1))).unwrap();
        arena.insert(cat(3, "phones", Some(1))).unwrap();
        arena.insert(cat(4, "ultrabooks", Some(2))).unwrap();

        assert_eq!(arena.parent_of(4).unwrap().id, 2);
        assert_eq!(arena.parent_of(2).unwrap().id, 1);
        assert!(arena.parent_of(1).is_none());

        let first_level: Vec<i64> = arena.children_of(1).iter().map(|c| c.id).collect();
        assert_eq!(first_level, vec![2, 3]);
        assert_eq!(arena.children_of(4).len(), 0);
    }

    #[test]
    fn insert_rejects_duplicate_id_and_missing_parent() {
        let mut arena = CategoryArena::new();
        arena.insert(cat(1, "root", None)).unwrap();

        assert!(arena.insert(cat(1, "dup", None)).is_err());
        assert!(arena.insert(cat(9, "orphan", Some(777))).is_err());
        assert_eq!(arena.len(), 1);
    }
}
