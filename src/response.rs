//! Folds flat `a.b.c -> value` items into a nested JSON object.
//!
//! A key whose components require one position to be both a leaf and a
//! branch (`a.b` and `a.b.c`) is rejected, whatever the insertion order.
//! Writing the same key twice keeps the later value.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::RetrieveError;

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Leaf(Value),
    Branch(BTreeMap<String, Node>),
}

impl Node {
    fn into_value(self) -> Value {
        match self {
            Node::Leaf(value) => value,
            Node::Branch(children) => Value::Object(
                children
                    .into_iter()
                    .map(|(key, child)| (key, child.into_value()))
                    .collect::<Map<String, Value>>(),
            ),
        }
    }
}

#[derive(Debug, Default)]
pub struct ResponseTree {
    root: BTreeMap<String, Node>,
}

impl ResponseTree {
    pub fn insert(&mut self, key: &str, value: Value) -> Result<(), RetrieveError> {
        let conflict = || RetrieveError::ResponseConflict(key.to_string());

        let components: Vec<&str> = key.split('.').collect();
        let Some((last, parents)) = components.split_last() else {
            return Err(conflict());
        };

        let mut children = &mut self.root;
        for component in parents {
            let node = children
                .entry(component.to_string())
                .or_insert_with(|| Node::Branch(BTreeMap::new()));
            children = match node {
                Node::Branch(next) => next,
                Node::Leaf(_) => return Err(conflict()),
            };
        }

        match children.get(*last) {
            Some(Node::Branch(_)) => Err(conflict()),
            _ => {
                children.insert(last.to_string(), Node::Leaf(value));
                Ok(())
            }
        }
    }

    pub fn into_value(self) -> Value {
        Node::Branch(self.root).into_value()
    }
}

/// Builds the nested response object from flat items.
pub fn shape<I>(items: I) -> Result<Value, RetrieveError>
where
    I: IntoIterator<Item = (String, Value)>,
{
    let mut tree = ResponseTree::default();
    for (key, value) in items {
        tree.insert(&key, value)?;
    }
    Ok(tree.into_value())
}
