//! Flat, key-indexed view of a workspace's state.
//!
//! Keys are `<module path>.<output name>` and `<module path>.<resource address>`,
//! with module path components joined by `.`.

use std::collections::HashMap;

use serde_json::Value;

use crate::terraform::{Module, ResourceState};

#[derive(Debug, Default, Clone)]
pub struct StateSnapshot {
    outputs: HashMap<String, Value>,
    resources: HashMap<String, ResourceState>,
}

impl StateSnapshot {
    pub fn from_modules(modules: &[Module]) -> Self {
        let mut snapshot = Self::default();
        for module in modules {
            let prefix = module.dotted_path();
            for (name, output) in &module.outputs {
                snapshot
                    .outputs
                    .insert(format!("{prefix}.{name}"), output.value.clone());
            }
            for (address, resource) in &module.resources {
                snapshot
                    .resources
                    .insert(format!("{prefix}.{address}"), resource.clone());
            }
        }
        snapshot
    }

    pub fn output(&self, key: &str) -> Option<&Value> {
        self.outputs.get(key)
    }

    pub fn resource(&self, key: &str) -> Option<&ResourceState> {
        self.resources.get(key)
    }

    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_keys_include_module_path() {
        let modules = vec![
            Module::root()
                .with_output("bucket_backups", json!("tsam.backups"))
                .with_resource(
                    "aws_s3_bucket.backups",
                    "tsam.backups",
                    [("bucket_domain_name", "tsam.backups.s3.amazonaws.com")],
                ),
            Module::new(vec!["root".into(), "child".into(), "grandchild".into()])
                .with_output("greeting", json!({"text": "hi"})),
        ];
        let snapshot = StateSnapshot::from_modules(&modules);

        assert_eq!(snapshot.output_count(), 2);
        assert_eq!(snapshot.resource_count(), 1);
        assert_eq!(
            snapshot.output("root.bucket_backups"),
            Some(&json!("tsam.backups"))
        );
        assert_eq!(
            snapshot.output("root.child.grandchild.greeting"),
            Some(&json!({"text": "hi"}))
        );
        let bucket = snapshot.resource("root.aws_s3_bucket.backups").unwrap();
        assert_eq!(bucket.id, "tsam.backups");
        assert!(snapshot.output("bucket_backups").is_none());
        assert!(snapshot.resource("root.aws_s3_bucket").is_none());
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = StateSnapshot::from_modules(&[]);
        assert!(snapshot.output("root.anything").is_none());
        assert_eq!(snapshot.resource_count(), 0);
    }
}
