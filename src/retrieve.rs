//! Resolves validated retrieves against a state snapshot.

use indexmap::IndexMap;
use serde_json::Value;

use crate::arguments::Retrieve;
use crate::error::RetrieveError;
use crate::lookup::Lookup;
use crate::snapshot::StateSnapshot;

const ROOT_PREFIX: &str = "root.";

/// Flat `dotted.key -> value` results in retrieve order.
pub type ResponseItems = IndexMap<String, Value>;

/// Looks up every retrieve in order. With `require_all` the first miss is
/// returned as an error; otherwise misses are skipped.
pub fn retrieve_all(
    snapshot: &StateSnapshot,
    retrieves: &[Retrieve],
    require_all: bool,
) -> Result<ResponseItems, RetrieveError> {
    let mut items = ResponseItems::new();

    for retrieve in retrieves {
        let lookup_key = format!("{}.{}", retrieve.module_path, retrieve.lookup.target());
        let response_key = strip_root(&lookup_key);

        match &retrieve.lookup {
            Lookup::Output { .. } => match snapshot.output(&lookup_key) {
                Some(value) => {
                    items.insert(response_key.to_string(), value.clone());
                }
                None if require_all => return Err(RetrieveError::OutputNotFound(lookup_key)),
                None => tracing::debug!(key = %lookup_key, "output not found, skipping"),
            },
            Lookup::ResourceAttr { attribute, .. } => {
                let Some(resource) = snapshot.resource(&lookup_key) else {
                    if require_all {
                        return Err(RetrieveError::ResourceNotFound(lookup_key));
                    }
                    tracing::debug!(key = %lookup_key, "resource not found, skipping");
                    continue;
                };
                match resource.attributes.get(attribute) {
                    Some(value) => {
                        items.insert(
                            format!("{response_key}.{attribute}"),
                            Value::String(value.clone()),
                        );
                    }
                    None if require_all => {
                        return Err(RetrieveError::AttributeNotFound(attribute.clone()));
                    }
                    None => tracing::debug!(
                        key = %lookup_key,
                        attribute = %attribute,
                        "resource attribute not found, skipping"
                    ),
                }
            }
        }
    }

    Ok(items)
}

fn strip_root(key: &str) -> &str {
    key.strip_prefix(ROOT_PREFIX).unwrap_or(key)
}
