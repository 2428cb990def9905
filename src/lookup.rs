//! Lookup expressions accepted in the `retrieve` field.
//!
//! Two forms exist: `o/<output-name>` and `r/<resource-address>/<attribute>`.
//! Segments are taken verbatim, no unescaping is performed.

use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Output { name: String },
    ResourceAttr { resource: String, attribute: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("Output '{0}' lookup format incorrect. Must be o/<name>.")]
    Output(String),

    #[error("Resource '{0}' lookup format incorrect. Must be r/<resource>/<property>.")]
    Resource(String),

    #[error("Unsupported retrieve format: '{0}'. Must start with 'o/' or 'r/'.")]
    Unsupported(String),
}

impl Lookup {
    pub fn parse(retrieve: &str) -> Result<Self, LookupError> {
        if retrieve.starts_with("o/") {
            match segments(retrieve).as_slice() {
                [_, name] => Ok(Lookup::Output {
                    name: name.to_string(),
                }),
                _ => Err(LookupError::Output(retrieve.to_string())),
            }
        } else if retrieve.starts_with("r/") {
            match segments(retrieve).as_slice() {
                [_, resource, attribute] => Ok(Lookup::ResourceAttr {
                    resource: resource.to_string(),
                    attribute: attribute.to_string(),
                }),
                _ => Err(LookupError::Resource(retrieve.to_string())),
            }
        } else {
            Err(LookupError::Unsupported(retrieve.to_string()))
        }
    }

    /// The part of the state key that follows the module path.
    pub fn target(&self) -> &str {
        match self {
            Lookup::Output { name } => name,
            Lookup::ResourceAttr { resource, .. } => resource,
        }
    }
}

impl FromStr for Lookup {
    type Err = LookupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Lookup::parse(s)
    }
}

/// Splits on `/`; any empty segment makes the whole expression malformed,
/// which is signalled by returning an empty list.
fn segments(retrieve: &str) -> Vec<&str> {
    let parts: Vec<&str> = retrieve.split('/').collect();
    if parts.iter().any(|part| part.is_empty()) {
        return Vec::new();
    }
    parts
}
