//! In-memory DMR model: groups, variables, shared dimensions, enumerations
//! and attribute metadata.

mod attributes;
mod group;
mod variable;

use dap_types::{AttributeType, Type};
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::Serialize;

pub use attributes::{Attribute, AttributeValue, Attributes};
pub use group::{Dimension, DimensionSize, Enumeration, Group};
pub use variable::{Array, DimRef, Scalar, Structure, Variable, VariableKind};

/// Error type produced by model mutators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// A sibling with the same name already exists.
    #[error("the name '{0}' is already in use")]
    DuplicateName(String),
    /// Children were added to a variable that cannot hold them.
    #[error("'{0}' is not a constructor type and cannot hold variables")]
    NotAConstructor(String),
    /// An enumeration was declared with a non-integer base type.
    #[error("the type '{0}' is not an integer type")]
    NotInteger(Type),
    /// An enumeration constant does not fit the base type.
    #[error("the value '{value}' cannot fit in a variable of type '{ty}'")]
    OutOfRange { value: i64, ty: Type },
    /// An attribute was re-declared with a different type.
    #[error("attribute '{name}' has type {existing}, not {requested}")]
    TypeMismatch {
        name: String,
        existing: AttributeType,
        requested: AttributeType,
    },
}

/// Parsed Dataset Metadata Response: dataset-level metadata plus the root
/// group, which carries the dataset name.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Dmr {
    pub dap_version: Option<String>,
    pub dmr_version: Option<String>,
    /// Value of the `xml:base` the request was made against.
    pub request_xml_base: Option<String>,
    /// Namespace URI of the `Dataset` element.
    pub namespace: Option<String>,
    root: Group,
}

impl Dmr {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            root: Group::new(name),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        self.root.name()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.root.set_name(name);
    }

    pub fn root(&self) -> &Group {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Group {
        &mut self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dataset_name_lives_on_root_group() {
        let mut dmr = Dmr::new("first");
        assert_eq!(dmr.root().name(), "first");
        dmr.set_name("second");
        assert_eq!(dmr.name(), "second");
        assert!(dmr.root().variables().is_empty());
    }

    #[test]
    fn errors_render_type_names() {
        let err = ModelError::OutOfRange {
            value: 300,
            ty: Type::Int8,
        };
        assert_eq!(
            err.to_string(),
            "the value '300' cannot fit in a variable of type 'Int8'"
        );
    }
}
