//! Variables: scalars, structures and arrays of either.

use dap_types::Type;

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::{Attributes, ModelError};

/// Dimension reference on an array variable.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum DimRef {
    /// Reference to a shared dimension by path, e.g. `/lat`.
    Named(String),
    /// Anonymous dimension of a fixed size.
    Size(u64),
}

/// Coarse variable kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    Scalar,
    Structure,
    Array,
}

/// Variable holding a single value of a simple type.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Scalar {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub ty: Type,
    /// Enumeration path for `Enum` variables.
    pub enumeration: Option<String>,
    pub attributes: Attributes,
}

impl Scalar {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            enumeration: None,
            attributes: Attributes::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Structure {
    pub name: String,
    pub attributes: Attributes,
    pub members: Vec<Variable>,
}

impl Structure {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Attributes::new(),
            members: Vec::new(),
        }
    }
}

/// Array of scalars or of structures.
///
/// The element template keeps the element type (and, for structures, the
/// members); the array itself carries the name and the attributes.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Array {
    pub name: String,
    pub attributes: Attributes,
    pub dimensions: Vec<DimRef>,
    pub element: Box<Variable>,
}

impl Array {
    fn from_element(mut element: Variable, dim: DimRef) -> Self {
        let name = element.name().to_string();
        let attributes = std::mem::take(element.attributes_mut());
        Self {
            name,
            attributes,
            dimensions: vec![dim],
            element: Box::new(element),
        }
    }
}

/// A variable node of the dataset tree.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize), serde(tag = "kind"))]
pub enum Variable {
    Scalar(Scalar),
    Structure(Structure),
    Array(Array),
}

impl Variable {
    pub fn scalar(name: impl Into<String>, ty: Type) -> Self {
        Variable::Scalar(Scalar::new(name, ty))
    }

    pub fn structure(name: impl Into<String>) -> Self {
        Variable::Structure(Structure::new(name))
    }

    pub fn name(&self) -> &str {
        match self {
            Variable::Scalar(v) => &v.name,
            Variable::Structure(v) => &v.name,
            Variable::Array(v) => &v.name,
        }
    }

    pub fn kind(&self) -> VariableKind {
        match self {
            Variable::Scalar(_) => VariableKind::Scalar,
            Variable::Structure(_) => VariableKind::Structure,
            Variable::Array(_) => VariableKind::Array,
        }
    }

    /// Declared type; for arrays this is the element type.
    pub fn ty(&self) -> Type {
        match self {
            Variable::Scalar(v) => v.ty,
            Variable::Structure(_) => Type::Structure,
            Variable::Array(v) => v.element.ty(),
        }
    }

    pub fn attributes(&self) -> &Attributes {
        match self {
            Variable::Scalar(v) => &v.attributes,
            Variable::Structure(v) => &v.attributes,
            Variable::Array(v) => &v.attributes,
        }
    }

    pub fn attributes_mut(&mut self) -> &mut Attributes {
        match self {
            Variable::Scalar(v) => &mut v.attributes,
            Variable::Structure(v) => &mut v.attributes,
            Variable::Array(v) => &mut v.attributes,
        }
    }

    /// Dimension references; empty unless the variable is an array.
    pub fn dimensions(&self) -> &[DimRef] {
        match self {
            Variable::Array(v) => &v.dimensions,
            _ => &[],
        }
    }

    /// Members of a structure or of an array of structures.
    pub fn members(&self) -> &[Variable] {
        match self {
            Variable::Structure(v) => &v.members,
            Variable::Array(v) => v.element.members(),
            Variable::Scalar(_) => &[],
        }
    }

    pub fn member(&self, name: &str) -> Option<&Variable> {
        self.members().iter().find(|member| member.name() == name)
    }

    /// Whether child variables may be added.
    pub fn accepts_children(&self) -> bool {
        match self {
            Variable::Structure(_) => true,
            Variable::Array(v) => v.element.accepts_children(),
            Variable::Scalar(_) => false,
        }
    }

    /// Append a member, keeping member names unique.
    pub fn add_member(&mut self, member: Variable) -> Result<(), ModelError> {
        let members = match self {
            Variable::Structure(v) => &mut v.members,
            Variable::Array(v) => return v.element.add_member(member),
            Variable::Scalar(v) => return Err(ModelError::NotAConstructor(v.name.clone())),
        };
        if members.iter().any(|existing| existing.name() == member.name()) {
            return Err(ModelError::DuplicateName(member.name().to_string()));
        }
        members.push(member);
        Ok(())
    }

    /// Add a dimension, turning a scalar or structure into an array of it.
    pub fn add_dimension(&mut self, dim: DimRef) {
        if let Variable::Array(array) = self {
            array.dimensions.push(dim);
            return;
        }
        let element = std::mem::replace(self, Variable::scalar(String::new(), Type::Byte));
        *self = Variable::Array(Array::from_element(element, dim));
    }
}
