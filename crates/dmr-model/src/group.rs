//! Groups and the definitions they own.

use dap_types::Type;

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::{Attributes, ModelError, Variable};

/// Size of a shared dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum DimensionSize {
    Fixed(u64),
    /// Declared with `size="*"`.
    Varying,
}

/// Shared dimension declared in a group.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Dimension {
    pub name: String,
    pub size: DimensionSize,
}

impl Dimension {
    pub fn new(name: impl Into<String>, size: DimensionSize) -> Self {
        Self {
            name: name.into(),
            size,
        }
    }

    pub fn is_varying(&self) -> bool {
        matches!(self.size, DimensionSize::Varying)
    }

    /// Fixed size, `None` when varying.
    pub fn size(&self) -> Option<u64> {
        match self.size {
            DimensionSize::Fixed(size) => Some(size),
            DimensionSize::Varying => None,
        }
    }
}

/// Enumeration definition: integer base type plus labelled constants.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Enumeration {
    name: String,
    base: Type,
    constants: Vec<(String, i64)>,
}

impl Enumeration {
    /// Create an empty enumeration. The base type must be an integer kind.
    pub fn new(name: impl Into<String>, base: Type) -> Result<Self, ModelError> {
        if !base.is_integer() {
            return Err(ModelError::NotInteger(base));
        }
        Ok(Self {
            name: name.into(),
            base,
            constants: Vec::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base(&self) -> Type {
        self.base
    }

    pub fn constants(&self) -> &[(String, i64)] {
        &self.constants
    }

    pub fn is_valid_value(&self, value: i64) -> bool {
        self.base.fits(value)
    }

    /// Append a constant; the value must fit the base type.
    pub fn add_constant(&mut self, label: impl Into<String>, value: i64) -> Result<(), ModelError> {
        if !self.is_valid_value(value) {
            return Err(ModelError::OutOfRange {
                value,
                ty: self.base,
            });
        }
        self.constants.push((label.into(), value));
        Ok(())
    }

    pub fn value_of(&self, label: &str) -> Option<i64> {
        self.constants
            .iter()
            .find(|(name, _)| name == label)
            .map(|(_, value)| *value)
    }
}

/// A group: the dataset root or a nested namespace of variables.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Group {
    name: String,
    pub attributes: Attributes,
    dimensions: Vec<Dimension>,
    enumerations: Vec<Enumeration>,
    variables: Vec<Variable>,
    groups: Vec<Group>,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    pub fn enumerations(&self) -> &[Enumeration] {
        &self.enumerations
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn dimension(&self, name: &str) -> Option<&Dimension> {
        self.dimensions.iter().find(|dim| dim.name == name)
    }

    pub fn enumeration(&self, name: &str) -> Option<&Enumeration> {
        self.enumerations.iter().find(|def| def.name == name)
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|var| var.name() == name)
    }

    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.iter().find(|group| group.name == name)
    }

    pub fn add_dimension(&mut self, dim: Dimension) -> Result<(), ModelError> {
        if self.dimension(&dim.name).is_some() {
            return Err(ModelError::DuplicateName(dim.name));
        }
        self.dimensions.push(dim);
        Ok(())
    }

    pub fn add_enumeration(&mut self, def: Enumeration) -> Result<(), ModelError> {
        if self.enumeration(&def.name).is_some() {
            return Err(ModelError::DuplicateName(def.name));
        }
        self.enumerations.push(def);
        Ok(())
    }

    /// Append a variable. Variables and child groups share one namespace.
    pub fn add_variable(&mut self, var: Variable) -> Result<(), ModelError> {
        self.ensure_unused(var.name())?;
        self.variables.push(var);
        Ok(())
    }

    pub fn add_group(&mut self, group: Group) -> Result<(), ModelError> {
        self.ensure_unused(&group.name)?;
        self.groups.push(group);
        Ok(())
    }

    /// Resolve an absolute path such as `/inst/obs/t`.
    ///
    /// Leading segments name groups; once a variable is reached the rest of
    /// the path walks structure members.
    pub fn find_variable(&self, path: &str) -> Option<&Variable> {
        let mut segments = path.split('/').filter(|segment| !segment.is_empty());
        let mut group = self;
        let mut var = loop {
            let segment = segments.next()?;
            match group.group(segment) {
                Some(child) => group = child,
                None => break group.variable(segment)?,
            }
        };
        for segment in segments {
            var = var.member(segment)?;
        }
        Some(var)
    }

    fn ensure_unused(&self, name: &str) -> Result<(), ModelError> {
        if self.variable(name).is_some() || self.group(name).is_some() {
            return Err(ModelError::DuplicateName(name.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enumeration_checks_range_on_insert() {
        let mut colors = Enumeration::new("colors", Type::Int8).expect("integer base");
        colors.add_constant("red", 1).expect("red");
        let err = colors.add_constant("big", 300).unwrap_err();
        assert_eq!(
            err,
            ModelError::OutOfRange {
                value: 300,
                ty: Type::Int8
            }
        );
        assert_eq!(colors.constants().len(), 1);
        assert_eq!(colors.value_of("red"), Some(1));
        assert!(matches!(
            Enumeration::new("f", Type::Float64),
            Err(ModelError::NotInteger(Type::Float64))
        ));
    }

    #[test]
    fn names_are_unique_per_group() {
        let mut root = Group::new("root");
        root.add_variable(Variable::scalar("a", Type::Int32))
            .expect("a");
        assert!(root.add_group(Group::new("a")).is_err());
        root.add_dimension(Dimension::new("lat", DimensionSize::Fixed(3)))
            .expect("lat");
        assert!(root
            .add_dimension(Dimension::new("lat", DimensionSize::Varying))
            .is_err());
    }

    #[test]
    fn find_variable_walks_groups_and_members() {
        let mut obs = Variable::structure("obs");
        obs.add_member(Variable::scalar("t", Type::Float64))
            .expect("t");
        let mut inst = Group::new("inst");
        inst.add_variable(obs).expect("obs");
        let mut root = Group::new("root");
        root.add_group(inst).expect("inst");
        root.add_variable(Variable::scalar("x", Type::Int8))
            .expect("x");

        assert_eq!(root.find_variable("/x").map(Variable::name), Some("x"));
        assert_eq!(
            root.find_variable("/inst/obs/t").map(Variable::ty),
            Some(Type::Float64)
        );
        assert!(root.find_variable("/inst").is_none());
        assert!(root.find_variable("/inst/missing").is_none());
    }
}
