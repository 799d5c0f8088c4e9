//! Attribute store attached to groups and variables.

use dap_types::AttributeType;

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::ModelError;

/// Payload of an [`Attribute`]; the variant is fixed by the attribute type.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum AttributeValue {
    /// String-encoded values in encounter order.
    Values(Vec<String>),
    /// Nested attributes of a `Container`.
    Container(Attributes),
    /// Verbatim XML of an `OtherXML` attribute.
    OtherXml(String),
}

/// A named, typed piece of metadata.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Attribute {
    name: String,
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    ty: AttributeType,
    value: AttributeValue,
}

impl Attribute {
    /// Create an empty attribute whose payload matches `ty`.
    pub fn new(name: impl Into<String>, ty: AttributeType) -> Self {
        let value = match ty {
            AttributeType::Container => AttributeValue::Container(Attributes::new()),
            AttributeType::OtherXml => AttributeValue::OtherXml(String::new()),
            _ => AttributeValue::Values(Vec::new()),
        };
        Self {
            name: name.into(),
            ty,
            value,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> AttributeType {
        self.ty
    }

    pub fn value(&self) -> &AttributeValue {
        &self.value
    }

    /// Values of a scalar attribute; empty for containers and OtherXML.
    pub fn values(&self) -> &[String] {
        match &self.value {
            AttributeValue::Values(values) => values,
            _ => &[],
        }
    }

    pub fn container(&self) -> Option<&Attributes> {
        match &self.value {
            AttributeValue::Container(attrs) => Some(attrs),
            _ => None,
        }
    }

    pub fn container_mut(&mut self) -> Option<&mut Attributes> {
        match &mut self.value {
            AttributeValue::Container(attrs) => Some(attrs),
            _ => None,
        }
    }

    pub fn other_xml(&self) -> Option<&str> {
        match &self.value {
            AttributeValue::OtherXml(xml) => Some(xml),
            _ => None,
        }
    }

    /// Append a value. OtherXML text is concatenated; containers take no
    /// values.
    pub fn add_value(&mut self, value: impl Into<String>) -> Result<(), ModelError> {
        match &mut self.value {
            AttributeValue::Values(values) => {
                values.push(value.into());
                Ok(())
            }
            AttributeValue::OtherXml(xml) => {
                xml.push_str(&value.into());
                Ok(())
            }
            AttributeValue::Container(_) => Err(ModelError::TypeMismatch {
                name: self.name.clone(),
                existing: self.ty,
                requested: AttributeType::String,
            }),
        }
    }
}

/// Insertion-ordered collection of attributes with unique names.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize), serde(transparent))]
pub struct Attributes {
    items: Vec<Attribute>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.items.iter()
    }

    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.items.iter().find(|attr| attr.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Attribute> {
        self.items.iter_mut().find(|attr| attr.name == name)
    }

    /// Attribute at a position previously returned by [`Attributes::open`].
    pub fn at_mut(&mut self, index: usize) -> Option<&mut Attribute> {
        self.items.get_mut(index)
    }

    /// Return the position of the attribute `name`, creating it if needed.
    ///
    /// Re-opening an existing attribute with the same type hands back the
    /// existing entry so later values append to it.
    pub fn open(&mut self, name: &str, ty: AttributeType) -> Result<usize, ModelError> {
        if let Some(index) = self.items.iter().position(|attr| attr.name == name) {
            let existing = self.items[index].ty;
            if existing != ty {
                return Err(ModelError::TypeMismatch {
                    name: name.to_string(),
                    existing,
                    requested: ty,
                });
            }
            return Ok(index);
        }
        self.items.push(Attribute::new(name, ty));
        Ok(self.items.len() - 1)
    }

    /// Look up a nested attribute by a dotted path such as `"NC_GLOBAL.title"`.
    pub fn find(&self, path: &str) -> Option<&Attribute> {
        let mut segments = path.split('.');
        let mut current = self.get(segments.next()?)?;
        for segment in segments {
            current = current.container()?.get(segment)?;
        }
        Some(current)
    }
}

impl<'a> IntoIterator for &'a Attributes {
    type Item = &'a Attribute;
    type IntoIter = std::slice::Iter<'a, Attribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
