//! Accumulators for `Dimension` and `Enumeration` declarations.

use std::num::IntErrorKind;

use dap_types::Type;
use dmr_model::{Dimension, DimensionSize, Enumeration, ModelError};

/// Parse a dimension size written as plain decimal digits. Signs are refused.
pub(crate) fn parse_size(text: &str) -> Option<u64> {
    let text = text.trim();
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// A `Dimension` declaration between its start and end tags.
#[derive(Debug)]
pub(crate) struct DimensionBuilder {
    name: String,
    size: DimensionSize,
}

impl DimensionBuilder {
    /// `size` is either `*` (varying) or a non-negative decimal integer.
    pub(crate) fn new(name: &str, size: &str) -> Result<Self, String> {
        let size = match size.trim() {
            "*" => DimensionSize::Varying,
            text => parse_size(text).map(DimensionSize::Fixed).ok_or_else(|| {
                format!("The size '{size}' of the Dimension '{name}' is not a non-negative integer or '*'.")
            })?,
        };
        Ok(Self {
            name: name.to_string(),
            size,
        })
    }

    pub(crate) fn build(self) -> Dimension {
        Dimension::new(self.name, self.size)
    }
}

/// An `Enumeration` declaration collecting its `EnumConst` children.
#[derive(Debug)]
pub(crate) struct EnumerationBuilder {
    name: String,
    base: Type,
    constants: Vec<(String, i64)>,
}

impl EnumerationBuilder {
    /// The base type must be an integer kind.
    pub(crate) fn new(name: &str, base: &str) -> Result<Self, String> {
        match Type::from_name(base.trim()) {
            Some(ty) if ty.is_integer() => Ok(Self {
                name: name.to_string(),
                base: ty,
                constants: Vec::new(),
            }),
            _ => Err(format!(
                "The Enumeration '{name}' must have an integer type, instead the type '{base}' was used."
            )),
        }
    }

    /// Parse `literal` as a signed 64-bit integer and add it under `label`.
    ///
    /// The value is range-checked against the base type here, at insertion.
    pub(crate) fn add_constant(&mut self, label: &str, literal: &str) -> Result<(), String> {
        let value = match literal.trim().parse::<i64>() {
            Ok(value) => value,
            Err(err)
                if matches!(
                    err.kind(),
                    IntErrorKind::PosOverflow | IntErrorKind::NegOverflow
                ) =>
            {
                return Err(self.out_of_range(literal));
            }
            Err(_) => {
                return Err(format!(
                    "Expected an integer value for an Enumeration constant of type '{}', got '{literal}' instead.",
                    self.base
                ));
            }
        };
        if !self.base.fits(value) {
            return Err(self.out_of_range(literal));
        }
        self.constants.push((label.to_string(), value));
        Ok(())
    }

    pub(crate) fn build(self) -> Result<Enumeration, ModelError> {
        let mut def = Enumeration::new(self.name, self.base)?;
        for (label, value) in self.constants {
            def.add_constant(label, value)?;
        }
        Ok(def)
    }

    fn out_of_range(&self, literal: &str) -> String {
        format!(
            "In an Enumeration constant, the value '{literal}' cannot fit in a variable of type '{}'.",
            self.base
        )
    }
}
