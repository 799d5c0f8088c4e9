#![cfg_attr(docsrs, feature(doc_cfg))]
//! DAP4 type naming helpers.

use core::fmt;

#[cfg(feature = "serde")]
use serde::Serialize;

/// Data types a DMR variable may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum Type {
    Byte,
    Char,
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float32,
    Float64,
    String,
    Url,
    Opaque,
    Enum,
    Structure,
    Group,
    Array,
}

impl Type {
    /// Look up a type by its DMR element name. Names are case-sensitive.
    pub fn from_name(name: &str) -> Option<Type> {
        let ty = match name {
            "Byte" => Type::Byte,
            "Char" => Type::Char,
            "Int8" => Type::Int8,
            "UInt8" => Type::UInt8,
            "Int16" => Type::Int16,
            "UInt16" => Type::UInt16,
            "Int32" => Type::Int32,
            "UInt32" => Type::UInt32,
            "Int64" => Type::Int64,
            "UInt64" => Type::UInt64,
            "Float32" => Type::Float32,
            "Float64" => Type::Float64,
            "String" => Type::String,
            "Url" => Type::Url,
            "Opaque" => Type::Opaque,
            "Enum" => Type::Enum,
            "Structure" => Type::Structure,
            "Group" => Type::Group,
            "Array" => Type::Array,
            _ => return None,
        };
        Some(ty)
    }

    /// Element name used for the type in a DMR document.
    pub const fn name(self) -> &'static str {
        match self {
            Type::Byte => "Byte",
            Type::Char => "Char",
            Type::Int8 => "Int8",
            Type::UInt8 => "UInt8",
            Type::Int16 => "Int16",
            Type::UInt16 => "UInt16",
            Type::Int32 => "Int32",
            Type::UInt32 => "UInt32",
            Type::Int64 => "Int64",
            Type::UInt64 => "UInt64",
            Type::Float32 => "Float32",
            Type::Float64 => "Float64",
            Type::String => "String",
            Type::Url => "Url",
            Type::Opaque => "Opaque",
            Type::Enum => "Enum",
            Type::Structure => "Structure",
            Type::Group => "Group",
            Type::Array => "Array",
        }
    }

    /// Whether the type declares a single value (no members, no dimensions).
    pub const fn is_simple(self) -> bool {
        !self.is_constructor()
    }

    /// Whether the type is one of the integer kinds usable as an enumeration
    /// base type.
    pub const fn is_integer(self) -> bool {
        self.integer_range().is_some()
    }

    /// Whether variables of this type hold other variables.
    pub const fn is_constructor(self) -> bool {
        matches!(self, Type::Structure | Type::Group | Type::Array)
    }

    /// Inclusive value range of an integer kind.
    ///
    /// The bounds are widened to `i128` so any signed 64-bit literal can be
    /// compared against `UInt64` without wrapping.
    pub const fn integer_range(self) -> Option<(i128, i128)> {
        match self {
            Type::Byte | Type::UInt8 => Some((0, u8::MAX as i128)),
            Type::Char | Type::Int8 => Some((i8::MIN as i128, i8::MAX as i128)),
            Type::Int16 => Some((i16::MIN as i128, i16::MAX as i128)),
            Type::UInt16 => Some((0, u16::MAX as i128)),
            Type::Int32 => Some((i32::MIN as i128, i32::MAX as i128)),
            Type::UInt32 => Some((0, u32::MAX as i128)),
            Type::Int64 => Some((i64::MIN as i128, i64::MAX as i128)),
            Type::UInt64 => Some((0, u64::MAX as i128)),
            _ => None,
        }
    }

    /// Whether `value` is representable by this integer kind. Always false
    /// for non-integer kinds.
    pub const fn fits(self, value: i64) -> bool {
        match self.integer_range() {
            Some((min, max)) => value as i128 >= min && value as i128 <= max,
            None => false,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Declared type of a DMR `Attribute` element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum AttributeType {
    /// Holds nested attributes instead of values.
    Container,
    /// Holds arbitrary embedded XML preserved verbatim.
    OtherXml,
    Char,
    Byte,
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float32,
    Float64,
    String,
    Url,
    Enum,
    Opaque,
}

impl AttributeType {
    /// Parse the `type` XML attribute. Matching ignores ASCII case, so both
    /// `URL` and `Url` are accepted.
    pub fn from_name(name: &str) -> Option<AttributeType> {
        const TABLE: &[(&str, AttributeType)] = &[
            ("Container", AttributeType::Container),
            ("OtherXML", AttributeType::OtherXml),
            ("Char", AttributeType::Char),
            ("Byte", AttributeType::Byte),
            ("Int8", AttributeType::Int8),
            ("UInt8", AttributeType::UInt8),
            ("Int16", AttributeType::Int16),
            ("UInt16", AttributeType::UInt16),
            ("Int32", AttributeType::Int32),
            ("UInt32", AttributeType::UInt32),
            ("Int64", AttributeType::Int64),
            ("UInt64", AttributeType::UInt64),
            ("Float32", AttributeType::Float32),
            ("Float64", AttributeType::Float64),
            ("String", AttributeType::String),
            ("URL", AttributeType::Url),
            ("Enum", AttributeType::Enum),
            ("Opaque", AttributeType::Opaque),
        ];
        TABLE
            .iter()
            .find(|(label, _)| label.eq_ignore_ascii_case(name.trim()))
            .map(|(_, ty)| *ty)
    }

    /// Canonical spelling of the attribute type.
    pub const fn name(self) -> &'static str {
        match self {
            AttributeType::Container => "Container",
            AttributeType::OtherXml => "OtherXML",
            AttributeType::Char => "Char",
            AttributeType::Byte => "Byte",
            AttributeType::Int8 => "Int8",
            AttributeType::UInt8 => "UInt8",
            AttributeType::Int16 => "Int16",
            AttributeType::UInt16 => "UInt16",
            AttributeType::Int32 => "Int32",
            AttributeType::UInt32 => "UInt32",
            AttributeType::Int64 => "Int64",
            AttributeType::UInt64 => "UInt64",
            AttributeType::Float32 => "Float32",
            AttributeType::Float64 => "Float64",
            AttributeType::String => "String",
            AttributeType::Url => "URL",
            AttributeType::Enum => "Enum",
            AttributeType::Opaque => "Opaque",
        }
    }

    /// Whether attributes of this type carry a list of values.
    pub const fn has_values(self) -> bool {
        !matches!(self, AttributeType::Container | AttributeType::OtherXml)
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
