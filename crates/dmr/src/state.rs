//! Automaton states of the DMR parser.

/// Where the parser is in the document grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum State {
    Start,
    InsideDataset,
    /// Just after the start of a `Group` element.
    InsideGroup,
    InsideAttributeContainer,
    InsideAttribute,
    InsideAttributeValue,
    /// Inside an `OtherXML` attribute; elements are captured, not interpreted.
    InsidePassThrough,
    InsideEnumDef,
    InsideEnumConst,
    InsideDimDef,
    /// Byte, ..., Url, Opaque, Enum.
    InsideScalarType,
    InsideArray,
    InsideDimensionRef,
    InsideStructure,
    /// Skipping an unrecognised element nested `depth` levels deep.
    Unknown { depth: usize },
    Error,
}

impl State {
    pub(crate) const fn name(self) -> &'static str {
        match self {
            State::Start => "parser_start",
            State::InsideDataset => "inside_dataset",
            State::InsideGroup => "inside_group",
            State::InsideAttributeContainer => "inside_attribute_container",
            State::InsideAttribute => "inside_attribute",
            State::InsideAttributeValue => "inside_attribute_value",
            State::InsidePassThrough => "inside_other_xml_attribute",
            State::InsideEnumDef => "inside_enum_def",
            State::InsideEnumConst => "inside_enum_const",
            State::InsideDimDef => "inside_dim_def",
            State::InsideScalarType => "inside_simple_type",
            State::InsideArray => "inside_array",
            State::InsideDimensionRef => "inside_dimension",
            State::InsideStructure => "inside_structure",
            State::Unknown { .. } => "parser_unknown",
            State::Error => "parser_error",
        }
    }
}
