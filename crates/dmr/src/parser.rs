//! Event dispatcher: a push-down automaton that turns SAX events into the
//! DMR model.
//!
//! Every open element that changes the parse context pushes a [`Frame`]. A
//! frame carries the automaton state together with whatever the element is
//! building: a group or variable under construction, or the position of the
//! attribute (or attribute container) it declared. Keeping all three in one
//! stack means they can never get out of step.
//!
//! Groups and variables are owned by their frame until their end tag, when
//! they are moved into the parent frame's node, or into the root group when
//! the parent is the `Dataset` frame.

use std::fmt;

use dap_types::{AttributeType, Type};
use dmr_model::{Attributes, DimRef, Dmr, Group, Variable, VariableKind};
use dmr_sax::{EndElement, Locator, SaxHandler, StartElement};
use tracing::{debug, trace, warn};

use crate::builders::{parse_size, DimensionBuilder, EnumerationBuilder};
use crate::diagnostics::Diagnostics;
use crate::raw_xml::RawXml;
use crate::state::State;

#[derive(Debug)]
enum Node {
    Group(Group),
    Variable(Variable),
}

impl Node {
    fn attributes_mut(&mut self) -> &mut Attributes {
        match self {
            Node::Group(group) => &mut group.attributes,
            Node::Variable(var) => var.attributes_mut(),
        }
    }
}

#[derive(Debug)]
struct Frame {
    state: State,
    node: Option<Node>,
    /// Container attribute opened by this frame, in the enclosing store.
    container: Option<usize>,
    /// Valued or `OtherXML` attribute opened by this frame.
    attribute: Option<usize>,
}

impl Frame {
    fn new(state: State) -> Self {
        Self {
            state,
            node: None,
            container: None,
            attribute: None,
        }
    }

    fn with_node(state: State, node: Node) -> Self {
        Self {
            node: Some(node),
            ..Self::new(state)
        }
    }
}

pub(crate) struct Dispatcher<'d> {
    dmr: &'d mut Dmr,
    stack: Vec<Frame>,
    diagnostics: Diagnostics,
    locator: Option<Locator>,
    /// Text of the `value` element being read.
    char_data: String,
    raw_xml: RawXml,
    dim_def: Option<DimensionBuilder>,
    enum_def: Option<EnumerationBuilder>,
    /// Namespace of the `Dataset` element.
    root_ns: Option<String>,
}

impl<'d> Dispatcher<'d> {
    pub(crate) fn new(dmr: &'d mut Dmr) -> Self {
        Self {
            dmr,
            stack: Vec::new(),
            diagnostics: Diagnostics::new(),
            locator: None,
            char_data: String::new(),
            raw_xml: RawXml::default(),
            dim_def: None,
            enum_def: None,
            root_ns: None,
        }
    }

    /// Consume the dispatcher. Succeeds when the document was balanced and
    /// no error was recorded; otherwise returns the accumulated diagnostics.
    pub(crate) fn finish(mut self) -> Result<(), String> {
        if self.stack.is_empty() {
            self.diagnostics.push(0, "No document was read.");
        }
        if self.diagnostics.is_empty() && self.state() == State::Start {
            Ok(())
        } else {
            Err(self.diagnostics.into_string())
        }
    }

    fn state(&self) -> State {
        self.stack.last().map_or(State::Start, |frame| frame.state)
    }

    fn set_state(&mut self, state: State) {
        if let Some(frame) = self.stack.last_mut() {
            frame.state = state;
        }
    }

    /// The error state is terminal: once entered nothing is pushed above it.
    fn push(&mut self, frame: Frame) {
        if self.state() == State::Error {
            return;
        }
        trace!(state = frame.state.name(), depth = self.stack.len(), "push");
        self.stack.push(frame);
    }

    fn pop(&mut self) -> Option<Frame> {
        let frame = self.stack.pop();
        if let Some(frame) = &frame {
            trace!(state = frame.state.name(), depth = self.stack.len(), "pop");
        }
        frame
    }

    fn line(&self) -> u64 {
        self.locator.as_ref().map_or(0, Locator::line)
    }

    fn fail(&mut self, message: impl fmt::Display) {
        let line = self.line();
        self.diagnostics.push(line, &message);
        debug!(line, %message, "DMR parse error");
        if self.state() != State::Error {
            self.stack.push(Frame::new(State::Error));
        }
    }

    /// Value of a required, non-blank attribute; records an error if absent.
    fn required<'e>(&mut self, element: &'e StartElement, name: &str) -> Option<&'e str> {
        match element.attribute(name) {
            Some(value) if !value.trim().is_empty() => Some(value),
            _ => {
                self.fail(format_args!(
                    "Required attribute '{name}' not found in the '{}' element.",
                    element.local_name
                ));
                None
            }
        }
    }

    /// The attribute store new `Attribute` elements are added to: that of
    /// the innermost group or variable, descended through any containers
    /// opened above it.
    fn current_attributes(&mut self) -> Option<&mut Attributes> {
        let base = self.stack.iter().rposition(|frame| frame.node.is_some());
        let (mut store, above): (&mut Attributes, &[Frame]) = match base {
            Some(index) => {
                let (below, above) = self.stack.split_at_mut(index + 1);
                (below[index].node.as_mut()?.attributes_mut(), above)
            }
            None => (&mut self.dmr.root_mut().attributes, &self.stack[..]),
        };
        for frame in above {
            if let Some(index) = frame.container {
                store = store.at_mut(index)?.container_mut()?;
            }
        }
        Some(store)
    }

    fn mismatch(&mut self, expected: &str, found: &str) {
        self.fail(format_args!(
            "Expected an end {expected} tag; found '{found}' instead."
        ));
    }

    fn skip_unknown(&mut self, element: &StartElement) {
        warn!(
            element = %element.local_name,
            line = self.line(),
            state = self.state().name(),
            "skipping unexpected element"
        );
        self.push(Frame::new(State::Unknown { depth: 1 }));
    }

    fn start_dataset(&mut self, element: &StartElement) {
        if element.local_name != "Dataset" {
            self.fail(format_args!(
                "Expected DMR to start with a Dataset element; found '{}' instead.",
                element.local_name
            ));
            return;
        }
        self.root_ns = element.namespace.clone();
        if let Some(name) = self.required(element, "name") {
            self.dmr.set_name(name);
        }
        if let Some(version) = element.attribute("dapVersion") {
            self.dmr.dap_version = Some(version.to_string());
        }
        if let Some(version) = element.attribute("dmrVersion") {
            self.dmr.dmr_version = Some(version.to_string());
        }
        // Usually written as `xml:base`.
        if let Some(base) = element.attributes.iter().find(|attr| attr.local_name == "base") {
            self.dmr.request_xml_base = Some(base.value.clone());
        }
        if element.namespace.is_some() {
            self.dmr.namespace = element.namespace.clone();
        }
        self.push(Frame::new(State::InsideDataset));
    }

    fn process_attribute(&mut self, element: &StartElement) -> bool {
        if element.local_name != "Attribute" {
            return false;
        }
        let Some(name) = self.required(element, "name") else {
            return true;
        };
        let Some(type_name) = self.required(element, "type") else {
            return true;
        };
        let Some(ty) = AttributeType::from_name(type_name) else {
            self.fail(format_args!(
                "Unknown type '{type_name}' for the Attribute '{name}'."
            ));
            return true;
        };
        let opened = match self.current_attributes() {
            Some(store) => store.open(name, ty).map_err(|err| err.to_string()),
            None => Err("the enclosing attribute container is missing".to_string()),
        };
        let index = match opened {
            Ok(index) => index,
            Err(err) => {
                self.fail(format_args!("Could not add the Attribute '{name}': {err}."));
                return true;
            }
        };
        let frame = match ty {
            AttributeType::Container => Frame {
                container: Some(index),
                ..Frame::new(State::InsideAttributeContainer)
            },
            AttributeType::OtherXml => {
                self.raw_xml.take();
                Frame {
                    attribute: Some(index),
                    ..Frame::new(State::InsidePassThrough)
                }
            }
            _ => Frame {
                attribute: Some(index),
                ..Frame::new(State::InsideAttribute)
            },
        };
        self.push(frame);
        true
    }

    fn process_enum_def(&mut self, element: &StartElement) -> bool {
        if element.local_name != "Enumeration" {
            return false;
        }
        let Some(name) = self.required(element, "name") else {
            return true;
        };
        let Some(base) = self.required(element, "basetype") else {
            return true;
        };
        debug_assert!(self.enum_def.is_none(), "Enumeration declarations cannot nest");
        match EnumerationBuilder::new(name, base) {
            Ok(builder) => {
                self.enum_def = Some(builder);
                self.push(Frame::new(State::InsideEnumDef));
            }
            Err(message) => self.fail(message),
        }
        true
    }

    fn process_enum_const(&mut self, element: &StartElement) -> bool {
        if element.local_name != "EnumConst" {
            return false;
        }
        let Some(label) = self.required(element, "name") else {
            return true;
        };
        let Some(literal) = self.required(element, "value") else {
            return true;
        };
        let added = match self.enum_def.as_mut() {
            Some(builder) => builder.add_constant(label, literal),
            None => Err("Found an EnumConst outside of an Enumeration.".to_string()),
        };
        match added {
            Ok(()) => self.push(Frame::new(State::InsideEnumConst)),
            Err(message) => self.fail(message),
        }
        true
    }

    fn process_dimension_def(&mut self, element: &StartElement) -> bool {
        if element.local_name != "Dimension" {
            return false;
        }
        let Some(name) = self.required(element, "name") else {
            return true;
        };
        let Some(size) = self.required(element, "size") else {
            return true;
        };
        debug_assert!(self.dim_def.is_none(), "Dimension declarations cannot nest");
        match DimensionBuilder::new(name, size) {
            Ok(builder) => {
                self.dim_def = Some(builder);
                self.push(Frame::new(State::InsideDimDef));
            }
            Err(message) => self.fail(message),
        }
        true
    }

    fn process_dim_ref(&mut self, element: &StartElement) -> bool {
        if element.local_name != "Dim" {
            return false;
        }
        let dim = if let Some(name) = element.attribute("name") {
            DimRef::Named(name.to_string())
        } else if let Some(size) = element.attribute("size") {
            match parse_size(size) {
                Some(size) => DimRef::Size(size),
                None => {
                    self.fail(format_args!(
                        "The size '{size}' of a Dim element is not a non-negative integer."
                    ));
                    return true;
                }
            }
        } else {
            self.fail("A Dim element requires either a 'name' or a 'size' attribute.");
            return true;
        };
        let attached = match self.stack.last_mut() {
            Some(Frame {
                state,
                node: Some(Node::Variable(var)),
                ..
            }) => {
                var.add_dimension(dim);
                *state = State::InsideArray;
                true
            }
            _ => false,
        };
        if attached {
            self.push(Frame::new(State::InsideDimensionRef));
        } else {
            self.fail("Internal parser error; found a Dim element outside of a variable.");
        }
        true
    }

    fn process_group(&mut self, element: &StartElement) -> bool {
        if element.local_name != "Group" {
            return false;
        }
        if let Some(name) = self.required(element, "name") {
            let group = Group::new(name);
            self.push(Frame::with_node(State::InsideGroup, Node::Group(group)));
        }
        true
    }

    fn process_variable(&mut self, element: &StartElement) -> bool {
        let ty = match Type::from_name(&element.local_name) {
            Some(ty) if ty.is_simple() || ty == Type::Structure => ty,
            _ => return false,
        };
        let Some(name) = self.required(element, "name") else {
            return true;
        };
        let (var, state) = if ty == Type::Structure {
            (Variable::structure(name), State::InsideStructure)
        } else {
            let mut var = Variable::scalar(name, ty);
            if ty == Type::Enum {
                let Some(path) = self.required(element, "enum") else {
                    return true;
                };
                if let Variable::Scalar(scalar) = &mut var {
                    scalar.enumeration = Some(path.to_string());
                }
            }
            (var, State::InsideScalarType)
        };
        self.push(Frame::with_node(state, Node::Variable(var)));
        true
    }

    /// Whether the variable on top of the stack may hold member variables.
    fn top_accepts_members(&self) -> bool {
        matches!(
            self.stack.last(),
            Some(Frame { node: Some(Node::Variable(var)), .. }) if var.accepts_children()
        )
    }

    fn commit_value(&mut self, index: Option<usize>, text: String) {
        let added = match (index, self.current_attributes()) {
            (Some(index), Some(store)) => match store.at_mut(index) {
                Some(attr) => attr.add_value(text).map_err(|err| err.to_string()),
                None => Err("the attribute being read is missing".to_string()),
            },
            _ => Err("no attribute is being read".to_string()),
        };
        if let Err(err) = added {
            self.fail(format_args!("Could not store an attribute value: {err}."));
        }
    }

    fn finish_value(&mut self, element: &EndElement) {
        if element.local_name != "value" {
            self.mismatch("value", &element.local_name);
            return;
        }
        self.pop();
        let text = std::mem::take(&mut self.char_data);
        let index = self.stack.last().and_then(|frame| frame.attribute);
        self.commit_value(index, text);
    }

    fn finish_pass_through(&mut self, element: &EndElement) {
        if self.raw_xml.close(element) {
            return;
        }
        if element.local_name != "Attribute" || element.namespace != self.root_ns {
            self.fail(format_args!(
                "Expected an OtherXML attribute to end; found '{}' instead.",
                element.local_name
            ));
            return;
        }
        let text = self.raw_xml.take();
        let index = self.pop().and_then(|frame| frame.attribute);
        self.commit_value(index, text);
    }

    fn finish_enum_def(&mut self, element: &EndElement) {
        if element.local_name != "Enumeration" {
            self.mismatch("Enumeration", &element.local_name);
            return;
        }
        self.pop();
        let built = match self.enum_def.take() {
            Some(builder) => builder.build().map_err(|err| err.to_string()),
            None => Err("no Enumeration was being read".to_string()),
        };
        // Enumerations are shared through the root group.
        let added = built.and_then(|def| {
            let name = def.name().to_string();
            self.dmr
                .root_mut()
                .add_enumeration(def)
                .map_err(|err| format!("could not add the Enumeration '{name}': {err}"))
        });
        if let Err(err) = added {
            self.fail(format_args!("Internal parser error; {err}."));
        }
    }

    fn finish_dim_def(&mut self, element: &EndElement) {
        if element.local_name != "Dimension" {
            self.mismatch("Dimension", &element.local_name);
            return;
        }
        self.pop();
        let Some(dim) = self.dim_def.take().map(DimensionBuilder::build) else {
            self.fail("Internal parser error; no Dimension was being read.");
            return;
        };
        let name = dim.name.clone();
        let added = match self.stack.last_mut().and_then(|frame| frame.node.as_mut()) {
            Some(Node::Group(group)) => group.add_dimension(dim),
            Some(Node::Variable(_)) => {
                self.fail("Internal parser error; a Dimension must be declared in a group.");
                return;
            }
            None => self.dmr.root_mut().add_dimension(dim),
        };
        if let Err(err) = added {
            self.fail(format_args!("Could not add the Dimension '{name}': {err}."));
        }
    }

    fn finish_group(&mut self, element: &EndElement) {
        if element.local_name != "Group" {
            self.mismatch("Group", &element.local_name);
            return;
        }
        let group = match self.pop().and_then(|frame| frame.node) {
            Some(Node::Group(group)) => group,
            _ => {
                self.fail("Internal parser error; expected a Group on the stack.");
                return;
            }
        };
        let name = group.name().to_string();
        let added = match self.stack.last_mut().and_then(|frame| frame.node.as_mut()) {
            Some(Node::Group(parent)) => parent.add_group(group),
            Some(Node::Variable(parent)) => {
                let parent = parent.name().to_string();
                self.fail(format_args!(
                    "Internal parser error; the Group '{name}' cannot be added to the variable '{parent}'."
                ));
                return;
            }
            None => self.dmr.root_mut().add_group(group),
        };
        if let Err(err) = added {
            self.fail(format_args!("Could not add the Group '{name}': {err}."));
        }
    }

    fn finish_variable(&mut self, element: &EndElement, kind: VariableKind) {
        let expected = match self.stack.last() {
            Some(Frame {
                node: Some(Node::Variable(var)),
                ..
            }) if var.kind() == kind => var.ty().name(),
            _ => {
                self.fail(format_args!(
                    "Internal parser error; expected a {kind:?} variable on the stack."
                ));
                return;
            }
        };
        if element.local_name != expected {
            self.mismatch(expected, &element.local_name);
            return;
        }
        let Some(Node::Variable(var)) = self.pop().and_then(|frame| frame.node) else {
            return;
        };
        let name = var.name().to_string();
        let added = match self.stack.last_mut().and_then(|frame| frame.node.as_mut()) {
            Some(Node::Group(group)) => group.add_variable(var),
            Some(Node::Variable(parent)) => parent.add_member(var),
            None => self.dmr.root_mut().add_variable(var),
        };
        if let Err(err) = added {
            self.fail(format_args!("Could not add the variable '{name}': {err}."));
        }
    }
}

impl SaxHandler for Dispatcher<'_> {
    fn set_document_locator(&mut self, locator: Locator) {
        self.locator = Some(locator);
    }

    fn start_document(&mut self) {
        self.stack.clear();
        self.stack.push(Frame::new(State::Start));
        self.char_data.clear();
        self.raw_xml.take();
        self.dim_def = None;
        self.enum_def = None;
        self.root_ns = None;
    }

    fn end_document(&mut self) {
        if self.state() != State::Start {
            self.fail("The document contained unbalanced tags.");
        }
    }

    fn start_element(&mut self, element: &StartElement) {
        let state = self.state();
        trace!(element = %element.local_name, state = state.name(), "start element");
        match state {
            State::Start => self.start_dataset(element),
            State::InsideDataset | State::InsideGroup => {
                let handled = self.process_enum_def(element)
                    || self.process_dimension_def(element)
                    || self.process_group(element)
                    || self.process_variable(element)
                    || self.process_attribute(element);
                if !handled {
                    self.fail(format_args!(
                        "Expected an Attribute, Enumeration, Dimension, Group or variable element; found '{}' instead.",
                        element.local_name
                    ));
                }
            }
            State::InsideAttributeContainer => {
                if !self.process_attribute(element) {
                    self.fail(format_args!(
                        "Expected an Attribute element; found '{}' instead.",
                        element.local_name
                    ));
                }
            }
            State::InsideAttribute => {
                if element.local_name == "value" {
                    self.char_data.clear();
                    self.push(Frame::new(State::InsideAttributeValue));
                } else if !self.process_attribute(element) {
                    self.fail(format_args!(
                        "Expected an 'Attribute' or 'value' element; found '{}' instead.",
                        element.local_name
                    ));
                }
            }
            State::InsideAttributeValue => self.fail(format_args!(
                "Internal parser error; unexpected element '{}' in an attribute value.",
                element.local_name
            )),
            State::InsidePassThrough => {
                self.raw_xml.open(element);
                trace!(depth = self.raw_xml.depth(), "captured element");
            }
            State::InsideEnumDef => {
                if !self.process_enum_const(element) {
                    self.fail(format_args!(
                        "Expected an 'EnumConst' element; found '{}' instead.",
                        element.local_name
                    ));
                }
            }
            State::InsideEnumConst | State::InsideDimDef | State::InsideDimensionRef => {
                self.skip_unknown(element)
            }
            State::InsideScalarType => {
                if !(self.process_attribute(element) || self.process_dim_ref(element)) {
                    self.fail(format_args!(
                        "Expected an 'Attribute' or 'Dim' element; found '{}' instead.",
                        element.local_name
                    ));
                }
            }
            State::InsideArray => {
                let handled = self.process_dim_ref(element)
                    || self.process_attribute(element)
                    || (self.top_accepts_members() && self.process_variable(element));
                if !handled {
                    self.fail(format_args!(
                        "Expected an 'Attribute' or 'Dim' element; found '{}' instead.",
                        element.local_name
                    ));
                }
            }
            State::InsideStructure => {
                let handled = self.process_variable(element)
                    || self.process_attribute(element)
                    || self.process_dim_ref(element);
                if !handled {
                    self.fail(format_args!(
                        "Expected an Attribute, Dim or variable element; found '{}' instead.",
                        element.local_name
                    ));
                }
            }
            State::Unknown { depth } => self.set_state(State::Unknown { depth: depth + 1 }),
            State::Error => {}
        }
    }

    fn end_element(&mut self, element: &EndElement) {
        let state = self.state();
        trace!(element = %element.local_name, state = state.name(), "end element");
        let tag = element.local_name.as_str();
        match state {
            State::Start => self.fail(format_args!(
                "Internal parser error; unexpected state, inside start state while processing element '{tag}'."
            )),
            State::InsideDataset => {
                if tag == "Dataset" {
                    self.pop();
                } else {
                    self.mismatch("Dataset", tag);
                }
            }
            State::InsideGroup => self.finish_group(element),
            State::InsideAttributeContainer | State::InsideAttribute => {
                if tag == "Attribute" {
                    self.pop();
                } else {
                    self.mismatch("Attribute", tag);
                }
            }
            State::InsideAttributeValue => self.finish_value(element),
            State::InsidePassThrough => self.finish_pass_through(element),
            State::InsideEnumDef => self.finish_enum_def(element),
            State::InsideEnumConst => {
                if tag == "EnumConst" {
                    self.pop();
                } else {
                    self.mismatch("EnumConst", tag);
                }
            }
            State::InsideDimDef => self.finish_dim_def(element),
            State::InsideScalarType => self.finish_variable(element, VariableKind::Scalar),
            State::InsideArray => self.finish_variable(element, VariableKind::Array),
            State::InsideStructure => self.finish_variable(element, VariableKind::Structure),
            State::InsideDimensionRef => {
                if tag == "Dim" {
                    self.pop();
                } else {
                    self.mismatch("Dim", tag);
                }
            }
            State::Unknown { depth } if depth > 1 => {
                self.set_state(State::Unknown { depth: depth - 1 })
            }
            State::Unknown { .. } => {
                self.pop();
            }
            State::Error => {}
        }
    }

    fn characters(&mut self, text: &str) {
        match self.state() {
            State::InsideAttributeValue => self.char_data.push_str(text),
            State::InsidePassThrough => self.raw_xml.text(text),
            _ => {}
        }
    }

    fn ignorable_whitespace(&mut self, text: &str) {
        match self.state() {
            State::InsideAttributeValue => self.char_data.push_str(text),
            State::InsidePassThrough => self.raw_xml.text(text),
            _ => {}
        }
    }

    fn cdata(&mut self, text: &str) {
        match self.state() {
            State::InsidePassThrough => self.raw_xml.cdata(text),
            State::Unknown { .. } | State::Error => {}
            _ => self.fail("Found a CData block but none are allowed by DAP."),
        }
    }

    fn fatal_error(&mut self, args: fmt::Arguments<'_>) {
        self.fail(args);
    }
}
