//! Callback interface between the XML event source and a document consumer.

use std::fmt;

use crate::Locator;

/// A namespace binding declared on an element (`xmlns` or `xmlns:prefix`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceDecl {
    /// Bound prefix; `None` for the default namespace.
    pub prefix: Option<String>,
    pub uri: String,
}

/// An ordinary (non-`xmlns`) XML attribute with its value already unescaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute {
    pub local_name: String,
    pub prefix: Option<String>,
    pub value: String,
}

/// Start tag as delivered to [`SaxHandler::start_element`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartElement {
    pub local_name: String,
    pub prefix: Option<String>,
    /// Namespace URI the element name resolved to, if bound.
    pub namespace: Option<String>,
    /// Namespace declarations in document order.
    pub namespaces: Vec<NamespaceDecl>,
    /// Attributes in document order, namespace declarations excluded.
    pub attributes: Vec<XmlAttribute>,
}

impl StartElement {
    /// Value of the unprefixed attribute `name`, if present.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.prefix.is_none() && attr.local_name == name)
            .map(|attr| attr.value.as_str())
    }
}

/// End tag as delivered to [`SaxHandler::end_element`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndElement {
    pub local_name: String,
    pub prefix: Option<String>,
    pub namespace: Option<String>,
}

/// Push-style consumer of XML events.
///
/// Callbacks cannot fail. A handler that detects a problem records it and
/// changes its own state; the event source keeps delivering events until
/// the input is exhausted or it hits a lexical error of its own.
pub trait SaxHandler {
    /// Receive the handle that reports the line of the current event.
    fn set_document_locator(&mut self, _locator: Locator) {}

    fn start_document(&mut self) {}

    fn end_document(&mut self) {}

    fn start_element(&mut self, element: &StartElement);

    fn end_element(&mut self, element: &EndElement);

    /// Character data. May be called several times for one text run.
    fn characters(&mut self, text: &str);

    /// Whitespace-only text between tags.
    fn ignorable_whitespace(&mut self, _text: &str) {}

    /// Content of a CDATA section, without the delimiters.
    fn cdata(&mut self, _text: &str) {}

    /// Resolve a named entity reference. Character references are expanded
    /// by the source itself.
    fn get_entity(&self, name: &str) -> Option<&'static str> {
        predefined_entity(name)
    }

    fn warning(&mut self, args: fmt::Arguments<'_>) {
        self.fatal_error(args)
    }

    fn error(&mut self, args: fmt::Arguments<'_>) {
        self.fatal_error(args)
    }

    fn fatal_error(&mut self, args: fmt::Arguments<'_>);
}

/// The five entities every XML processor must recognise.
pub fn predefined_entity(name: &str) -> Option<&'static str> {
    match name {
        "lt" => Some("<"),
        "gt" => Some(">"),
        "amp" => Some("&"),
        "apos" => Some("'"),
        "quot" => Some("\""),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_lookup_ignores_prefixed() {
        let element = StartElement {
            local_name: "Dataset".into(),
            attributes: vec![
                XmlAttribute {
                    local_name: "base".into(),
                    prefix: Some("xml".into()),
                    value: "http://example.com/".into(),
                },
                XmlAttribute {
                    local_name: "name".into(),
                    prefix: None,
                    value: "sst".into(),
                },
            ],
            ..StartElement::default()
        };
        assert_eq!(element.attribute("name"), Some("sst"));
        assert_eq!(element.attribute("base"), None);
        assert_eq!(element.attribute("dapVersion"), None);
    }

    #[test]
    fn predefined_entities() {
        assert_eq!(predefined_entity("amp"), Some("&"));
        assert_eq!(predefined_entity("quot"), Some("\""));
        assert_eq!(predefined_entity("nbsp"), None);
    }
}
