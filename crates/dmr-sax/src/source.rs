//! Event source backed by `quick-xml`.

use std::io::BufRead;

use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;
use tracing::{debug, trace, warn};

use crate::locator::LineTracker;
use crate::{
    EndElement, Locator, NamespaceDecl, SaxError, SaxHandler, StartElement, XmlAttribute,
};

/// Something that can turn a byte stream into [`SaxHandler`] callbacks.
pub trait EventSource {
    /// Feed the whole of `input` to `handler`, in document order.
    ///
    /// Lexical problems are reported through the handler's error callbacks
    /// and [`EventSource::well_formed`]; only a failure to read the input is
    /// returned as an error.
    fn parse(
        &mut self,
        input: &mut dyn BufRead,
        handler: &mut dyn SaxHandler,
    ) -> Result<(), SaxError>;

    /// Whether the last document was well formed.
    fn well_formed(&self) -> bool;

    /// Whether the last document passed schema validation.
    fn valid(&self) -> bool;
}

/// [`EventSource`] using `quick_xml::NsReader`.
#[derive(Debug)]
pub struct QuickXmlSource {
    validate: bool,
    well_formed: bool,
}

impl Default for QuickXmlSource {
    fn default() -> Self {
        Self::new()
    }
}

impl QuickXmlSource {
    pub fn new() -> Self {
        Self {
            validate: false,
            well_formed: true,
        }
    }

    /// Request schema validation.
    ///
    /// quick-xml has no validating mode, so the request is only logged and
    /// [`EventSource::valid`] keeps reporting `true`.
    pub fn validate(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    fn fail(&mut self, handler: &mut dyn SaxHandler, message: &str) {
        self.well_formed = false;
        handler.fatal_error(format_args!("{message}"));
    }
}

impl EventSource for QuickXmlSource {
    fn parse(
        &mut self,
        input: &mut dyn BufRead,
        handler: &mut dyn SaxHandler,
    ) -> Result<(), SaxError> {
        self.well_formed = true;
        if self.validate {
            warn!("schema validation requested but not supported by the quick-xml source");
        }

        let locator = Locator::default();
        handler.set_document_locator(locator.clone());
        let mut reader = NsReader::from_reader(LineTracker::new(input, locator.clone()));
        reader.expand_empty_elements(true);

        let mut buf = Vec::new();
        let mut open: Vec<String> = Vec::new();
        let mut root_closed = false;

        handler.start_document();
        loop {
            match reader.read_resolved_event_into(&mut buf) {
                Ok((ns, Event::Start(start))) => {
                    if root_closed && open.is_empty() {
                        self.fail(handler, "Extra content at the end of the document");
                        break;
                    }
                    let element = match start_element(&start, ns, &*handler) {
                        Ok(element) => element,
                        Err(err) => {
                            self.fail(handler, &err.to_string());
                            break;
                        }
                    };
                    if let Some(prefix) = unbound_prefix(&element) {
                        handler.error(format_args!("Namespace prefix {prefix} is not defined"));
                    }
                    trace!(line = locator.line(), tag = %element.local_name, "start element");
                    open.push(element.local_name.clone());
                    handler.start_element(&element);
                }
                Ok((ns, Event::End(end))) => {
                    let element = end_element(&end, ns);
                    trace!(line = locator.line(), tag = %element.local_name, "end element");
                    open.pop();
                    if open.is_empty() {
                        root_closed = true;
                    }
                    handler.end_element(&element);
                }
                Ok((_, Event::Text(text))) => {
                    let decoded = match text.unescape_with(|name| handler.get_entity(name)) {
                        Ok(decoded) => decoded,
                        Err(err) => {
                            self.fail(handler, &err.to_string());
                            break;
                        }
                    };
                    if decoded.chars().all(char::is_whitespace) {
                        handler.ignorable_whitespace(&decoded);
                    } else if open.is_empty() {
                        let message = if root_closed {
                            "Extra content at the end of the document"
                        } else {
                            "Start tag expected, '<' not found"
                        };
                        self.fail(handler, message);
                        break;
                    } else {
                        handler.characters(&decoded);
                    }
                }
                Ok((_, Event::CData(data))) => {
                    handler.cdata(&String::from_utf8_lossy(&data));
                }
                Ok((_, Event::Eof)) => {
                    if let Some(tag) = open.last() {
                        let message = format!("Premature end of data in tag {tag}");
                        self.fail(handler, &message);
                    } else if !root_closed {
                        self.fail(handler, "Document is empty");
                    }
                    break;
                }
                Ok(_) => {}
                Err(quick_xml::Error::Io(err)) => {
                    return Err(SaxError::Io(err.to_string()));
                }
                Err(err) => {
                    self.fail(handler, &err.to_string());
                    break;
                }
            }
            buf.clear();
        }
        handler.end_document();
        debug!(
            well_formed = self.well_formed,
            lines = locator.line(),
            "event source finished"
        );
        Ok(())
    }

    fn well_formed(&self) -> bool {
        self.well_formed
    }

    fn valid(&self) -> bool {
        true
    }
}

fn start_element(
    start: &BytesStart<'_>,
    ns: ResolveResult<'_>,
    handler: &dyn SaxHandler,
) -> Result<StartElement, quick_xml::Error> {
    let name = start.name();
    let mut element = StartElement {
        local_name: lossy(name.local_name().as_ref()),
        prefix: name.prefix().map(|prefix| lossy(prefix.as_ref())),
        namespace: namespace_uri(ns),
        namespaces: Vec::new(),
        attributes: Vec::new(),
    };
    for attr in start.attributes() {
        let attr = attr?;
        let value = attr
            .unescape_value_with(|entity| handler.get_entity(entity))?
            .into_owned();
        let key = attr.key.as_ref();
        if key == b"xmlns" {
            element.namespaces.push(NamespaceDecl {
                prefix: None,
                uri: value,
            });
        } else if let Some(prefix) = key.strip_prefix(b"xmlns:") {
            element.namespaces.push(NamespaceDecl {
                prefix: Some(lossy(prefix)),
                uri: value,
            });
        } else {
            element.attributes.push(XmlAttribute {
                local_name: lossy(attr.key.local_name().as_ref()),
                prefix: attr.key.prefix().map(|prefix| lossy(prefix.as_ref())),
                value,
            });
        }
    }
    Ok(element)
}

fn end_element(end: &BytesEnd<'_>, ns: ResolveResult<'_>) -> EndElement {
    let name = end.name();
    EndElement {
        local_name: lossy(name.local_name().as_ref()),
        prefix: name.prefix().map(|prefix| lossy(prefix.as_ref())),
        namespace: namespace_uri(ns),
    }
}

fn unbound_prefix(element: &StartElement) -> Option<&str> {
    match (&element.prefix, &element.namespace) {
        (Some(prefix), None) if prefix != "xml" => Some(prefix),
        _ => None,
    }
}

fn namespace_uri(ns: ResolveResult<'_>) -> Option<String> {
    match ns {
        ResolveResult::Bound(uri) => Some(lossy(uri.as_ref())),
        ResolveResult::Unbound | ResolveResult::Unknown(_) => None,
    }
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
