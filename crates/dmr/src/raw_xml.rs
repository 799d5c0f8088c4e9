//! Re-serialization of XML captured inside an `OtherXML` attribute.
//!
//! Output is canonical rather than a byte copy: namespace declarations come
//! before ordinary attributes (each group in document order), empty elements
//! are written with an explicit end tag, and text and attribute values are
//! re-escaped.

use dmr_sax::{EndElement, StartElement};
use quick_xml::escape::{escape, partial_escape};

#[derive(Debug, Default)]
pub(crate) struct RawXml {
    buf: String,
    depth: usize,
}

impl RawXml {
    /// Number of captured elements currently open.
    pub(crate) fn depth(&self) -> usize {
        self.depth
    }

    pub(crate) fn open(&mut self, element: &StartElement) {
        self.depth += 1;
        self.buf.push('<');
        push_qualified(&mut self.buf, element.prefix.as_deref(), &element.local_name);
        for decl in &element.namespaces {
            self.buf.push_str(" xmlns");
            if let Some(prefix) = &decl.prefix {
                self.buf.push(':');
                self.buf.push_str(prefix);
            }
            push_value(&mut self.buf, &decl.uri);
        }
        for attr in &element.attributes {
            self.buf.push(' ');
            push_qualified(&mut self.buf, attr.prefix.as_deref(), &attr.local_name);
            push_value(&mut self.buf, &attr.value);
        }
        self.buf.push('>');
    }

    /// Write the end tag of a captured element. Returns `false`, writing
    /// nothing, when no captured element is open.
    pub(crate) fn close(&mut self, element: &EndElement) -> bool {
        if self.depth == 0 {
            return false;
        }
        self.depth -= 1;
        self.buf.push_str("</");
        push_qualified(&mut self.buf, element.prefix.as_deref(), &element.local_name);
        self.buf.push('>');
        true
    }

    pub(crate) fn text(&mut self, text: &str) {
        self.buf.push_str(&partial_escape(text));
    }

    pub(crate) fn cdata(&mut self, text: &str) {
        self.buf.push_str("<![CDATA[");
        self.buf.push_str(text);
        self.buf.push_str("]]>");
    }

    /// Hand back the captured text and reset for the next attribute.
    pub(crate) fn take(&mut self) -> String {
        self.depth = 0;
        std::mem::take(&mut self.buf)
    }
}

fn push_qualified(buf: &mut String, prefix: Option<&str>, local_name: &str) {
    if let Some(prefix) = prefix {
        buf.push_str(prefix);
        buf.push(':');
    }
    buf.push_str(local_name);
}

fn push_value(buf: &mut String, value: &str) {
    buf.push_str("=\"");
    buf.push_str(&escape(value));
    buf.push('"');
}
