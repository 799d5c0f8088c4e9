#![cfg_attr(docsrs, feature(doc_cfg))]
//! DAP4 Dataset Metadata Response (DMR) parser.
//!
//! The parser reads a DMR XML document as a stream of SAX events and builds
//! the [`model::Dmr`] tree: groups, variables (scalars, structures and
//! arrays), shared dimensions, enumerations and attribute metadata.
//!
//! ```rust
//! let dmr = dmr::parse_str(
//!     r#"<Dataset name="sst.nc" dapVersion="4.0">
//!          <Dimension name="time" size="12"/>
//!          <Float32 name="sst"><Dim name="/time"/></Float32>
//!        </Dataset>"#,
//! )?;
//! assert_eq!(dmr.name(), "sst.nc");
//! assert_eq!(dmr.root().variables()[0].dimensions().len(), 1);
//! # Ok::<(), dmr::DmrError>(())
//! ```
//!
//! Errors carry every diagnostic found, each prefixed with its line:
//!
//! ```rust
//! let err = dmr::parse_str("<Group name=\"g\"/>").unwrap_err();
//! assert!(err.to_string().contains("At line 1: Expected DMR to start with a Dataset element"));
//! ```

mod builders;
mod diagnostics;
mod parser;
mod raw_xml;
mod state;

use std::io::BufRead;

use thiserror::Error;
use tracing::{debug, info};

pub use dap_types;
pub use dmr_model as model;
pub use dmr_sax as sax;

pub use dmr_model::Dmr;

use dmr_sax::{EventSource, QuickXmlSource, SaxError};
use parser::Dispatcher;

const NOT_WELL_FORMED: &str = "The DMR is not a well formed XML document.";
const NOT_VALID: &str = "The DMR is not a valid document.";
const PARSE_FAILED: &str = "Error parsing DMR response.";

/// Error type produced by the DMR parser.
#[derive(Debug, Error)]
pub enum DmrError {
    /// The document was rejected; the text holds a summary line followed by
    /// the line-numbered diagnostics.
    #[error("{0}")]
    Parse(String),
    /// The input could not be read.
    #[error("io: {0}")]
    Io(String),
}

impl From<SaxError> for DmrError {
    fn from(err: SaxError) -> Self {
        match err {
            SaxError::Io(msg) => DmrError::Io(msg),
        }
    }
}

/// Parser configuration.
#[derive(Debug, Clone, Default)]
pub struct ParserOptions {
    /// Ask the event source for schema validation.
    pub validate: bool,
}

/// Reusable DMR parser.
#[derive(Debug, Clone, Default)]
pub struct DmrParser {
    options: ParserOptions,
}

impl DmrParser {
    pub fn new(options: ParserOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    /// Parse `input` into `dest`, adding to whatever it already holds.
    ///
    /// `dest` is only modified when the whole document is accepted.
    pub fn intern<R: BufRead>(&self, input: R, dest: &mut Dmr) -> Result<(), DmrError> {
        let mut source = QuickXmlSource::new().validate(self.options.validate);
        self.intern_with(&mut source, input, dest)
    }

    pub fn intern_str(&self, document: &str, dest: &mut Dmr) -> Result<(), DmrError> {
        self.intern(document.as_bytes(), dest)
    }

    /// Like [`DmrParser::intern`] with a caller supplied event source.
    pub fn intern_with<R: BufRead>(
        &self,
        source: &mut dyn EventSource,
        mut input: R,
        dest: &mut Dmr,
    ) -> Result<(), DmrError> {
        let mut work = dest.clone();
        let mut dispatcher = Dispatcher::new(&mut work);
        source.parse(&mut input, &mut dispatcher)?;
        let outcome = dispatcher.finish();

        let header = if !source.well_formed() {
            Some(NOT_WELL_FORMED)
        } else if !source.valid() {
            Some(NOT_VALID)
        } else if outcome.is_err() {
            Some(PARSE_FAILED)
        } else {
            None
        };
        if let Some(header) = header {
            let diagnostics = outcome.err().unwrap_or_default();
            debug!(%header, "rejected DMR document");
            return Err(DmrError::Parse(format!("{header}\n{diagnostics}")));
        }

        info!(
            dataset = %work.name(),
            variables = work.root().variables().len(),
            groups = work.root().groups().len(),
            "parsed DMR"
        );
        *dest = work;
        Ok(())
    }
}

/// Parse a DMR document held in memory.
pub fn parse_str(document: &str) -> Result<Dmr, DmrError> {
    parse_reader(document.as_bytes())
}

/// Parse a DMR document from a buffered reader.
pub fn parse_reader<R: BufRead>(input: R) -> Result<Dmr, DmrError> {
    let mut dmr = Dmr::default();
    DmrParser::default().intern(input, &mut dmr)?;
    Ok(dmr)
}

/// Parse a DMR document into an existing model.
pub fn parse_into<R: BufRead>(input: R, dest: &mut Dmr) -> Result<(), DmrError> {
    DmrParser::default().intern(input, dest)
}

#[cfg(test)]
mod tests {
    use std::io::{self, BufReader, Read};

    use dap_types::{AttributeType, Type};
    use dmr_model::{DimRef, DimensionSize, VariableKind};
    use dmr_sax::{Locator, SaxHandler, StartElement, XmlAttribute};

    use super::*;

    const DAP_NS: &str = "http://xml.opendap.org/ns/DAP/4.0#";

    fn parse_err(document: &str) -> String {
        match parse_str(document) {
            Err(DmrError::Parse(msg)) => msg,
            other => panic!("expected a parse error, got {other:?}"),
        }
    }

    #[test]
    fn minimal_dataset() {
        let dmr = parse_str(r#"<Dataset name="X"><Int32 name="a"/></Dataset>"#).expect("parse");
        assert_eq!(dmr.name(), "X");
        let vars = dmr.root().variables();
        assert_eq!(vars.len(), 1);
        assert_eq!(vars[0].name(), "a");
        assert_eq!(vars[0].ty(), Type::Int32);
        assert_eq!(vars[0].kind(), VariableKind::Scalar);
    }

    #[test]
    fn dataset_metadata() {
        let dmr = parse_str(&format!(
            r#"<Dataset xmlns="{DAP_NS}" name="d" dapVersion="4.0" dmrVersion="1.0"
                 xml:base="http://test.opendap.org/data/d.nc"/>"#
        ))
        .expect("parse");
        assert_eq!(dmr.dap_version.as_deref(), Some("4.0"));
        assert_eq!(dmr.dmr_version.as_deref(), Some("1.0"));
        assert_eq!(
            dmr.request_xml_base.as_deref(),
            Some("http://test.opendap.org/data/d.nc")
        );
        assert_eq!(dmr.namespace.as_deref(), Some(DAP_NS));
    }

    #[test]
    fn root_must_be_dataset() {
        let msg = parse_err(r#"<Group name="g"/>"#);
        assert!(msg.starts_with(PARSE_FAILED), "{msg}");
        assert!(
            msg.contains("At line 1: Expected DMR to start with a Dataset element; found 'Group' instead."),
            "{msg}"
        );
    }

    #[test]
    fn dataset_requires_name() {
        let msg = parse_err("<Dataset/>");
        assert!(msg.contains("Required attribute 'name' not found"), "{msg}");
    }

    #[test]
    fn dimensions() {
        let dmr = parse_str(
            r#"<Dataset name="d">
                 <Dimension name="time" size="12"/>
                 <Dimension name="obs" size="*"/>
               </Dataset>"#,
        )
        .expect("parse");
        let root = dmr.root();
        assert_eq!(
            root.dimension("time").map(|dim| dim.size),
            Some(DimensionSize::Fixed(12))
        );
        assert!(root.dimension("obs").expect("obs").is_varying());

        let msg = parse_err(r#"<Dataset name="d"><Dimension name="time"/></Dataset>"#);
        assert!(msg.contains("Required attribute 'size' not found"), "{msg}");
    }

    #[test]
    fn dimension_children_are_skipped() {
        let dmr = parse_str(
            r#"<Dataset name="d">
                 <Dimension name="n" size="3"><Note><Deep/></Note></Dimension>
                 <Int8 name="v"/>
               </Dataset>"#,
        )
        .expect("parse");
        assert_eq!(dmr.root().dimension("n").and_then(|d| d.size()), Some(3));
        assert_eq!(dmr.root().variables().len(), 1);
    }

    #[test]
    fn dimensions_belong_to_their_group() {
        let dmr = parse_str(
            r#"<Dataset name="d">
                 <Group name="inner"><Dimension name="x" size="2"/></Group>
               </Dataset>"#,
        )
        .expect("parse");
        assert!(dmr.root().dimension("x").is_none());
        let inner = dmr.root().group("inner").expect("inner");
        assert_eq!(inner.dimension("x").and_then(|d| d.size()), Some(2));
    }

    #[test]
    fn enumerations() {
        let dmr = parse_str(
            r#"<Dataset name="d">
                 <Enumeration name="colors" basetype="Byte">
                   <EnumConst name="red" value="1"/>
                   <EnumConst name="green" value="2"/>
                 </Enumeration>
                 <Group name="g"><Enum name="c" enum="/colors"/></Group>
               </Dataset>"#,
        )
        .expect("parse");
        let colors = dmr.root().enumeration("colors").expect("colors");
        assert_eq!(colors.base(), Type::Byte);
        assert_eq!(colors.value_of("green"), Some(2));
        let var = dmr.root().group("g").and_then(|g| g.variable("c")).expect("c");
        match var {
            dmr_model::Variable::Scalar(scalar) => {
                assert_eq!(scalar.enumeration.as_deref(), Some("/colors"))
            }
            other => panic!("unexpected variable {other:?}"),
        }
    }

    #[test]
    fn enumeration_base_must_be_integer() {
        let msg = parse_err(
            r#"<Dataset name="d"><Enumeration name="e" basetype="Float64"/></Dataset>"#,
        );
        assert!(
            msg.contains("The Enumeration 'e' must have an integer type, instead the type 'Float64' was used."),
            "{msg}"
        );
    }

    #[test]
    fn enumeration_constant_out_of_range() {
        let msg = parse_err(
            r#"<Dataset name="d">
                 <Enumeration name="e" basetype="Int8"><EnumConst name="big" value="300"/></Enumeration>
               </Dataset>"#,
        );
        assert!(msg.contains("'300'") && msg.contains("'Int8'"), "{msg}");
    }

    #[test]
    fn arrays_from_dims() {
        let dmr = parse_str(
            r#"<Dataset name="d">
                 <Float32 name="sst">
                   <Dim name="/lat"/>
                   <Dim size="4"/>
                   <Attribute name="units" type="String"><value>K</value></Attribute>
                 </Float32>
               </Dataset>"#,
        )
        .expect("parse");
        let sst = dmr.root().variable("sst").expect("sst");
        assert_eq!(sst.kind(), VariableKind::Array);
        assert_eq!(sst.ty(), Type::Float32);
        assert_eq!(
            sst.dimensions(),
            [DimRef::Named("/lat".into()), DimRef::Size(4)]
        );
        assert_eq!(sst.attributes().get("units").map(|a| a.values()), Some(&["K".to_string()][..]));
    }

    #[test]
    fn array_of_structures_keeps_members() {
        let dmr = parse_str(
            r#"<Dataset name="d">
                 <Structure name="s">
                   <Int32 name="a"/>
                   <Dim size="10"/>
                   <Float64 name="b"/>
                 </Structure>
               </Dataset>"#,
        )
        .expect("parse");
        let s = dmr.root().variable("s").expect("s");
        assert_eq!(s.kind(), VariableKind::Array);
        assert_eq!(s.ty(), Type::Structure);
        let names: Vec<_> = s.members().iter().map(|m| m.name()).collect();
        assert_eq!(names, ["a", "b"]);
        assert!(dmr.root().find_variable("/s/b").is_some());
    }

    #[test]
    fn scalar_arrays_take_no_members() {
        let msg = parse_err(
            r#"<Dataset name="d"><Int16 name="v"><Dim size="2"/><Int8 name="m"/></Int16></Dataset>"#,
        );
        assert!(
            msg.contains("Expected an 'Attribute' or 'Dim' element; found 'Int8' instead."),
            "{msg}"
        );
    }

    #[test]
    fn document_order_is_kept() {
        let dmr = parse_str(
            r#"<Dataset name="d">
                 <Int32 name="c"/>
                 <Group name="z"/>
                 <Int32 name="a"/>
                 <Group name="y"/>
                 <Int32 name="b"/>
               </Dataset>"#,
        )
        .expect("parse");
        let vars: Vec<_> = dmr.root().variables().iter().map(|v| v.name()).collect();
        assert_eq!(vars, ["c", "a", "b"]);
        let groups: Vec<_> = dmr.root().groups().iter().map(|g| g.name()).collect();
        assert_eq!(groups, ["z", "y"]);
    }

    #[test]
    fn nested_attribute_containers() {
        let dmr = parse_str(
            r#"<Dataset name="d">
                 <Attribute name="NC_GLOBAL" type="Container">
                   <Attribute name="title" type="String"><value>Sea  surface</value></Attribute>
                   <Attribute name="inner" type="Container">
                     <Attribute name="n" type="Int32"><value>1</value><value>2</value></Attribute>
                   </Attribute>
                 </Attribute>
                 <Attribute name="top" type="url"><value>http://x</value></Attribute>
               </Dataset>"#,
        )
        .expect("parse");
        let attrs = &dmr.root().attributes;
        assert_eq!(
            attrs.find("NC_GLOBAL.title").map(|a| a.values()),
            Some(&["Sea  surface".to_string()][..])
        );
        let n = attrs.find("NC_GLOBAL.inner.n").expect("n");
        assert_eq!(n.ty(), AttributeType::Int32);
        assert_eq!(n.values(), ["1", "2"]);
        assert_eq!(attrs.get("top").map(|a| a.ty()), Some(AttributeType::Url));
    }

    #[test]
    fn redeclared_attribute_appends() {
        let dmr = parse_str(
            r#"<Dataset name="d">
                 <Attribute name="history" type="String"><value>a</value></Attribute>
                 <Attribute name="history" type="String"><value>b</value></Attribute>
               </Dataset>"#,
        )
        .expect("parse");
        let history = dmr.root().attributes.get("history").expect("history");
        assert_eq!(history.values(), ["a", "b"]);
        assert_eq!(dmr.root().attributes.len(), 1);
    }

    #[test]
    fn redeclared_attribute_with_other_type_fails() {
        let msg = parse_err(
            r#"<Dataset name="d">
                 <Attribute name="h" type="String"><value>a</value></Attribute>
                 <Attribute name="h" type="Int32"><value>1</value></Attribute>
               </Dataset>"#,
        );
        assert!(msg.contains("Could not add the Attribute 'h'"), "{msg}");
    }

    #[test]
    fn unknown_attribute_type_fails() {
        let msg = parse_err(r#"<Dataset name="d"><Attribute name="h" type="Widget"/></Dataset>"#);
        assert!(msg.contains("Unknown type 'Widget'"), "{msg}");
    }

    #[test]
    fn char_attribute_takes_values() {
        let dmr = parse_str(
            r#"<Dataset name="d"><Attribute name="c" type="Char"><value>65</value></Attribute></Dataset>"#,
        )
        .expect("parse");
        let c = dmr.root().attributes.get("c").expect("c");
        assert_eq!(c.ty(), AttributeType::Char);
        assert_eq!(c.values(), ["65"]);
    }

    #[test]
    fn other_xml_is_captured() {
        let dmr = parse_str(&format!(
            r#"<Dataset xmlns="{DAP_NS}" name="d"><Attribute name="geo" type="OtherXML"><gml:Point xmlns:gml="http://www.opengis.net/gml" gml:id="p1"><gml:pos>1 2</gml:pos></gml:Point></Attribute><Int8 name="v"/></Dataset>"#
        ))
        .expect("parse");
        let geo = dmr.root().attributes.get("geo").expect("geo");
        assert_eq!(geo.ty(), AttributeType::OtherXml);
        assert_eq!(
            geo.other_xml(),
            Some(
                r#"<gml:Point xmlns:gml="http://www.opengis.net/gml" gml:id="p1"><gml:pos>1 2</gml:pos></gml:Point>"#
            )
        );
        assert!(dmr.root().variable("v").is_some());
    }

    #[test]
    fn other_xml_keeps_dap_lookalikes() {
        let dmr = parse_str(
            r#"<Dataset name="d"><Attribute name="x" type="OtherXML"><Attribute name="inner"><Int32 name="no"/></Attribute></Attribute></Dataset>"#,
        )
        .expect("parse");
        assert_eq!(
            dmr.root().attributes.get("x").and_then(|a| a.other_xml()),
            Some(r#"<Attribute name="inner"><Int32 name="no"></Int32></Attribute>"#)
        );
        assert!(dmr.root().variables().is_empty());
    }

    #[test]
    fn cdata_outside_other_xml_fails() {
        let msg = parse_err(r#"<Dataset name="d"><![CDATA[raw]]></Dataset>"#);
        assert!(msg.contains("Found a CData block but none are allowed by DAP."), "{msg}");
    }

    #[test]
    fn unexpected_element_reports_line() {
        let msg = parse_err("<Dataset name=\"d\">\n  <Int32 name=\"a\"/>\n  <Bogus/>\n</Dataset>");
        assert!(
            msg.contains(
                "At line 3: Expected an Attribute, Enumeration, Dimension, Group or variable element; found 'Bogus' instead."
            ),
            "{msg}"
        );
    }

    #[test]
    fn only_first_structural_error_is_reported() {
        let msg = parse_err("<Dataset name=\"d\">\n<Bogus/>\n<Other/>\n</Dataset>");
        assert!(msg.contains("At line 2:") && msg.contains("'Bogus'"), "{msg}");
        assert!(!msg.contains("'Other'"), "{msg}");
        assert!(msg.contains("The document contained unbalanced tags."), "{msg}");
    }

    #[test]
    fn signed_dim_size_fails() {
        let msg =
            parse_err(r#"<Dataset name="d"><Int32 name="v"><Dim size="+2"/></Int32></Dataset>"#);
        assert!(msg.contains("The size '+2' of a Dim element"), "{msg}");
    }

    #[test]
    fn text_outside_root_is_not_well_formed() {
        let msg = parse_err(r#"<Dataset name="d"/>junk after root"#);
        assert!(msg.starts_with(NOT_WELL_FORMED), "{msg}");
        let msg = parse_err(r#"junk before<Dataset name="d"/>"#);
        assert!(msg.starts_with(NOT_WELL_FORMED), "{msg}");
    }

    #[test]
    fn truncated_document() {
        let msg = parse_err(r#"<Dataset name="d"><Group name="g">"#);
        assert!(msg.starts_with(NOT_WELL_FORMED), "{msg}");
        assert!(msg.contains("The document contained unbalanced tags."), "{msg}");
    }

    #[test]
    fn intern_adds_to_existing_model() {
        let parser = DmrParser::new(ParserOptions::default());
        let mut dmr = Dmr::default();
        parser
            .intern_str(r#"<Dataset name="first"><Int32 name="a"/></Dataset>"#, &mut dmr)
            .expect("first");
        parser
            .intern_str(r#"<Dataset name="second"><Int32 name="b"/></Dataset>"#, &mut dmr)
            .expect("second");
        assert_eq!(dmr.name(), "second");
        let names: Vec<_> = dmr.root().variables().iter().map(|v| v.name()).collect();
        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    fn failed_intern_leaves_model_untouched() {
        let mut dmr = parse_str(r#"<Dataset name="kept"><Int32 name="a"/></Dataset>"#).expect("parse");
        let before = dmr.clone();
        let err = parse_into(
            r#"<Dataset name="other"><Int32 name="b"/><Int32 name="a"/></Dataset>"#.as_bytes(),
            &mut dmr,
        )
        .unwrap_err();
        assert!(err.to_string().contains("already in use"), "{err}");
        assert_eq!(dmr, before);
    }

    struct Rejecting(QuickXmlSource);

    impl EventSource for Rejecting {
        fn parse(
            &mut self,
            input: &mut dyn BufRead,
            handler: &mut dyn SaxHandler,
        ) -> Result<(), SaxError> {
            self.0.parse(input, handler)
        }

        fn well_formed(&self) -> bool {
            self.0.well_formed()
        }

        fn valid(&self) -> bool {
            false
        }
    }

    #[test]
    fn invalid_document_is_rejected() {
        let parser = DmrParser::new(ParserOptions { validate: true });
        let mut source = Rejecting(QuickXmlSource::new());
        let mut dmr = Dmr::default();
        let err = parser
            .intern_with(&mut source, r#"<Dataset name="d"/>"#.as_bytes(), &mut dmr)
            .unwrap_err();
        assert!(matches!(&err, DmrError::Parse(msg) if msg.starts_with(NOT_VALID)), "{err}");
        assert_eq!(dmr.name(), "");
    }

    /// Replays a structural mistake followed by a lexical one.
    struct Scripted;

    impl EventSource for Scripted {
        fn parse(
            &mut self,
            _input: &mut dyn BufRead,
            handler: &mut dyn SaxHandler,
        ) -> Result<(), SaxError> {
            handler.set_document_locator(Locator::default());
            handler.start_document();
            handler.start_element(&StartElement {
                local_name: "Dataset".into(),
                attributes: vec![XmlAttribute {
                    local_name: "name".into(),
                    prefix: None,
                    value: "d".into(),
                }],
                ..StartElement::default()
            });
            handler.start_element(&StartElement {
                local_name: "Bogus".into(),
                ..StartElement::default()
            });
            handler.fatal_error(format_args!("Opening and ending tag mismatch"));
            handler.end_document();
            Ok(())
        }

        fn well_formed(&self) -> bool {
            false
        }

        fn valid(&self) -> bool {
            true
        }
    }

    #[test]
    fn source_errors_after_latch_are_recorded() {
        let parser = DmrParser::new(ParserOptions::default());
        let mut dmr = Dmr::default();
        let msg = match parser.intern_with(&mut Scripted, "".as_bytes(), &mut dmr) {
            Err(DmrError::Parse(msg)) => msg,
            other => panic!("expected a parse error, got {other:?}"),
        };
        assert!(msg.starts_with(NOT_WELL_FORMED), "{msg}");
        assert!(msg.contains("'Bogus'"), "{msg}");
        assert!(msg.contains("Opening and ending tag mismatch"), "{msg}");
    }

    struct Broken;

    impl Read for Broken {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "disk on fire"))
        }
    }

    #[test]
    fn read_failures_are_io_errors() {
        let err = parse_reader(BufReader::new(Broken)).unwrap_err();
        assert!(matches!(err, DmrError::Io(ref msg) if msg.contains("disk on fire")), "{err}");
    }
}
