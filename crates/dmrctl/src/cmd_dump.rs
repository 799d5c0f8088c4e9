use std::fmt::Write;
use std::path::Path;

use anyhow::{Context, Result};
use dmr::model::{AttributeValue, Attributes, DimRef, Dmr, Group, Variable};
use tracing::info;

use crate::common;

pub fn run(path: &Path, json: bool) -> Result<()> {
    let name = common::display_name(path);
    let input = common::open_input(path)?;
    info!(input = %name, "dumping DMR");
    let doc = dmr::parse_reader(input).with_context(|| format!("parse {name}"))?;
    if json {
        common::print_json(&doc)?;
    } else {
        print!("{}", render(&doc));
    }
    Ok(())
}

/// Indented outline of the dataset tree.
pub fn render(doc: &Dmr) -> String {
    let mut out = String::new();
    let _ = write!(out, "Dataset {}", doc.name());
    if let Some(version) = &doc.dap_version {
        let _ = write!(out, " (DAP {version})");
    }
    out.push('\n');
    render_group_body(&mut out, doc.root(), 1);
    out
}

fn indent(out: &mut String, depth: usize) {
    out.extend(std::iter::repeat("  ").take(depth));
}

fn render_group_body(out: &mut String, group: &Group, depth: usize) {
    render_attributes(out, &group.attributes, depth);
    for dim in group.dimensions() {
        indent(out, depth);
        match dim.size() {
            Some(size) => {
                let _ = writeln!(out, "Dimension {} = {size}", dim.name);
            }
            None => {
                let _ = writeln!(out, "Dimension {} = *", dim.name);
            }
        }
    }
    for def in group.enumerations() {
        indent(out, depth);
        let constants: Vec<_> = def
            .constants()
            .iter()
            .map(|(label, value)| format!("{label} = {value}"))
            .collect();
        let _ = writeln!(
            out,
            "Enumeration {}: {} {{ {} }}",
            def.name(),
            def.base(),
            constants.join(", ")
        );
    }
    for var in group.variables() {
        render_variable(out, var, depth);
    }
    for sub in group.groups() {
        indent(out, depth);
        let _ = writeln!(out, "Group {}", sub.name());
        render_group_body(out, sub, depth + 1);
    }
}

fn render_variable(out: &mut String, var: &Variable, depth: usize) {
    indent(out, depth);
    let _ = write!(out, "{} {}", var.ty(), var.name());
    for dim in var.dimensions() {
        match dim {
            DimRef::Named(name) => {
                let _ = write!(out, "[{name}]");
            }
            DimRef::Size(size) => {
                let _ = write!(out, "[{size}]");
            }
        }
    }
    if let Variable::Scalar(scalar) = var {
        if let Some(path) = &scalar.enumeration {
            let _ = write!(out, " (enum {path})");
        }
    }
    out.push('\n');
    render_attributes(out, var.attributes(), depth + 1);
    for member in var.members() {
        render_variable(out, member, depth + 1);
    }
}

fn render_attributes(out: &mut String, attrs: &Attributes, depth: usize) {
    for attr in attrs {
        indent(out, depth);
        let _ = write!(out, "@{} ({})", attr.name(), attr.ty());
        match attr.value() {
            AttributeValue::Values(values) => {
                let quoted: Vec<_> = values.iter().map(|v| format!("{v:?}")).collect();
                let _ = writeln!(out, ": {}", quoted.join(", "));
            }
            AttributeValue::OtherXml(xml) => {
                let _ = writeln!(out, ": {xml}");
            }
            AttributeValue::Container(children) => {
                out.push('\n');
                render_attributes(out, children, depth + 1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_outline() {
        let doc = dmr::parse_str(
            r#"<Dataset name="sst.nc" dapVersion="4.0">
                 <Dimension name="time" size="12"/>
                 <Enumeration name="flag" basetype="Byte"><EnumConst name="ok" value="0"/></Enumeration>
                 <Float32 name="sst">
                   <Dim name="/time"/>
                   <Attribute name="units" type="String"><value>K</value></Attribute>
                 </Float32>
                 <Group name="inner"><Enum name="q" enum="/flag"/></Group>
               </Dataset>"#,
        )
        .expect("parse");
        assert_eq!(
            render(&doc),
            "Dataset sst.nc (DAP 4.0)\n\
             \x20 Dimension time = 12\n\
             \x20 Enumeration flag: Byte { ok = 0 }\n\
             \x20 Float32 sst[/time]\n\
             \x20   @units (String): \"K\"\n\
             \x20 Group inner\n\
             \x20   Enum q (enum /flag)\n"
        );
    }
}
