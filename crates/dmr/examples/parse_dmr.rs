use std::error::Error;

use dmr::model::AttributeValue;
use tracing::info;

const DMR: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Dataset xmlns="http://xml.opendap.org/ns/DAP/4.0#" name="coads_climatology.nc"
         dapVersion="4.0" dmrVersion="1.0">
    <Dimension name="TIME" size="12"/>
    <Dimension name="COADSY" size="90"/>
    <Dimension name="COADSX" size="180"/>
    <Float64 name="TIME">
        <Dim name="/TIME"/>
        <Attribute name="units" type="String">
            <value>hour since 0000-01-01 00:00:00</value>
        </Attribute>
    </Float64>
    <Float32 name="SST">
        <Dim name="/TIME"/>
        <Dim name="/COADSY"/>
        <Dim name="/COADSX"/>
        <Attribute name="missing_value" type="Float32">
            <value>-1.00000001e+10</value>
        </Attribute>
        <Attribute name="long_name" type="String">
            <value>SEA SURFACE TEMPERATURE</value>
        </Attribute>
    </Float32>
    <Attribute name="NC_GLOBAL" type="Container">
        <Attribute name="history" type="String">
            <value>FERRET V4.30 (debug/no GUI) 15-Aug-96</value>
        </Attribute>
    </Attribute>
    <Attribute name="footprint" type="OtherXML">
        <gml:Envelope xmlns:gml="http://www.opengis.net/gml"><gml:lowerCorner>-90 -180</gml:lowerCorner></gml:Envelope>
    </Attribute>
</Dataset>
"#;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();
    let dmr = dmr::parse_str(DMR)?;
    info!(dataset = %dmr.name(), "parsed");

    for dim in dmr.root().dimensions() {
        println!("dimension {:<8} {:?}", dim.name, dim.size);
    }
    for var in dmr.root().variables() {
        println!("{} {} dims={:?}", var.ty(), var.name(), var.dimensions());
        for attr in var.attributes() {
            println!("    {} = {:?}", attr.name(), attr.values());
        }
    }
    if let Some(history) = dmr.root().attributes.find("NC_GLOBAL.history") {
        println!("history: {}", history.values().join(" "));
    }
    if let Some(attr) = dmr.root().attributes.get("footprint") {
        if let AttributeValue::OtherXml(xml) = attr.value() {
            println!("footprint: {}", xml.trim());
        }
    }
    Ok(())
}
