use std::path::Path;

use anyhow::{bail, Context, Result};
use dmr::model::Group;
use dmr::DmrError;
use serde::Serialize;
use tracing::info;

use crate::common;

#[derive(Serialize)]
struct CheckReport {
    input: String,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    dataset: Option<String>,
    variables: usize,
    groups: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Variables and groups below `group`, at any depth.
fn census(group: &Group) -> (usize, usize) {
    group
        .groups()
        .iter()
        .map(census)
        .fold((group.variables().len(), group.groups().len()), |acc, sub| {
            (acc.0 + sub.0, acc.1 + sub.1)
        })
}

pub fn run(path: &Path, json: bool) -> Result<()> {
    let name = common::display_name(path);
    let input = common::open_input(path)?;
    info!(input = %name, "checking DMR");

    let report = match dmr::parse_reader(input) {
        Ok(doc) => {
            let (variables, groups) = census(doc.root());
            CheckReport {
                input: name.clone(),
                ok: true,
                dataset: Some(doc.name().to_string()),
                variables,
                groups,
                error: None,
            }
        }
        Err(DmrError::Parse(msg)) => CheckReport {
            input: name.clone(),
            ok: false,
            dataset: None,
            variables: 0,
            groups: 0,
            error: Some(msg),
        },
        Err(err) => return Err(err).with_context(|| format!("read {name}")),
    };

    if json {
        common::print_json(&report)?;
    } else if let Some(error) = &report.error {
        eprintln!("{name}: {error}");
    } else {
        println!(
            "{name}: ok, dataset '{}' with {} variables in {} groups",
            report.dataset.as_deref().unwrap_or_default(),
            report.variables,
            report.groups
        );
    }
    if !report.ok {
        bail!("{name} is not a valid DMR document");
    }
    Ok(())
}
