use anyhow::{Context, bail};
use beacon_core::{Nrn, NrnKind};

pub fn parse(input: &str, format: &str) -> anyhow::Result<()> {
    let nrn = Nrn::parse(input)?;
    println!("{}", describe(&nrn, format)?);
    Ok(())
}

pub fn child(input: &str, system: Option<&str>, expectation: Option<&str>) -> anyhow::Result<()> {
    let nrn = Nrn::parse(input)?;
    println!("{}", derive(&nrn, system, expectation)?);
    Ok(())
}

fn describe(nrn: &Nrn, format: &str) -> anyhow::Result<String> {
    match format {
        "json" => {
            let doc = serde_json::json!({
                "nrn": nrn.to_string(),
                "tenant": nrn.tenant(),
                "kind": nrn.kind().as_str(),
                "feature": nrn.feature(),
                "version": nrn.version(),
                "instance": nrn.instance(),
                "systemPath": nrn.system_path(),
                "name": nrn.name(),
            });
            serde_json::to_string_pretty(&doc).context("failed to render NRN")
        }
        "text" => Ok([
            ("tenant", nrn.tenant()),
            ("kind", nrn.kind().as_str()),
            ("feature", nrn.feature()),
            ("version", nrn.version()),
            ("instance", nrn.instance()),
            ("system path", nrn.system_path()),
            ("name", nrn.name()),
        ]
        .iter()
        .map(|(k, v)| format!("{k:<12} {v}"))
        .collect::<Vec<_>>()
        .join("\n")),
        other => bail!("unknown format {other:?} (expected text or json)"),
    }
}

fn derive(nrn: &Nrn, system: Option<&str>, expectation: Option<&str>) -> anyhow::Result<Nrn> {
    match (system, expectation) {
        (Some(name), None) => {
            if *nrn.kind() == NrnKind::Expectation {
                bail!("{nrn} is an expectation and cannot have child systems");
            }
            Ok(nrn.child_system(name))
        }
        (None, Some(name)) => {
            if *nrn.kind() != NrnKind::System {
                bail!("{nrn} is not a system; only systems own expectations");
            }
            Ok(nrn.child_expectation(name))
        }
        _ => bail!("pass exactly one of --system or --expectation"),
    }
}
