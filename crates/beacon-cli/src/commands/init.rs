use std::path::Path;

use anyhow::{Context, bail};
use beacon_core::{BeaconConfig, Nrn, NrnKind};

pub fn init(
    base_url: &str,
    tenant: &str,
    name: &str,
    feature_instance: &str,
    output: &Path,
) -> anyhow::Result<()> {
    if output.exists() {
        bail!("{} already exists", output.display());
    }
    let rendered = scaffold(base_url, tenant, name, feature_instance)?;
    std::fs::write(output, rendered)
        .with_context(|| format!("failed to write {}", output.display()))?;
    println!("✓ Generated {}", output.display());
    Ok(())
}

fn scaffold(
    base_url: &str,
    tenant: &str,
    name: &str,
    feature_instance: &str,
) -> anyhow::Result<String> {
    let fin = Nrn::parse(feature_instance)?;
    if *fin.kind() != NrnKind::FeatureInstance {
        bail!("{fin} is a {} address, expected a feature instance (fin)", fin.kind());
    }
    let config = BeaconConfig::scaffold(base_url, tenant, name, feature_instance);
    Ok(config.to_toml_string()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIN: &str = "nrn:beacon:acme:fin:api:1.0.0:blue::blue";

    #[test]
    fn writes_loadable_config() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("beacon.toml");
        init("http://localhost:9005/", "acme", "api", FIN, &output).unwrap();

        let config = BeaconConfig::from_file(&output).unwrap();
        let system = config.system.unwrap();
        assert_eq!(system.name, "api");
        assert_eq!(system.feature_instance_path, FIN);

        // Never overwrites.
        assert!(init("http://localhost:9005/", "acme", "api", FIN, &output).is_err());
    }

    #[test]
    fn rejects_non_feature_instance() {
        let sys = "nrn:beacon:acme:sys:api:1.0.0:blue::api";
        assert!(scaffold("http://b", "acme", "api", sys).is_err());
        assert!(scaffold("http://b", "acme", "api", "not-an-nrn").is_err());
    }
}
