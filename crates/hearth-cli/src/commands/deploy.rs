use super::{json_pretty, EXIT_SUCCESS};
use hearth_resource::{Bundle, DefaultFileDeployer, DeployOutcome};
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct Deployed {
    name: String,
    path: String,
    deployed: bool,
}

pub fn run(dir: &Path, names: &[String], json: bool) -> Result<u8, String> {
    let bundle = Bundle::defaults();
    let names: Vec<String> = if names.is_empty() {
        bundle.names()
    } else {
        names.to_vec()
    };
    let deployer = DefaultFileDeployer::new(bundle);

    let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let outcomes = deployer
        .deploy_all(dir, &name_refs)
        .map_err(|e| e.to_string())?;
    let results: Vec<Deployed> = names
        .into_iter()
        .zip(outcomes)
        .map(|(name, outcome)| Deployed {
            name,
            path: outcome.path().display().to_string(),
            deployed: matches!(outcome, DeployOutcome::Deployed(_)),
        })
        .collect();

    if json {
        println!("{}", json_pretty(&results)?);
    } else {
        for r in &results {
            let verb = if r.deployed { "deployed" } else { "kept" };
            println!("{verb:>8} {}", r.path);
        }
    }
    Ok(EXIT_SUCCESS)
}
