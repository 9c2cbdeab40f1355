use super::{colorize_state, json_pretty, EXIT_SUCCESS};
use hearth_resource::{Bundle, ResourceResolver};
use serde::Serialize;

#[derive(Serialize)]
struct Resolution<'a> {
    name: &'a str,
    strategy: String,
    bytes: usize,
}

pub fn run(name: &str, json: bool) -> Result<u8, String> {
    let resolver = ResourceResolver::new(Bundle::defaults());
    let resource = resolver.resolve(name).map_err(|e| e.to_string())?;
    let strategy = resource.strategy().to_string();
    let bytes = resource
        .into_bytes()
        .map_err(|e| format!("failed to read '{name}': {e}"))?
        .len();

    if json {
        let out = Resolution {
            name,
            strategy,
            bytes,
        };
        println!("{}", json_pretty(&out)?);
    } else {
        println!("{name}: {} ({bytes} bytes)", colorize_state(&strategy));
    }
    Ok(EXIT_SUCCESS)
}
