use super::{json_pretty, EXIT_SUCCESS};
use hearth_config::{FileConfigStore, LoggingConfigRegistrar};
use std::path::Path;

pub fn run(store_path: &Path, json: bool) -> Result<u8, String> {
    let store = FileConfigStore::new(store_path);
    let config = LoggingConfigRegistrar::new(&store)
        .ensure_logging_config()
        .map_err(|e| format!("config store error: {e}"))?;
    let record = config.record();

    if json {
        println!("{}", json_pretty(record)?);
    } else {
        let status = if config.was_created() {
            "created"
        } else {
            "existing"
        };
        println!("pid:     {} ({status})", record.pid);
        if let Some(factory) = &record.factory_pid {
            println!("factory: {factory}");
        }
        for (key, value) in &record.properties {
            println!("  {key} = {value}");
        }
    }
    Ok(EXIT_SUCCESS)
}
