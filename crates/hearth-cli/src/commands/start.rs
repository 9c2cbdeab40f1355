use super::{colorize_state, json_pretty, spin_fail, spin_ok, spinner, EXIT_SUCCESS};
use hearth_config::FileConfigStore;
use hearth_core::{select_library, shutdown_requested, EngineLifecycle, EngineSettings};
use hearth_resource::{Bundle, ResourceResolver};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub struct StartOptions {
    pub settings: Option<PathBuf>,
    pub home: Option<PathBuf>,
    pub schema: Option<String>,
    pub config: Option<String>,
    pub once: bool,
}

#[derive(Serialize)]
struct StartReport<'a> {
    state: String,
    home: &'a Path,
    data_dir: &'a Path,
    cores: &'a [String],
}

fn load_settings(opts: &StartOptions) -> Result<EngineSettings, String> {
    let mut settings = match &opts.settings {
        Some(path) => EngineSettings::load(path).map_err(|e| e.to_string())?,
        None => EngineSettings::default(),
    };
    if let Some(home) = &opts.home {
        settings.home = Some(home.clone());
    }
    if let Some(schema) = &opts.schema {
        settings.schema_location.clone_from(schema);
    }
    if let Some(config) = &opts.config {
        settings.config_location.clone_from(config);
    }
    Ok(settings)
}

pub fn run(store_path: &Path, opts: &StartOptions, json: bool) -> Result<u8, String> {
    let settings = load_settings(opts)?;
    let library = select_library(&settings.library).map_err(|e| e.to_string())?;
    let lifecycle = EngineLifecycle::new(
        library,
        Arc::new(ResourceResolver::new(Bundle::defaults())),
        Arc::new(FileConfigStore::new(store_path)),
    );

    let pb = (!json).then(|| spinner("starting engine..."));
    let server = match lifecycle.start(&settings) {
        Ok(server) => {
            if let Some(pb) = &pb {
                spin_ok(pb, "engine started");
            }
            server
        }
        Err(e) => {
            if let Some(pb) = &pb {
                spin_fail(pb, "engine failed to start");
            }
            return Err(e.to_string());
        }
    };

    let state = lifecycle.state().to_string();
    if json {
        let report = StartReport {
            state,
            home: server.home(),
            data_dir: server.data_dir(),
            cores: server.core_names(),
        };
        println!("{}", json_pretty(&report)?);
    } else {
        println!("state: {}", colorize_state(&state));
        println!("home:  {}", server.home().display());
        println!("data:  {}", server.data_dir().display());
        println!("cores: {}", server.core_names().join(", "));
    }

    if !opts.once {
        if !json {
            println!("press Ctrl-C to stop");
        }
        while !shutdown_requested() {
            std::thread::sleep(Duration::from_millis(200));
        }
    }

    lifecycle.stop().map_err(|e| e.to_string())?;
    if !json {
        println!("state: {}", colorize_state(&lifecycle.state().to_string()));
    }
    Ok(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> StartOptions {
        StartOptions {
            settings: None,
            home: None,
            schema: None,
            config: None,
            once: true,
        }
    }

    #[test]
    fn flags_override_settings_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hearth.toml");
        std::fs::write(&path, "schema_location = \"a.xml\"\nhome = \"/from/file\"\n").unwrap();

        let settings = load_settings(&StartOptions {
            settings: Some(path),
            home: Some(PathBuf::from("/from/flag")),
            ..opts()
        })
        .unwrap();
        assert_eq!(settings.home, Some(PathBuf::from("/from/flag")));
        assert_eq!(settings.schema_location, "a.xml");
        assert_eq!(settings.config_location, "solrconfig.xml");
    }

    #[test]
    fn missing_settings_file_is_a_settings_error() {
        let err = load_settings(&StartOptions {
            settings: Some(PathBuf::from("/nonexistent/hearth.toml")),
            ..opts()
        })
        .unwrap_err();
        assert!(err.starts_with("settings error:"));
    }
}
