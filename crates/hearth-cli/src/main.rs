mod commands;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::{EXIT_BOOTSTRAP_ERROR, EXIT_CONFIG_ERROR, EXIT_FAILURE};
use hearth_core::install_signal_handler;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "hearth",
    version,
    about = "Bootstrap and lifecycle management for an embedded search engine"
)]
struct Cli {
    /// Directory of the configuration store.
    #[arg(long, default_value = "~/.local/share/hearth", global = true)]
    store: String,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Bootstrap the engine and run until interrupted.
    Start {
        /// Engine settings file (TOML).
        #[arg(long)]
        settings: Option<PathBuf>,
        /// Engine home directory (overrides settings and HEARTH_HOME).
        #[arg(long)]
        home: Option<PathBuf>,
        /// Schema location: URL, file path, or bundled name.
        #[arg(long)]
        schema: Option<String>,
        /// Engine config location: URL, file path, or bundled name.
        #[arg(long)]
        config: Option<String>,
        /// Stop immediately after a successful start.
        #[arg(long, default_value_t = false)]
        once: bool,
    },
    /// Show which strategy resolves a resource name.
    Resolve {
        /// URL, file path, or bundled name.
        name: String,
    },
    /// Copy bundled default files into a directory without overwriting.
    Deploy {
        /// Destination directory.
        dir: PathBuf,
        /// Files to deploy (defaults to every bundled file).
        names: Vec<String>,
    },
    /// Ensure the engine's logging configuration exists and print it.
    LogConfig,
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
    /// Generate man pages in the specified directory.
    ManPages {
        /// Output directory for man pages.
        #[arg(default_value = "man")]
        dir: PathBuf,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("HEARTH_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let store_path = expand_tilde(&cli.store);
    let json_output = cli.json;

    let result = match cli.command {
        Commands::Start {
            settings,
            home,
            schema,
            config,
            once,
        } => {
            install_signal_handler();
            commands::start::run(
                &store_path,
                &commands::start::StartOptions {
                    settings,
                    home,
                    schema,
                    config,
                    once,
                },
                json_output,
            )
        }
        Commands::Resolve { name } => commands::resolve::run(&name, json_output),
        Commands::Deploy { dir, names } => commands::deploy::run(&dir, &names, json_output),
        Commands::LogConfig => commands::log_config::run(&store_path, json_output),
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
        Commands::ManPages { dir } => commands::man_pages::run::<Cli>(&dir),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            let code = if msg.starts_with("bootstrap failed:") {
                EXIT_BOOTSTRAP_ERROR
            } else if msg.starts_with("config store error:") || msg.starts_with("settings error:")
            {
                EXIT_CONFIG_ERROR
            } else {
                EXIT_FAILURE
            };
            ExitCode::from(code)
        }
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(stripped);
        }
    }
    PathBuf::from(path)
}
