//! ArcCore CLI
//!
//! Interactive shell (or one-shot runner) over a persisted memory tree.

use arccore::interpreter::help_text;
use arccore::{ArcConfig, GuardianIdentity, Interpreter, MemoryStore, MemorySystem};
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const PROMPT: &str = "ac> ";

/// ArcCore - policy-gated conversation memory
#[derive(Parser, Debug)]
#[command(name = "arccore")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// ArcCore home directory (defaults to $ARCCORE_HOME or ~/.arccore)
    #[arg(long)]
    home: Option<PathBuf>,

    /// Path to a config file (defaults to <home>/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to the persisted memory tree
    #[arg(long)]
    memory_file: Option<PathBuf>,

    /// Do not save the tree on exit
    #[arg(long)]
    no_autosave: bool,

    /// Verbose output: debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Run a single command and exit, e.g. `arccore walk`
    #[arg(trailing_var_arg = true)]
    command: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_log_level(cli.verbose)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli)?;
    info!("ArcCore home: {:?}", config.home);
    info!("Memory file: {:?}", config.memory_file);

    let store = MemoryStore::new(config.memory_file.clone());
    let (memory, loaded) = open_memory(&store, &config).await;
    let autosave = config.autosave && loaded;

    let guardian = GuardianIdentity::boot(config.guardian_name.clone());
    let mut interpreter = Interpreter::new(memory, guardian).with_store(store);

    if cli.command.is_empty() {
        run_shell(&mut interpreter).await?;
    } else {
        let line = cli.command.join(" ");
        println!("{}", interpreter.execute(&line).await);
    }

    if autosave {
        if let Some(store) = interpreter.store() {
            if let Err(e) = store.save(interpreter.memory().root()).await {
                error!("Autosave failed: {}", e);
            }
        }
    }

    Ok(())
}

/// Level used when `RUST_LOG` is unset
fn default_log_level(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "info"
    }
}

/// Load the persisted tree into a fresh memory system.
///
/// The flag is `false` when the file exists but could not be read; the
/// caller must not autosave over it in that case.
async fn open_memory(store: &MemoryStore, config: &ArcConfig) -> (MemorySystem, bool) {
    let mut memory = MemorySystem::new(config.policy.clone());
    match store.load().await {
        Ok(Some(root)) => {
            memory.replace_root(root);
            (memory, true)
        }
        Ok(None) => {
            info!("Starting with a fresh memory tree");
            (memory, true)
        }
        Err(e) => {
            error!(
                "Could not load {}: {}. Starting fresh with autosave disabled",
                store.path().display(),
                e
            );
            (memory, false)
        }
    }
}

fn build_config(cli: &Cli) -> anyhow::Result<ArcConfig> {
    let home = match &cli.home {
        Some(home) => home.clone(),
        None => get_arccore_home()?,
    };

    let mut config = ArcConfig::new(home);
    let config_file = cli.config.clone().unwrap_or_else(|| config.config_file());
    config = config.load_file(&config_file)?;

    if let Some(memory_file) = &cli.memory_file {
        config = config.with_memory_file(memory_file.clone());
    }
    if cli.no_autosave {
        config = config.with_autosave(false);
    }
    Ok(config)
}

async fn run_shell(interpreter: &mut Interpreter) -> anyhow::Result<()> {
    let guardian = interpreter.guardian();
    println!("ArcCore shell - guardian {} [{}]", guardian.name, guardian.short_key());
    println!("Type `help` for commands, `exit` to leave.");

    let (line_tx, mut line_rx) = mpsc::channel::<String>(32);

    // Spawn blocking thread to read from stdin
    std::thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if line_tx.blocking_send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    eprintln!("Error reading stdin: {}", e);
                    break;
                }
            }
        }
    });

    prompt()?;
    while let Some(line) = line_rx.recv().await {
        let line = line.trim();
        match line {
            "" => {}
            "exit" | "quit" => break,
            "?" => println!("{}", help_text()),
            _ => println!("{}", interpreter.execute(line).await),
        }
        prompt()?;
    }

    Ok(())
}

fn prompt() -> io::Result<()> {
    let mut stdout = io::stdout();
    write!(stdout, "{}", PROMPT)?;
    stdout.flush()
}

/// Get the ArcCore home directory
fn get_arccore_home() -> anyhow::Result<PathBuf> {
    if let Ok(home) = std::env::var("ARCCORE_HOME") {
        return Ok(PathBuf::from(home));
    }

    // Default to ~/.arccore
    let home = dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Could not find home directory"))?;
    Ok(home.join(".arccore"))
}
