use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::Command;

#[derive(Parser)]
#[command(name = "xtask", about = "Workspace automation for the dust-map viewer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run fmt, clippy, tests, docs and the headless smoke run
    Check,
    /// Run cargo fmt --check on all crates
    Fmt,
    /// Run clippy on all crates
    Clippy,
    /// Run all tests
    Test,
    /// Build rustdoc for the workspace
    Doc,
    /// Replay and simulate through the debug backend with generated tiles
    Smoke,
    /// Verify a dataset directory loads completely
    Assets {
        /// Directory containing media/
        dir: PathBuf,
        /// Dataset version to check
        #[arg(long, default_value = "b19")]
        ver: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check => {
            fmt()?;
            clippy()?;
            test()?;
            doc()?;
            smoke()?;
        }
        Commands::Fmt => fmt()?,
        Commands::Clippy => clippy()?,
        Commands::Test => test()?,
        Commands::Doc => doc()?,
        Commands::Smoke => smoke()?,
        Commands::Assets { dir, ver } => {
            let dir = dir.to_string_lossy();
            cli_run(&["check-assets", "--ver", &ver, "--assets", &dir])?;
        }
    }

    Ok(())
}

fn cargo(step: &str, args: &[&str]) -> Result<()> {
    println!("==> {step}");
    let status = Command::new("cargo").args(args).status()?;
    if !status.success() {
        anyhow::bail!("{step} failed ({status})");
    }
    Ok(())
}

/// Run `dustmap-cli` with `args` through cargo.
fn cli_run(args: &[&str]) -> Result<()> {
    let mut full = vec!["run", "--quiet", "-p", "dustmap-cli", "--"];
    full.extend_from_slice(args);
    cargo(&format!("dustmap-cli {}", args.join(" ")), &full)
}

fn fmt() -> Result<()> {
    cargo("cargo fmt --check", &["fmt", "--all", "--", "--check"])
}

fn clippy() -> Result<()> {
    cargo(
        "cargo clippy",
        &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"],
    )
}

fn test() -> Result<()> {
    cargo("cargo test", &["test", "--workspace"])
}

fn doc() -> Result<()> {
    cargo("cargo doc", &["doc", "--workspace", "--no-deps"])
}

fn smoke() -> Result<()> {
    cli_run(&["replay", "--query", "ver=b19&x=0.5&y=%2D0.2&z=0.1&alpha=45&beta=10"])?;
    cli_run(&[
        "simulate",
        "--script",
        "0:+right,400:-right,400:+space,1400:-space,1500:+h",
        "--duration-ms",
        "3000",
    ])
}
