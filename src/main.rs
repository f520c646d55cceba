//! Boundary Loader CLI
//!
//! Single-shot mode:
//!   boundary-loader [--config <file.json>] classify <file>
//!   boundary-loader [--config <file.json>] strip <file>
//!   boundary-loader [--config <file.json>] key <file>
//!   boundary-loader [--config <file.json>] scan <dir>
//!   boundary-loader [--config <file.json>] load <project-root> <file>
//!
//! Server mode (persistent process, reads from stdin):
//!   boundary-loader [--config <file.json>] --server <project-root>
//!
//! Protocol (server mode):
//!   Request (stdin), one module path per line:
//!     components/counter.js
//!
//!   Response (stdout):
//!     Status:Ok
//!     Length:123
//!
//!     {"source":"/app/components/counter.js","boundary":"client_eligible",...}
//!
//!   Error response:
//!     Status:Error
//!     Length:42
//!
//!     Module not found: /app/components/missing.js

use anyhow::{anyhow, Context, Result};
use boundary_loader::{
    cache_key_with_len, classify, strip_directive, BoundaryLoader, JsHost, LoaderConfig,
};
use std::io::{BufRead, Write};
use std::path::Path;
use tracing_subscriber::EnvFilter;

fn print_usage() {
    eprintln!("Boundary Loader - server/client module boundary and artifact cache");
    eprintln!();
    eprintln!("Single-shot mode:");
    eprintln!("  boundary-loader [--config <file.json>] classify <file>");
    eprintln!("  boundary-loader [--config <file.json>] strip <file>");
    eprintln!("  boundary-loader [--config <file.json>] key <file>");
    eprintln!("  boundary-loader [--config <file.json>] scan <dir>");
    eprintln!("  boundary-loader [--config <file.json>] load <project-root> <file>");
    eprintln!();
    eprintln!("Server mode (persistent process):");
    eprintln!("  boundary-loader [--config <file.json>] --server <project-root>");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  boundary-loader classify ./app/components/counter.tsx");
    eprintln!("  boundary-loader scan ./app/components");
    eprintln!("  boundary-loader --server ./app");
}

fn read_source(file: &str) -> Result<String> {
    std::fs::read_to_string(file).with_context(|| format!("Failed to read '{}'", file))
}

/// Resolve, evaluate and report a single module
async fn run_load(mut config: LoaderConfig, project_root: &str, file: &str) -> Result<()> {
    config.project_root = project_root.into();
    let loader = BoundaryLoader::new(config.clone());
    let mut host = JsHost::new(&config)?;

    let resolved = loader.resolve(file)?;
    loader.load_resolved(&mut host, &resolved).await?;

    println!("{}", serde_json::to_string_pretty(&resolved)?);
    Ok(())
}

/// Run in server mode (persistent process, reads module paths from stdin)
async fn run_server(mut config: LoaderConfig, project_root: &str) -> Result<()> {
    config.project_root = project_root.into();
    let loader = BoundaryLoader::new(config.clone());

    // Create the isolate ONCE at startup
    let mut host = JsHost::new(&config)?;

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    let mut reader = stdin.lock();

    tracing::info!(root = project_root, "server ready, reading from stdin");

    loop {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            // EOF - stdin closed, exit gracefully
            break;
        }

        let request = line.trim();
        if request.is_empty() {
            continue;
        }

        let path = Path::new(project_root).join(request);
        let outcome = match loader.resolve(&path) {
            Ok(resolved) => loader
                .load_resolved(&mut host, &resolved)
                .await
                .map(|_| resolved),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(resolved) => write_response(&mut stdout, true, &serde_json::to_string(&resolved)?)?,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "load failed");
                write_response(&mut stdout, false, &e.to_string())?;
            }
        }
    }

    tracing::info!("server shutting down");
    Ok(())
}

/// Write response in length-prefixed protocol
fn write_response(stdout: &mut std::io::Stdout, ok: bool, body: &str) -> Result<()> {
    let status = if ok { "Ok" } else { "Error" };

    writeln!(stdout, "Status:{}", status)?;
    writeln!(stdout, "Length:{}", body.len())?;
    writeln!(stdout)?; // Empty line separator
    write!(stdout, "{}", body)?;
    stdout.flush()?;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries results and protocol frames; logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();

    let config = if args.first().map(String::as_str) == Some("--config") {
        if args.len() < 2 {
            print_usage();
            return Err(anyhow!("--config requires a file argument"));
        }
        let file = args.remove(1);
        args.remove(0);
        LoaderConfig::from_file(&file)?
    } else {
        LoaderConfig::default()
    };

    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    match args.as_slice() {
        ["--server", root] => run_server(config, root).await,
        ["classify", file] => {
            println!("{}", classify(&read_source(file)?));
            Ok(())
        }
        ["strip", file] => {
            print!("{}", strip_directive(&read_source(file)?));
            Ok(())
        }
        ["key", file] => {
            let content = read_source(file)?;
            let absolute = std::path::absolute(file)?;
            println!("{}", cache_key_with_len(&absolute, &content, config.key_length));
            Ok(())
        }
        ["scan", dir] => {
            let found = boundary_loader::scan_directory(dir, &config.component_extensions)?;
            println!("{}", serde_json::to_string_pretty(&found)?);
            Ok(())
        }
        ["load", root, file] => run_load(config, root, file).await,
        _ => {
            print_usage();
            Err(anyhow!("Missing or unknown arguments"))
        }
    }
}
