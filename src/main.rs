//! depfinder - Finds GitHub repositories depending on scoped npm packages.
//!
//! CLI entry point.

use clap::Parser;
use depfinder::mcp::{McpServer, RepositoriesTool};
use depfinder::notify::ConsoleOutput;
use depfinder::{Commands, Config, ScanCommand, Scanner, ServeConfig};
use serde::Serialize;
use std::fs;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Serialize)]
struct ScanReport {
    repositories: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    // Set up logging, stdout belongs to the MCP transport
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if config.verbose {
            EnvFilter::new("depfinder=debug,info")
        } else {
            EnvFilter::new("depfinder=info,warn")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let outcome = match config.command.clone() {
        Commands::Scan(scan_command) => run_scan(scan_command, &config).await,
        Commands::Serve(serve_config) => run_serve(serve_config, &config).await,
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => code,
    }
}

async fn run_scan(scan_command: ScanCommand, global_config: &Config) -> Result<(), ExitCode> {
    let Some(token) = global_config.token() else {
        error!("Missing GitHub token: set DEPFINDER_GITHUB_TOKEN or GITHUB_TOKEN");
        return Err(ExitCode::FAILURE);
    };

    let scanner = match Scanner::new(&scan_command.scan, &token, &global_config.api_url) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            error!("Failed to create scanner: {}", e);
            return Err(ExitCode::FAILURE);
        }
    };

    let console = ConsoleOutput::new(global_config.verbose, scan_command.json);
    console.print_scan_start(scanner.library_name(), &scanner.source().to_string());

    let handle = scanner.clone().spawn();
    let progress = handle.progress();
    let spinner = console.create_spinner();

    let wait = handle.wait();
    tokio::pin!(wait);
    let summary = loop {
        tokio::select! {
            summary = &mut wait => break summary,
            _ = tokio::time::sleep(Duration::from_millis(200)) => {
                if let Some(ref spinner) = spinner {
                    console.update_spinner(spinner, &progress);
                }
            }
        }
    };
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    let summary = summary.unwrap_or_default();

    let mut repositories = progress.repositories();
    repositories.sort();
    console.print_summary(scanner.library_name(), &repositories, &summary);

    if scan_command.json || scan_command.output.is_some() {
        let report = ScanReport { repositories };
        let json = serde_json::to_string_pretty(&report).unwrap_or_default();

        match scan_command.output {
            Some(ref output_path) => {
                if let Err(e) = fs::write(output_path, &json) {
                    error!("Failed to write output file: {}", e);
                    return Err(ExitCode::FAILURE);
                }
                info!("Results written to: {:?}", output_path);
            }
            None => println!("{}", json),
        }
    }

    Ok(())
}

async fn run_serve(serve_config: ServeConfig, global_config: &Config) -> Result<(), ExitCode> {
    let scan_config = &serve_config.scan;

    let tool = match global_config.token() {
        Some(token) => {
            let scanner = match Scanner::new(scan_config, &token, &global_config.api_url) {
                Ok(s) => Arc::new(s),
                Err(e) => {
                    error!("Failed to create scanner: {}", e);
                    return Err(ExitCode::FAILURE);
                }
            };

            // The tool reads partial results while the scan runs
            let tool = RepositoriesTool::new(
                scanner.library_name(),
                scanner.scopes(),
                &scan_config.manifest_name,
                scanner.clone().spawn().detach(),
            )
            .with_name(serve_config.tool_name.clone())
            .with_title(serve_config.tool_title.clone())
            .with_description(serve_config.tool_description.clone());
            info!("Registered tool {}", tool.name());
            Some(tool)
        }
        None => {
            if let Err(e) = scan_config.validate() {
                error!("Invalid configuration: {}", e);
                return Err(ExitCode::FAILURE);
            }
            error!(
                "Missing GitHub token for the {} repositories tool, not registering it",
                scan_config.library_name
            );
            None
        }
    };

    if let Err(e) = McpServer::new(tool).run_stdio().await {
        error!("MCP server stopped: {}", e);
        return Err(ExitCode::FAILURE);
    }

    Ok(())
}
