//! Thin operational entry point: bootstraps a `PlatformContext` rooted at a
//! data directory and drives one focus-group run end to end. Everything this
//! binary does is also reachable as a library call — it exists so the engine
//! can be exercised without a host application wired up.

use std::path::PathBuf;
use std::process::ExitCode;

use panelist_core::orchestrator::{self, CancellationToken};

fn print_usage() {
    eprintln!(
        "usage:\n  \
         panelist-cli run-focus-group --data-dir <path> --id <focus_group_id>\n  \
         panelist-cli bootstrap --data-dir <path>"
    );
}

fn arg_value(args: &[String], flag: &str) -> Option<String> {
    args.iter().position(|a| a == flag).and_then(|i| args.get(i + 1)).cloned()
}

#[tokio::main]
async fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first().cloned() else {
        print_usage();
        return ExitCode::FAILURE;
    };

    let data_dir = arg_value(&args, "--data-dir").unwrap_or_else(|| "./panelist-data".to_string());
    let ctx = match panelist_core::bootstrap(&PathBuf::from(&data_dir)) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("failed to bootstrap: {e}");
            return ExitCode::FAILURE;
        }
    };

    match command.as_str() {
        "bootstrap" => {
            println!("database ready at {data_dir}");
            ExitCode::SUCCESS
        }
        "run-focus-group" => {
            let Some(focus_group_id) = arg_value(&args, "--id") else {
                print_usage();
                return ExitCode::FAILURE;
            };
            match orchestrator::run_focus_group(ctx, &focus_group_id, CancellationToken::new()).await {
                Ok(fg) => {
                    match serde_json::to_string_pretty(&fg) {
                        Ok(json) => println!("{json}"),
                        Err(e) => eprintln!("failed to serialize focus group: {e}"),
                    }
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("run-focus-group failed: {e}");
                    ExitCode::FAILURE
                }
            }
        }
        _ => {
            print_usage();
            ExitCode::FAILURE
        }
    }
}
