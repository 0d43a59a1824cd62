//! Conversion CLI Example
//!
//! This example demonstrates a minimal command-line shell around docconv.
//! Set `RUST_LOG=docconv=debug` to see the library's log output.

use std::process;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use docconv::{ConvertError, ConverterBuilder, DateFormat, ErrorCategory};

fn main() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,docconv=info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 3 {
        eprintln!("Usage: {} <input> <output> [options]", args[0]);
        eprintln!("\nSupported extensions: .json, .csv, .xml, .xlsx");
        eprintln!("\nOptions:");
        eprintln!("  --date-format <fmt>  Date format for text outputs (chrono syntax)");
        eprintln!("  --sheet-name <name>  Worksheet name for XLSX output");
        eprintln!("  --compact            Write JSON without indentation");
        eprintln!("\nExamples:");
        eprintln!("  {} documents.csv documents.xlsx", args[0]);
        eprintln!("  {} documents.xlsx documents.json --compact", args[0]);
        eprintln!("  {} documents.json documents.csv --date-format %d/%m/%Y", args[0]);
        process::exit(1);
    }

    let input_path = &args[1];
    let output_path = &args[2];

    // Parse options
    let mut builder = ConverterBuilder::new();
    let mut i = 3;
    while i < args.len() {
        match args[i].as_str() {
            "--date-format" => {
                if i + 1 >= args.len() {
                    eprintln!("Error: --date-format requires a value");
                    process::exit(1);
                }
                builder = builder.with_date_format(DateFormat::Custom(args[i + 1].clone()));
                i += 2;
            }
            "--sheet-name" => {
                if i + 1 >= args.len() {
                    eprintln!("Error: --sheet-name requires a value");
                    process::exit(1);
                }
                builder = builder.with_sheet_name(args[i + 1].clone());
                i += 2;
            }
            "--compact" => {
                builder = builder.with_pretty_json(false);
                i += 1;
            }
            _ => {
                eprintln!("Error: Unknown option: {}", args[i]);
                process::exit(1);
            }
        }
    }

    let result = builder.build().and_then(|mut converter| {
        converter.load(input_path)?;
        converter.convert(output_path)
    });

    match result {
        Ok(count) => {
            println!(
                "Conversion completed: {} -> {} ({} records)",
                input_path, output_path, count
            );
        }
        Err(e) => {
            handle_error(e);
            process::exit(1);
        }
    }
}

fn handle_error(error: ConvertError) {
    eprintln!("{} error: {}", error.category(), error);
    match error.category() {
        ErrorCategory::UnsupportedFormat => {
            eprintln!("Use one of: .json, .csv, .xml, .xlsx");
        }
        ErrorCategory::MalformedInput | ErrorCategory::EmptyDocument => {
            eprintln!("The input file does not match the expected layout.");
        }
        ErrorCategory::NoData => {
            eprintln!("The input file contains no records; nothing was written.");
        }
        ErrorCategory::IoFailure => {
            eprintln!("Please check that the file exists and you have permission to access it.");
        }
        _ => {}
    }
}
