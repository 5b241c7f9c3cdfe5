//! Converts a pegboard file between formats and prints its tree.
//!
//! ```text
//! cargo run --example convert -- level.dat level.json
//! cargo run --example convert -- level.json level.bytes --no-header
//! ```

use std::env;
use std::process::ExitCode;

use pegboard_io::io::{read_file, write_file, ExportOption, Format};

fn export_option(path: &str, with_header: bool) -> Option<ExportOption> {
    let format = Format::from_path(path)?;
    let lower = path.to_ascii_lowercase();
    Some(match (format, lower.ends_with(".bytes"), with_header) {
        (Format::Json, _, _) => ExportOption::Json,
        (Format::Binary, true, true) => ExportOption::BytesWithHeader,
        (Format::Binary, true, false) => ExportOption::BytesNoHeader,
        (Format::Binary, false, true) => ExportOption::DatWithHeader,
        (Format::Binary, false, false) => ExportOption::DatNoHeader,
    })
}

fn main() -> ExitCode {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let with_header = !args.iter().any(|a| a == "--no-header");
    let paths: Vec<&String> = args.iter().filter(|a| !a.starts_with("--")).collect();

    let [input, rest @ ..] = paths.as_slice() else {
        eprintln!("usage: convert <input> [output] [--no-header]");
        return ExitCode::FAILURE;
    };

    let imported = match read_file(input) {
        Ok(imported) => imported,
        Err(e) => {
            eprintln!("{input}: {e}");
            return ExitCode::FAILURE;
        }
    };

    println!("{} (header name {:?})", imported.data.name, imported.name);
    for entry in imported.data.walk_all() {
        let hidden = if entry.node.enabled { "" } else { " [disabled]" };
        println!(
            "{:indent$}{} <{}> ({}, {}){hidden}",
            "",
            entry.node.name,
            entry.node.component_type(),
            entry.node.pos_x,
            entry.node.pos_y,
            indent = entry.depth * 2
        );
    }

    let Some(output) = rest.first() else {
        return ExitCode::SUCCESS;
    };
    let Some(option) = export_option(output, with_header) else {
        eprintln!("{output}: unsupported extension");
        return ExitCode::FAILURE;
    };
    if let Err(e) = write_file(output, &imported.data, option) {
        eprintln!("{output}: {e}");
        return ExitCode::FAILURE;
    }
    println!("wrote {output} as {}", option.label());
    ExitCode::SUCCESS
}
