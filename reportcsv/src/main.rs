//! # reportcsv
//!
//! A CLI tool for exporting hierarchical analytics reports as CSV.
//!
//! ## Overview
//!
//! reportcsv is built on top of reportcsvlib. It reads a report document
//! (JSON), flattens it into one rectangular table and writes delimited text
//! that spreadsheets open directly.
//!
//! ## Usage
//!
//! ```bash
//! # Export a report to stdout as UTF-8
//! reportcsv visits.json --no-unicode
//!
//! # Semicolon separated, CRLF line endings, written to a file
//! reportcsv visits.json --separator ';' --line-ending crlf --output visits.csv
//!
//! # Human-readable column names from a translation dictionary
//! reportcsv visits.json --translate lang/en.json
//!
//! # Write into a directory, file name derived from report name and period
//! reportcsv visits.json --output exports/ --report-name "Visits Summary" --period "March 2024"
//!
//! # Read from stdin
//! cat visits.json | reportcsv -
//!
//! # Show the columns a report would be exported with
//! reportcsv columns visits.json
//! ```

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;

use anyhow::{bail, Context};
use clap::{Arg, ArgAction, ArgMatches, Command};
use console::style;
use reportcsvlib::{
    export, load_report, parse_report, suggested_file_name, CsvOptions, DataNode, Dictionary,
    HeaderMode, HierarchicalRenderer, LineEnding, RawNames, ReportPayload, Translator,
    NO_DATA_MESSAGE,
};

/// Arguments shared by the export and `columns` commands
fn shared_args() -> Vec<Arg> {
    vec![
        Arg::new("input")
            .help("Report document (JSON), or '-' for stdin")
            .default_value("-"),
        Arg::new("config")
            .long("config")
            .value_name("FILE")
            .help("Load export options from a JSON file (flags override it)"),
        Arg::new("separator")
            .short('s')
            .long("separator")
            .help("Field separator (use 'tab' or '\\t' for tabs)"),
        Arg::new("translate")
            .long("translate")
            .value_name("DICT")
            .help("Translate column names using a JSON dictionary"),
        Arg::new("no-metadata")
            .long("no-metadata")
            .action(ArgAction::SetTrue)
            .help("Do not export row metadata columns"),
        Arg::new("no-subtable-id")
            .long("no-subtable-id")
            .action(ArgAction::SetTrue)
            .help("Do not export the idsubdatatable column"),
        Arg::new("header-mode")
            .long("header-mode")
            .value_parser(["first-wins", "union"])
            .help("How collections build their header"),
    ]
}

/// Build the clap Command structure
fn build_command() -> Command {
    Command::new("reportcsv")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Arthur Debert")
        .about("Export hierarchical analytics reports as CSV")
        .args_conflicts_with_subcommands(true)
        .args(shared_args())
        .arg(
            Arg::new("line-ending")
                .long("line-ending")
                .value_parser(["lf", "crlf"])
                .help("Record terminator"),
        )
        .arg(
            Arg::new("no-unicode")
                .long("no-unicode")
                .action(ArgAction::SetTrue)
                .help("Write UTF-8 instead of UTF-16LE with byte-order mark"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("PATH")
                .help("Write to a file, or into a directory using a generated file name"),
        )
        .arg(
            Arg::new("report-name")
                .long("report-name")
                .help("Report name used in generated file names"),
        )
        .arg(
            Arg::new("period")
                .long("period")
                .help("Period description used in generated file names"),
        )
        .subcommand(
            Command::new("columns")
                .about("Print the columns a report would be exported with")
                .args(shared_args()),
        )
}

fn parse_separator(raw: &str) -> String {
    match raw {
        "tab" | "\\t" => "\t".to_string(),
        other => other.to_string(),
    }
}

/// Build export options: config file first, then flags on top
fn build_options(matches: &ArgMatches) -> anyhow::Result<CsvOptions> {
    let mut options = match matches.get_one::<String>("config") {
        Some(path) => CsvOptions::from_json_file(path)
            .with_context(|| format!("loading options from {}", path))?,
        None => CsvOptions::new(),
    };

    if let Some(separator) = matches.get_one::<String>("separator") {
        options = options.separator(parse_separator(separator));
    }
    if matches.get_flag("no-metadata") {
        options = options.export_metadata(false);
    }
    if matches.get_flag("no-subtable-id") {
        options = options.export_subtable_id(false);
    }
    if matches.get_one::<String>("translate").is_some() {
        options = options.translate_column_names(true);
    }
    if let Some(mode) = matches.get_one::<String>("header-mode") {
        options = options.header_mode(HeaderMode::from_str(mode)?);
    }

    // Only the export command carries these
    if let Ok(Some(ending)) = matches.try_get_one::<String>("line-ending") {
        options = options.line_ending(LineEnding::from_str(ending)?);
    }
    if let Ok(Some(true)) = matches.try_get_one::<bool>("no-unicode").map(Option::<&bool>::copied) {
        options = options.convert_to_unicode(false);
    }

    options.validate()?;
    Ok(options)
}

fn build_translator(matches: &ArgMatches) -> anyhow::Result<Box<dyn Translator>> {
    match matches.get_one::<String>("translate") {
        Some(path) => {
            let dict = Dictionary::from_json_file(path)
                .with_context(|| format!("loading translations from {}", path))?;
            Ok(Box::new(dict))
        }
        None => Ok(Box::new(RawNames)),
    }
}

fn read_payload(input: &str) -> anyhow::Result<ReportPayload> {
    if input == "-" {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("reading report from stdin")?;
        Ok(parse_report(&text, Path::new("<stdin>"))?)
    } else {
        Ok(load_report(input)?)
    }
}

fn input_of(matches: &ArgMatches) -> &str {
    matches
        .get_one::<String>("input")
        .map(|s| s.as_str())
        .unwrap_or("-")
}

/// Resolve where the export goes; `None` means stdout
fn output_path(
    matches: &ArgMatches,
    translator: &dyn Translator,
    input: &str,
) -> Option<PathBuf> {
    let output = PathBuf::from(matches.get_one::<String>("output")?);
    if !output.is_dir() {
        return Some(output);
    }

    let report_name = matches
        .get_one::<String>("report-name")
        .cloned()
        .or_else(|| {
            Path::new(input)
                .file_stem()
                .map(|stem| stem.to_string_lossy().to_string())
        })
        .unwrap_or_else(|| "report".to_string());
    let period = matches.get_one::<String>("period").map(|s| s.as_str());

    Some(output.join(suggested_file_name(translator, &report_name, period)))
}

/// Handler for the default export command
fn export_handler(matches: &ArgMatches) -> anyhow::Result<()> {
    let options = build_options(matches)?;
    let translator = build_translator(matches)?;
    let input = input_of(matches);
    let payload = read_payload(input)?;

    let bytes = export(&payload, &options, translator.as_ref());

    match output_path(matches, translator.as_ref(), input) {
        Some(path) => {
            fs::write(&path, &bytes).with_context(|| format!("writing {}", path.display()))?;
            tracing::info!(path = %path.display(), bytes = bytes.len(), "export written");
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(&bytes)?;
            stdout.flush()?;
        }
    }

    if let ReportPayload::Failure { error } = &payload {
        bail!("report failed upstream: {}", error);
    }
    Ok(())
}

/// Handler for `columns`
fn columns_handler(matches: &ArgMatches) -> anyhow::Result<()> {
    let options = build_options(matches)?;
    let translator = build_translator(matches)?;
    let payload = read_payload(input_of(matches))?;

    let node: DataNode = match payload {
        ReportPayload::Data(node) => node,
        ReportPayload::Failure { error } => bail!("report failed upstream: {}", error),
    };

    let renderer = HierarchicalRenderer::new(&options, translator.as_ref());
    match renderer.header(&node) {
        Some(columns) => {
            for column in columns {
                println!("{}", column);
            }
        }
        None => println!("{}", NO_DATA_MESSAGE),
    }
    Ok(())
}

fn main() -> ExitCode {
    // Logs go to stderr so they never mix with CSV on stdout
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let matches = build_command().get_matches();
    let result = match matches.subcommand() {
        Some(("columns", sub_matches)) => columns_handler(sub_matches),
        _ => export_handler(&matches),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", style("Error:").for_stderr().red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_is_valid() {
        build_command().debug_assert();
    }

    #[test]
    fn test_parse_separator() {
        assert_eq!(parse_separator("tab"), "\t");
        assert_eq!(parse_separator("\\t"), "\t");
        assert_eq!(parse_separator(";"), ";");
    }

    #[test]
    fn test_build_options_from_flags() {
        let matches = build_command().get_matches_from([
            "reportcsv",
            "in.json",
            "--separator",
            ";",
            "--line-ending",
            "crlf",
            "--no-metadata",
            "--no-unicode",
            "--header-mode",
            "union",
        ]);
        let options = build_options(&matches).unwrap();
        assert_eq!(options.separator, ";");
        assert_eq!(options.line_ending, LineEnding::CrLf);
        assert!(!options.export_metadata);
        assert!(options.export_subtable_id);
        assert!(!options.convert_to_unicode);
        assert_eq!(options.header_mode, HeaderMode::Union);
    }

    #[test]
    fn test_columns_subcommand_options() {
        let matches = build_command().get_matches_from(["reportcsv", "columns", "in.json", "--no-subtable-id"]);
        let (name, sub) = matches.subcommand().unwrap();
        assert_eq!(name, "columns");
        let options = build_options(sub).unwrap();
        assert!(!options.export_subtable_id);
        assert!(options.convert_to_unicode);
        assert_eq!(input_of(sub), "in.json");
    }
}
