//! Command line front end for the MXL expression parser.

use std::process::ExitCode;

use clap::Parser;
use serde::Serialize;

use mxl_parser::{log_info, logging};
use mxl_parser::{
    ExpressionMatch, ExpressionOptions, ExpressionParser, ExpressionValidator, Outcome,
    SyntaxError,
};

#[derive(Parser, Debug)]
#[command(name = "mxl", version, about = "Parse MXL monitoring expressions")]
struct Cli {
    /// Expression to parse. Reads from --file when omitted.
    expression: Option<String>,

    /// Read the expression from a file instead of the command line.
    #[arg(long, conflicts_with = "expression")]
    file: Option<std::path::PathBuf>,

    /// Parse as a calculated-item formula.
    #[arg(long)]
    calculated: bool,

    /// Accept {$NAME} user macros.
    #[arg(long)]
    user_macros: bool,

    /// Accept {#NAME} discovery macros.
    #[arg(long)]
    lld_macros: bool,

    /// Function calls collapsed to {<id>} references.
    #[arg(long)]
    collapsed: bool,

    /// Accept {HOST.HOST} as a query host.
    #[arg(long)]
    host_macro: bool,

    /// Accept {HOST.HOST<1-9>} as a query host.
    #[arg(long)]
    host_macro_n: bool,

    /// Accept queries with an empty host (//key).
    #[arg(long)]
    empty_host: bool,

    /// Legacy {host:key.func()} function syntax.
    #[arg(long)]
    legacy: bool,

    /// With --legacy, allow {func()} without a host:key part.
    #[arg(long, requires = "legacy")]
    allow_function_only: bool,

    /// Accept * as an item key outside calculated mode.
    #[arg(long)]
    wildcard_item_keys: bool,

    /// Recursion cap for nested math-function arguments.
    #[arg(long, default_value_t = 32)]
    max_depth: usize,

    /// Run the semantic validator on an accepted expression.
    #[arg(long)]
    validate: bool,

    /// Emit the token stream as JSON instead of the human summary.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase", tag = "status")]
enum Report<'a> {
    Complete {
        #[serde(flatten)]
        parsed: &'a ExpressionMatch,
    },
    Partial {
        #[serde(flatten)]
        parsed: &'a ExpressionMatch,
        error: ReportError,
    },
    Failed {
        error: ReportError,
    },
}

#[derive(Debug, Serialize)]
struct ReportError {
    offset: usize,
    code: String,
    message: String,
}

impl ReportError {
    fn syntax(err: &SyntaxError, source: &str) -> Self {
        Self {
            offset: err.offset,
            code: err.code().as_str().to_string(),
            message: err.message(source),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = logging::init_global_logging() {
        eprintln!("error: {err}");
        return ExitCode::FAILURE;
    }

    match run(&cli) {
        Ok(accepted) => {
            if accepted {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<bool, String> {
    let source = read_source(cli)?;
    let options = build_options(cli)?;
    let parser = ExpressionParser::new(options).map_err(|e| e.to_string())?;

    log_info!("parsing expression", "length" => source.len());
    let outcome = parser.parse(&source, 0);

    let accepted = match &outcome {
        Outcome::Complete(parsed) => {
            report(cli, &source, Report::Complete { parsed })?;
            if cli.validate {
                check_semantics(cli, parsed, &source)?
            } else {
                true
            }
        }
        Outcome::Partial(parsed, err) => {
            report(
                cli,
                &source,
                Report::Partial {
                    parsed,
                    error: ReportError::syntax(err, &source),
                },
            )?;
            false
        }
        Outcome::Fail(err) => {
            report(
                cli,
                &source,
                Report::Failed {
                    error: ReportError::syntax(err, &source),
                },
            )?;
            false
        }
    };
    Ok(accepted)
}

fn read_source(cli: &Cli) -> Result<String, String> {
    if let Some(expression) = &cli.expression {
        return Ok(expression.clone());
    }
    let Some(path) = &cli.file else {
        return Err("an expression or --file is required".to_string());
    };
    let raw = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    Ok(raw.trim_end_matches('\n').to_string())
}

fn build_options(cli: &Cli) -> Result<ExpressionOptions, String> {
    let base = if cli.calculated {
        ExpressionOptions::calculated_formula()
    } else {
        ExpressionOptions::trigger()
    };
    base.user_macros(cli.user_macros)
        .lld_macros(cli.lld_macros)
        .collapsed(cli.collapsed)
        .host_macro(cli.host_macro)
        .host_macro_n(cli.host_macro_n)
        .empty_host(cli.empty_host)
        .legacy(cli.legacy)
        .allow_function_only(cli.allow_function_only)
        .wildcard_item_keys(cli.wildcard_item_keys)
        .max_depth(cli.max_depth)
        .build()
        .map_err(|e| e.to_string())
}

fn report(cli: &Cli, source: &str, report: Report<'_>) -> Result<(), String> {
    if cli.json {
        let json = serde_json::to_string_pretty(&report).map_err(|e| e.to_string())?;
        println!("{json}");
        return Ok(());
    }

    match report {
        Report::Complete { parsed } => {
            println!("complete: {} tokens, length {}", parsed.tokens.len(), parsed.len);
            print_tokens(parsed, source);
        }
        Report::Partial { parsed, error } => {
            println!(
                "partial: matched {} of {} characters, {} tokens",
                parsed.len,
                source.len(),
                parsed.tokens.len()
            );
            print_tokens(parsed, source);
            print_error(source, &error);
        }
        Report::Failed { error } => {
            println!("failed");
            print_error(source, &error);
        }
    }
    Ok(())
}

fn print_tokens(parsed: &ExpressionMatch, source: &str) {
    for token in &parsed.tokens {
        let text = source
            .get(token.offset..token.offset + token.len)
            .unwrap_or("");
        println!("  {:>4}  {:<14} {:?}", token.offset, format!("{:?}", token.kind), text);
    }
}

fn print_error(source: &str, error: &ReportError) {
    println!("{}: {} (offset {})", error.code, error.message, error.offset);
    if error.offset <= source.len() {
        println!("  {source}");
        println!("  {}^", " ".repeat(caret_column(source, error.offset)));
    }
}

/// Byte offsets do not line up with what the terminal prints, so the caret
/// indent counts characters up to the offset instead.
fn caret_column(source: &str, offset: usize) -> usize {
    source.get(..offset).map_or(0, |s| s.chars().count())
}

fn check_semantics(cli: &Cli, parsed: &ExpressionMatch, source: &str) -> Result<bool, String> {
    let validator = ExpressionValidator::new();
    match validator.validate(parsed, source) {
        Ok(()) => {
            if !cli.json {
                println!("valid");
            }
            Ok(true)
        }
        Err(err) => {
            if cli.json {
                let rendered = serde_json::to_string_pretty(&ReportError {
                    offset: err.offset(),
                    code: err.code().as_str().to_string(),
                    message: err.to_string(),
                })
                .map_err(|e| e.to_string())?;
                println!("{rendered}");
            } else {
                print_error(
                    source,
                    &ReportError {
                        offset: err.offset(),
                        code: err.code().as_str().to_string(),
                        message: err.to_string(),
                    },
                );
            }
            Ok(false)
        }
    }
}
