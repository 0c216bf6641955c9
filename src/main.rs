use clap::{Parser, ValueEnum};
use std::io::{self, Write};
use std::path::PathBuf;
use ste::directive::{DirectiveInfo, scan};
use ste::fs_utils::{read_file_lines, resolve_template_path};
use ste::{Result, SteError, process_template_file};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Template processed when `--file` isn't given
const DEFAULT_TEMPLATE: &str = "build.yaml";

const LONG_HELP: &str = r#"
Directives:
  #config(vars.conf)    - Load #set lines from vars.conf
  #set(name="value")    - Bind name to value (one character is stripped from each end)
  #include(part.yaml)   - Expand part.yaml here, indented like the directive
  #var(name)            - Replace with the value of name (any number per line)

Examples:
  # Expand build.yaml from the current directory
  ste
  # Expand another template from another directory
  ste --directory ci --file pipeline.yaml
  # Save output to file
  ste -f pipeline.yaml -o pipeline.out.yaml
  # List the directives of a template
  ste -f pipeline.yaml --list
  # Same, as JSON for scripting
  ste -f pipeline.yaml --list=json
"#;

/// Simple template engine that preserves indentation.
#[derive(Parser, Debug)]
#[command(
    name = "ste",
    version,
    about = "Simple template engine that preserves indentation.",
    after_long_help = LONG_HELP
)]
struct Cli {
    /// The working directory where to find template files (defaults to the current directory)
    #[arg(short, long, value_name = "DIR", env = "STE_DIRECTORY")]
    directory: Option<PathBuf>,

    /// The template file to process, relative to the working directory
    #[arg(short, long, value_name = "FILE", env = "STE_FILE", default_value = DEFAULT_TEMPLATE)]
    file: String,

    /// Output file (defaults to stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// List directives in the template instead of expanding it (optionally with format: plain, json)
    #[arg(long, value_name = "FORMAT", num_args = 0..=1, default_missing_value = "plain")]
    list: Option<ListFormat>,

    /// Increase verbosity (can be used multiple times)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq)]
enum ListFormat {
    /// One directive per line
    Plain,
    /// JSON output for scripting
    Json,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose);

    if let Err(e) = run(&cli) {
        if let Some(location) = error_location(&e) {
            debug!(location = %location, "Expansion failed");
        }
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// Directive and line an error points at, e.g. `#include at line 3`
fn error_location(err: &SteError) -> Option<String> {
    err.directive_kind()
        .zip(err.line())
        .map(|(kind, line)| format!("{kind} at line {line}"))
}

fn init_tracing(quiet: bool, verbose: u8) {
    let filter = match level_filter(quiet, verbose) {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Level picked by `-q`/`-v`; `None` defers to `RUST_LOG`
fn level_filter(quiet: bool, verbose: u8) -> Option<&'static str> {
    match (quiet, verbose) {
        (true, _) => Some("error"),
        (false, 0) => None,
        (false, 1) => Some("info"),
        (false, 2) => Some("debug"),
        (false, _) => Some("trace"),
    }
}

fn run(cli: &Cli) -> Result<()> {
    let directory = cli
        .directory
        .clone()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    if let Some(format) = cli.list {
        let path = resolve_template_path(&directory, &cli.file);
        let lines = read_file_lines(&path)?;
        print!("{}", format_listing(&scan(&lines), format)?);
        io::stdout().flush()?;
        return Ok(());
    }

    info!(directory = %directory.display(), file = %cli.file, "Processing template");
    let lines = process_template_file(&directory, &cli.file)?;
    let rendered = render(&lines);

    if let Some(output_path) = &cli.output {
        info!("Writing output to {}", output_path.display());
        std::fs::write(output_path, rendered)?;
    } else {
        print!("{rendered}");
        io::stdout().flush()?;
    }

    info!(lines = lines.len(), "Processing complete");
    Ok(())
}

/// Joins expanded lines, each terminated by a newline
fn render(lines: &[String]) -> String {
    let mut rendered = String::with_capacity(lines.iter().map(|l| l.len() + 1).sum());
    for line in lines {
        rendered.push_str(line);
        rendered.push('\n');
    }
    rendered
}

fn format_listing(directives: &[DirectiveInfo], format: ListFormat) -> Result<String> {
    match format {
        ListFormat::Plain => {
            let mut listing = String::new();
            for directive in directives {
                listing.push_str(&format!("{}: {}", directive.line, directive.kind));
                if !directive.arguments.is_empty() {
                    listing.push_str(&format!(" {}", directive.arguments.join(", ")));
                }
                if let Some(error) = &directive.error {
                    listing.push_str(&format!(" (error: {error})"));
                }
                listing.push('\n');
            }
            Ok(listing)
        }
        ListFormat::Json => {
            let mut json = serde_json::to_string_pretty(directives)?;
            json.push('\n');
            Ok(json)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render() {
        let lines = vec!["a".to_string(), "  b".to_string(), String::new()];
        assert_eq!(render(&lines), "a\n  b\n\n");
        assert_eq!(render(&[]), "");
    }

    #[test]
    fn test_error_location() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join("build.yaml"),
            "jobs:\n  #include(missing.yaml)\n",
        )
        .unwrap();

        let err = process_template_file(temp_dir.path(), "build.yaml").unwrap_err();
        assert_eq!(error_location(&err).as_deref(), Some("#include at line 2"));

        let err = process_template_file(temp_dir.path(), "absent.yaml").unwrap_err();
        assert_eq!(error_location(&err), None);
    }

    #[test]
    fn test_level_filter() {
        assert_eq!(level_filter(true, 0), Some("error"));
        assert_eq!(level_filter(false, 0), None);
        assert_eq!(level_filter(false, 1), Some("info"));
        assert_eq!(level_filter(false, 2), Some("debug"));
        assert_eq!(level_filter(false, 5), Some("trace"));
    }

    #[test]
    fn test_format_listing_plain() {
        let directives = scan(&[
            "#set(name=\"ste\")",
            "  #include(child.tmpl)",
            "#var",
        ]);
        let listing = format_listing(&directives, ListFormat::Plain).unwrap();
        let lines: Vec<&str> = listing.lines().collect();
        assert_eq!(lines[0], "1: #set name, ste");
        assert_eq!(lines[1], "2: #include child.tmpl");
        assert!(lines[2].starts_with("3: #var (error: expecting #var(<name>) expressions"));
    }

    #[test]
    fn test_format_listing_json() {
        let directives = scan(&["#config(vars.conf)"]);
        let listing = format_listing(&directives, ListFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&listing).unwrap();
        assert_eq!(value[0]["line"], 1);
        assert_eq!(value[0]["kind"], "config");
        assert_eq!(value[0]["arguments"][0], "vars.conf");
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["ste"]).unwrap();
        assert_eq!(cli.file, DEFAULT_TEMPLATE);
        assert!(cli.output.is_none());
        assert!(cli.list.is_none());

        let cli = Cli::try_parse_from(["ste", "-d", "ci", "-f", "p.yaml", "--list=json"]).unwrap();
        assert_eq!(cli.directory, Some(PathBuf::from("ci")));
        assert_eq!(cli.file, "p.yaml");
        assert_eq!(cli.list, Some(ListFormat::Json));
    }

    #[test]
    fn test_cli_verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["ste", "-q", "-v"]).is_err());
    }

    #[test]
    fn test_cli_verify() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
