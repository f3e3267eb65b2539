use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use xptest_codec::{
    add_envelope, classify, clean_test_code, clean_test_result, compress_raw_events,
    compress_test_code, convert_xml_events, format_test_code,
};
use xptest_diag::{
    Dialect, HarnessConfig, Verdict, classify_verdict, correct_whitespace_columns,
    parse_build_log, parse_config_file,
};

#[derive(Parser)]
#[command(name = "xptest")]
#[command(about = "Envelope raw events, format test code and interpret rule test output")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report the format of raw event text (xml, enveloped_json, raw_json, raw_text)
    Classify {
        /// Input file (reads stdin if omitted)
        input: Option<PathBuf>,
    },

    /// Convert EventViewer XML events to JSON
    ConvertXml {
        /// Input file (reads stdin if omitted)
        input: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(short, long)]
        pretty: bool,
    },

    /// Compact pretty JSON events, one per line
    Compress {
        /// Input file (reads stdin if omitted)
        input: Option<PathBuf>,

        /// Treat the input as test code (table_list / expect clauses)
        #[arg(short, long)]
        test_code: bool,
    },

    /// Expand compact JSON in test code into sorted, indented form
    Format {
        /// Input file (reads stdin if omitted)
        input: Option<PathBuf>,
    },

    /// Wrap raw events into envelope records, one JSON record per line
    Envelope {
        /// Input file (reads stdin if omitted)
        input: Option<PathBuf>,

        /// MIME type of the raw events (e.g. application/x-pt-eventlog)
        #[arg(short, long)]
        mime: String,
    },

    /// Extract diagnostics from compiler or build output
    Diagnose {
        /// Tool output file (reads stdin if omitted)
        input: Option<PathBuf>,

        /// Which tool produced the output
        #[arg(short, long, value_enum)]
        dialect: DialectArg,

        /// Rule source used to correct diagnostic columns
        #[arg(short, long)]
        source: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(short, long)]
        pretty: bool,
    },

    /// Decide whether a test run passed
    ///
    /// Exits with status 1 when the test failed.
    Verdict {
        /// Test runner output file (reads stdin if omitted)
        input: Option<PathBuf>,

        /// Test code the run was checked against
        #[arg(short, long)]
        expect: PathBuf,

        /// Harness config YAML (defaults to the nearest .xptest.yml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print the verdict as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove volatile fields from test code or a test result
    Clean {
        /// Input file (reads stdin if omitted)
        input: Option<PathBuf>,

        /// Clean a test result, keeping `time` and `incident.name`
        #[arg(short, long)]
        result: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum DialectArg {
    Correlation,
    Normalization,
    Build,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Classify { input } => cmd_classify(input),
        Commands::ConvertXml { input, pretty } => cmd_convert_xml(input, pretty),
        Commands::Compress { input, test_code } => cmd_compress(input, test_code),
        Commands::Format { input } => cmd_format(input),
        Commands::Envelope { input, mime } => cmd_envelope(input, mime),
        Commands::Diagnose {
            input,
            dialect,
            source,
            pretty,
        } => cmd_diagnose(input, dialect, source, pretty),
        Commands::Verdict {
            input,
            expect,
            config,
            json,
        } => cmd_verdict(input, expect, config, json),
        Commands::Clean { input, result } => cmd_clean(input, result),
    }
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

fn cmd_classify(input: Option<PathBuf>) {
    let text = read_input(input.as_deref());
    println!("{}", classify(&text));
}

fn cmd_convert_xml(input: Option<PathBuf>, pretty: bool) {
    let text = read_input(input.as_deref());
    match convert_xml_events(&text) {
        Ok(events) => {
            eprintln!("Converted {} event(s)", events.len());
            for event in &events {
                print_json(event, pretty);
            }
        }
        Err(e) => {
            eprintln!("Error converting XML: {e}");
            process::exit(1);
        }
    }
}

fn cmd_compress(input: Option<PathBuf>, test_code: bool) {
    let text = read_input(input.as_deref());
    if test_code {
        println!("{}", compress_test_code(&text));
        return;
    }
    match compress_raw_events(&text) {
        Ok(compact) => println!("{compact}"),
        Err(e) => {
            eprintln!("Error compressing events: {e}");
            process::exit(1);
        }
    }
}

fn cmd_format(input: Option<PathBuf>) {
    let text = read_input(input.as_deref());
    println!("{}", format_test_code(&text));
}

fn cmd_envelope(input: Option<PathBuf>, mime: String) {
    let text = read_input(input.as_deref());
    match add_envelope(&text, &mime) {
        Ok(records) => {
            eprintln!("Enveloped {} event(s)", records.len());
            for record in &records {
                println!("{record}");
            }
        }
        Err(e) => {
            eprintln!("Error enveloping events: {e}");
            process::exit(1);
        }
    }
}

fn cmd_diagnose(input: Option<PathBuf>, dialect: DialectArg, source: Option<PathBuf>, pretty: bool) {
    let output = read_input(input.as_deref());

    let dialect = match dialect {
        DialectArg::Correlation => Dialect::Correlation,
        DialectArg::Normalization => Dialect::Normalization,
        DialectArg::Build => {
            let mut report = parse_build_log(&output);
            if let Err(e) = report.correct_columns() {
                eprintln!("Error correcting columns: {e}");
                process::exit(1);
            }
            for file in &report.files {
                for d in &file.diagnostics {
                    eprintln!("{d}");
                }
            }
            eprintln!(
                "{} error(s), {} warning(s), {} failed test(s)",
                report.error_count(),
                report.warning_count(),
                report.failed_tests.len()
            );
            print_json(&report, pretty);
            return;
        }
    };

    let diagnostics = dialect.parse(&output);
    let diagnostics = match source {
        Some(path) => {
            let text = read_file(&path);
            match correct_whitespace_columns(&text, diagnostics) {
                Ok(d) => d
                    .into_iter()
                    .map(|d| d.with_file(&path))
                    .collect::<Vec<_>>(),
                Err(e) => {
                    eprintln!("Error correcting columns against {}: {e}", path.display());
                    process::exit(1);
                }
            }
        }
        None => diagnostics,
    };

    for d in &diagnostics {
        eprintln!("{d}");
    }
    print_json(&diagnostics, pretty);
}

fn cmd_verdict(input: Option<PathBuf>, expect: PathBuf, config: Option<PathBuf>, json: bool) {
    let output = read_input(input.as_deref());
    let expectation = read_file(&expect);
    let config = load_config(config.as_deref(), &expect);

    let verdict = classify_verdict(&output, &expectation, &config);

    eprintln!("Verdict: {verdict}");
    if json {
        print_json(&verdict, true);
    } else if let Some(text) = verdict.output().filter(|t| !t.is_empty()) {
        println!("{text}");
    }

    if matches!(verdict, Verdict::Failed(_)) {
        process::exit(1);
    }
}

fn cmd_clean(input: Option<PathBuf>, result: bool) {
    let text = read_input(input.as_deref());
    if result {
        println!("{}", clean_test_result(&text));
        return;
    }
    match clean_test_code(&text) {
        Ok(cleaned) => println!("{cleaned}"),
        Err(e) => {
            eprintln!("Error cleaning test code: {e}");
            process::exit(1);
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_input(path: Option<&Path>) -> String {
    match path {
        Some(path) => read_file(path),
        None => {
            let mut input = String::new();
            if let Err(e) = io::stdin().read_to_string(&mut input) {
                eprintln!("Error reading stdin: {e}");
                process::exit(1);
            }
            input
        }
    }
}

fn read_file(path: &Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Error reading {}: {e}", path.display());
            process::exit(1);
        }
    }
}

fn load_config(explicit: Option<&Path>, expect: &Path) -> HarnessConfig {
    let path = match explicit {
        Some(p) => Some(p.to_path_buf()),
        None => HarnessConfig::find_in_ancestors(expect),
    };
    let Some(path) = path else {
        return HarnessConfig::default();
    };

    match parse_config_file(&path) {
        Ok(config) => {
            eprintln!("Loaded harness config: {}", path.display());
            config
        }
        Err(e) => {
            eprintln!("Error loading harness config {}: {e}", path.display());
            process::exit(1);
        }
    }
}

fn print_json(value: &impl serde::Serialize, pretty: bool) {
    let json = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    match json {
        Ok(j) => println!("{j}"),
        Err(e) => {
            eprintln!("JSON serialization error: {e}");
            process::exit(1);
        }
    }
}
