//! traffic-comparator - compare captured primary and shadow cluster traffic.

use clap::{ArgAction, Args, Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tc_common::Error;
use tc_config::{resolve_config, Config};
use tc_core::compare::ComparisonRules;
use tc_core::exit_codes::ExitCode;
use tc_core::loader::load_pairs;
use tc_core::logging::{init_logging, LogFormat};
use tc_core::report::{
    ExportOutcome, ExportRequest, ReportAggregator, ReportOptions, ReportRegistry, ReportUse,
};
use tc_core::{Analyzer, StreamComparator, StreamReporter};
use tracing::{debug, info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "traffic-comparator",
    version,
    about = "Compare captured primary and shadow cluster traffic"
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Log line format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    /// Configuration file (JSON, or TOML by extension)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Correlate two captures, compare matched requests and report
    Run(RunArgs),

    /// Compare matched pairs, writing one comparison JSON line per pair
    Stream(StreamArgs),

    /// Aggregate comparison JSON lines into periodic report snapshots
    StreamReport(StreamReportArgs),

    /// List the report types that can be displayed or exported
    AvailableReports,
}

#[derive(Args, Debug)]
struct ReportArgs {
    /// Report to print in summary form (repeatable)
    #[arg(long = "display-reports", value_name = "NAME")]
    display_reports: Vec<String>,

    /// Report to export as JSON; '-' as PATH writes to stdout (repeatable)
    #[arg(long = "export-reports", value_name = "NAME=PATH")]
    export_reports: Vec<ExportRequest>,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Capture from the primary cluster (JSON lines of {request, response})
    #[arg(long, value_name = "PATH")]
    primary_log_file: Option<PathBuf>,

    /// Capture from the shadow cluster (JSON lines of {request, response})
    #[arg(long, value_name = "PATH")]
    shadow_log_file: Option<PathBuf>,

    #[command(flatten)]
    reports: ReportArgs,
}

#[derive(Args, Debug)]
struct StreamArgs {
    /// Matched-pair input; '-' or omitted reads stdin
    #[arg(long, value_name = "PATH")]
    input: Option<PathBuf>,

    /// Comparison output; '-' or omitted writes stdout
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct StreamReportArgs {
    /// Comparison-line input; '-' or omitted reads stdin
    #[arg(long, value_name = "PATH")]
    input: Option<PathBuf>,

    /// Snapshot output; '-' or omitted writes stdout
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,

    #[command(flatten)]
    reports: ReportArgs,

    /// Seconds between snapshots (overrides the config file)
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    snapshot_interval_secs: Option<u64>,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_format);

    let code = match dispatch(&cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("traffic-comparator: {err}");
            ExitCode::from_error(&err)
        }
    };
    debug!(exit_code = code.as_i32(), "exiting");
    std::process::exit(code.as_i32());
}

fn dispatch(cli: &Cli) -> tc_common::Result<ExitCode> {
    let registry = ReportRegistry::builtin();
    if let Commands::AvailableReports = cli.command {
        return cmd_available_reports(&registry);
    }

    let resolved = resolve_config(cli.config.as_deref()).map_err(|e| Error::Config(e.to_string()))?;
    info!(source = %resolved.source, "using configuration");
    let config = resolved.config;

    match &cli.command {
        Commands::Run(args) => cmd_run(args, &config, &registry),
        Commands::Stream(args) => cmd_stream(args, &config),
        Commands::StreamReport(args) => cmd_stream_report(args, &config, &registry),
        Commands::AvailableReports => cmd_available_reports(&registry),
    }
}

fn cmd_available_reports(registry: &ReportRegistry) -> tc_common::Result<ExitCode> {
    for descriptor in registry.descriptors() {
        println!("{}: {}", descriptor.name, descriptor.description);
    }
    Ok(ExitCode::Clean)
}

fn cmd_run(args: &RunArgs, config: &Config, registry: &ReportRegistry) -> tc_common::Result<ExitCode> {
    let primary_path = args
        .primary_log_file
        .as_ref()
        .or(config.primary_log_file.as_ref())
        .ok_or_else(|| {
            Error::Config("no primary capture: pass --primary-log-file or set primary_log_file".into())
        })?;
    let shadow_path = args
        .shadow_log_file
        .as_ref()
        .or(config.shadow_log_file.as_ref())
        .ok_or_else(|| {
            Error::Config("no shadow capture: pass --shadow-log-file or set shadow_log_file".into())
        })?;
    let rules = comparison_rules(config)?;

    let analyzer = Analyzer::new(load_pairs(primary_path)?, load_pairs(shadow_path)?);
    let comparisons = analyzer.analyze(&rules);

    let interval = Duration::from_secs(config.streaming.snapshot_interval_secs);
    let (mut aggregator, report_failures) =
        build_aggregator(registry, config, &args.reports, interval);
    for comparison in &comparisons {
        aggregator.update(comparison);
    }
    aggregator.record_unmatched(analyzer.skipped().count());
    let finalized = aggregator.finalize();

    for (name, text) in finalized.displayed() {
        println!("{name}:\n");
        println!("{text}");
    }
    let exports = finalized.export_all();
    for (name, path) in &exports.written {
        println!("{name} was exported to {}", path.display());
    }
    let report_failures = report_failures + reported_export_failures(&exports);

    Ok(ExitCode::for_mismatches(finalized.tally().mismatches()).max(report_code(report_failures)))
}

fn cmd_stream(args: &StreamArgs, config: &Config) -> tc_common::Result<ExitCode> {
    let rules = comparison_rules(config)?;
    let input = open_input(args.input.as_deref())?;
    let output = open_output(args.output.as_deref())?;

    let aggregator = ReportAggregator::new(
        report_options(config),
        Duration::from_secs(config.streaming.snapshot_interval_secs),
    );
    let (summary, _) = StreamComparator::new(rules).run(input, output, aggregator)?;
    Ok(ExitCode::for_mismatches(summary.mismatches()))
}

fn cmd_stream_report(
    args: &StreamReportArgs,
    config: &Config,
    registry: &ReportRegistry,
) -> tc_common::Result<ExitCode> {
    let interval = Duration::from_secs(
        args.snapshot_interval_secs
            .unwrap_or(config.streaming.snapshot_interval_secs),
    );
    let (mut aggregator, report_failures) =
        build_aggregator(registry, config, &args.reports, interval);
    if aggregator.report_names().is_empty() && report_failures == 0 {
        aggregator.add_report(registry, "DiffReport", ReportUse::displayed())?;
    }

    let input = open_input(args.input.as_deref())?;
    let output = open_output(args.output.as_deref())?;
    let outcome = StreamReporter::new().run(input, output, aggregator)?;
    let report_failures = report_failures + reported_export_failures(&outcome.exports);
    Ok(ExitCode::for_mismatches(outcome.summary.mismatches()).max(report_code(report_failures)))
}

fn comparison_rules(config: &Config) -> tc_common::Result<ComparisonRules> {
    ComparisonRules::from_settings(&config.comparison).map_err(|e| Error::Config(e.to_string()))
}

fn report_options(config: &Config) -> ReportOptions {
    ReportOptions {
        max_recorded_mismatches: config.streaming.max_recorded_mismatches,
    }
}

/// Request every configured report. CLI display/export lists replace the
/// config file's. Unknown names fail only their own request; the count of
/// such failures is returned.
fn build_aggregator(
    registry: &ReportRegistry,
    config: &Config,
    cli: &ReportArgs,
    interval: Duration,
) -> (ReportAggregator, usize) {
    let mut requests: Vec<(&str, ReportUse)> = Vec::new();
    if cli.display_reports.is_empty() {
        requests.extend(config.displayed_reports().map(|n| (n, ReportUse::displayed())));
    } else {
        requests.extend(cli.display_reports.iter().map(|n| (n.as_str(), ReportUse::displayed())));
    }
    if cli.export_reports.is_empty() {
        requests.extend(
            config
                .exported_reports()
                .map(|(n, path)| (n, ReportUse::exported(path))),
        );
    } else {
        requests.extend(
            cli.export_reports
                .iter()
                .map(|e| (e.report_name.as_str(), ReportUse::exported(&e.path))),
        );
    }

    let mut aggregator = ReportAggregator::new(report_options(config), interval);
    let mut failures = 0;
    for (name, usage) in requests {
        if let Err(err) = aggregator.add_report(registry, name, usage) {
            failures += 1;
            warn!(report = name, "{err}");
            eprintln!("traffic-comparator: {err}");
        }
    }
    (aggregator, failures)
}

fn reported_export_failures(exports: &ExportOutcome) -> usize {
    for err in &exports.failed {
        eprintln!("traffic-comparator: {err}");
    }
    exports.failed.len()
}

fn report_code(failures: usize) -> ExitCode {
    if failures == 0 {
        ExitCode::Clean
    } else {
        ExitCode::ReportError
    }
}

fn is_stdio(path: Option<&Path>) -> bool {
    path.map_or(true, |p| p == Path::new("-"))
}

fn open_input(path: Option<&Path>) -> io::Result<Box<dyn BufRead>> {
    match path {
        Some(p) if !is_stdio(path) => Ok(Box::new(BufReader::new(File::open(p)?))),
        _ => Ok(Box::new(io::stdin().lock())),
    }
}

fn open_output(path: Option<&Path>) -> io::Result<Box<dyn Write>> {
    match path {
        Some(p) if !is_stdio(path) => Ok(Box::new(BufWriter::new(File::create(p)?))),
        _ => Ok(Box::new(io::stdout())),
    }
}
