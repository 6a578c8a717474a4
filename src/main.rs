use anyhow::{anyhow, bail, Result};
use clap::Parser;
use colored::Colorize;
use holepunch::config::{load_from_path, Severity};
use holepunch::driver::{
    compile_jobs, discover_files, process_source, run_batch, BatchOptions, FileOutcome,
    FileReport, Job,
};
use holepunch::lang::LanguageProfile;
use holepunch::output::{
    colored_diff, diagnostic_line, match_line, unified_diff, MatchRecord, RewriteRecord,
};
use holepunch::pattern::Syntax;
use holepunch::pool::build_pool;
use holepunch::rewrite::FreshIds;
use holepunch::telemetry;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "holepunch")]
#[command(about = "Structural search and rewrite with holes", long_about = None)]
#[command(version)]
struct Cli {
    /// Match template, e.g. 'foo(:[args])'
    #[arg(value_name = "MATCH")]
    match_template: Option<String>,

    /// Rewrite template, e.g. 'bar(:[args])'
    #[arg(value_name = "REWRITE")]
    rewrite_template: Option<String>,

    /// Files, directories, or extension filters such as .py
    #[arg(value_name = "TARGETS")]
    targets: Vec<String>,

    /// Rewrite files in place
    #[arg(short, long)]
    in_place: bool,

    /// Read source from stdin
    #[arg(long)]
    stdin: bool,

    /// Print the rewritten source
    #[arg(long)]
    stdout: bool,

    /// Print a unified diff of each change
    #[arg(long)]
    diff: bool,

    /// Print matches only
    #[arg(long)]
    match_only: bool,

    /// Print one JSON record per file
    #[arg(long)]
    json_lines: bool,

    /// `where` rule applied to every match (repeatable)
    #[arg(short, long = "rule", value_name = "RULE")]
    rules: Vec<String>,

    /// Drop matches enclosed by a match of this pattern (repeatable)
    #[arg(long = "not", value_name = "PATTERN")]
    not: Vec<String>,

    /// Keep only matches enclosed by a match of this pattern (repeatable)
    #[arg(long = "inside", value_name = "PATTERN")]
    inside: Vec<String>,

    /// Extra alternative tried after MATCH (repeatable)
    #[arg(long = "either", value_name = "PATTERN")]
    either: Vec<String>,

    /// Pattern that must match the same range as MATCH (repeatable)
    #[arg(long = "all", value_name = "PATTERN")]
    all: Vec<String>,

    /// Hole syntax of the templates: comby, or semgrep for $X metavariables
    #[arg(long, value_name = "SYNTAX", default_value_t = Syntax::Comby)]
    syntax: Syntax,

    /// Force a language, e.g. .py or python
    #[arg(short, long, value_name = "EXT")]
    matcher: Option<String>,

    /// TOML rule file used instead of MATCH and REWRITE
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Only process files with these extensions (comma separated)
    #[arg(short = 'f', long, value_name = "EXT", value_delimiter = ',')]
    extensions: Vec<String>,

    /// Directory to search
    #[arg(short, long, value_name = "DIR")]
    directory: Option<PathBuf>,

    /// Only run rules at or above this severity
    #[arg(long, value_name = "LEVEL")]
    severity: Option<Severity>,

    /// Worker threads (0 = one per core)
    #[arg(short, long, default_value_t = 0)]
    jobs: usize,

    /// Stop starting new files after this many seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Tracing filter, e.g. holepunch=debug
    #[arg(long, value_name = "FILTER")]
    log: Option<String>,
}

/// How results are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    JsonLines,
    MatchOnly,
    Stdout,
    Diff,
    /// Diff for rewrites, match lines otherwise
    Default,
}

impl Cli {
    fn mode(&self) -> Mode {
        if self.json_lines {
            Mode::JsonLines
        } else if self.match_only {
            Mode::MatchOnly
        } else if self.stdout {
            Mode::Stdout
        } else if self.diff {
            Mode::Diff
        } else {
            Mode::Default
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(error) = telemetry::init(cli.log.as_deref()) {
        eprintln!("{} {}", "error:".red().bold(), error);
        return ExitCode::from(2);
    }

    match run(cli) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("{} {}", "error:".red().bold(), error);
            ExitCode::from(2)
        }
    }
}

/// `Err` is reserved for problems found before any file is touched.
fn run(mut cli: Cli) -> Result<ExitCode> {
    if cli.config.is_some() {
        // Without MATCH and REWRITE every positional is a target.
        let leading = [cli.rewrite_template.take(), cli.match_template.take()];
        for target in leading.into_iter().flatten() {
            cli.targets.insert(0, target);
        }
    }
    if cli.stdin && cli.in_place {
        bail!("--in-place cannot be combined with --stdin");
    }

    let jobs = load_jobs(&cli)?;
    let (paths, mut extensions) = split_targets(&cli.targets);
    extensions.extend(cli.extensions.iter().cloned());

    let forced = match &cli.matcher {
        Some(spec) => Some(LanguageProfile::from_matcher(spec)?),
        None => None,
    };

    if cli.stdin {
        let profile = match (forced, extensions.first()) {
            (Some(profile), _) => profile,
            (None, Some(ext)) => LanguageProfile::from_matcher(ext)?,
            (None, None) => LanguageProfile::generic(),
        };
        return run_stdin(&cli, &jobs, profile);
    }

    let files = collect_files(&cli, paths, &extensions);
    if files.is_empty() {
        // Nothing selected, so no profile to compile for; still surface
        // template errors.
        compile_jobs(&jobs, forced.unwrap_or(LanguageProfile::generic()))?;
    }
    let options = BatchOptions {
        profile: forced,
        in_place: cli.in_place,
        timeout: cli.timeout.map(Duration::from_secs),
        fresh: FreshIds::new(),
    };
    let pool = build_pool(cli.jobs).map_err(|e| anyhow!("failed to start worker threads: {e}"))?;
    let reports = pool.install(|| run_batch(&files, &jobs, &options))?;

    let rewriting = jobs.iter().any(Job::rewrites);
    let mut failed = 0;
    let mut written = 0;
    for report in &reports {
        match &report.result {
            Ok(outcome) => {
                print_outcome(&cli, outcome, rewriting)?;
                if report.written.as_ref().is_some_and(|w| w.changed()) {
                    written += 1;
                }
            }
            Err(error) => {
                eprintln!("{} {}: {}", "✗".red(), report.path.display(), error);
                failed += 1;
            }
        }
    }

    if cli.in_place {
        print_summary(&reports, written, failed);
    }
    Ok(if failed > 0 {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    })
}

fn load_jobs(cli: &Cli) -> Result<Vec<Job>> {
    if let Some(path) = &cli.config {
        let rule_file = load_from_path(path)?;
        let min = cli.severity.unwrap_or(Severity::Info);
        let jobs: Vec<Job> = rule_file.at_least(min).map(Job::from).collect();
        if jobs.is_empty() {
            bail!("no rules in {} at severity {} or above", path.display(), min);
        }
        return Ok(jobs);
    }

    let Some(pattern) = &cli.match_template else {
        bail!("a MATCH template or --config is required");
    };
    Ok(vec![Job {
        name: "command-line".to_string(),
        pattern: pattern.clone(),
        either: cli.either.clone(),
        all: cli.all.clone(),
        rules: cli.rules.clone(),
        not: cli.not.clone(),
        inside: cli.inside.clone(),
        // --match-only never renders, so REWRITE is not checked either.
        rewrite: cli
            .rewrite_template
            .clone()
            .filter(|_| !cli.match_only),
        fix_regex: None,
        syntax: cli.syntax,
        severity: Severity::default(),
        message: None,
    }])
}

/// Targets starting with `.` that are not existing paths are extension
/// filters.
fn split_targets(targets: &[String]) -> (Vec<PathBuf>, Vec<String>) {
    let mut paths = Vec::new();
    let mut extensions = Vec::new();
    for target in targets {
        let path = Path::new(target);
        if target.starts_with('.') && target.len() > 1 && !path.exists() {
            extensions.push(target.clone());
        } else {
            paths.push(path.to_path_buf());
        }
    }
    (paths, extensions)
}

fn collect_files(cli: &Cli, mut paths: Vec<PathBuf>, extensions: &[String]) -> Vec<PathBuf> {
    paths.extend(cli.directory.iter().cloned());
    if paths.is_empty() {
        paths.push(PathBuf::from("."));
    }

    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            files.extend(discover_files(&path, extensions));
        } else {
            // Named files are kept even when their extension is filtered out,
            // so a missing one is reported.
            files.push(path);
        }
    }
    files.sort();
    files.dedup();
    files
}

fn run_stdin(cli: &Cli, jobs: &[Job], profile: &'static LanguageProfile) -> Result<ExitCode> {
    let compiled = compile_jobs(jobs, profile)?;
    let mut source = String::new();
    io::stdin()
        .read_to_string(&mut source)
        .map_err(|e| anyhow!("failed to read stdin: {e}"))?;

    let outcome = process_source("<stdin>", &source, profile, &compiled, &FreshIds::new());
    match outcome {
        Ok(outcome) => {
            let rewriting = jobs.iter().any(Job::rewrites);
            print_outcome(cli, &outcome, rewriting)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(error) => {
            eprintln!("{} <stdin>: {}", "✗".red(), error);
            Ok(ExitCode::from(1))
        }
    }
}

fn print_outcome(cli: &Cli, outcome: &FileOutcome, rewriting: bool) -> Result<()> {
    let uri = outcome.uri.as_str();
    match cli.mode() {
        Mode::JsonLines if rewriting => {
            if outcome.changed() {
                let substitutions = outcome.substitutions();
                let record = RewriteRecord {
                    uri,
                    rewritten_source: &outcome.rewritten,
                    in_place_substitutions: &substitutions,
                    diff: unified_diff(uri, &outcome.original, &outcome.rewritten),
                };
                println!("{}", record.to_json()?);
            }
        }
        Mode::JsonLines => {
            let matches: Vec<_> = outcome.matches().cloned().collect();
            if !matches.is_empty() {
                println!("{}", MatchRecord { uri, matches: &matches }.to_json()?);
            }
        }
        Mode::MatchOnly => {
            for m in outcome.matches() {
                println!("{}", match_line(uri, m));
            }
        }
        Mode::Stdout => print!("{}", outcome.rewritten),
        Mode::Diff => print_diff(outcome),
        Mode::Default if rewriting => {
            if !cli.in_place {
                print_diff(outcome);
            }
        }
        Mode::Default => {
            for job in &outcome.jobs {
                for m in &job.matches {
                    match &job.message {
                        Some(message) => println!(
                            "{}",
                            diagnostic_line(uri, m, &job.name, job.severity, message)
                        ),
                        None => println!("{}", match_line(uri, m)),
                    }
                }
            }
        }
    }
    Ok(())
}

fn print_diff(outcome: &FileOutcome) {
    let diff = if io::stdout().is_terminal() {
        colored_diff(&outcome.uri, &outcome.original, &outcome.rewritten)
    } else {
        unified_diff(&outcome.uri, &outcome.original, &outcome.rewritten)
    };
    print!("{diff}");
}

fn print_summary(reports: &[FileReport], written: usize, failed: usize) {
    for report in reports {
        if let Some(write) = report.written.as_ref().filter(|w| w.changed()) {
            eprintln!(
                "{} {}: {} replacement(s)",
                "✓".green(),
                report.path.display(),
                write.applied
            );
        }
    }
    eprintln!("{}", "Summary:".bold());
    eprintln!("  {} rewritten", format!("{written}").green());
    eprintln!(
        "  {} unchanged",
        format!("{}", reports.len() - written - failed).yellow()
    );
    eprintln!("  {} failed", format!("{failed}").red());
}
