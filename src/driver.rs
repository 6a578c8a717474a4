//! Running rules over files.
//!
//! A batch has three phases: every job is compiled against every profile
//! the batch needs (failures abort before any file is read), files are
//! processed as independent rayon tasks, and reports come back sorted by
//! path whatever order the workers finished in.

use crate::cache;
use crate::config::{FixRegex, RuleSpec, Severity};
use crate::edit::{Edit, EditError, FileWrite};
use crate::lang::{LanguageProfile, LanguageProfileError};
use crate::matcher::Match;
use crate::output::Substitution;
use crate::pattern::{CompileError, Syntax};
use crate::position::LineIndex;
use crate::query::{find_matches, Query, QueryError};
use crate::rewrite::{Fix, FreshIds, RegexFix, Replacement, RewriteError, RewriteTemplate};
use crate::rules::Rule;
use rayon::prelude::*;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Directory names never descended into.
const SKIPPED_DIRS: &[&str] = &["target", "node_modules"];

/// An uncompiled rule: template texts as written on the command line or in
/// a rule file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub name: String,
    pub pattern: String,
    pub either: Vec<String>,
    pub all: Vec<String>,
    pub rules: Vec<String>,
    pub not: Vec<String>,
    pub inside: Vec<String>,
    pub rewrite: Option<String>,
    pub fix_regex: Option<FixRegex>,
    /// How holes are written in every template of this job
    pub syntax: Syntax,
    pub severity: Severity,
    pub message: Option<String>,
}

impl Job {
    pub fn new(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
            either: Vec::new(),
            all: Vec::new(),
            rules: Vec::new(),
            not: Vec::new(),
            inside: Vec::new(),
            rewrite: None,
            fix_regex: None,
            syntax: Syntax::default(),
            severity: Severity::default(),
            message: None,
        }
    }

    pub fn with_rewrite(mut self, rewrite: impl Into<String>) -> Self {
        self.rewrite = Some(rewrite.into());
        self
    }

    pub fn with_rule(mut self, rule: impl Into<String>) -> Self {
        self.rules.push(rule.into());
        self
    }

    pub fn with_syntax(mut self, syntax: Syntax) -> Self {
        self.syntax = syntax;
        self
    }

    /// Whether running this job can change the text.
    pub fn rewrites(&self) -> bool {
        self.rewrite.is_some() || self.fix_regex.is_some()
    }

    /// Compile against `profile`, checking every hole a rule or the rewrite
    /// references is bound.
    pub fn compile(&self, profile: &LanguageProfile) -> Result<CompiledJob, JobError> {
        let err = |source: QueryError| JobError::Query {
            job: self.name.clone(),
            source,
        };
        let compile = |text: &str| {
            cache::get_or_compile(&self.syntax.normalize(text), profile).map_err(QueryError::from)
        };

        let mut query = Query::new(compile(&self.pattern).map_err(err)?);
        for text in &self.either {
            query = query.either(compile(text).map_err(err)?);
        }
        for text in &self.all {
            query = query.all(compile(text).map_err(err)?);
        }
        for text in &self.rules {
            let text = self.syntax.normalize(text);
            query = query.rule(Rule::parse(&text).map_err(|e| err(e.into()))?);
        }
        for text in &self.not {
            query = query.not(compile(text).map_err(err)?);
        }
        for text in &self.inside {
            query = query.inside(compile(text).map_err(err)?);
        }
        query.validate().map_err(err)?;

        let fix = match (&self.rewrite, &self.fix_regex) {
            (Some(_), Some(_)) => {
                return Err(JobError::ConflictingFixes {
                    job: self.name.clone(),
                })
            }
            (Some(text), None) => {
                let template = RewriteTemplate::compile(&self.syntax.normalize(text)).map_err(
                    |source| JobError::Template {
                        job: self.name.clone(),
                        source,
                    },
                )?;
                template
                    .check_bound(&query.variables())
                    .map_err(|source| JobError::Unbound {
                        job: self.name.clone(),
                        source,
                    })?;
                Some(Fix::Template(template))
            }
            (None, Some(spec)) => {
                let fix = RegexFix::compile(&spec.regex, &spec.replacement, spec.count)
                    .map_err(|source| JobError::FixRegex {
                        job: self.name.clone(),
                        source,
                    })?;
                Some(Fix::Regex(fix))
            }
            (None, None) => None,
        };

        Ok(CompiledJob {
            name: self.name.clone(),
            query,
            fix,
            severity: self.severity,
            message: self.message.clone(),
        })
    }
}

impl From<&RuleSpec> for Job {
    fn from(spec: &RuleSpec) -> Self {
        Self {
            name: spec.name.clone(),
            pattern: spec.pattern.clone(),
            either: spec.either.clone(),
            all: spec.all.clone(),
            rules: spec.rule.iter().cloned().collect(),
            not: spec.not.clone(),
            inside: spec.inside.clone(),
            rewrite: spec.rewrite.clone(),
            fix_regex: spec.fix_regex.clone(),
            syntax: spec.syntax,
            severity: spec.severity,
            message: spec.message.clone(),
        }
    }
}

/// Compile failures. Always reported before any file is read.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum JobError {
    #[error("rule '{job}': {source}")]
    Query { job: String, source: QueryError },

    #[error("rule '{job}': invalid rewrite template: {source}")]
    Template { job: String, source: CompileError },

    #[error("rule '{job}': {source}")]
    Unbound { job: String, source: RewriteError },

    #[error("rule '{job}': invalid fix-regex: {source}")]
    FixRegex { job: String, source: regex::Error },

    #[error("rule '{job}': set either a rewrite or a fix-regex, not both")]
    ConflictingFixes { job: String },
}

/// A job ready to run against one language profile.
#[derive(Debug, Clone)]
pub struct CompiledJob {
    pub name: String,
    pub query: Query,
    pub fix: Option<Fix>,
    pub severity: Severity,
    pub message: Option<String>,
}

/// Compile `jobs` against `profile`, stopping at the first failure.
pub fn compile_jobs(jobs: &[Job], profile: &LanguageProfile) -> Result<Vec<CompiledJob>, JobError> {
    jobs.iter().map(|job| job.compile(profile)).collect()
}

/// What one job did to one source text.
#[derive(Debug, Clone)]
pub struct JobOutcome {
    pub name: String,
    pub severity: Severity,
    pub message: Option<String>,
    /// Matches against the text this job saw
    pub matches: Vec<Match>,
    pub replacements: Vec<Replacement>,
    /// Replacements located in this job's output
    pub substitutions: Vec<Substitution>,
}

/// Result of running every job over one source text.
#[derive(Debug, Clone)]
pub struct FileOutcome {
    pub uri: String,
    pub original: String,
    pub rewritten: String,
    pub jobs: Vec<JobOutcome>,
}

impl FileOutcome {
    pub fn changed(&self) -> bool {
        self.original != self.rewritten
    }

    pub fn matches(&self) -> impl Iterator<Item = &Match> {
        self.jobs.iter().flat_map(|job| job.matches.iter())
    }

    pub fn match_count(&self) -> usize {
        self.jobs.iter().map(|job| job.matches.len()).sum()
    }

    pub fn substitutions(&self) -> Vec<Substitution> {
        self.jobs
            .iter()
            .flat_map(|job| job.substitutions.iter().cloned())
            .collect()
    }

    /// Edits that turn `original` into `rewritten` on disk.
    ///
    /// A single rewriting job yields one edit per replacement. When several
    /// jobs rewrote the text their spans no longer refer to the original,
    /// so the whole file becomes one edit.
    pub fn edits(&self, file: &Path) -> Vec<Edit> {
        if !self.changed() {
            return Vec::new();
        }
        let mut rewriting = self.jobs.iter().filter(|job| !job.replacements.is_empty());
        match (rewriting.next(), rewriting.next()) {
            (Some(job), None) => job.replacements.iter().map(|r| r.to_edit(file)).collect(),
            _ => vec![Edit::new(
                file,
                0,
                self.original.len(),
                self.rewritten.clone(),
                self.original.clone(),
            )],
        }
    }
}

/// Run `jobs` in order over `text`; each job sees the previous job's output.
pub fn process_source(
    uri: &str,
    text: &str,
    profile: &LanguageProfile,
    jobs: &[CompiledJob],
    fresh: &FreshIds,
) -> Result<FileOutcome, RewriteError> {
    let mut current = text.to_string();
    let mut outcomes = Vec::with_capacity(jobs.len());

    for job in jobs {
        let matches: Vec<Match> = find_matches(&current, profile, &job.query).collect();
        debug!(uri, job = %job.name, matches = matches.len(), "ran job");

        let mut outcome = JobOutcome {
            name: job.name.clone(),
            severity: job.severity,
            message: job.message.clone(),
            matches,
            replacements: Vec::new(),
            substitutions: Vec::new(),
        };
        if let Some(fix) = &job.fix {
            let rewritten = fix.apply(&current, &outcome.matches, fresh)?;
            let lines = LineIndex::new(&rewritten.text);
            outcome.substitutions = rewritten
                .replacements
                .iter()
                .map(|r| Substitution {
                    range: lines.range(r.output_start, r.output_end),
                    replacement_content: r.replacement.clone(),
                    environment: r.environment.clone(),
                })
                .collect();
            outcome.replacements = rewritten.replacements;
            current = rewritten.text;
        }
        outcomes.push(outcome);
    }

    Ok(FileOutcome {
        uri: uri.to_string(),
        original: text.to_string(),
        rewritten: current,
        jobs: outcomes,
    })
}

/// Per-file failure; the rest of the batch carries on.
#[derive(Error, Debug)]
pub enum FileError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Language(#[from] LanguageProfileError),

    #[error(transparent)]
    Rewrite(#[from] RewriteError),

    #[error(transparent)]
    Edit(#[from] EditError),

    #[error("skipped {path}: time limit reached")]
    DeadlineExceeded { path: PathBuf },
}

#[derive(Debug)]
pub struct FileReport {
    pub path: PathBuf,
    pub result: Result<FileOutcome, FileError>,
    /// Set when the file was rewritten in place
    pub written: Option<FileWrite>,
}

#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Profile for every file instead of detection by extension
    pub profile: Option<&'static LanguageProfile>,
    pub in_place: bool,
    /// Stop starting new files after this long
    pub timeout: Option<Duration>,
    pub fresh: FreshIds,
}

/// Run `jobs` over `files` on the current rayon pool.
///
/// Returns `Err` only for compile failures, which happen before any file is
/// read. Reports are sorted by path.
pub fn run_batch(
    files: &[PathBuf],
    jobs: &[Job],
    options: &BatchOptions,
) -> Result<Vec<FileReport>, JobError> {
    let profiles: Vec<Result<&'static LanguageProfile, LanguageProfileError>> = files
        .iter()
        .map(|path| match options.profile {
            Some(profile) => Ok(profile),
            None => LanguageProfile::from_path(path),
        })
        .collect();

    let mut compiled: HashMap<&'static str, Vec<CompiledJob>> = HashMap::new();
    for profile in profiles.iter().flatten() {
        if !compiled.contains_key(profile.name) {
            compiled.insert(profile.name, compile_jobs(jobs, profile)?);
        }
    }

    let started = Instant::now();
    let expired = AtomicBool::new(false);
    let mut reports: Vec<FileReport> = files
        .par_iter()
        .zip(profiles.into_par_iter())
        .map(|(path, profile)| {
            let past_deadline = options
                .timeout
                .is_some_and(|limit| started.elapsed() >= limit);
            if past_deadline {
                if !expired.swap(true, Ordering::Relaxed) {
                    warn!("time limit reached; remaining files are skipped");
                }
                return FileReport {
                    path: path.clone(),
                    result: Err(FileError::DeadlineExceeded { path: path.clone() }),
                    written: None,
                };
            }
            run_file(path, profile, &compiled, options)
        })
        .collect();

    reports.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(reports)
}

fn run_file(
    path: &Path,
    profile: Result<&'static LanguageProfile, LanguageProfileError>,
    compiled: &HashMap<&'static str, Vec<CompiledJob>>,
    options: &BatchOptions,
) -> FileReport {
    let mut written = None;
    let result = profile.map_err(FileError::from).and_then(|profile| {
        let text = fs::read_to_string(path).map_err(|source| FileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let jobs = compiled.get(profile.name).map(Vec::as_slice).unwrap_or(&[]);
        let uri = path.display().to_string();
        let outcome = process_source(&uri, &text, profile, jobs, &options.fresh)?;
        if options.in_place && outcome.changed() {
            written = Edit::apply_batch(outcome.edits(path))?.pop();
        }
        Ok(outcome)
    });

    if let Err(error) = &result {
        warn!(file = %path.display(), %error, "file failed");
    }
    FileReport {
        path: path.to_path_buf(),
        result,
        written,
    }
}

/// Files under `root` to process, sorted.
///
/// Hidden directories, `target` and `node_modules` are skipped. With an
/// empty `extensions` list every file with a known language is kept;
/// otherwise only files with one of the listed extensions.
pub fn discover_files(root: &Path, extensions: &[String]) -> Vec<PathBuf> {
    let wanted: Vec<String> = extensions
        .iter()
        .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
        .collect();

    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 || !entry.file_type().is_dir() {
                return true;
            }
            let name = entry.file_name().to_string_lossy();
            !name.starts_with('.') && !SKIPPED_DIRS.contains(&name.as_ref())
        })
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(error) => {
                warn!(%error, "skipping unreadable entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            let ext = path
                .extension()
                .and_then(|e| e.to_str())
                .map(str::to_ascii_lowercase);
            match ext {
                Some(ext) if !wanted.is_empty() => wanted.contains(&ext),
                Some(ext) => LanguageProfile::from_extension(&ext).is_some(),
                None => false,
            }
        })
        .collect();

    files.sort();
    files
}
