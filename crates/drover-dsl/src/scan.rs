use std::{
    fs,
    path::{Path, PathBuf},
};

use tracing::{info, instrument, warn};

use drover_model::JobDefinition;

use crate::{
    error::{DslError, DslResult},
    parser::{ProviderCatalog, parse_job},
};

/// File extension of job files picked up by [`scan_directory`].
pub const JOB_FILE_EXTENSION: &str = "job";

/// A job file that could not be turned into a [`JobDefinition`].
#[derive(Debug)]
pub struct ScanFailure {
    pub path: PathBuf,
    pub error: DslError,
}

/// Outcome of one directory scan.
#[derive(Debug, Default)]
pub struct ScanReport {
    /// Parsed jobs in file name order.
    pub jobs: Vec<JobDefinition>,
    /// Files that failed, each with its own error.
    pub failures: Vec<ScanFailure>,
}

impl ScanReport {
    /// Returns `true` if every job file parsed.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Parse every `*.job` file directly inside `dir`.
///
/// Files are visited in file name order. A file that fails to read, tokenize,
/// assemble or resolve is recorded in [`ScanReport::failures`] and the scan
/// moves on. Only an unreadable directory fails the whole call.
#[instrument(level = "info", skip(catalog), fields(dir = %dir.display()))]
pub fn scan_directory<C>(dir: &Path, catalog: &C) -> DslResult<ScanReport>
where
    C: ProviderCatalog + ?Sized,
{
    let io_err = |source: std::io::Error| DslError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        let is_job = path.is_file()
            && path
                .extension()
                .is_some_and(|ext| ext == JOB_FILE_EXTENSION);
        if is_job {
            paths.push(path);
        }
    }
    paths.sort();

    let mut report = ScanReport::default();
    for path in paths {
        match parse_file(&path, catalog) {
            Ok(job) => {
                info!(job = %job.name, tasks = job.tasks.len(), "job file parsed");
                report.jobs.push(job);
            }
            Err(error) => {
                warn!(path = %path.display(), error = %error, "job file rejected");
                report.failures.push(ScanFailure { path, error });
            }
        }
    }
    Ok(report)
}

fn parse_file<C>(path: &Path, catalog: &C) -> DslResult<JobDefinition>
where
    C: ProviderCatalog + ?Sized,
{
    let text = fs::read_to_string(path).map_err(|source| DslError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    parse_job(&name, &text, catalog)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROVIDERS: &[&str] = &["ticker", "localexec"];

    fn write(dir: &Path, name: &str, text: &str) {
        fs::write(dir.join(name), text).unwrap();
    }

    #[test]
    fn scan_parses_job_files_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "b.job", "ticker B {\n  Interval: 2\n}\n");
        write(dir.path(), "a.job", "ticker A {\n  Interval: 1\n}\n");
        write(dir.path(), "notes.txt", "not a job");

        let report = scan_directory(dir.path(), PROVIDERS).unwrap();

        assert!(report.is_clean());
        let names: Vec<&str> = report.jobs.iter().map(|j| j.name.as_str()).collect();
        assert_eq!(names, vec!["a.job", "b.job"]);
    }

    #[test]
    fn bad_files_do_not_stop_the_scan() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "good.job", "ticker T {\n  Interval: 1\n}\n");
        write(dir.path(), "syntax.job", "ticker T { % }\n");
        write(dir.path(), "unknown.job", "mongo Q {\n  Query: x\n}\n");

        let report = scan_directory(dir.path(), PROVIDERS).unwrap();

        assert_eq!(report.jobs.len(), 1);
        assert_eq!(report.jobs[0].name, "good.job");
        assert_eq!(report.failures.len(), 2);
        assert!(matches!(report.failures[0].error, DslError::Syntax(_)));
        assert!(matches!(
            report.failures[1].error,
            DslError::UnknownProvider { .. }
        ));
        assert!(report.failures[1].path.ends_with("unknown.job"));
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        assert!(matches!(
            scan_directory(&missing, PROVIDERS),
            Err(DslError::Io { .. })
        ));
    }
}
