//! Job arguments: `--NAME value` pairs, as job runners pass them.

use std::collections::BTreeMap;

use super::JobError;
use crate::config::ConfigError;

/// Arguments keyed by their `--NAME` form.
pub type JobArguments = BTreeMap<String, String>;

/// Parse `--NAME value` and `--NAME=value` pairs. Later occurrences win.
pub fn parse_argv<S: AsRef<str>>(argv: &[S]) -> Result<JobArguments, JobError> {
    let mut args = JobArguments::new();
    let mut iter = argv.iter().map(AsRef::as_ref);

    while let Some(token) = iter.next() {
        if !token.starts_with("--") || token.len() == 2 {
            return Err(JobError::InvalidArguments(format!(
                "expected --NAME, found '{token}'"
            )));
        }
        match token.split_once('=') {
            Some((name, value)) => {
                args.insert(name.to_string(), value.to_string());
            }
            None => {
                let value = iter.next().ok_or_else(|| {
                    JobError::InvalidArguments(format!("'{token}' has no value"))
                })?;
                args.insert(token.to_string(), value.to_string());
            }
        }
    }

    Ok(args)
}

/// Pick the named options (given without the `--` prefix) out of `args`.
///
/// Every name is required; the first missing one fails the whole resolution.
pub fn resolve_options(
    args: &JobArguments,
    names: &[&str],
) -> Result<BTreeMap<String, String>, ConfigError> {
    names
        .iter()
        .map(|name| {
            let key = format!("--{name}");
            match args.get(&key) {
                Some(value) if !value.is_empty() => Ok((name.to_string(), value.clone())),
                _ => Err(ConfigError::Missing { key }),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_forms() {
        let args = parse_argv(&[
            "--JOB_NAME",
            "refine",
            "--s3_source_path=s3://q/raw/a.parquet",
        ])
        .unwrap();
        assert_eq!(args["--JOB_NAME"], "refine");
        assert_eq!(args["--s3_source_path"], "s3://q/raw/a.parquet");
    }

    #[test]
    fn dangling_name_is_rejected() {
        assert!(parse_argv(&["--JOB_NAME"]).is_err());
        assert!(parse_argv(&["positional"]).is_err());
    }

    #[test]
    fn resolve_reports_first_missing_option() {
        let args = parse_argv(&["--A", "1"]).unwrap();
        let resolved = resolve_options(&args, &["A"]).unwrap();
        assert_eq!(resolved["A"], "1");

        let err = resolve_options(&args, &["A", "B"]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing { ref key } if key == "--B"));
    }
}
