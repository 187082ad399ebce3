use crate::error::WriteError;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use tracing::debug;

const GITHUB_OUTPUT: &str = "GITHUB_OUTPUT";

/// Exposes `key=value` as a step output when running under GitHub Actions.
/// Does nothing elsewhere.
pub fn set_step_output(key: &str, value: &str) -> Result<(), WriteError> {
    match std::env::var_os(GITHUB_OUTPUT) {
        Some(path) => append_output(Path::new(&path), key, value),
        None => {
            debug!("{} not set, skipping step output {}", GITHUB_OUTPUT, key);
            Ok(())
        }
    }
}

fn append_output(path: &Path, key: &str, value: &str) -> Result<(), WriteError> {
    let io_error = |source| WriteError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(io_error)?;
    writeln!(file, "{key}={value}").map_err(io_error)
}
