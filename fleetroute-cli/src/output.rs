//! JSON output to stdout or a file.

use std::io::Write;

use camino::Utf8Path;
use log::debug;
use serde::Serialize;

use crate::CliError;
use crate::fs::write_utf8_file;

/// Pretty-print `value` to `path` when given, otherwise to `stdout`.
pub(crate) fn write_json<T: Serialize>(
    value: &T,
    path: Option<&Utf8Path>,
    stdout: &mut dyn Write,
) -> Result<(), CliError> {
    let mut payload = serde_json::to_vec_pretty(value).map_err(CliError::SerialiseOutput)?;
    payload.push(b'\n');
    match path {
        Some(target) => {
            debug!("writing output to {target}");
            write_utf8_file(target, &payload).map_err(CliError::WriteOutput)
        }
        None => stdout.write_all(&payload).map_err(CliError::WriteOutput),
    }
}
