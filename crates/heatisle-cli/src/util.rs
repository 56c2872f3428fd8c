use std::{
    fs::{self, File, OpenOptions},
    io::{self, BufReader, BufWriter, Write},
    path::Path,
};

use anyhow::Context;
use serde::{Serialize, de::DeserializeOwned};

/// Writes `value` as pretty-printed JSON to `path`, or to stdout if there is
/// no path.
///
/// An existing file is never replaced, and a file whose write fails is
/// removed again.
pub fn write_json<T: Serialize>(value: &T, path: Option<&Path>) -> anyhow::Result<()> {
    let Some(path) = path else {
        return write_pretty(io::stdout().lock(), value).context("Failed to write JSON to stdout");
    };
    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;
    if let Err(e) = write_pretty(BufWriter::new(file), value) {
        if let Err(e) = fs::remove_file(path) {
            log::warn!("Failed to remove partial file {}: {e}", path.display());
        }
        return Err(e).with_context(|| format!("Failed to write JSON to {}", path.display()));
    }
    Ok(())
}

fn write_pretty<W: Write, T: Serialize>(mut writer: W, value: &T) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut writer, value)?;
    writeln!(writer)?;
    writer.flush()
}

pub fn read_json_file<T, P>(file_kind: &str, path: P) -> anyhow::Result<T>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open {file_kind} file: {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse {file_kind} JSON file: {}", path.display()))
}
