//! Text persistence of set stores and item weights.
//!
//! Set store files start with a `<size> <dim>` header followed by one line per row:
//! `<count> <item>:<weight> ...`. Files written without the header are accepted on load,
//! in which case `dim` is inferred from the largest item id.
//!
//! Weights files hold one `<item> <weight>` pair per line.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use tracing::debug;

use crate::error::{Result, SmhError};
use crate::store::{Entry, Row, Store};
use crate::weights::Weights;

/// Loads a set store from a file.
pub fn load<P: AsRef<Path>>(path: P) -> Result<Store> {
    let path = path.as_ref();
    let file = open(path)?;
    let store = read_store(BufReader::new(file)).map_err(|e| with_path(e, path))?;
    debug!(path = %path.display(), size = store.size(), dim = store.dim(), "loaded set store");
    Ok(store)
}

/// Saves a set store to a file, replacing any previous content.
pub fn save<P: AsRef<Path>>(store: &Store, path: P) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|source| io_error(path, source))?;
    let mut writer = BufWriter::new(file);
    write_store(store, &mut writer)
        .and_then(|_| writer.flush())
        .map_err(|source| io_error(path, source))
}

/// Loads item weights from a file. Items not listed get the neutral weight `1.0`.
pub fn load_weights<P: AsRef<Path>>(path: P) -> Result<Weights> {
    let path = path.as_ref();
    let file = open(path)?;
    read_weights(BufReader::new(file)).map_err(|e| with_path(e, path))
}

pub fn save_weights<P: AsRef<Path>>(weights: &Weights, path: P) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|source| io_error(path, source))?;
    let mut writer = BufWriter::new(file);
    write_weights(weights, &mut writer)
        .and_then(|_| writer.flush())
        .map_err(|source| io_error(path, source))
}

pub fn write_store<W: Write>(store: &Store, writer: &mut W) -> io::Result<()> {
    writeln!(writer, "{} {}", store.size(), store.dim())?;
    for row in store {
        write!(writer, "{}", row.len())?;
        for entry in row.entries() {
            write!(writer, " {}:{}", entry.item, entry.weight)?;
        }
        writeln!(writer)?;
    }
    Ok(())
}

pub fn read_store<R: BufRead>(reader: R) -> Result<Store> {
    let mut header: Option<(usize, usize)> = None;
    let mut rows: Vec<Row> = Vec::new();
    let mut max_item: Option<u32> = None;

    for (n, line) in reader.lines().enumerate() {
        let line_no = n + 1;
        let line = line.map_err(|source| SmhError::Io { path: Default::default(), source })?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if rows.is_empty() && header.is_none() {
            if let Some(parsed) = parse_header(line) {
                header = Some(parsed);
                continue;
            }
        }
        let row = parse_row(line, line_no)?;
        if let Some(max) = row.max_item() {
            max_item = Some(max_item.map_or(max, |m| m.max(max)));
        }
        rows.push(row);
    }

    let inferred_dim = max_item.map_or(0, |m| m as usize + 1);
    let dim = match header {
        Some((size, dim)) => {
            if size != rows.len() {
                return Err(SmhError::Parse {
                    line: 1,
                    message: format!("header announces {size} rows, but {} were read", rows.len()),
                });
            }
            if inferred_dim > dim {
                return Err(SmhError::item_out_of_range(inferred_dim - 1, dim));
            }
            dim
        }
        None => inferred_dim,
    };
    Store::from_rows(rows, dim)
}

pub fn write_weights<W: Write>(weights: &Weights, writer: &mut W) -> io::Result<()> {
    for (item, weight) in weights.iter().enumerate() {
        writeln!(writer, "{item} {weight}")?;
    }
    Ok(())
}

pub fn read_weights<R: BufRead>(reader: R) -> Result<Weights> {
    let mut pairs: Vec<(usize, f64)> = Vec::new();
    for (n, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| SmhError::Io { path: Default::default(), source })?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let parse_err = |message: &str| SmhError::Parse { line: n + 1, message: message.into() };
        let mut fields = line.split_whitespace();
        let item = fields
            .next()
            .and_then(|f| f.parse::<usize>().ok())
            .ok_or_else(|| parse_err("expected an item id"))?;
        let weight = fields
            .next()
            .and_then(|f| f.parse::<f64>().ok())
            .ok_or_else(|| parse_err("expected a weight"))?;
        if fields.next().is_some() {
            return Err(parse_err("trailing fields"));
        }
        pairs.push((item, weight));
    }
    let dim = pairs.iter().map(|(item, _)| item + 1).max().unwrap_or(0);
    let mut weights = Weights::uniform(dim);
    for (item, weight) in pairs {
        weights.set(item, weight)?;
    }
    Ok(weights)
}

fn parse_header(line: &str) -> Option<(usize, usize)> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != 2 || fields.iter().any(|f| f.contains(':')) {
        return None;
    }
    Some((fields[0].parse().ok()?, fields[1].parse().ok()?))
}

fn parse_row(line: &str, line_no: usize) -> Result<Row> {
    let parse_err = |message: String| SmhError::Parse { line: line_no, message };
    let mut fields = line.split_whitespace();
    let count: usize = fields
        .next()
        .and_then(|f| f.parse().ok())
        .ok_or_else(|| parse_err("expected the number of entries".into()))?;
    let mut entries = Vec::with_capacity(count);
    for field in fields {
        let (item, weight) = field
            .split_once(':')
            .ok_or_else(|| parse_err(format!("expected item:weight, found {field:?}")))?;
        let item = item
            .parse::<u32>()
            .map_err(|_| parse_err(format!("invalid item id {item:?}")))?;
        let weight = weight
            .parse::<u32>()
            .map_err(|_| parse_err(format!("invalid weight {weight:?}")))?;
        entries.push(Entry::new(item, weight));
    }
    if entries.len() != count {
        return Err(parse_err(format!("expected {count} entries, found {}", entries.len())));
    }
    Ok(Row::from_entries(entries))
}

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => SmhError::NotFound { path: path.to_path_buf() },
        _ => io_error(path, source),
    })
}

fn io_error(path: &Path, source: io::Error) -> SmhError {
    SmhError::Io { path: path.to_path_buf(), source }
}

fn with_path(error: SmhError, path: &Path) -> SmhError {
    match error {
        SmhError::Io { source, .. } => io_error(path, source),
        other => other,
    }
}
