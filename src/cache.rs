//! Compiled-schema cache: the compiled form of `x.rnc` is kept next to it as
//! `x.rnc.json` and reused while it is newer than the source.
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{debug, info, warn};

use crate::compile::compile;
use crate::emit::{emit_document, load_document_str};
use crate::error::{Result, RncError};
use crate::ir::SchemaDocument;
use crate::pretty::pretty;

pub fn cache_path(source: &Path) -> PathBuf {
    let mut name = source.as_os_str().to_owned();
    name.push(".json");
    PathBuf::from(name)
}

/// Loads a schema: compiled documents (`.json`) directly, RNC sources through
/// the cache unless `use_cache` is off.
pub fn load_schema(path: &Path, use_cache: bool) -> Result<SchemaDocument> {
    if path.extension().is_some_and(|ext| ext == "json") {
        let text = fs::read_to_string(path).map_err(|err| RncError::io(path, err))?;
        return load_document_str(&text);
    }
    if use_cache { load_or_compile(path) } else { compile_file(path) }
}

pub fn load_or_compile(source: &Path) -> Result<SchemaDocument> {
    let cached = cache_path(source);
    if is_fresh(&cached, source)? {
        match fs::read_to_string(&cached).map_err(|err| RncError::io(&cached, err)).and_then(|t| load_document_str(&t)) {
            Ok(doc) => {
                debug!(cache = %cached.display(), "schema cache hit");
                return Ok(doc);
            }
            Err(err) => warn!(cache = %cached.display(), %err, "unusable schema cache, recompiling"),
        }
    }
    info!(source = %source.display(), "compiling schema");
    let doc = compile_file(source)?;
    if let Err(err) = fs::write(&cached, pretty(&emit_document(&doc), true)) {
        warn!(cache = %cached.display(), %err, "could not write schema cache");
    }
    Ok(doc)
}

/// Compiles an RNC file and stamps the document with its origin and time.
pub fn compile_file(source: &Path) -> Result<SchemaDocument> {
    let text = fs::read_to_string(source).map_err(|err| RncError::io(source, err))?;
    let mut doc = compile(&text).map_err(RncError::Compile)?;
    stamp(&mut doc, source);
    Ok(doc)
}

/// Records which file the document was compiled from, and when.
pub fn stamp(doc: &mut SchemaDocument, source: &Path) {
    let file = source.file_name().map_or_else(|| source.display().to_string(), |n| n.to_string_lossy().into_owned());
    doc.title = Some(format!("Created from JSON-RNC: {file}"));
    doc.description = Some(format!("Written: {}", chrono::Local::now().format("%Y-%m-%d %H:%M")));
}

fn is_fresh(cached: &Path, source: &Path) -> Result<bool> {
    let Some(cache_time) = modified(cached) else { return Ok(false) };
    let source_time = fs::metadata(source).and_then(|m| m.modified()).map_err(|err| RncError::io(source, err))?;
    Ok(cache_time > source_time)
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

// ------------------------------- Tests ------------------------------------ //
