use std::{
    fs,
    path::{Path, PathBuf},
};

use minibuf_schema::{SchemaSet, FILE_EXTENSION};
use tracing::{debug, info};

use crate::{
    error::MinibufError,
    parser::parse_schema,
    tokenizer::tokenize_schema,
    verifier::verify_schema,
};

/// One schema source file. `name` labels parse errors and is recorded on every
/// schema parsed from it.
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    pub name: String,
    pub text: String,
}

impl Source {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Source {
        Source { name: name.into(), text: text.into() }
    }

    /// Reads a `.mb` file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Source, MinibufError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        if path.extension().and_then(|ext| ext.to_str()) != Some(FILE_EXTENSION) {
            return Err(MinibufError::InvalidPath(format!(
                "{} (expected a .{} file)",
                display, FILE_EXTENSION
            )));
        }
        if !path.is_file() {
            return Err(MinibufError::InvalidPath(format!("{} (no such file)", display)));
        }
        let text = fs::read_to_string(path)?;
        Ok(Source::new(display, text))
    }
}

/// Compile a single in-memory schema source into a verified `SchemaSet`.
pub fn compile_schema(text: &str) -> Result<SchemaSet, MinibufError> {
    compile_sources(&[Source::new("<input>", text)])
}

/// Parses every source, merges the results in order and verifies the merged
/// set once. A config key assigned in several sources keeps the last value.
pub fn compile_sources(sources: &[Source]) -> Result<SchemaSet, MinibufError> {
    let mut merged = SchemaSet::default();
    for source in sources {
        let tokens = tokenize_schema(&source.name, &source.text)?;
        let set = parse_schema(&source.name, &tokens)?;
        debug!(
            source = %source.name,
            schemas = set.schemas.len(),
            "Parsed schema source"
        );
        merged.schemas.extend(set.schemas);
        for (key, value) in set.config.iter() {
            merged.config.insert(key.clone(), value.clone());
        }
    }
    verify_schema(&merged)?;
    info!(
        sources = sources.len(),
        schemas = merged.schemas.len(),
        float_precision = merged.float_precision(),
        "Compiled schemas"
    );
    Ok(merged)
}

pub fn load_sources<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<Source>, MinibufError> {
    if paths.is_empty() {
        return Err(MinibufError::InvalidPath("no schema files given".to_string()));
    }
    paths.iter().map(Source::load).collect()
}

/// Load, parse and verify schema files.
pub fn compile_files<P: AsRef<Path>>(paths: &[P]) -> Result<SchemaSet, MinibufError> {
    compile_sources(&load_sources(paths)?)
}

/// Expands directories into the `.mb` files they directly contain, sorted by
/// name. Plain file paths are passed through unchanged.
pub fn expand_paths<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<PathBuf>, MinibufError> {
    let mut expanded = Vec::new();
    for path in paths {
        let path = path.as_ref();
        if path.is_dir() {
            let mut found = Vec::new();
            for entry in fs::read_dir(path)? {
                let entry_path = entry?.path();
                if entry_path.is_file()
                    && entry_path.extension().and_then(|ext| ext.to_str()) == Some(FILE_EXTENSION)
                {
                    found.push(entry_path);
                }
            }
            found.sort();
            expanded.extend(found);
        } else {
            expanded.push(path.to_path_buf());
        }
    }
    Ok(expanded)
}
