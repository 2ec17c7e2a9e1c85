//! Writing generated code to disk, from the CLI or from a build script.
//!
//! ```no_run
//! // build.rs
//! use minibuf_compiler::{build::compile_to_dir, Target};
//!
//! let out_dir = std::env::var("OUT_DIR").unwrap();
//! compile_to_dir(&["schemas/example.mb"], &out_dir, &[Target::Rust]).unwrap();
//! println!("cargo:rerun-if-changed=schemas/example.mb");
//! ```

use std::{fs, path::Path};

use minibuf_schema::SchemaSet;
use tracing::{debug, info};

use crate::{
    compiler::compile_files,
    error::MinibufError,
    traits::{GeneratedFile, Target},
};

/// Runs every requested emitter. Nothing touches the filesystem, so a caller
/// can write the result only once all targets have been produced.
pub fn generate_files(set: &SchemaSet, targets: &[Target]) -> Vec<GeneratedFile> {
    let mut files = Vec::new();
    for target in targets {
        let emitted = target.emitter().files(set);
        for file in &emitted {
            debug!(target = %target, file = %file.name, bytes = file.contents.len(), "Generated file");
        }
        files.extend(emitted);
    }
    files
}

/// Creates `dir` if needed and writes each file into it.
pub fn write_files(dir: impl AsRef<Path>, files: &[GeneratedFile]) -> Result<(), MinibufError> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    for file in files {
        fs::write(dir.join(&file.name), &file.contents)?;
    }
    info!(dir = %dir.display(), files = files.len(), "Wrote generated code");
    Ok(())
}

/// Compiles `paths` and writes code for `targets` into `out_dir`. Returns the
/// compiled schemas.
pub fn compile_to_dir<P: AsRef<Path>>(
    paths: &[P],
    out_dir: impl AsRef<Path>,
    targets: &[Target],
) -> Result<SchemaSet, MinibufError> {
    if targets.is_empty() {
        return Err(MinibufError::InvalidPath("no output target selected".to_string()));
    }
    let set = compile_files(paths)?;
    let files = generate_files(&set, targets);
    write_files(out_dir, &files)?;
    Ok(set)
}
