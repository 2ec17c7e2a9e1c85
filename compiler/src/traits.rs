use std::{fmt, str::FromStr};

use minibuf_schema::SchemaSet;

use crate::{gen_c::CEmitter, gen_rust::RustEmitter, gen_ts::TsEmitter};

/// The two text blocks an emitter produces: type definitions and the
/// parse/serialize implementation.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedCode {
    pub interface:      String,
    pub implementation: String,
}

/// A generated file, named relative to the output directory.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedFile {
    pub name:     String,
    pub contents: String,
}

/// Emitters are pure functions of a verified `SchemaSet`.
pub trait Emitter {
    fn target(&self) -> Target;

    /// File names for the interface and implementation blocks.
    fn file_names(&self) -> (&'static str, &'static str);

    fn emit(&self, set: &SchemaSet) -> GeneratedCode;

    fn files(&self, set: &SchemaSet) -> Vec<GeneratedFile> {
        let code = self.emit(set);
        let (interface, implementation) = self.file_names();
        vec![
            GeneratedFile { name: interface.to_string(), contents: code.interface },
            GeneratedFile { name: implementation.to_string(), contents: code.implementation },
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    C,
    TypeScript,
    Rust,
}

impl Target {
    pub const ALL: [Target; 3] = [Target::C, Target::TypeScript, Target::Rust];

    pub fn name(&self) -> &'static str {
        match self {
            Target::C => "c",
            Target::TypeScript => "ts",
            Target::Rust => "rust",
        }
    }

    pub fn emitter(&self) -> Box<dyn Emitter> {
        match self {
            Target::C => Box::new(CEmitter),
            Target::TypeScript => Box::new(TsEmitter),
            Target::Rust => Box::new(RustEmitter::default()),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> Result<Target, String> {
        match s.to_ascii_lowercase().as_str() {
            "c" => Ok(Target::C),
            "ts" | "typescript" => Ok(Target::TypeScript),
            "rust" | "rs" => Ok(Target::Rust),
            other => Err(format!("unknown target \"{}\"", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_names() {
        for target in Target::ALL {
            assert_eq!(target.name().parse::<Target>(), Ok(target));
            assert_eq!(target.emitter().target(), target);
        }
        assert_eq!("TypeScript".parse::<Target>(), Ok(Target::TypeScript));
        assert!("go".parse::<Target>().is_err());
    }

    #[test]
    fn emitter_files() {
        let set = SchemaSet::default();
        let names: Vec<_> = Target::ALL
            .iter()
            .flat_map(|t| t.emitter().files(&set))
            .map(|f| f.name)
            .collect();
        assert_eq!(names, [
            "minibuf.h",
            "minibuf.c",
            "minibuf.types.ts",
            "minibuf.ts",
            "minibuf_types.rs",
            "minibuf.rs",
        ]);
    }
}
