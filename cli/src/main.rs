use clap::{ArgGroup, Parser, Subcommand};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use minibuf::{decode_to_json, encode_from_json};
use minibuf_compiler::{
    build::{generate_files, write_files},
    compile_files, expand_paths, MinibufError, SchemaSet, Target,
};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "minibufc", version)]
#[command(about = "Compile Minibuf schemas to C, TypeScript or Rust, or inspect wire data", long_about = None)]
struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate serialization code from `.mb` schema files
    #[command(group(ArgGroup::new("targets").required(true).multiple(true).args(["c", "ts", "rust"])))]
    Generate {
        /// Input `.mb` files or directories containing them
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output directory, created if missing
        #[arg(short, long, default_value = "generated")]
        output: PathBuf,

        /// Emit `minibuf.h` and `minibuf.c`
        #[arg(long)]
        c: bool,

        /// Emit `minibuf.types.ts` and `minibuf.ts`
        #[arg(long)]
        ts: bool,

        /// Emit `minibuf_types.rs` and `minibuf.rs`
        #[arg(long)]
        rust: bool,
    },

    /// Parse and verify schema files without generating anything
    Check {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Print the compiled schema model as JSON
    Dump {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Decode a wire record and print it as JSON
    Decode {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Schema the record belongs to
        #[arg(short, long)]
        schema: String,

        /// Encoded record, e.g. `[2]3;5`
        #[arg(short, long)]
        input: String,
    },

    /// Encode a JSON object as a wire record
    Encode {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Schema the record belongs to
        #[arg(short, long)]
        schema: String,

        /// JSON object keyed by field name; missing fields take their default
        #[arg(short, long)]
        json: String,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "minibufc=debug,minibuf_compiler=debug"
    } else {
        "minibufc=info,minibuf_compiler=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .init();
}

fn compile(files: &[PathBuf]) -> Result<SchemaSet, MinibufError> {
    compile_files(&expand_paths(files)?)
}

fn run(command: &Commands) -> Result<(), MinibufError> {
    match command {
        Commands::Generate { files, output, c, ts, rust } => {
            let set = compile(files)?;
            for schema in &set.schemas {
                debug!(
                    schema = %schema.name,
                    source = %schema.source,
                    fields = schema.fields.len(),
                    "Parsed schema"
                );
            }
            let targets: Vec<Target> = [(*c, Target::C), (*ts, Target::TypeScript), (*rust, Target::Rust)]
                .into_iter()
                .filter_map(|(wanted, target)| wanted.then_some(target))
                .collect();
            // Everything is generated in memory before the first write.
            let generated = generate_files(&set, &targets);
            write_files(output, &generated)?;
            for file in &generated {
                println!("{}", output.join(&file.name).display());
            }
            Ok(())
        }

        Commands::Check { files } => {
            let set = compile(files)?;
            for schema in &set.schemas {
                println!(
                    "{} ({}:{}): {} field(s)",
                    schema.name,
                    schema.source,
                    schema.line,
                    schema.fields.len()
                );
            }
            println!(
                "OK: {} schema(s), float_precision = {}",
                set.schemas.len(),
                set.float_precision()
            );
            Ok(())
        }

        Commands::Dump { files } => {
            let set = compile(files)?;
            println!("{}", serde_json::to_string_pretty(&set)?);
            Ok(())
        }

        Commands::Decode { files, schema, input } => {
            let set = compile(files)?;
            let json = decode_to_json(&set, schema, input)?;
            println!("{}", serde_json::to_string_pretty(&json)?);
            Ok(())
        }

        Commands::Encode { files, schema, json } => {
            let set = compile(files)?;
            let value: serde_json::Value = serde_json::from_str(json)?;
            println!("{}", encode_from_json(&set, schema, &value)?);
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}
