use minibuf_compiler::{build::compile_to_dir, Target};

fn main() {
    let out_dir = std::env::var("OUT_DIR").expect("OUT_DIR is set by cargo");
    println!("cargo:rerun-if-changed=schemas/example.mb");
    if let Err(err) = compile_to_dir(&["schemas/example.mb"], &out_dir, &[Target::Rust]) {
        panic!("failed to compile schemas/example.mb: {}", err);
    }
}
