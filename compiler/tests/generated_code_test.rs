#![cfg(test)]

//! Builds and runs the generated C and TypeScript codecs and checks that they
//! write the same bytes as the Rust runtime. A test returns early when its
//! toolchain (`cc` or `node`) is not installed.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use minibuf_compiler::{build::write_files, compile_schema, SchemaSet, Target};
use minibuf_schema::Value;
use pretty_assertions::assert_eq;

const SCHEMAS: &str = r#"
config float_precision = 3;

Vector {
  x: float;
  y: float;
  z: float;
}

Config {
  auto_restart: bool;
  id: number;
  user_name: string = guest;
  score: float = 0.5;
}

Point {
  x: number;
  y: number = 5;
}
"#;

/// `(schema, input)` pairs. Every input is decoded, re-encoded and then
/// re-encoded again into buffers that fit exactly and one byte short.
const CASES: [(&str, &str); 16] = [
    ("Vector", "[3]3.14159;-0.5;0.9996"),
    ("Vector", "[3]1e19;1e22;-2.5e-3"),
    ("Vector", "[3]-0.0004;123456789.9999;.5"),
    ("Vector", "junk[9]1;2;3;4"),
    ("Vector", "[3]"),
    ("Vector", "1;2;3"),
    ("Config", "[4]T;42;Ted;99.5"),
    ("Config", "[4]F;;;"),
    ("Config", "[4]F;7"),
    ("Config", "[4]T;99999999999;x;abc"),
    ("Config", "[4]T;-12abc;h\u{e9}llo;1.5e2"),
    ("Config", "[4]"),
    ("Point", "[2]3"),
    ("Point", "[2]-2147483648;+12abc"),
    ("Point", "[7]1;2;3"),
    ("Point", "nope"),
];

const C_RUNNER: &str = r#"static void run_NAME(const char* input) {
    NAME_t value;
    char text[1024];
    char scratch[1024];
    size_t len = 0;
    size_t ignored = 0;
    int rc = mb_NAME_parse(input, &value);
    if (rc == MB_OK) rc = mb_NAME_serialize(&value, text, sizeof(text), &len);
    if (rc != MB_OK) {
        printf("rc=%d\n", rc);
        return;
    }
    /* C capacities include the NUL terminator. */
    printf("%s|%d|%d\n", text,
           mb_NAME_serialize(&value, scratch, len + 1, &ignored),
           mb_NAME_serialize(&value, scratch, len, &ignored));
}
"#;

const TS_RUNNER: &str = r#"import * as mb from "./minibuf.ts";

type Parse = (buf: string) => { code: number; value: unknown };
type Serialize = (value: any, capacity?: number) => { code: number; text: string; bytesWritten: number };

function run(parse: Parse, serialize: Serialize, input: string): void {
  const parsed = parse(input);
  if (parsed.code !== mb.ErrorCode.OK) {
    console.log(`rc=${parsed.code}`);
    return;
  }
  const full = serialize(parsed.value);
  const n = full.bytesWritten;
  console.log(`${full.text}|${serialize(parsed.value, n).code}|${serialize(parsed.value, n - 1).code}`);
}
"#;

fn compiled() -> SchemaSet {
    compile_schema(SCHEMAS).unwrap()
}

/// What every target must print for `CASES`, computed with the Rust runtime.
fn expected_lines(set: &SchemaSet) -> Vec<String> {
    CASES
        .iter()
        .map(|(name, input)| {
            let schema = set.get(name).unwrap();
            match Value::decode_record(schema, input) {
                Ok(values) => format!(
                    "{}|0|2",
                    Value::encode_record_to_string(schema, &values, set.float_precision())
                ),
                Err(err) => format!("rc={}", err.code()),
            }
        })
        .collect()
}

fn available(program: &str, args: &[&str], dir: &Path) -> Option<Output> {
    Command::new(program)
        .args(args)
        .current_dir(dir)
        .output()
        .ok()
        .filter(|output| output.status.success())
}

fn stdout_lines(output: &Output) -> Vec<String> {
    String::from_utf8_lossy(&output.stdout).lines().map(str::to_string).collect()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_reference_lines() {
    let expected = expected_lines(&compiled());
    assert_eq!(expected[0], "[3]3.142;-0.500;1.000|0|2");
    assert_eq!(expected[1], "[3]10000000000000000000.000;10000000000000000000000.000;-0.003|0|2");
    assert_eq!(expected[7], "[4]F;0;;0.000|0|2");
    assert_eq!(expected[8], "[4]F;7;guest;0.500|0|2");
    assert_eq!(expected[13], "[2]-2147483648;12|0|2");
    assert_eq!(expected[15], "rc=1");
}

#[test]
fn test_generated_c_matches_rust() {
    let dir = tempfile::tempdir().unwrap();
    if available("cc", &["--version"], dir.path()).is_none() {
        eprintln!("skipping: no C compiler on PATH");
        return;
    }

    let set = compiled();
    write_files(dir.path(), &Target::C.emitter().files(&set)).unwrap();

    let mut driver = vec!["#include <stdio.h>".to_string(), "#include \"minibuf.h\"".to_string(), "".to_string()];
    for schema in &set.schemas {
        driver.push(C_RUNNER.replace("NAME", &schema.name.to_ascii_lowercase()));
    }
    driver.push("int main(void) {".to_string());
    for (name, input) in CASES {
        driver.push(format!("    run_{}({:?});", name.to_ascii_lowercase(), input));
    }
    driver.push("    return 0;".to_string());
    driver.push("}".to_string());
    fs::write(dir.path().join("driver.c"), driver.join("\n")).unwrap();

    let build = Command::new("cc")
        .args([
            "-std=c99",
            "-Wall",
            "-Wextra",
            "-ffp-contract=off",
            "-o",
            "driver",
            "driver.c",
            "minibuf.c",
            "-lm",
        ])
        .current_dir(dir.path())
        .output()
        .unwrap();
    assert!(build.status.success(), "cc failed: {}", stderr(&build));

    let run = Command::new(dir.path().join("driver")).output().unwrap();
    assert!(run.status.success(), "driver failed: {}", stderr(&run));
    assert_eq!(stdout_lines(&run), expected_lines(&set));
}

#[test]
fn test_generated_typescript_matches_rust() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("package.json"), "{ \"type\": \"module\" }\n").unwrap();
    fs::write(dir.path().join("support.ts"), "const answer: number = 42;\nconsole.log(answer);\n").unwrap();
    let supported = available("node", &["--experimental-strip-types", "support.ts"], dir.path())
        .map(|output| stdout_lines(&output) == ["42"])
        .unwrap_or(false);
    if !supported {
        eprintln!("skipping: no node with TypeScript type stripping on PATH");
        return;
    }

    let set = compiled();
    let mut files = Target::TypeScript.emitter().files(&set);
    // Node resolves relative imports by exact file name.
    for file in &mut files {
        file.contents = file.contents.replace("\"./minibuf.types\"", "\"./minibuf.types.ts\"");
    }
    write_files(dir.path(), &files).unwrap();

    let mut driver = vec![TS_RUNNER.to_string()];
    for (name, input) in CASES {
        driver.push(format!(
            "run(mb.{}Parse, mb.{}Serialize, {});",
            name,
            name,
            serde_json::to_string(input).unwrap()
        ));
    }
    fs::write(dir.path().join("driver.ts"), driver.join("\n")).unwrap();

    let run = Command::new("node")
        .args(["--experimental-strip-types", "driver.ts"])
        .current_dir(dir.path())
        .output()
        .unwrap();
    assert!(run.status.success(), "node failed: {}", stderr(&run));
    assert_eq!(stdout_lines(&run), expected_lines(&set));
}
