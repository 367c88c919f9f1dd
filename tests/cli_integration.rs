//! CLI integration tests for avrkit.
//!
//! These tests drive the binary against a fake toolchain made of shell
//! scripts that create the files a real AVR-GCC would.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

const FAKE_CXX: &str = r##"#!/bin/sh
prev=""
last=""
out=""
for a in "$@"; do
  if [ "$prev" = "-o" ]; then out="$a"; fi
  if [ "$a" = "-dM" ]; then
    echo "#define __AVR__ 1"
    echo "#define __AVR_ATmega328P__ 1"
    exit 0
  fi
  prev="$a"
  last="$a"
done
if [ -n "$FAKE_FAIL_ARG" ]; then
  case "$*" in *"$FAKE_FAIL_ARG"*) echo "fake: error: forced failure" >&2; exit 1;; esac
fi
if [ -f "$last" ] && grep -q BROKEN "$last"; then
  echo "$last:1:1: error: broken source" >&2
  exit 1
fi
if [ -n "$out" ]; then : > "$out"; fi
exit 0
"##;

const FAKE_OBJCOPY: &str = r##"#!/bin/sh
for a in "$@"; do last="$a"; done
: > "$last"
"##;

const FAKE_SIZE: &str = r##"#!/bin/sh
echo "   text    data     bss     dec     hex filename"
echo "      0     842       0     842     34a $1"
"##;

const FAKE_AVRDUDE: &str = r##"#!/bin/sh
echo "avrdude: $* done" >&2
"##;

/// Get the avrkit binary command.
fn avrkit() -> Command {
    Command::cargo_bin("avrkit").unwrap()
}

/// A project directory with a fake toolchain next to it.
struct Fixture {
    tmp: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let bin = tmp.path().join("avr/bin");
        fs::create_dir_all(&bin).unwrap();
        fs::create_dir_all(tmp.path().join("project")).unwrap();

        for (name, script) in [
            ("avr-g++", FAKE_CXX),
            ("avr-objcopy", FAKE_OBJCOPY),
            ("avr-size", FAKE_SIZE),
            ("avrdude", FAKE_AVRDUDE),
        ] {
            let path = bin.join(name);
            fs::write(&path, script).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        }

        Fixture { tmp }
    }

    fn root(&self) -> PathBuf {
        self.tmp.path().join("avr")
    }

    fn project(&self) -> PathBuf {
        self.tmp.path().join("project")
    }

    fn source(&self, name: &str, content: &str) {
        let path = self.project().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn exists(&self, name: &str) -> bool {
        self.project().join(name).is_file()
    }

    /// avrkit run inside the project with the fake toolchain.
    fn cmd(&self) -> Command {
        let mut cmd = avrkit();
        cmd.current_dir(self.project())
            .env("AVR_GCC_ROOT", self.root())
            .env("HOME", self.tmp.path())
            .env_remove("RUST_LOG")
            .env_remove("FAKE_FAIL_ARG");
        cmd
    }
}

fn count_files(dir: &Path, ext: &str) -> usize {
    fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().is_some_and(|x| x == ext))
        .count()
}

// ============================================================================
// configuration and argument errors
// ============================================================================

#[test]
fn test_missing_root_is_reported_first() {
    let fx = Fixture::new();
    fx.source("demo.cpp", "int main() {}\n");

    fx.cmd()
        .env_remove("AVR_GCC_ROOT")
        .args(["build", "demo.cpp"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains(
            "avrkit: error: expected environment variable 'AVR_GCC_ROOT'",
        ));

    assert!(!fx.exists("demo.o"));
}

#[test]
fn test_missing_tool_is_configuration_error() {
    let fx = Fixture::new();
    fx.source("demo.cpp", "int main() {}\n");
    let empty = fx.tmp.path().join("empty-root");
    fs::create_dir_all(&empty).unwrap();

    fx.cmd()
        .env("AVR_GCC_ROOT", &empty)
        .args(["build", "demo.cpp"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("avr-g++ not found"));
}

#[test]
fn test_output_with_multiple_inputs() {
    let fx = Fixture::new();
    fx.source("blink.cpp", "int main() {}\n");
    fx.source("fade.cpp", "int main() {}\n");

    fx.cmd()
        .args(["build", "*.cpp", "--output", "fw"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains(
            "cannot use option '--output fw' with multiple input files",
        ));

    assert!(!fx.exists("blink.s"));
    assert!(!fx.exists("fw.elf"));
}

// ============================================================================
// avrkit build
// ============================================================================

#[test]
fn test_zero_match_is_not_an_error() {
    let fx = Fixture::new();

    fx.cmd()
        .args(["build", "*.cpp"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No files compiled"));
}

#[test]
fn test_build_single_file() {
    let fx = Fixture::new();
    fx.source("demo.cpp", "int main() {}\n");

    fx.cmd()
        .args(["build", "demo.cpp"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Processed 1 file"));

    for ext in ["s", "o", "elf", "eep", "hex"] {
        assert!(fx.exists(&format!("demo.{}", ext)), "missing demo.{}", ext);
    }
}

#[test]
fn test_build_each_file() {
    let fx = Fixture::new();
    fx.source("blink.cpp", "int main() {}\n");
    fx.source("fade.cpp", "int main() {}\n");

    fx.cmd()
        .args(["build", "blink.cpp", "fade.cpp"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Processed 2 files"));

    assert!(fx.exists("blink.hex"));
    assert!(fx.exists("fade.hex"));
}

#[test]
fn test_build_output_override() {
    let fx = Fixture::new();
    fx.source("demo.cpp", "int main() {}\n");

    fx.cmd()
        .args(["build", "demo.cpp", "-o", "out/firmware"])
        .assert()
        .success();

    assert!(fx.exists("out/firmware.hex"));
    assert!(fx.exists("out/firmware.eep"));
    assert!(!fx.exists("demo.hex"));
}

#[test]
fn test_build_link_all() {
    let fx = Fixture::new();
    fx.source("main.cpp", "int main() {}\n");
    fx.source("uart.cpp", "void uart() {}\n");

    fx.cmd()
        .args(["build", "--link-all", "main.cpp", "uart.cpp", "-o", "fw"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Processed 2 files"));

    assert!(fx.exists("main.o"));
    assert!(fx.exists("uart.o"));
    assert!(fx.exists("fw.elf"));
    assert!(fx.exists("fw.hex"));
}

#[test]
fn test_build_link_all_same_stem() {
    let fx = Fixture::new();
    fx.source("main.cpp", "int main() {}\n");
    fx.source("main.cc", "void helper() {}\n");

    fx.cmd()
        .args(["-dd", "build", "--link-all", "main.cpp", "main.cc", "-o", "fw"])
        .assert()
        .success()
        .stderr(predicate::str::contains("-o fw.elf main.o main-2.o -lm"));

    assert!(fx.exists("main.o"));
    assert!(fx.exists("main-2.o"));
    assert!(fx.exists("fw.hex"));
}

#[test]
fn test_build_failure_stops_target() {
    let fx = Fixture::new();
    fx.source("demo.cpp", "BROKEN\n");

    fx.cmd()
        .args(["build", "demo.cpp"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("failed with exit code 1"))
        .stderr(predicate::str::contains("broken source"));

    assert!(!fx.exists("demo.elf"));
    assert!(!fx.exists("demo.hex"));
}

#[test]
fn test_size_report_with_verbosity() {
    let fx = Fixture::new();
    fx.source("demo.cpp", "int main() {}\n");

    fx.cmd()
        .args(["build", "demo.cpp"])
        .assert()
        .success()
        .stdout(predicate::str::contains("filename").not());

    fx.cmd()
        .args(["-vv", "build", "demo.cpp"])
        .assert()
        .success()
        .stdout(predicate::str::contains("demo.hex"))
        .stderr(predicate::str::contains("demo.cpp => demo .s/.o/.elf/.eep/.hex"));
}

#[test]
fn test_debug_prints_commands() {
    let fx = Fixture::new();
    fx.source("demo.cpp", "int main() {}\n");

    fx.cmd()
        .args(["-dd", "build", "demo.cpp", "-D", "KE_UPDATE_KALMAN_GAIN=0", "-O", "s"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Environment: AVR_GCC_ROOT="))
        .stderr(predicate::str::contains("-Os"))
        .stderr(predicate::str::contains("-DKE_UPDATE_KALMAN_GAIN=0"));
}

#[test]
fn test_predefined_macros() {
    let fx = Fixture::new();

    fx.cmd()
        .args(["build", "--predefined"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#define __AVR__ 1"));
}

#[test]
fn test_project_config_defaults() {
    let fx = Fixture::new();
    fx.source("demo.cpp", "int main() {}\n");
    fx.source(
        ".avrkit/config.toml",
        "[build]\nmcu = \"atmega2560\"\nfcpu = \"8000000\"\n",
    );

    fx.cmd()
        .args(["-dd", "build", "demo.cpp"])
        .assert()
        .success()
        .stderr(predicate::str::contains("-mmcu=atmega2560"))
        .stderr(predicate::str::contains("-DF_CPU_HZ=8000000"));
}

// ============================================================================
// avrkit matrix
// ============================================================================

#[test]
fn test_matrix_builds_every_cell() {
    let fx = Fixture::new();
    fx.source("kalman-time-avr.cpp", "int main() {}\n");

    fx.cmd()
        .args(["matrix", "kalman-time-avr.cpp"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Built 8 of 8 matrix cells"));

    assert_eq!(count_files(&fx.project(), "hex"), 8);
    assert!(fx.exists("kalman-time-avr-fp32_t-fixed-O2.hex"));
    assert!(fx.exists("kalman-time-avr-double-updating-Os.hex"));
}

#[test]
fn test_matrix_failed_cell_does_not_stop_others() {
    let fx = Fixture::new();
    fx.source("kalman-time-avr.cpp", "int main() {}\n");

    fx.cmd()
        .env("FAKE_FAIL_ARG", "fp32_t-fixed-O2.o")
        .args(["matrix", "kalman-time-avr.cpp", "--jobs", "2"])
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("Built 7 of 8 matrix cells"))
        .stderr(predicate::str::contains("kalman-time-avr-fp32_t-fixed-O2"));

    assert_eq!(count_files(&fx.project(), "hex"), 7);
    assert!(!fx.exists("kalman-time-avr-fp32_t-fixed-O2.hex"));
}

#[test]
fn test_matrix_file() {
    let fx = Fixture::new();
    fx.source("bench.cpp", "int main() {}\n");
    fx.source(
        "clock.toml",
        r#"
basename = "clk"

[[dimension]]
name = "clock"
kind = "fcpu"
value = [{ value = "8000000", fragment = "8M" }, { value = "16000000", fragment = "16M" }]
"#,
    );

    fx.cmd()
        .args(["matrix", "bench.cpp", "--file", "clock.toml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Built 2 of 2 matrix cells"));

    assert!(fx.exists("clk-8M.hex"));
    assert!(fx.exists("clk-16M.hex"));
}

#[test]
fn test_matrix_unknown_preset() {
    let fx = Fixture::new();
    fx.source("bench.cpp", "int main() {}\n");

    fx.cmd()
        .args(["matrix", "bench.cpp", "--preset", "fir-time"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown matrix preset 'fir-time'"));
}

// ============================================================================
// avrkit upload
// ============================================================================

#[test]
fn test_upload_missing_file() {
    let fx = Fixture::new();

    fx.cmd()
        .args(["upload", "missing.hex"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no such file: missing.hex"));
}

#[test]
fn test_upload_runs_programmer() {
    let fx = Fixture::new();
    fx.source("blink.hex", ":00000001FF\n");

    fx.cmd()
        .args(["upload", "blink.hex", "--mmcu", "atmega2560"])
        .assert()
        .success()
        .stderr(predicate::str::contains(
            "-v -patmega2560 -cusbtiny -Uflash:w:blink.hex:i",
        ));
}
