#![cfg(test)] // workaround for https://github.com/rust-lang/rust-clippy/issues/11024
#![allow(deprecated, reason = "the Command::cargo_bin function is fine for us")]

use std::path::PathBuf;

macro_rules! reject_proof {
    ($name:ident) => {
        #[test]
        fn $name() {
            let _ = pbip()
                .arg("verify")
                .arg(fixture(stringify!($name)))
                .assert()
                .failure();
        }
    };
}

reject_proof!(tampered_bound);
reject_proof!(no_contradiction);
reject_proof!(forward_hint);
reject_proof!(overflowing_sum);

fn pbip() -> assert_cmd::Command {
    assert_cmd::Command::cargo_bin("pbip").expect("could not find executable")
}

fn fixture(name: &str) -> String {
    format!("{}/tests/proofs/{name}.pbip", env!("CARGO_MANIFEST_DIR"))
}

fn scratch_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("pbip-{}-{name}", std::process::id()))
}

fn write_then_verify(file_name: &str, format: &str) {
    let proof_path = scratch_path(file_name);

    let output = pbip()
        .args(["pigeonhole", "--holes", "3", "--pigeons", "4"])
        .arg("--proof-path")
        .arg(&proof_path)
        .args(["--format", format])
        .output()
        .expect("failed to run");
    assert!(output.status.success());
    assert!(output.stdout.ends_with(b"s UNSATISFIABLE\n"));

    let _ = pbip()
        .arg("verify")
        .arg(&proof_path)
        .args(["--format", format])
        .assert()
        .success()
        .stdout("s VERIFIED\n");

    let _ = std::fs::remove_file(&proof_path);
}

#[test]
fn fixture_proof_is_verified() {
    let _ = pbip()
        .arg("verify")
        .arg(fixture("pigeonhole_1_2"))
        .assert()
        .success()
        .stdout("s VERIFIED\n");
}

#[test]
fn text_proof_is_verified() {
    write_then_verify("text.pbip", "text");
}

#[test]
fn binary_proof_is_verified() {
    write_then_verify("binary.pbip", "binary");
}

#[test]
#[cfg(feature = "gzipped-proofs")]
fn gzipped_proof_is_verified() {
    write_then_verify("gzipped.pbip.gz", "binary");
}

#[test]
fn binary_reader_rejects_text_proof() {
    let _ = pbip()
        .arg("verify")
        .arg(fixture("pigeonhole_1_2"))
        .args(["--format", "binary"])
        .assert()
        .failure();
}

#[test]
fn pigeonhole_without_proof_path_reports_unsatisfiable() {
    let output = pbip()
        .args(["pigeonhole", "--holes", "2", "--pigeons", "3"])
        .output()
        .expect("failed to run");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(Some("s UNSATISFIABLE"), stdout.lines().last());
}

#[test]
fn pigeonhole_with_enough_holes_fails() {
    let _ = pbip()
        .args(["pigeonhole", "--holes", "3", "--pigeons", "3"])
        .assert()
        .failure();
}

#[test]
fn pigeonhole_without_holes_fails() {
    let _ = pbip()
        .args(["pigeonhole", "--holes", "0", "--pigeons", "3"])
        .assert()
        .failure();
}

#[test]
fn integers_are_encoded_as_varints() {
    let output = pbip()
        .arg("encode")
        .write_stdin("-63 -8193\n129 -8191")
        .output()
        .expect("failed to run");

    assert!(output.status.success());
    assert_eq!(
        vec![0x7f, 0x83, 0x80, 0x01, 0x82, 0x02, 0xff, 0x7f],
        output.stdout
    );
}

#[test]
fn varints_are_decoded_as_integers() {
    let _ = pbip()
        .arg("decode")
        .write_stdin(vec![0x7f, 0x83, 0x80, 0x01, 0x82, 0x02, 0xff, 0x7f])
        .assert()
        .success()
        .stdout("-63 -8193 129 -8191\n");
}

#[test]
fn truncated_varint_fails_to_decode() {
    let _ = pbip()
        .arg("decode")
        .write_stdin(vec![0x83, 0x80])
        .assert()
        .failure();
}

#[test]
fn negative_zero_fails_to_decode() {
    let _ = pbip()
        .arg("decode")
        .write_stdin(vec![0x01])
        .assert()
        .failure();
}

#[test]
fn non_integer_fails_to_encode() {
    let _ = pbip()
        .arg("encode")
        .write_stdin("1 two 3")
        .assert()
        .failure();
}
