#![cfg(test)] // workaround for https://github.com/rust-lang/rust-clippy/issues/11024
#![allow(deprecated, reason = "the Command::cargo_bin function is fine for us")]

macro_rules! reject_instance {
    ($name:ident) => {
        #[test]
        fn $name() {
            let _ = check_cnf(stringify!($name), false).failure();
        }
    };
}

reject_instance!(too_many_clauses);
reject_instance!(unterminated);
reject_instance!(complementary);
reject_instance!(out_of_range);
reject_instance!(beyond_i32);

fn check_cnf(instance: &str, lenient: bool) -> assert_cmd::assert::Assert {
    let instance_path = format!(
        "{}/tests/instances/{instance}.cnf",
        env!("CARGO_MANIFEST_DIR")
    );

    let mut command = assert_cmd::Command::cargo_bin("pbip").expect("could not find executable");
    let _ = command.arg("check-cnf").arg(instance_path);
    if lenient {
        let _ = command.arg("--lenient");
    }

    command.assert()
}

#[test]
fn valid_instance_reports_its_header() {
    let _ = check_cnf("small", false)
        .success()
        .stdout("s VALID 3 2\n");
}

#[test]
fn lenient_mode_accepts_missing_terminator() {
    let _ = check_cnf("unterminated", true)
        .success()
        .stdout("s VALID 2 2\n");
}

#[test]
fn lenient_mode_still_rejects_complementary_literals() {
    let _ = check_cnf("complementary", true).failure();
}

#[test]
fn missing_file_is_an_error() {
    let _ = check_cnf("does_not_exist", false).failure();
}
