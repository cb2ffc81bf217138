use assert_cmd::Command;
use predicates::str::contains;

fn synvm() -> Command {
    Command::cargo_bin("synvm").unwrap()
}

#[test]
fn runs_without_arguments() {
    synvm().assert().success();
}

#[test]
fn prints_single_character_and_halts() {
    synvm()
        .arg("run")
        .arg("tests/files/add_out.bin")
        .arg("--minimal")
        .assert()
        .success()
        .stdout("\x0b")
        .stderr(contains("Halted"));
}

#[test]
fn runs_hello_world_from_path() {
    synvm()
        .arg("tests/files/hello.bin")
        .assert()
        .success()
        .stdout("Hello, world!\n")
        .stderr(contains("Halted"));
}

#[test]
fn call_and_return() {
    synvm()
        .arg("run")
        .arg("tests/files/call_ret.bin")
        .assert()
        .success()
        .stdout("A");
}

#[test]
fn return_with_empty_stack_is_clean() {
    synvm()
        .arg("run")
        .arg("tests/files/ret_empty.bin")
        .assert()
        .success()
        .stdout("")
        .stderr(contains("Returned"));
}

#[test]
fn echoes_piped_input_until_exhausted() {
    synvm()
        .arg("run")
        .arg("tests/files/echo.bin")
        .write_stdin("hi\n")
        .assert()
        .failure()
        .stdout("hi\n")
        .stderr(contains("input ended"));
}

#[test]
fn scripted_input_comes_before_stdin() {
    synvm()
        .arg("run")
        .arg("tests/files/echo.bin")
        .arg("--input")
        .arg("ab")
        .write_stdin("c")
        .assert()
        .failure()
        .stdout("abc");
}

#[test]
fn modulo_by_zero_reports_address() {
    synvm()
        .arg("run")
        .arg("tests/files/mod_zero.bin")
        .assert()
        .failure()
        .stderr(contains("zero divisor"))
        .stderr(contains("address 3"));
}

#[test]
fn pop_on_empty_stack_fails() {
    synvm()
        .arg("run")
        .arg("tests/files/pop_empty.bin")
        .assert()
        .failure()
        .stderr(contains("empty stack"));
}

#[test]
fn literal_destination_fails() {
    synvm()
        .arg("run")
        .arg("tests/files/bad_dest.bin")
        .assert()
        .failure()
        .stderr(contains("cannot be written to"));
}

#[test]
fn step_limit_stops_endless_program() {
    synvm()
        .arg("run")
        .arg("tests/files/spin.bin")
        .arg("--step-limit")
        .arg("100")
        .assert()
        .success()
        .stderr(contains("Stopped"))
        .stderr(contains("after 100 instructions"));
}

#[test]
fn step_limit_from_environment() {
    synvm()
        .env("SYNVM_STEP_LIMIT", "10")
        .arg("run")
        .arg("tests/files/spin.bin")
        .assert()
        .success()
        .stderr(contains("after 10 instructions"));
}

#[test]
fn trace_lists_instructions() {
    synvm()
        .arg("run")
        .arg("tests/files/add_out.bin")
        .arg("--trace")
        .arg("--minimal")
        .assert()
        .success()
        .stderr(contains("ADD  R0=0 5 6"))
        .stderr(contains("OUT  R0=11"))
        .stderr(contains("HALT"));
}

#[test]
fn dumps_registers() {
    synvm()
        .arg("run")
        .arg("tests/files/add_out.bin")
        .arg("--minimal")
        .arg("--dump")
        .assert()
        .success()
        .stderr(contains("R0 11\n"))
        .stderr(contains("PC 6\n"))
        .stderr(contains("SP 0\n"));
}

#[test]
fn patches_register_from_input() {
    synvm()
        .arg("run")
        .arg("tests/files/patch.bin")
        .arg("--patch-sentinel")
        .arg("$")
        .arg("--input")
        .arg("$7\nx")
        .assert()
        .success()
        .stdout("7");
}

#[test]
fn rejects_out_of_range_patch_register() {
    synvm()
        .arg("run")
        .arg("tests/files/patch.bin")
        .arg("--patch-sentinel")
        .arg("$")
        .arg("--patch-register")
        .arg("8")
        .assert()
        .failure();
}

#[test]
fn watches_output() {
    synvm()
        .arg("run")
        .arg("tests/files/hello.bin")
        .arg("--watch")
        .arg("world")
        .assert()
        .success()
        .stdout("Hello, world!\n")
        .stderr(contains("Matched"));
}

#[test]
fn odd_length_image_is_rejected() {
    synvm()
        .arg("run")
        .arg("tests/files/odd.bin")
        .assert()
        .failure()
        .stdout("")
        .stderr(contains("not a whole number of 16-bit words"));
}

#[test]
fn missing_image_is_rejected() {
    synvm()
        .arg("run")
        .arg("tests/files/does_not_exist.bin")
        .assert()
        .failure()
        .stderr(contains("failed to read image"));
}

#[test]
fn checks_image() {
    synvm()
        .arg("check")
        .arg("tests/files/hello.bin")
        .assert()
        .success()
        .stderr(contains("29 words"));
}
