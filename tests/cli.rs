mod common;

use std::process::Command;

use common::box_repo;

fn typedeps() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_typedeps"));
    command.env_remove("RUST_LOG");
    command
}

#[test]
fn edges_go_to_stdout_and_failures_to_stderr() {
    let repo = box_repo();
    repo.write("m", "tsconfig.json", "{ broken");

    let output = typedeps().arg("--root").arg(repo.root()).output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout, "a,b,Foo\na,b,Box\na,b,Foo\n");
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert_eq!(stderr, "m\n");
}

#[test]
fn output_file_and_dedupe_flags() {
    let repo = box_repo();
    let out_dir = tempfile::TempDir::new().unwrap();
    let out_file = out_dir.path().join("edges.csv");

    let status = typedeps()
        .arg("--root")
        .arg(repo.root())
        .arg("--dedupe")
        .arg("--jobs")
        .arg("2")
        .arg("-o")
        .arg(&out_file)
        .status()
        .unwrap();
    assert!(status.success());

    let written = std::fs::read_to_string(&out_file).unwrap();
    assert_eq!(written, "a,b,Foo\na,b,Box\n");
}

#[test]
fn package_filter_accepts_comma_list() {
    let repo = box_repo();
    let output = typedeps()
        .arg("--root")
        .arg(repo.root())
        .arg("--package")
        .arg("b,a")
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(String::from_utf8(output.stdout).unwrap().lines().count(), 3);
}

#[test]
fn verbose_flag_surfaces_configuration_reports() {
    let repo = box_repo();
    repo.write("m", "tsconfig.json", "{ broken");

    let output = typedeps().arg("--root").arg(repo.root()).arg("-v").output().unwrap();
    assert!(output.status.success());

    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.lines().any(|line| line == "m"));
    assert!(stderr
        .lines()
        .any(|line| line.starts_with("[WARN") && line.contains("] m: ")));
}
