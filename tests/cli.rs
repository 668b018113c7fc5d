extern crate assert_cmd;
extern crate predicates;
extern crate tempfile;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;

fn mandel(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("mandel").unwrap();
    cmd.arg("-o").arg(dir);
    cmd
}

fn count_files(dir: &Path) -> usize {
    fs::read_dir(dir).unwrap().count()
}

#[test]
fn renders_and_reports_timing() {
    let dir = tempfile::tempdir().unwrap();
    mandel(dir.path())
        .args(&["-t", "4", "40", "0.0"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Mandel: domain 40x40, 4 execution units, virtualization 0.00",
        ))
        .stdout(predicate::str::contains(
            "Mandel: chunk size 10, remainder 0, work units 4, single-pass",
        ))
        .stdout(predicate::str::contains("Mandel: computation time"));
    assert_eq!(count_files(dir.path()), 4);
    assert!(dir.path().join("out-mandelbrot-3.ppm").exists());
}

#[test]
fn one_thread_writes_one_image() {
    let dir = tempfile::tempdir().unwrap();
    mandel(dir.path())
        .args(&["-t", "1", "30"])
        .assert()
        .success();
    assert!(dir.path().join("out-mandelbrot.ppm").exists());
    assert_eq!(count_files(dir.path()), 1);
}

#[test]
fn progress_lines_follow_each_unit() {
    let dir = tempfile::tempdir().unwrap();
    mandel(dir.path())
        .args(&["-t", "2", "-p", "20"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Mandel: unit 0 finished (rows 0..10)"))
        .stdout(predicate::str::contains("Mandel: unit 1 finished (rows 10..20)"));
}

#[test]
fn multipass_jpeg() {
    let dir = tempfile::tempdir().unwrap();
    mandel(dir.path())
        .args(&["-t", "2", "-m", "-f", "jpeg", "32"])
        .assert()
        .success()
        .stdout(predicate::str::contains("work units 2, multi-pass"));
    assert_eq!(count_files(dir.path()), 4);
    assert!(dir.path().join("out-mandelbrot-1-1.jpg").exists());
}

#[test]
fn virtualization_out_of_range_fails_before_dispatch() {
    for &v in &["1.1", "-0.1"] {
        let dir = tempfile::tempdir().unwrap();
        mandel(dir.path())
            .args(&["-t", "4", "40", v])
            .assert()
            .failure()
            .stderr(predicate::str::contains("virtualization"))
            .stdout(predicate::str::contains("Mandel: domain").not());
        assert_eq!(count_files(dir.path()), 0);
    }
}

#[test]
fn non_positive_domain_fails() {
    let dir = tempfile::tempdir().unwrap();
    mandel(dir.path())
        .args(&["0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("domain size must be positive"));
    assert_eq!(count_files(dir.path()), 0);
}

#[test]
fn unparseable_arguments_fail() {
    let dir = tempfile::tempdir().unwrap();
    mandel(dir.path()).args(&["big"]).assert().failure();
    mandel(dir.path()).args(&["40", "half"]).assert().failure();
    assert_eq!(count_files(dir.path()), 0);
}
