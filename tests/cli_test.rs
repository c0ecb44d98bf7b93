// file: tests/cli_test.rs
// version: 1.0.0
// guid: 5b3bdd84-98f6-4f9a-b073-90e86e9e5346

//! End-to-end tests for the cifar-train-job binary

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const CANONICAL_SCRIPT: &str = "#!/bin/bash
#SBATCH --job-name=lab5
#SBATCH --partition=teach_gpu
#SBATCH --nodes=1
#SBATCH --output=train_%j.out
#SBATCH --error=train_%j.err
#SBATCH --account=COMS030144
#SBATCH --gres=gpu:1
#SBATCH --time=0-00:30
#SBATCH --mem=64GB

module purge
module load languages/anaconda3/2021-3.8.8-cuda-11.1-pytorch

python train_cifar.py --learning-rate 0.01 --batch-size 128 --data-aug-brightness 0.1
";

/// A command isolated from any configuration on this machine
fn cli(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("cifar-train-job").unwrap();
    cmd.current_dir(dir.path())
        .env("HOME", dir.path())
        .env("XDG_CONFIG_HOME", dir.path().join(".config"))
        .env_remove("CIFAR_JOB_CONFIG")
        .env_remove("CIFAR_JOB_PARTITION")
        .env_remove("CIFAR_JOB_ACCOUNT")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_render_without_config_prints_canonical_script() {
    let dir = TempDir::new().unwrap();
    cli(&dir)
        .args(["--quiet", "render"])
        .assert()
        .success()
        .stdout(CANONICAL_SCRIPT);
}

#[test]
fn test_render_with_overrides() {
    let dir = TempDir::new().unwrap();
    cli(&dir)
        .args([
            "--quiet",
            "render",
            "--learning-rate",
            "0.05",
            "--data-aug-brightness",
            "0.3",
            "--time",
            "0-01:00",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("#SBATCH --time=0-01:00\n"))
        .stdout(predicate::str::contains(
            "--learning-rate 0.05 --batch-size 128 --data-aug-brightness 0.3",
        ));
}

#[test]
fn test_init_then_validate() {
    let dir = TempDir::new().unwrap();
    cli(&dir)
        .args(["init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("cifar-job.yaml"));
    assert!(dir.path().join("cifar-job.yaml").exists());

    cli(&dir)
        .args(["validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("job lab5 is valid"))
        .stdout(predicate::str::contains("1800 s"));

    // refuses to overwrite without --force
    cli(&dir).args(["init"]).assert().failure();
    cli(&dir).args(["init", "--force"]).assert().success();
}

#[test]
fn test_project_config_is_picked_up() {
    let dir = TempDir::new().unwrap();
    cli(&dir).args(["init"]).assert().success();

    let path = dir.path().join("cifar-job.yaml");
    let content = std::fs::read_to_string(&path).unwrap();
    std::fs::write(&path, content.replace("teach_gpu", "gpu_short")).unwrap();

    cli(&dir)
        .args(["--quiet", "render"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#SBATCH --partition=gpu_short\n"));
}

#[test]
fn test_inspect_reads_script_back() {
    let dir = TempDir::new().unwrap();
    let script = dir.path().join("lab5.sh");
    std::fs::write(&script, CANONICAL_SCRIPT).unwrap();

    cli(&dir)
        .args(["--quiet", "inspect", "lab5.sh", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"job_name\": \"lab5\""))
        .stdout(predicate::str::contains("\"data_aug_brightness\": 0.1"));
}

#[test]
fn test_inspect_rejects_script_without_directives() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("plain.sh"), "#!/bin/bash\necho hi\n").unwrap();

    cli(&dir).args(["inspect", "plain.sh"]).assert().failure();
}

#[test]
fn test_submit_dry_run_writes_nothing() {
    let dir = TempDir::new().unwrap();
    cli(&dir)
        .args(["--quiet", "submit", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("DRY RUN: would execute: sbatch"))
        .stdout(predicate::str::contains("lab5.sh"));

    assert!(!dir.path().join("lab5.sh").exists());
}

#[test]
fn test_submit_dry_run_json_report() {
    let dir = TempDir::new().unwrap();
    cli(&dir)
        .args(["--quiet", "submit", "--dry-run", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\": \"dry_run\""))
        .stdout(predicate::str::contains("\"launcher\": \"sbatch\""));
}

#[test]
fn test_submit_with_missing_sbatch_fails() {
    let dir = TempDir::new().unwrap();
    cli(&dir)
        .args(["submit", "--sbatch", "definitely-not-sbatch-xyz"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Command not found"));

    // nothing is left behind when submission cannot start
    assert!(!dir.path().join("lab5.sh").exists());
}

#[test]
fn test_run_local_dry_run() {
    let dir = TempDir::new().unwrap();
    cli(&dir)
        .args(["--quiet", "run-local", "--dry-run", "--skip-modules"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "python train_cifar.py --learning-rate 0.01",
        ));
}

#[test]
fn test_invalid_time_rejected() {
    let dir = TempDir::new().unwrap();
    cli(&dir)
        .args(["render", "--time", "UNLIMITED"])
        .assert()
        .failure();
}

#[test]
fn test_oversized_time_is_a_usage_error() {
    let dir = TempDir::new().unwrap();
    cli(&dir)
        .args(["render", "--time", "400000000000000000"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("too long"))
        .stderr(predicate::str::contains("panicked").not());
}

#[test]
fn test_version_flag() {
    let dir = TempDir::new().unwrap();
    cli(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_invalid_config_fails_validation() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("job.json"), "{}").unwrap();

    cli(&dir)
        .args(["validate", "--config", "job.json"])
        .assert()
        .failure();
}
