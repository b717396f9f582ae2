use assert_cmd::Command;
use std::path::PathBuf;

/// The `stepwise` binary with a clean environment.
pub fn stepwise() -> Command {
    let mut cmd = Command::cargo_bin("stepwise").unwrap();
    cmd.env_remove("RUST_LOG").env_remove("STEPWISE_CONFIG");
    cmd
}

pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// `stepwise debug` with the plain display configuration.
pub fn debug(program: &str) -> Command {
    let mut cmd = stepwise();
    cmd.arg("--config")
        .arg(fixture("plain.toml"))
        .arg("debug")
        .arg(fixture(program));
    cmd
}
