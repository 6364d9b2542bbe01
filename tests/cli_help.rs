use assert_cmd::Command;

#[test]
fn cli_help_smoke() {
    let mut cmd = Command::cargo_bin("kira-dvh").unwrap();
    cmd.arg("--help");
    cmd.assert().success();
}

#[test]
fn run_help_lists_metric_flags() {
    let mut cmd = Command::cargo_bin("kira-dvh").unwrap();
    cmd.args(["run", "--help"]);
    let output = cmd.assert().success().get_output().stdout.clone();
    let text = String::from_utf8(output).unwrap();
    for flag in ["--plan", "--v-cc", "--d-percent", "--delimiter", "--anchor"] {
        assert!(text.contains(flag), "missing {}", flag);
    }
}
