use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn help_lists_the_usage() {
    Command::cargo_bin("nugu")
        .expect("Binary exists")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage").and(predicate::str::contains("--engine")));
}

#[test]
fn a_source_path_is_required() {
    Command::cargo_bin("nugu")
        .expect("Binary exists")
        .assert()
        .failure();
}

#[test]
fn options_without_a_source_are_rejected() {
    Command::cargo_bin("nugu")
        .expect("Binary exists")
        .args(["--engine", "true", "--", "--host", "news.example.com"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("source path"));
}

#[cfg(unix)]
mod with_fake_tools {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    const LSJSON: &str = r#"[{"Path":"a/b.txt","Name":"b.txt","Size":12,"IsDir":false},{"Path":"c.bin","Name":"c.bin","Size":7,"IsDir":false}]"#;

    fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    struct Tools {
        dir: TempDir,
        rclone: PathBuf,
        engine: PathBuf,
    }

    fn tools(rclone_body: &str) -> Tools {
        let dir = TempDir::new().unwrap();
        let rclone = script(dir.path(), "rclone", rclone_body);
        // Prints argv, then the manifest it was fed, then a progress line on stderr.
        let engine = script(
            dir.path(),
            "nyuu",
            r#"printf '%s\n' "$@"
echo ---
cat
echo
echo 'Uploading 2 article(s) from 2 file(s) totalling 1.00 KiB' >&2"#,
        );
        Tools { dir, rclone, engine }
    }

    fn nugu(tools: &Tools) -> Command {
        let mut cmd = Command::cargo_bin("nugu").expect("Binary exists");
        cmd.env_remove("NUGU_CONFIG")
            .arg("--rclone")
            .arg(&tools.rclone)
            .arg("--engine")
            .arg(&tools.engine);
        cmd
    }

    #[test]
    fn live_mode_streams_manifest_and_arguments() {
        let tools = tools(&format!("echo '{LSJSON}'"));

        nugu(&tools)
            .env("USENET_POST_HOST", "news.example.com")
            .args(["remote:set", "--port", "563", "--overwrite"])
            .assert()
            .success()
            .stdout(
                predicate::str::contains("--host\nnews.example.com\n")
                    .and(predicate::str::contains("--port\n563\n--overwrite\n--out\n-\n"))
                    .and(predicate::str::contains("--input-file\n-\n--ssl\n---\n"))
                    .and(predicate::str::contains(format!(
                        r#"procjson://"b.txt",12,"{} cat 'remote:set/a/b.txt'""#,
                        tools.rclone.display()
                    ))),
            );
    }

    #[test]
    fn out_path_writes_engine_output_to_file() {
        let tools = tools(&format!("echo '{LSJSON}'"));
        let out = tools.dir.path().join("post.nzb");

        nugu(&tools)
            .args(["remote:set", "--out"])
            .arg(&out)
            .assert()
            .success()
            .stdout(predicate::str::is_empty());

        let written = fs::read_to_string(&out).unwrap();
        assert!(written.contains("--out\n-\n"), "{written}");
        assert!(written.contains("c.bin"), "{written}");
    }

    #[test]
    fn empty_out_buffers_and_prints_at_the_end() {
        let tools = tools(&format!("echo '{LSJSON}'"));

        nugu(&tools)
            .env_remove("RUST_LOG")
            .arg("--track-progress")
            .args(["remote:set", "--out", "", "--archive"])
            .assert()
            .success()
            .stdout(predicate::str::contains(format!(
                r#"procjson://"set.tar",10240,"{} archive -- 'remote:set' -""#,
                tools.rclone.display()
            )))
            .stderr(
                predicate::str::contains("Uploading 2 article(s)")
                    .and(predicate::str::contains("Upload progress")),
            );
    }

    #[test]
    fn progress_is_not_logged_without_the_flag() {
        let tools = tools(&format!("echo '{LSJSON}'"));

        nugu(&tools)
            .env_remove("RUST_LOG")
            .args(["remote:set", "--out", ""])
            .assert()
            .success()
            .stderr(
                predicate::str::contains("Uploading 2 article(s)")
                    .and(predicate::str::contains("Upload progress").not()),
            );
    }

    #[test]
    fn listing_failure_is_reported() {
        let tools = tools("echo 'directory not found' >&2; exit 3");

        nugu(&tools)
            .arg("remote:missing")
            .assert()
            .failure()
            .stderr(predicate::str::contains("directory not found"));
    }
}
