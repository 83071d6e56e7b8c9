use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;

const STACK: &str = r#"
stack "web-sakura" {
    project "web-sakura"
    region "us-central1"
}

service-account "auto-regist-runner" {
    account-id "auto-regist-runner"
}

secret "account" {
    secret-id "account"
    replication "automatic"
}

storage-bucket "asset-bucket" {
    location "us-central1"
    name "web-sakura-asset"
}

storage-object "asset-object" {
    bucket (ref)"storage-bucket:asset-bucket.name"
    source "build/auto-regist.zip"
}

pubsub-topic "scheduler-topic" {
    name "scheduler-topic"
}

cloud-function "auto-regist" {
    entry-point "EntryPoint"
    runtime "go121"
    source-bucket (ref)"storage-bucket:asset-bucket.name"
    source-object (ref)"storage-object:asset-object.name"
    trigger-topic (ref)"pubsub-topic:scheduler-topic.id"
    service-account (ref)"service-account:auto-regist-runner.email"
    secret-env {
        ACCOUNT (ref)"secret:account.secret_id"
    }
}

scheduler-job "schedule" {
    name "auto-regist-schedule"
    schedule "0 0 * * *"
    pubsub-target (ref)"pubsub-topic:scheduler-topic.id"
}
"#;

fn write_stack(dir: &Path, content: &str) {
    std::fs::write(dir.join("stack.kdl"), content).unwrap();
}

fn sora(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("sora").unwrap();
    cmd.current_dir(dir).env_remove("SORA_STACK_PATH");
    cmd
}

#[test]
fn validate_reports_apply_order() {
    let temp = tempfile::tempdir().unwrap();
    write_stack(temp.path(), STACK);

    sora(temp.path())
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("検証OK"))
        .stdout(predicate::str::contains("secret:account"))
        .stdout(predicate::str::contains("cloud-function:auto-regist"));
}

#[test]
fn validate_fails_on_cycle() {
    let temp = tempfile::tempdir().unwrap();
    write_stack(
        temp.path(),
        r#"
            stack "broken"
            storage-object "a" {
                marker (ref)"cloud-function:b.name"
            }
            cloud-function "b" {
                source-object (ref)"storage-object:a.name"
            }
        "#,
    );

    sora(temp.path())
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("循環依存"));
}

#[test]
fn validate_fails_on_dangling_reference() {
    let temp = tempfile::tempdir().unwrap();
    write_stack(
        temp.path(),
        r#"
            stack "broken"
            cloud-function "auto-regist" {
                trigger-topic (ref)"pubsub-topic:missing.id"
            }
        "#,
    );

    sora(temp.path())
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("参照先リソースが見つかりません"));
}

#[test]
fn plan_creates_everything_on_fresh_state() {
    let temp = tempfile::tempdir().unwrap();
    write_stack(temp.path(), STACK);

    sora(temp.path())
        .arg("plan")
        .assert()
        .success()
        .stdout(predicate::str::contains("7 to create"))
        .stdout(predicate::str::contains("(known after apply)"));
}

#[test]
fn up_without_yes_only_shows_the_plan() {
    let temp = tempfile::tempdir().unwrap();
    write_stack(temp.path(), STACK);

    sora(temp.path())
        .arg("up")
        .assert()
        .success()
        .stdout(predicate::str::contains("--yes"));

    // 確認なしでは状態は作られない
    assert!(!temp.path().join(".soraflow/state.json").exists());
}

#[test]
fn state_is_empty_before_first_apply() {
    let temp = tempfile::tempdir().unwrap();
    write_stack(temp.path(), STACK);

    sora(temp.path())
        .arg("state")
        .assert()
        .success()
        .stdout(predicate::str::contains("記録済みのリソースはありません"));
}
