mod common;

use common::Workspace;
use predicates::prelude::*;

#[test]
fn test_arrange_prints_event_stream() {
    let ws = Workspace::with_web();

    ws.galley()
        .arg("arrange")
        .assert()
        .success()
        .stdout(
            "config standalone/main
branch
  feature-pack base:1#1.0
  spec interface
  feature base/interface:name=public
end branch
branch
  feature-pack web:1#1.0
  spec socket
  feature web/socket:name=http
end branch
done
",
        )
        .stderr(predicate::str::contains("1 config(s), 2 feature(s)"));
}

#[test]
fn test_arrange_unknown_config_filter_fails() {
    let ws = Workspace::with_web();

    ws.galley()
        .args(["arrange", "--only", "domain/"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No resolved config matches 'domain/'"));
}

#[test]
fn test_arrange_dangling_reference_fails() {
    let ws = Workspace::new();
    ws.publish("web", "1.0", common::WEB);
    ws.provisioning("[[feature-pack]]\nlocation = \"web:1#1.0\"\n");

    ws.galley()
        .arg("arrange")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to arrange config standalone/main"));
}

#[test]
fn test_arrange_verbose_logs_resolution() {
    let ws = Workspace::with_web();

    ws.galley()
        .args(["arrange", "--verbose"])
        .assert()
        .success()
        .stderr(predicate::str::contains("DEBUG"));
}
