#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use tempfile::TempDir;

pub const BASE: &str = r#"
fpid = "base:1#1.0"

[[package]]
name = "core"

[[config]]
model = "standalone"
name = "main"
feature = [{ spec = "interface", params = { name = "public" } }]

[[feature-spec]]
name = "interface"
param = [{ name = "name", id = true }]
"#;

pub const WEB: &str = r#"
fpid = "web:1#1.0"

[[dependency]]
location = "base:1#1.0"

[[package]]
name = "undertow"

[[config]]
model = "standalone"
name = "main"
feature = [{ spec = "socket", params = { name = "http" } }]

[[feature-spec]]
name = "socket"
param = [
    { name = "name", id = true },
    { name = "interface", default = "public" },
]
ref = [{ feature = "interface", mappings = { interface = "name" } }]
"#;

/// A local repository next to a project directory, isolated from `~/.galley`.
pub struct Workspace {
    tmp: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let ws = Self {
            tmp: TempDir::new().unwrap(),
        };
        fs::create_dir_all(ws.project()).unwrap();
        ws
    }

    /// `base` and `web`, with `web` depending on `base`.
    pub fn with_web() -> Self {
        let ws = Self::new();
        ws.publish("base", "1.0", BASE);
        ws.publish("web", "1.0", WEB);
        ws.provisioning("[[feature-pack]]\nlocation = \"web:1#1.0\"\n");
        ws
    }

    pub fn repo(&self) -> PathBuf {
        self.tmp.path().join("repo")
    }

    pub fn project(&self) -> PathBuf {
        self.tmp.path().join("project")
    }

    /// Publish a feature-pack in the implicit universe.
    pub fn publish(&self, producer: &str, build: &str, toml: &str) {
        let dir = self.repo().join(producer).join(producer).join(build);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("feature-pack.toml"), toml).unwrap();
    }

    pub fn provisioning(&self, toml: &str) {
        fs::write(self.project().join("provisioning.toml"), toml).unwrap();
    }

    pub fn galley(&self) -> Command {
        let mut cmd = Command::cargo_bin("galley").unwrap();
        cmd.current_dir(self.project())
            .env("HOME", self.tmp.path())
            .env_remove("RUST_LOG")
            .env_remove("GALLEY_REPOSITORY")
            .arg("--repository")
            .arg(self.repo());
        cmd
    }
}
