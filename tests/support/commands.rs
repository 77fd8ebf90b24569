//! Command helper methods for Test.

use super::Test;
use assert_cmd::Command;
use std::process::Output;

impl Test {
    /// Create a kvt command isolated to this test's config.
    pub fn cmd(&self) -> Command {
        #[allow(deprecated)]
        let mut cmd = Command::cargo_bin("kvt").expect("failed to find kvt binary");
        cmd.env("KVT_CONFIG", self.config_path());
        cmd.env_remove("KVT_BACKEND");
        cmd.env_remove("KVT_LOG");
        cmd.env("NO_COLOR", "1");
        cmd.current_dir(self.dir.path());
        cmd
    }

    /// Shortcut for `kvt contexts`.
    pub fn contexts(&self) -> Output {
        self.cmd()
            .arg("contexts")
            .output()
            .expect("failed to run kvt contexts")
    }

    /// Shortcut for `kvt show <project> <env>` with extra arguments.
    pub fn show(&self, project: &str, env: &str, extra: &[&str]) -> Output {
        self.cmd()
            .args(["show", project, env])
            .args(extra)
            .output()
            .expect("failed to run kvt show")
    }

    /// Shortcut for `kvt apply <project> <env> <ops>... --yes`.
    pub fn apply(&self, project: &str, env: &str, ops: &[&str]) -> Output {
        self.cmd()
            .args(["apply", project, env])
            .args(ops)
            .arg("--yes")
            .output()
            .expect("failed to run kvt apply")
    }

    /// Shortcut for `kvt apply ... --yes --json`.
    pub fn apply_json(&self, project: &str, env: &str, ops: &[&str]) -> Output {
        self.cmd()
            .args(["apply", project, env])
            .args(ops)
            .args(["--yes", "--json"])
            .output()
            .expect("failed to run kvt apply --json")
    }
}
