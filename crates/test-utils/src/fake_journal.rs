use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use tempfile::TempDir;
use unitjob::job::LogCommand;

/// A stand-in for `journalctl`: a shell script that records its PID and
/// arguments, then runs `body` with stdout connected to the log stream.
///
/// Inside `body`, `$2` is the unit name (the follower is invoked as
/// `-u <unit> -f -o json`).
pub struct FakeJournal {
    dir: TempDir,
    script: PathBuf,
}

impl FakeJournal {
    pub fn new(body: &str) -> Result<Self> {
        let dir = tempfile::tempdir().context("creating fake journal dir")?;
        let script = dir.path().join("fake-journalctl");
        let pid_file = dir.path().join("pid");
        let args_file = dir.path().join("args");

        let contents = format!(
            "#!/bin/sh\necho \"$@\" > '{}'\necho $$ > '{}.tmp' && mv '{}.tmp' '{}'\n{}\n",
            args_file.display(),
            pid_file.display(),
            pid_file.display(),
            pid_file.display(),
            body
        );
        fs::write(&script, contents).context("writing fake journal script")?;
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755))
            .context("making fake journal script executable")?;

        Ok(Self { dir, script })
    }

    /// Emits one JSON record per 20ms forever: `line 1`, `line 2`, ...
    pub fn endless() -> Result<Self> {
        Self::new(
            r#"i=0
while true; do
  i=$((i+1))
  printf '{"MESSAGE":"line %s","_SYSTEMD_UNIT":"%s"}\n' "$i" "$2"
  sleep 0.02
done"#,
        )
    }

    /// Emits the given raw lines, then exits with `exit_code`.
    pub fn scripted(lines: &[&str], exit_code: i32) -> Result<Self> {
        let mut body = String::new();
        for line in lines {
            body.push_str(&format!("printf '%s\\n' '{}'\n", line.replace('\'', r"'\''")));
        }
        body.push_str(&format!("exit {exit_code}"));
        Self::new(&body)
    }

    /// Emits the given raw lines, then blocks until killed.
    pub fn scripted_then_hang(lines: &[&str]) -> Result<Self> {
        let mut body = String::new();
        for line in lines {
            body.push_str(&format!("printf '%s\\n' '{}'\n", line.replace('\'', r"'\''")));
        }
        body.push_str("while true; do sleep 0.05; done");
        Self::new(&body)
    }

    pub fn command(&self) -> LogCommand {
        LogCommand::new(&self.script)
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// PID of the most recently started follower, waiting up to 5s for it to
    /// be recorded.
    pub async fn wait_for_pid(&self) -> Result<u32> {
        let pid_file = self.dir.path().join("pid");
        for _ in 0..250 {
            if let Ok(contents) = fs::read_to_string(&pid_file) {
                if let Ok(pid) = contents.trim().parse() {
                    return Ok(pid);
                }
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        anyhow::bail!("fake journal never recorded its pid")
    }

    /// Arguments the follower was last invoked with, space separated.
    pub fn recorded_args(&self) -> Result<String> {
        let args = fs::read_to_string(self.dir.path().join("args"))
            .context("reading recorded follower args")?;
        Ok(args.trim().to_string())
    }
}

/// Whether `pid` still exists (including as an unreaped zombie).
pub fn process_is_alive(pid: u32) -> bool {
    Path::new(&format!("/proc/{pid}")).exists()
}

/// Poll until `pid` is gone, up to 5s.
pub async fn wait_for_exit(pid: u32) -> bool {
    for _ in 0..250 {
        if !process_is_alive(pid) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}
