//! Dump sources for the command line: a device over adb, or saved files.

use std::path::PathBuf;
use std::process::Command;

use wmstate_core::DumpSource;

const SCHEDULER_DUMP_ARGS: [&str; 3] = ["dumpsys", "activity", "activities"];
const COMPOSITOR_DUMP_ARGS: [&str; 3] = ["dumpsys", "window", "-a"];

/// Runs `adb shell dumpsys ...`, optionally against one device serial.
#[derive(Debug, Clone, Default)]
pub struct AdbDumpSource {
    serial: Option<String>,
}

impl AdbDumpSource {
    pub fn new(serial: Option<String>) -> Self {
        Self { serial }
    }

    fn shell(&self, args: &[&str]) -> Result<String, String> {
        let mut command = Command::new("adb");
        if let Some(serial) = &self.serial {
            command.args(["-s", serial]);
        }
        command.arg("shell").args(args);

        let output = command
            .output()
            .map_err(|err| format!("failed to run adb: {}", err))?;
        if !output.status.success() {
            return Err(format!(
                "adb shell {} exited with {}: {}",
                args.join(" "),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

impl DumpSource for AdbDumpSource {
    fn scheduler_dump(&self) -> Result<String, String> {
        self.shell(&SCHEDULER_DUMP_ARGS)
    }

    fn compositor_dump(&self) -> Result<String, String> {
        self.shell(&COMPOSITOR_DUMP_ARGS)
    }
}

/// Re-reads two saved dumps on every fetch.
#[derive(Debug, Clone)]
pub struct FileDumpSource {
    activities: PathBuf,
    windows: PathBuf,
}

impl FileDumpSource {
    pub fn new(activities: PathBuf, windows: PathBuf) -> Self {
        Self {
            activities,
            windows,
        }
    }
}

impl DumpSource for FileDumpSource {
    fn scheduler_dump(&self) -> Result<String, String> {
        fs_err::read_to_string(&self.activities).map_err(|err| err.to_string())
    }

    fn compositor_dump(&self) -> Result<String, String> {
        fs_err::read_to_string(&self.windows).map_err(|err| err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_source_reads_both_dumps() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let activities = temp_dir.path().join("activities.txt");
        let windows = temp_dir.path().join("windows.txt");
        fs_err::write(&activities, "Stack #1:\n").expect("write activities");
        fs_err::write(&windows, "mStackId=1\n").expect("write windows");

        let source = FileDumpSource::new(activities, windows);
        assert_eq!(source.scheduler_dump().expect("scheduler"), "Stack #1:\n");
        assert_eq!(source.compositor_dump().expect("compositor"), "mStackId=1\n");
    }

    #[test]
    fn file_source_reports_missing_file_path() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let missing = temp_dir.path().join("missing.txt");
        let source = FileDumpSource::new(missing.clone(), missing);
        let err = source.scheduler_dump().expect_err("missing file");
        assert!(err.contains("missing.txt"));
    }
}
