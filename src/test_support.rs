use crate::candidate::{Category, RiskLevel};
use crate::context::AppContext;
use crate::rules::{RuleSet, RuleSpec};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

/// A throwaway state directory plus a `work/` directory to scan and clean.
pub(crate) struct TestEnv {
    pub(crate) temp: TempDir,
    pub(crate) ctx: AppContext,
    pub(crate) work: PathBuf,
}

impl TestEnv {
    pub(crate) fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let ctx = AppContext::at(temp.path().join("state")).unwrap();
        let work = temp.path().join("work");
        fs::create_dir_all(&work).unwrap();
        Self { temp, ctx, work }
    }

    /// Another scan root next to `work/`.
    pub(crate) fn root(&self, name: &str) -> PathBuf {
        let root = self.temp.path().join(name);
        fs::create_dir_all(&root).unwrap();
        root
    }

    pub(crate) fn quarantine_dir(&self) -> PathBuf {
        self.ctx.state_dir.join("quarantine")
    }

    /// Write `config.yaml` into the state directory.
    pub(crate) fn write_config(&self, yaml: &str) {
        fs::create_dir_all(&self.ctx.state_dir).unwrap();
        fs::write(self.ctx.config_path(), yaml).unwrap();
    }
}

/// Write a file of exactly `size` bytes, creating parent directories.
pub(crate) fn write_file(path: &Path, size: usize) -> PathBuf {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, vec![b'x'; size]).unwrap();
    path.to_path_buf()
}

/// Write a file and backdate its mtime by `age`.
pub(crate) fn write_aged_file(path: &Path, size: usize, age: Duration) -> PathBuf {
    write_file(path, size);
    let file = File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() - age).unwrap();
    path.to_path_buf()
}

/// A glob rule with an explicit category, so temp-dir paths do not skew
/// category inference.
pub(crate) fn rule(name: &str, pattern: &str, category: Category) -> RuleSpec {
    RuleSpec {
        category: Some(category),
        risk: RiskLevel::Safe,
        ..RuleSpec::pattern(name, pattern)
    }
}

pub(crate) fn rule_set(specs: &[RuleSpec]) -> RuleSet {
    RuleSet::compile(specs, &[]).unwrap()
}

/// Drop write permission on `dir`. Returns false, with the mode restored,
/// when the current user can still create files there (root can).
#[cfg(unix)]
pub(crate) fn make_read_only(dir: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(dir, fs::Permissions::from_mode(0o555)).unwrap();
    let marker = dir.join(".writable");
    if fs::write(&marker, b"").is_ok() {
        let _ = fs::remove_file(&marker);
        make_writable(dir);
        return false;
    }
    true
}

#[cfg(unix)]
pub(crate) fn make_writable(dir: &Path) {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(dir, fs::Permissions::from_mode(0o755)).unwrap();
}
