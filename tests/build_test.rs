//! End-to-end build tests
//!
//! Small shell scripts stand in for the compiler and the linker. They log
//! every invocation so the tests can check what was compiled and in which
//! order objects reached the linker.

#![cfg(unix)]

use rbuild::build::BuildCoordinator;
use rbuild::config::{BuildOptions, ProjectDescriptor};
use rbuild::error::BuildError;
use std::fs::{self, File};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, SystemTime};

// Writing an executable while another test forks can fail with ETXTBSY,
// so tests that create scripts run one at a time.
static SCRIPT_LOCK: Mutex<()> = Mutex::new(());

fn lock() -> MutexGuard<'static, ()> {
    SCRIPT_LOCK.lock().unwrap_or_else(|e| e.into_inner())
}

struct Fixture {
    dir: tempfile::TempDir,
}

impl Fixture {
    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn src(&self) -> PathBuf {
        self.root().join("src")
    }

    fn work(&self) -> PathBuf {
        self.root().join("build").join("main")
    }

    fn compile_log(&self) -> Vec<String> {
        read_lines(&self.root().join("compile.log"))
    }

    fn link_log(&self) -> Vec<String> {
        read_lines(&self.root().join("link.log"))
    }

    fn reset_logs(&self) {
        let _ = fs::remove_file(self.root().join("compile.log"));
        let _ = fs::remove_file(self.root().join("link.log"));
    }

    fn project(&self, sources: &[&str], extra: &str) -> ProjectDescriptor {
        let list = sources
            .iter()
            .map(|s| format!("\"{s}\""))
            .collect::<Vec<_>>()
            .join(", ");
        let text = format!(
            r#"
src_folder = "{src}"
working_folder = "{build}"
project_binary = "app"
noarch = true

[overrides]
c = "{cc}"
cpp = "{cc}"
linker = "{ld}"
linker_cpp = "{ld}"

[targets.main]
sources = [{list}]
{extra}
"#,
            src = self.src().display(),
            build = self.root().join("build").display(),
            cc = self.root().join("cc.sh").display(),
            ld = self.root().join("ld.sh").display(),
        );
        toml::from_str(&text).unwrap()
    }
}

fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .map(|s| s.lines().map(str::to_string).collect())
        .unwrap_or_default()
}

fn write_script(path: &Path, body: &str) {
    fs::write(path, format!("#!/bin/sh\n{body}")).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

/// A project whose compiler fails on sources with `bad` in their name and
/// whose linker exits with `link_status`.
fn fixture(sources: &[&str], link_status: i32) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("src")).unwrap();
    for s in sources {
        let path = root.join("src").join(s);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "int x;\n").unwrap();
    }

    let compile_log = root.join("compile.log");
    write_script(
        &root.join("cc.sh"),
        &format!(
            r#"in=""; out=""; dep=""
while [ $# -gt 0 ]; do
  case "$1" in
    -c) shift; in="$1" ;;
    -o) shift; out="$1" ;;
    -MF) shift; dep="$1" ;;
  esac
  shift
done
echo "$in" >> "{log}"
case "$in" in
  *bad*) echo "$in:1: error: expected ';'" >&2; exit 1 ;;
esac
printf 'obj\n' > "$out"
if [ -n "$dep" ]; then printf '%s: %s\n' "$out" "$in" > "$dep"; fi
exit 0
"#,
            log = compile_log.display()
        ),
    );

    let link_log = root.join("link.log");
    write_script(
        &root.join("ld.sh"),
        &format!(
            r#"out=""
while [ $# -gt 0 ]; do
  case "$1" in
    -o) shift; out="$1" ;;
    *) echo "$1" >> "{log}" ;;
  esac
  shift
done
printf 'bin\n' > "$out"
exit {link_status}
"#,
            log = link_log.display()
        ),
    );

    Fixture { dir }
}

fn options(num_jobs: usize) -> BuildOptions {
    BuildOptions {
        num_jobs,
        ..BuildOptions::default()
    }
}

fn set_mtime(path: &Path, t: SystemTime) {
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(t)
        .unwrap();
}

#[test]
fn test_builds_only_stale_sources_and_links_all() {
    let _guard = lock();
    let f = fixture(&["a.c", "b.c"], 0);
    let project = f.project(&["a.c", "b.c"], "");

    let artifact = BuildCoordinator::new(&project, options(2))
        .build_target("main")
        .unwrap();
    assert_eq!(artifact, f.work().join("bin").join("app"));
    assert!(artifact.exists());
    assert_eq!(f.compile_log().len(), 2);

    // Everything old, objects newer than sources; then a.c changes.
    let past = SystemTime::now() - Duration::from_secs(600);
    for s in ["a.c", "b.c"] {
        set_mtime(&f.src().join(s), past);
        set_mtime(
            &f.work().join("obj").join(format!("{s}.o")),
            past + Duration::from_secs(60),
        );
    }
    set_mtime(&f.src().join("a.c"), SystemTime::now());
    f.reset_logs();

    let summary = BuildCoordinator::new(&project, options(2))
        .build_targets(&["main".to_string()])
        .unwrap();
    assert!(summary.success());
    assert_eq!(f.compile_log(), vec![f.src().join("a.c").display().to_string()]);

    let obj = f.work().join("obj");
    assert_eq!(
        f.link_log(),
        vec![
            obj.join("a.c.o").display().to_string(),
            obj.join("b.c.o").display().to_string(),
        ]
    );
}

#[test]
fn test_up_to_date_target_compiles_nothing() {
    let _guard = lock();
    let f = fixture(&["a.c"], 0);
    let project = f.project(&["a.c"], "");
    BuildCoordinator::new(&project, options(0))
        .build_target("main")
        .unwrap();

    let past = SystemTime::now() - Duration::from_secs(600);
    set_mtime(&f.src().join("a.c"), past);
    set_mtime(&f.work().join("obj/a.c.o"), past + Duration::from_secs(60));
    f.reset_logs();

    BuildCoordinator::new(&project, options(0))
        .build_target("main")
        .unwrap();
    assert!(f.compile_log().is_empty());
    assert_eq!(f.link_log().len(), 1);
}

#[test]
fn test_link_failure_leaves_no_artifact() {
    let _guard = lock();
    let f = fixture(&["a.c"], 1);
    let project = f.project(&["a.c"], "");

    let err = BuildCoordinator::new(&project, options(2))
        .build_target("main")
        .unwrap_err();
    assert!(matches!(err, BuildError::LinkFailed { ref target } if target == "main"));
    let bin = f.work().join("bin");
    assert!(!bin.join("app").exists());
    assert!(!bin.join("app.partial").exists());
}

#[test]
fn test_link_order_is_the_same_in_every_mode() {
    let _guard = lock();
    let sources = ["z.c", "m.c", "lib/a.c", "lib/b.c", "boot.c", "y.c"];
    let f = fixture(&sources, 0);
    let rules = r#"
linker_order = [
  { name = "boot.c.o", weight = -5 },
  { name = "lib/b.c.o", weight = 3, kind = "path" },
  { name = "/opt/crt0.o", weight = -10, kind = "extra" },
]
"#;
    let project = f.project(&sources, rules);

    let mut logs = Vec::new();
    for jobs in [0, 1, 4] {
        f.reset_logs();
        let _ = fs::remove_dir_all(f.root().join("build"));
        BuildCoordinator::new(&project, options(jobs))
            .build_target("main")
            .unwrap();
        logs.push(f.link_log());
    }
    assert_eq!(logs[0], logs[1]);
    assert_eq!(logs[1], logs[2]);

    let obj = f.work().join("obj");
    let names: Vec<String> = ["boot.c", "z.c", "m.c", "lib/a.c", "y.c", "lib/b.c"]
        .iter()
        .map(|s| obj.join(format!("{s}.o")).display().to_string())
        .collect();
    let mut expected = vec!["/opt/crt0.o".to_string()];
    expected.extend(names);
    assert_eq!(logs[0], expected);
}

#[test]
fn test_compile_failures_are_aggregated_and_skip_linking() {
    let _guard = lock();
    let sources = ["bad1.c", "good.c", "bad2.c"];
    let f = fixture(&sources, 0);
    let project = f.project(&sources, "");

    let err = BuildCoordinator::new(&project, options(4))
        .build_target("main")
        .unwrap_err();
    match err {
        BuildError::CompileFailed { files } => {
            assert!(files.contains(&f.src().join("bad1.c")));
            assert!(!files.contains(&f.src().join("good.c")));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(f.link_log().is_empty());
}

#[test]
fn test_sequential_mode_stops_at_first_failure() {
    let _guard = lock();
    let sources = ["a.c", "bad.c", "c.c"];
    let f = fixture(&sources, 0);
    let project = f.project(&sources, "");

    let err = BuildCoordinator::new(&project, options(0))
        .build_target("main")
        .unwrap_err();
    assert!(matches!(err, BuildError::CompileFailed { ref files } if files.len() == 1));
    let compiled = f.compile_log();
    assert_eq!(compiled.len(), 2);
    assert!(compiled[1].ends_with("bad.c"));
}

#[test]
fn test_fail_exit_stops_remaining_targets() {
    let _guard = lock();
    let f = fixture(&["a.c"], 1);
    let project = f.project(&["a.c"], "");
    let names = vec!["main".to_string(), "main".to_string()];

    let summary = BuildCoordinator::new(&project, options(1))
        .build_targets(&names)
        .unwrap();
    assert_eq!(summary.failed.len(), 2);

    let stop = BuildOptions {
        fail_exit: true,
        ..options(1)
    };
    let summary = BuildCoordinator::new(&project, stop)
        .build_targets(&names)
        .unwrap();
    assert_eq!(summary.failed, vec!["main".to_string()]);
}

#[test]
fn test_clean_removes_objects_but_keeps_binary() {
    let _guard = lock();
    let f = fixture(&["a.c"], 0);
    let project = f.project(&["a.c"], "");
    let coordinator = BuildCoordinator::new(&project, options(2));
    let artifact = coordinator.build_target("main").unwrap();

    assert!(coordinator.clean_target("main").unwrap());
    assert!(!f.work().join("obj").exists());
    assert!(!f.work().join("tmp").exists());
    assert!(artifact.exists());
    assert!(f.src().join("a.c").exists());
}
