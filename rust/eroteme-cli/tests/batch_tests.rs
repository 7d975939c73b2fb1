use eroteme_cli::batch::{exit_code, run, BatchOptions, FileReport, Mode, Outcome};
use eroteme_cli::config::{ErotemeConfig, WalkSection};
use eroteme_cli::walk::Walker;
use std::fs;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use tempfile::TempDir;

const GOOD: &str = "package app\n\
                    \n\
                    func load(path string) ([]byte, error) {\n\
                    \tdata, _ := read(path) //? nil, err\n\
                    \treturn data, nil\n\
                    }\n";

const GOOD_REWRITTEN: &str = "package app\n\
                              \n\
                              func load(path string) ([]byte, error) {\n\
                              \tdata, err := read(path)\n\
                              \tif err != nil {\n\
                              \t\treturn nil, err\n\
                              \t}\n\
                              \treturn data, nil\n\
                              }\n";

const BROKEN: &str = "package app\n\nfunc broken() error {\n\tv, _ := f( //?\n}\n";

const PLAIN: &str = "package app\n\nfunc   plain() {}\n";

fn write(root: &Path, rel: &str, body: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, body).unwrap();
}

fn run_dir(root: &Path, options: &BatchOptions, walk: &WalkSection) -> Vec<FileReport> {
    let walker = Walker::new(walk).unwrap();
    run(walker.collect(&[root.to_path_buf()]), options, &AtomicBool::new(false))
}

#[test]
fn batch_isolates_failures() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(root, "a_broken.go", BROKEN);
    write(root, "b_good.go", GOOD);
    write(root, "c_plain.go", PLAIN);

    let options = BatchOptions { jobs: 2, ..BatchOptions::default() };
    let reports = run_dir(root, &options, &WalkSection::default());

    assert_eq!(reports.len(), 3);

    assert!(matches!(reports[0].outcome, Outcome::Failed { .. }), "got: {:?}", reports[0].outcome);
    assert_eq!(reports[0].diagnostics.len(), 1);
    assert!(reports[0].diagnostics[0].line.is_some());
    assert_eq!(fs::read_to_string(root.join("a_broken.go")).unwrap(), BROKEN);

    assert_eq!(reports[1].outcome, Outcome::Rewritten { edits: 1 });
    assert_eq!(fs::read_to_string(root.join("b_good.go")).unwrap(), GOOD_REWRITTEN);

    assert_eq!(reports[2].outcome, Outcome::Unchanged);
    assert_eq!(fs::read_to_string(root.join("c_plain.go")).unwrap(), PLAIN);

    assert_eq!(exit_code(&reports, Mode::Write), 1);
}

#[test]
fn second_run_is_a_no_op() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "good.go", GOOD);
    let options = BatchOptions::default();
    let first = run_dir(dir.path(), &options, &WalkSection::default());
    assert_eq!(first[0].outcome, Outcome::Rewritten { edits: 1 });
    let second = run_dir(dir.path(), &options, &WalkSection::default());
    assert_eq!(second[0].outcome, Outcome::Unchanged);
    assert_eq!(exit_code(&second, Mode::Write), 0);
}

#[test]
fn check_mode_writes_nothing() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "good.go", GOOD);
    let options = BatchOptions { mode: Mode::Check, ..BatchOptions::default() };
    let reports = run_dir(dir.path(), &options, &WalkSection::default());
    assert_eq!(reports[0].outcome, Outcome::WouldRewrite { edits: 1 });
    assert_eq!(fs::read_to_string(dir.path().join("good.go")).unwrap(), GOOD);
    assert_eq!(exit_code(&reports, Mode::Check), 1);
}

#[test]
fn config_controls_walk_and_transform() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(root, "main.go", &GOOD.replace("//? nil, err", "// try: nil, e"));
    write(root, "gen/skip.go", GOOD);
    write(root, "vendor/dep.go", GOOD);
    fs::write(
        root.join("eroteme.toml"),
        "[transform]\n\
         sigil = \"// try:\"\n\
         error_ident = \"e\"\n\
         \n\
         [walk]\n\
         exclude = [\"gen\"]\n\
         \n\
         [batch]\n\
         jobs = 1\n",
    )
    .unwrap();

    let config = ErotemeConfig::load_from(&root.join("eroteme.toml")).unwrap();
    let options = BatchOptions {
        mode: Mode::Write,
        jobs: config.batch.jobs,
        transform: config.transform_options(),
    };
    let reports = run_dir(root, &options, &config.walk);

    let paths: Vec<_> = reports.iter().map(|r| &r.path).collect();
    assert_eq!(reports.len(), 1, "got: {:?}", paths);
    assert_eq!(reports[0].outcome, Outcome::Rewritten { edits: 1 });
    let main = fs::read_to_string(root.join("main.go")).unwrap();
    assert!(
        main.contains("\tdata, e := read(path)\n\tif e != nil {\n\t\treturn nil, e\n\t}\n"),
        "got:\n{}",
        main
    );
    assert_eq!(fs::read_to_string(root.join("gen/skip.go")).unwrap(), GOOD);
    assert_eq!(fs::read_to_string(root.join("vendor/dep.go")).unwrap(), GOOD);
}

#[test]
fn warnings_become_diagnostics() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "w.go",
        "package app\n\nfunc f() error {\n\tx := g() //?\n\treturn use(x)\n}\n",
    );
    let reports = run_dir(dir.path(), &BatchOptions::default(), &WalkSection::default());
    assert_eq!(reports[0].outcome, Outcome::Unchanged);
    assert_eq!(reports[0].diagnostics.len(), 1);
    assert_eq!(reports[0].diagnostics[0].code.as_deref(), Some("W001"));
    assert_eq!(exit_code(&reports, Mode::Write), 0);
}

#[cfg(unix)]
#[test]
fn unwritable_directory_fails_and_keeps_the_file() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let locked = dir.path().join("locked");
    write(&locked, "a.go", GOOD);
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o555)).unwrap();
    let unlock = || fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    // Permission bits do not bind a privileged user.
    let marker = locked.join("writable");
    if fs::write(&marker, "").is_ok() {
        unlock();
        fs::remove_file(&marker).unwrap();
        return;
    }

    let reports = run_dir(&locked, &BatchOptions::default(), &WalkSection::default());
    let entries: Vec<String> = fs::read_dir(&locked)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    let contents = fs::read_to_string(locked.join("a.go")).unwrap();
    unlock();

    assert_eq!(reports.len(), 1);
    assert!(matches!(reports[0].outcome, Outcome::Failed { .. }), "got: {:?}", reports[0].outcome);
    assert_eq!(contents, GOOD);
    assert_eq!(entries, vec!["a.go"]);
    assert_eq!(exit_code(&reports, Mode::Write), 1);
}
