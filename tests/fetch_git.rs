//! End-to-end tests against a real `git` binary. Each test builds a
//! throwaway upstream repository and fetches it over `file://`. The whole
//! suite is skipped when git is not installed.

use std::{fs, path::Path, process::Command};

use pretty_assertions::assert_eq;
use tempfile::TempDir;
use treefetch::{model::FetchRequest, Treefetch};

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

fn git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(args)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
}

fn rev_parse_head(dir: &Path) -> String {
    let output = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(["rev-parse", "HEAD"])
        .output()
        .unwrap();
    assert!(output.status.success());
    String::from_utf8(output.stdout).unwrap().trim().to_owned()
}

fn commit_files(upstream: &Path, message: &str, files: &[(&str, &str)]) {
    for (name, contents) in files {
        let path = upstream.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }
    git(upstream, &["add", "."]);
    git(
        upstream,
        &["-c", "commit.gpgsign=false", "commit", "--quiet", "-m", message],
    );
}

/// Upstream repository with its default branch pinned to `master`, whatever
/// the host's `init.defaultBranch` says.
fn upstream_repository(files: &[(&str, &str)]) -> TempDir {
    let upstream = tempfile::tempdir().unwrap();
    git(upstream.path(), &["init", "--quiet"]);
    git(
        upstream.path(),
        &["symbolic-ref", "HEAD", "refs/heads/master"],
    );
    git(upstream.path(), &["config", "user.name", "tester"]);
    git(upstream.path(), &["config", "user.email", "tester@localhost"]);
    commit_files(upstream.path(), "initial", files);
    upstream
}

fn treefetch(cache: &Path, store: &Path) -> Treefetch {
    Treefetch::builder()
        .cache_directory(cache)
        .store_directory(store)
        .try_build()
        .unwrap()
}

fn file_url(dir: &Path) -> String {
    format!("file://{}", dir.display())
}

#[test]
fn fetch_exports_the_committed_tree() {
    if !git_available() {
        eprintln!("git not found, skipping");
        return;
    }

    let upstream = upstream_repository(&[
        ("README.md", "fetched over file://\n"),
        ("src/lib.rs", "pub fn answer() -> u32 { 42 }\n"),
    ]);
    let workdir = tempfile::tempdir().unwrap();
    let treefetch = treefetch(&workdir.path().join("cache"), &workdir.path().join("store"));

    let tree = treefetch
        .fetch(&FetchRequest::new(file_url(upstream.path())))
        .unwrap();

    assert_eq!(tree.commit.as_str(), rev_parse_head(upstream.path()));
    assert_eq!(
        fs::read_to_string(tree.path.as_path().join("README.md")).unwrap(),
        "fetched over file://\n"
    );
    assert_eq!(
        fs::read_to_string(tree.path.as_path().join("src/lib.rs")).unwrap(),
        "pub fn answer() -> u32 { 42 }\n"
    );
    assert_eq!(tree.context.iter().collect::<Vec<_>>(), vec![&tree.path]);
}

#[test]
fn repeated_fetch_reuses_the_cached_artifact() {
    if !git_available() {
        eprintln!("git not found, skipping");
        return;
    }

    let upstream = upstream_repository(&[("README.md", "cache me\n")]);
    let workdir = tempfile::tempdir().unwrap();
    let cache = workdir.path().join("cache");
    let store = workdir.path().join("store");

    let first = treefetch(&cache, &store)
        .fetch(&FetchRequest::new(file_url(upstream.path())))
        .unwrap();
    // A separately built instance finds the commit link left by the first.
    let second = treefetch(&cache, &store)
        .fetch(&FetchRequest::new(file_url(upstream.path())))
        .unwrap();

    assert_eq!(first.path, second.path);
    assert_eq!(first.commit, second.commit);
}

#[test]
fn bare_path_locator_is_fetched_as_a_file_url() {
    if !git_available() {
        eprintln!("git not found, skipping");
        return;
    }

    let upstream = upstream_repository(&[("README.md", "no scheme\n")]);
    let workdir = tempfile::tempdir().unwrap();
    let treefetch = treefetch(&workdir.path().join("cache"), &workdir.path().join("store"));

    let locator = upstream.path().display().to_string();
    assert!(locator.starts_with('/'));

    let tree = treefetch.fetch(&FetchRequest::new(locator)).unwrap();

    assert_eq!(tree.commit.as_str(), rev_parse_head(upstream.path()));
    assert_eq!(
        fs::read_to_string(tree.path.as_path().join("README.md")).unwrap(),
        "no scheme\n"
    );
}

#[test]
fn new_commit_on_the_branch_is_picked_up() {
    if !git_available() {
        eprintln!("git not found, skipping");
        return;
    }

    let upstream = upstream_repository(&[("README.md", "first\n")]);
    let workdir = tempfile::tempdir().unwrap();
    let cache = workdir.path().join("cache");
    let store = workdir.path().join("store");
    let treefetch = treefetch(&cache, &store);

    let first = treefetch
        .fetch(&FetchRequest::new(file_url(upstream.path())))
        .unwrap();
    commit_files(upstream.path(), "second", &[("README.md", "second\n")]);
    let second = treefetch
        .fetch(&FetchRequest::new(file_url(upstream.path())))
        .unwrap();

    assert_ne!(first.commit, second.commit);
    assert_ne!(first.path, second.path);
    assert_eq!(
        fs::read_to_string(second.path.as_path().join("README.md")).unwrap(),
        "second\n"
    );
    // The superseded artifact is untouched.
    assert_eq!(
        fs::read_to_string(first.path.as_path().join("README.md")).unwrap(),
        "first\n"
    );
}

#[test]
fn fetching_a_tag_by_name() {
    if !git_available() {
        eprintln!("git not found, skipping");
        return;
    }

    let upstream = upstream_repository(&[("README.md", "tagged\n")]);
    git(upstream.path(), &["tag", "v1.0"]);
    commit_files(upstream.path(), "after tag", &[("README.md", "moved on\n")]);

    let workdir = tempfile::tempdir().unwrap();
    let treefetch = treefetch(&workdir.path().join("cache"), &workdir.path().join("store"));

    let tree = treefetch
        .fetch(&FetchRequest::new(file_url(upstream.path())).with_rev("v1.0"))
        .unwrap();

    assert_eq!(
        fs::read_to_string(tree.path.as_path().join("README.md")).unwrap(),
        "tagged\n"
    );
}

#[test]
fn unknown_revision_is_a_fetch_error() {
    if !git_available() {
        eprintln!("git not found, skipping");
        return;
    }

    let upstream = upstream_repository(&[("README.md", "only master\n")]);
    let workdir = tempfile::tempdir().unwrap();
    let treefetch = treefetch(&workdir.path().join("cache"), &workdir.path().join("store"));

    let request = FetchRequest::new(file_url(upstream.path())).with_rev("no-such-branch");
    let error = treefetch.fetch(&request).unwrap_err().to_string();

    assert!(error.contains("no-such-branch"), "unexpected error: {error}");
}

#[test]
fn restricted_mode_rejects_without_touching_the_upstream() {
    let workdir = tempfile::tempdir().unwrap();
    let cache = workdir.path().join("cache");
    let treefetch = Treefetch::builder()
        .cache_directory(&cache)
        .store_directory(workdir.path().join("store"))
        .restricted(true)
        .try_build()
        .unwrap();

    // The locator does not exist; restricted mode must reject before git
    // would ever get a chance to notice.
    let request = FetchRequest::new("https://example.invalid/repo.git");
    let error = treefetch.fetch(&request).unwrap_err().to_string();

    assert!(error.contains("restricted"), "unexpected error: {error}");
    assert!(!cache.exists());
}
