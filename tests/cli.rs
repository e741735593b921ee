use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let files_dir = root.join("files");
    fs::create_dir_all(&files_dir).unwrap();
    fs::write(
        files_dir.join("refunds.txt"),
        "Our refund policy is 30 days.\n\nContact support for exceptions.",
    )
    .unwrap();
    fs::write(
        files_dir.join("setup.md"),
        "# Setup\n\nInstall the agent, then restart the service.",
    )
    .unwrap();
    fs::write(files_dir.join("payload.exe"), b"MZ").unwrap();

    let config_content = format!(
        r#"[db]
path = "{root}/data/docqa.sqlite"

[chunking]
chunk_size = 40

[provider]
kind = "disabled"

[ingest]
upload_dir = "{root}/data/uploads"
"#,
        root = root.display()
    );

    let config_path = config_dir.join("docqa.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_docqa(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let output = Command::new(env!("CARGO_BIN_EXE_docqa"))
        .arg("--config")
        .arg(config_path)
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to run docqa binary");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

fn file_arg(tmp: &TempDir, name: &str) -> String {
    tmp.path().join("files").join(name).display().to_string()
}

/// Pull the document id out of an `ingested <name> -> <id> (...)` line.
fn ingested_id(stdout: &str, name: &str) -> String {
    let prefix = format!("ingested {} -> ", name);
    let line = stdout
        .lines()
        .find(|l| l.starts_with(&prefix))
        .unwrap_or_else(|| panic!("no ingest line for {} in: {}", name, stdout));
    line[prefix.len()..]
        .split_whitespace()
        .next()
        .unwrap()
        .to_string()
}

#[test]
fn test_init_creates_database() {
    let (tmp, config) = setup_test_env();
    let (stdout, stderr, success) = run_docqa(&config, &["init"]);
    assert!(success, "init failed: {}", stderr);
    assert!(stdout.contains("Database initialized"));
    assert!(tmp.path().join("data/docqa.sqlite").exists());
    assert!(tmp.path().join("data/uploads").is_dir());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config) = setup_test_env();
    assert!(run_docqa(&config, &["init"]).2);
    let (_, stderr, success) = run_docqa(&config, &["init"]);
    assert!(success, "second init failed: {}", stderr);
}

#[test]
fn test_ingest_without_provider_still_stores_documents() {
    let (tmp, config) = setup_test_env();
    run_docqa(&config, &["init"]);

    let refunds = file_arg(&tmp, "refunds.txt");
    let setup = file_arg(&tmp, "setup.md");
    let (stdout, stderr, success) =
        run_docqa(&config, &["ingest", &refunds, &setup, "--user", "alice"]);
    assert!(success, "ingest failed: {}", stderr);
    assert!(stdout.contains("ingested refunds.txt"));
    assert!(stdout.contains("ingested setup.md"));
    assert!(stdout.contains("0 embedded"));

    let (stdout, _, success) = run_docqa(&config, &["documents"]);
    assert!(success);
    assert!(stdout.contains("refunds.txt"));
    assert!(stdout.contains("setup.md"));
    assert!(stdout.contains("TXT"));
    assert!(stdout.contains("(by alice)"));
}

#[test]
fn test_unsupported_file_fails_without_blocking_others() {
    let (tmp, config) = setup_test_env();
    run_docqa(&config, &["init"]);

    let bad = file_arg(&tmp, "payload.exe");
    let good = file_arg(&tmp, "refunds.txt");
    let (stdout, stderr, success) = run_docqa(&config, &["ingest", &bad, &good]);
    assert!(!success);
    assert!(stdout.contains("failed   payload.exe: Unsupported file type"));
    assert!(stdout.contains("ingested refunds.txt"));
    assert!(stderr.contains("1 of 2 files failed"));

    let (stdout, _, _) = run_docqa(&config, &["documents"]);
    assert!(stdout.contains("refunds.txt"));
    assert!(!stdout.contains("payload.exe"));
}

#[test]
fn test_show_and_delete_document() {
    let (tmp, config) = setup_test_env();
    run_docqa(&config, &["init"]);
    let refunds = file_arg(&tmp, "refunds.txt");
    let (stdout, _, _) = run_docqa(&config, &["ingest", &refunds]);
    let id = ingested_id(&stdout, "refunds.txt");

    let (stdout, stderr, success) = run_docqa(&config, &["show", &id]);
    assert!(success, "show failed: {}", stderr);
    assert!(stdout.contains("file:      refunds.txt"));
    assert!(stdout.contains("--- chunk 0 (no embedding) ---"));
    assert!(stdout.contains("refund policy is 30 days"));

    let (stdout, _, success) = run_docqa(&config, &["delete", &id]);
    assert!(success);
    assert!(stdout.contains("Deleted"));
    // The user's original file is never touched.
    assert!(tmp.path().join("files/refunds.txt").exists());
    assert_eq!(
        fs::read_dir(tmp.path().join("data/uploads")).unwrap().count(),
        0
    );

    let (stdout, _, _) = run_docqa(&config, &["documents"]);
    assert!(stdout.contains("No documents."));
}

#[test]
fn test_missing_document_errors() {
    let (_tmp, config) = setup_test_env();
    run_docqa(&config, &["init"]);
    let (_, stderr, success) = run_docqa(&config, &["show", "no-such-id"]);
    assert!(!success);
    assert!(stderr.contains("Document not found"));
    let (_, _, success) = run_docqa(&config, &["delete", "no-such-id"]);
    assert!(!success);
}

#[test]
fn test_ask_fails_cleanly_when_provider_disabled() {
    let (_tmp, config) = setup_test_env();
    run_docqa(&config, &["init"]);
    let (_, stderr, success) = run_docqa(&config, &["ask", "What is the refund policy?"]);
    assert!(!success);
    assert!(stderr.contains("Failed to process message"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let (_tmp, config) = setup_test_env();
    fs::write(&config, "[retrieval]\ntop_k = 0\n").unwrap();
    let (_, stderr, success) = run_docqa(&config, &["init"]);
    assert!(!success);
    assert!(stderr.contains("top_k"));
}
