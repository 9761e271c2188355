//! CLI integration tests
use predicates::prelude::*;
use tempfile::TempDir;

fn cmd() -> assert_cmd::Command {
    assert_cmd::cargo::cargo_bin_cmd!("quire")
}

fn get_fixture_path(name: &str) -> String {
    format!("../../tests/fixtures/{}", name)
}

#[test]
fn test_cli_file_input_json() {
    let output = cmd().arg(get_fixture_path("article.html")).assert().success().get_output().stdout.clone();
    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();

    assert_eq!(json["title"], "How Tidal Marshes Store Carbon");
    assert_eq!(json["author"], "Priya Natarajan");
    assert_eq!(json["domain"], "localhost");
    assert_eq!(json["url"], "http://localhost/article.html");
    assert_eq!(json["siteName"], "The Coastal Review");
    assert_eq!(json["publishedDate"], "2024-03-18T09:30:00Z");
    assert!(json["wordCount"].as_i64().unwrap() > 100);
    assert!(json.get("contentRaw").is_none());
}

#[test]
fn test_cli_stdin_input() {
    let html = std::fs::read_to_string(get_fixture_path("article.html")).unwrap();
    cmd()
        .args(["-", "--url", "news.example.org/marshes"])
        .write_stdin(html)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"domain\": \"news.example.org\""))
        .stdout(predicate::str::contains("https://news.example.org/images/marsh-core.jpg"));
}

#[test]
fn test_cli_html_format() {
    cmd()
        .args(["-f", "html", &get_fixture_path("article.html")])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("<div>"))
        .stdout(predicate::str::contains("<h1>How Tidal Marshes Store Carbon</h1>"))
        .stdout(predicate::str::contains("<script").not());
}

#[test]
fn test_cli_text_format() {
    cmd()
        .args(["-f", "text", &get_fixture_path("article.html")])
        .assert()
        .success()
        .stdout(predicate::str::contains("Salt marshes cover a sliver"))
        .stdout(predicate::str::contains("<p>").not());
}

#[test]
fn test_cli_invalid_format() {
    cmd().args(["-f", "markdown", &get_fixture_path("article.html")]).assert().failure();
}

#[test]
fn test_cli_output_file() {
    let tmp = TempDir::new().unwrap();
    let output = tmp.path().join("article.json");

    cmd()
        .args(["-o", output.to_str().unwrap()])
        .arg(get_fixture_path("article.html"))
        .assert()
        .success();

    let written = std::fs::read_to_string(&output).unwrap();
    assert!(written.contains("\"title\""));
}

#[test]
fn test_cli_untitled_fallback() {
    cmd()
        .arg(get_fixture_path("untitled.html"))
        .assert()
        .success()
        .stdout(predicate::str::contains("\"title\": \"Untitled\""));
}

#[test]
fn test_cli_invalid_file() {
    cmd().arg("nonexistent.html").assert().failure().stderr(predicate::str::contains("Failed to read file"));
}

#[test]
fn test_cli_navigation_only_fails() {
    cmd()
        .arg(get_fixture_path("nav_only.html"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not find an article"));
}

#[test]
fn test_cli_malformed_html() {
    cmd()
        .args(["-f", "text", &get_fixture_path("malformed.html")])
        .assert()
        .success()
        .stdout(predicate::str::contains("Pruning season"));
}

#[test]
fn test_cli_verbose() {
    cmd()
        .args(["-v", &get_fixture_path("article.html")])
        .assert()
        .success()
        .stderr(predicate::str::contains("Quire"))
        .stderr(predicate::str::contains("Extracting main content"));
}

#[test]
fn test_cli_char_threshold() {
    cmd()
        .args(["--char-threshold", "100000", &get_fixture_path("article.html")])
        .assert()
        .failure();
}

#[test]
fn test_cli_max_elements() {
    cmd()
        .args(["--max-elements", "10", &get_fixture_path("article.html")])
        .assert()
        .failure();
}

#[test]
fn test_cli_no_images() {
    cmd()
        .args(["--no-images", "-f", "html", &get_fixture_path("article.html")])
        .assert()
        .success()
        .stdout(predicate::str::contains("<img").not());
}
