//! Runs the built binary against copies of `tests/testdata`.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

fn testdata(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/testdata")
        .join(name)
}

/// Temp dir holding copies of the sample sources.
fn setup_workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    for name in ["legacy.js", "greet.py", "notes.md"] {
        fs::copy(testdata(name), dir.path().join(name)).unwrap();
    }
    dir
}

fn holepunch(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_holepunch"))
        .args(args)
        .env_remove("HOLEPUNCH_LOG")
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn help_lists_core_flags() {
    let output = holepunch(&["--help"]);
    assert!(output.status.success());
    let help = stdout(&output);
    for flag in ["--in-place", "--json-lines", "--match-only", "--rule", "--config"] {
        assert!(help.contains(flag), "missing {flag} in:\n{help}");
    }
}

#[test]
fn in_place_rewrites_known_languages_only() {
    let dir = setup_workspace();
    let root = dir.path().to_str().unwrap();

    let output = holepunch(&["oldFunc(:[args])", "newFunc(:[args])", root, "-i"]);
    assert!(output.status.success(), "{}", stderr(&output));

    let js = fs::read_to_string(dir.path().join("legacy.js")).unwrap();
    assert!(js.contains("var total = newFunc(1, 2);"));
    assert!(js.contains("var other = newFunc(compute(3, 4));"));

    let py = fs::read_to_string(dir.path().join("greet.py")).unwrap();
    assert!(py.contains("# oldFunc(name) is gone"), "comment was rewritten:\n{py}");
    assert!(py.contains("return newFunc(name)"));

    let md = fs::read_to_string(dir.path().join("notes.md")).unwrap();
    assert_eq!(md, fs::read_to_string(testdata("notes.md")).unwrap());
    assert!(stderr(&output).contains("2 rewritten"));
}

#[test]
fn extension_target_limits_files() {
    let dir = setup_workspace();
    let root = dir.path().to_str().unwrap();

    let output = holepunch(&["oldFunc(:[args])", "newFunc(:[args])", root, ".py", "-i"]);
    assert!(output.status.success(), "{}", stderr(&output));

    let js = fs::read_to_string(dir.path().join("legacy.js")).unwrap();
    assert!(js.contains("oldFunc(1, 2)"));
    let py = fs::read_to_string(dir.path().join("greet.py")).unwrap();
    assert!(py.contains("return newFunc(name)"));
}

#[test]
fn diff_is_the_default_for_rewrites() {
    let dir = setup_workspace();
    let file = dir.path().join("legacy.js");

    let output = holepunch(&["oldFunc(:[args])", "newFunc(:[args])", file.to_str().unwrap()]);
    assert!(output.status.success());
    let diff = stdout(&output);
    let path = file.to_str().unwrap().trim_start_matches('/');
    assert!(diff.contains(&format!("--- a/{path}\n+++ b/{path}\n")), "{diff}");
    assert!(!diff.contains("a//"), "{diff}");
    assert!(diff.contains("-var total = oldFunc(1, 2);\n+var total = newFunc(1, 2);"));
    assert!(fs::read_to_string(&file).unwrap().contains("oldFunc"));
}

#[test]
fn stdin_to_stdout_with_language_filter() {
    let mut child = Command::new(env!("CARGO_BIN_EXE_holepunch"))
        .args(["print :[x]", "print(:[x])", "--stdin", "--stdout", ".py"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"# print kept\nprint 'hi'\n")
        .unwrap();
    let output = child.wait_with_output().unwrap();

    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(stdout(&output), "# print kept\nprint('hi')\n");
}

#[test]
fn json_lines_match_records() {
    let dir = setup_workspace();
    let file = dir.path().join("legacy.js");

    let output = holepunch(&[
        "oldFunc(:[args])",
        "",
        file.to_str().unwrap(),
        "--match-only",
        "--json-lines",
    ]);
    assert!(output.status.success(), "{}", stderr(&output));

    let text = stdout(&output);
    let record: serde_json::Value = serde_json::from_str(text.trim()).unwrap();
    assert_eq!(record["uri"], file.display().to_string());
    let matches = record["matches"].as_array().unwrap();
    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0]["matched"], "oldFunc(1, 2)");
    assert_eq!(matches[0]["environment"][0]["variable"], "args");
    assert_eq!(matches[0]["environment"][0]["value"], "1, 2");
    assert_eq!(matches[1]["range"]["start"]["line"], 3);
}

#[test]
fn json_lines_rewrite_records() {
    let dir = setup_workspace();
    let file = dir.path().join("greet.py");

    let output = holepunch(&["oldFunc(:[a])", "newFunc(:[a])", file.to_str().unwrap(), "--json-lines"]);
    let record: serde_json::Value = serde_json::from_str(stdout(&output).trim()).unwrap();
    assert!(record["rewritten_source"]
        .as_str()
        .unwrap()
        .contains("return newFunc(name)"));
    let subs = record["in_place_substitutions"].as_array().unwrap();
    assert_eq!(subs.len(), 1);
    assert_eq!(subs[0]["replacement_content"], "newFunc(name)");
    assert!(record["diff"].as_str().unwrap().contains("+    return newFunc(name)"));
}

#[test]
fn rules_filter_command_line_matches() {
    let dir = setup_workspace();
    let file = dir.path().join("legacy.js");

    let output = holepunch(&[
        "oldFunc(:[args])",
        "",
        file.to_str().unwrap(),
        "--match-only",
        "-r",
        "where :[args] != \"1, 2\"",
    ]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(
        stdout(&output),
        format!("{}:3:oldFunc(compute(3, 4))\n", file.display())
    );
}

#[test]
fn config_messages_and_severity() {
    let dir = setup_workspace();
    let file = dir.path().join("legacy.js");
    let rules = testdata("rules.toml");

    let output = holepunch(&[
        "-c",
        rules.to_str().unwrap(),
        file.to_str().unwrap(),
        "--severity",
        "warning",
        "-i",
    ]);
    assert!(output.status.success(), "{}", stderr(&output));
    let js = fs::read_to_string(&file).unwrap();
    assert!(js.contains("newFunc(1, 2)") && js.contains("console.log(total)"));

    let lint = dir.path().join("lint.toml");
    fs::write(
        &lint,
        "[no-console-log]\nmatch = \"console.log(:[v])\"\nmessage = \"remove debug logging\"\nseverity = \"info\"\n",
    )
    .unwrap();
    let output = holepunch(&["-c", lint.to_str().unwrap(), file.to_str().unwrap()]);
    assert_eq!(
        stdout(&output),
        format!(
            "{}:2:1: info [no-console-log] remove debug logging\n",
            file.display()
        )
    );
}

#[test]
fn compile_errors_exit_2_before_touching_files() {
    let dir = setup_workspace();
    let root = dir.path().to_str().unwrap();

    let output = holepunch(&["oldFunc(:[args]", "newFunc(:[args])", root, "-i"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("error:"));
    let js = fs::read_to_string(dir.path().join("legacy.js")).unwrap();
    assert_eq!(js, fs::read_to_string(testdata("legacy.js")).unwrap());

    let output = holepunch(&["f(:[x])", "g(:[y])", root]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains(":[y]"));
}

#[test]
fn compile_errors_are_printed_once() {
    let dir = setup_workspace();
    let output = holepunch(&["oldFunc(:[args]", "", dir.path().to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(2));
    let err = stderr(&output);
    assert_eq!(err.matches("unbalanced").count(), 1, "{err}");
}

#[test]
fn patterns_compile_for_the_file_language() {
    // A quote inside a string is text for Python but would leave the generic
    // profile's parentheses unbalanced.
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("a.py");
    fs::write(&file, "f(')')\n").unwrap();

    let output = holepunch(&["f(')')", "g()", file.to_str().unwrap(), "-i"]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(fs::read_to_string(&file).unwrap(), "g()\n");

    // With nothing selected the templates are still checked.
    let empty = dir.path().join("empty");
    fs::create_dir(&empty).unwrap();
    let output = holepunch(&["f(:[x]", "g()", empty.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(2), "{}", stderr(&output));
}

#[test]
fn semgrep_syntax_and_conjuncts_on_the_command_line() {
    let dir = setup_workspace();
    let file = dir.path().join("legacy.js");

    let output = holepunch(&[
        "oldFunc($...ARGS)",
        "newFunc($...ARGS)",
        file.to_str().unwrap(),
        "--syntax",
        "semgrep",
        "--all",
        "$F(compute($...INNER))",
        "-i",
    ]);
    assert!(output.status.success(), "{}", stderr(&output));
    let js = fs::read_to_string(&file).unwrap();
    assert!(js.contains("var total = oldFunc(1, 2);"), "{js}");
    assert!(js.contains("var other = newFunc(compute(3, 4));"), "{js}");
}

#[test]
fn invalid_config_exits_2() {
    let dir = setup_workspace();
    let bad = dir.path().join("bad.toml");
    fs::write(&bad, "[r]\nrewrite = \"x\"\n").unwrap();

    let output = holepunch(&["-c", bad.to_str().unwrap(), dir.path().to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("missing required field 'match'"));
}

#[test]
fn missing_file_exits_1_and_others_still_run() {
    let dir = setup_workspace();
    let js = dir.path().join("legacy.js");
    let missing = dir.path().join("absent.js");

    let output = holepunch(&[
        "oldFunc(:[args])",
        "newFunc(:[args])",
        js.to_str().unwrap(),
        missing.to_str().unwrap(),
        "-i",
    ]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("absent.js"));
    assert!(fs::read_to_string(&js).unwrap().contains("newFunc(1, 2)"));
}
