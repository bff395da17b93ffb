use std::path::{Path, PathBuf};
use std::process::Command;

const MAX_LINES: usize = 750;

const CHECKED_EXTENSIONS: &[&str] = &["rs", "md", "yaml", "toml"];

const EXCLUDED_DIRS: &[&str] = &["target", ".git", "examples"];

const EXCLUDED_FILES: &[&str] = &["Cargo.lock"];

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/heads/main");
    println!("cargo:rerun-if-changed=.git/packed-refs");

    let sha = Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    println!("cargo:rustc-env=SESSION_TELEMETRY_GIT_SHA={}", sha);

    let root = PathBuf::from(
        std::env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR must be set"),
    );
    let files = collect_files_to_check(&root);
    for file in &files {
        println!("cargo:rerun-if-changed={}", file.display());
    }
    let sources: Vec<Source> = files
        .iter()
        .filter(|p| {
            p.extension().and_then(|e| e.to_str()) == Some("rs")
                && p.file_name().and_then(|n| n.to_str()) != Some("build.rs")
        })
        .filter_map(|p| Source::read(&root, p))
        .collect();

    enforce_line_limits(&root, &files);
    enforce_no_dead_code_allows(&sources);
    enforce_no_test_skips(&sources);
    enforce_no_nested_runtimes(&sources);
    enforce_serial_for_env_mutations(&sources);
}

struct Source {
    rel_path: PathBuf,
    content: String,
}

impl Source {
    fn read(root: &Path, path: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        Some(Self {
            rel_path: path.strip_prefix(root).unwrap_or(path).to_path_buf(),
            content,
        })
    }
}

type Violations = Vec<(PathBuf, usize, String)>;

fn fail(title: &str, violations: &Violations, advice: &[&str], summary: &str) {
    if violations.is_empty() {
        return;
    }
    eprintln!("\n========================================");
    eprintln!("{}", title);
    eprintln!("========================================\n");
    for (path, line, message) in violations {
        eprintln!("  {}:{}", path.display(), line);
        eprintln!("    {}\n", message.trim());
    }
    eprintln!("========================================\n");
    for line in advice {
        eprintln!("{}", line);
    }
    eprintln!("\n========================================\n");
    panic!("Build failed: {} {}", violations.len(), summary);
}

fn enforce_line_limits(root: &Path, files: &[PathBuf]) {
    let mut violations = Violations::new();
    for file in files {
        let rel_path = file.strip_prefix(root).unwrap_or(file).to_path_buf();
        match std::fs::read_to_string(file) {
            Ok(content) => {
                let lines = content.lines().filter(|l| !l.trim().is_empty()).count();
                if lines > MAX_LINES {
                    violations.push((
                        rel_path,
                        lines,
                        format!("{} lines (exceeds by {})", lines, lines - MAX_LINES),
                    ));
                }
            }
            Err(e) => println!(
                "cargo:warning=Could not read file {}: {}",
                rel_path.display(),
                e
            ),
        }
    }

    fail(
        &format!("FILE LINE LIMIT EXCEEDED (max {} lines)", MAX_LINES),
        &violations,
        &["Please split these files into smaller modules."],
        &format!("file(s) exceed the {} line limit", MAX_LINES),
    );
}

fn collect_files_to_check(root: &Path) -> Vec<PathBuf> {
    if let Ok(output) = Command::new("git")
        .args(["ls-files"])
        .current_dir(root)
        .output()
    {
        if output.status.success() {
            if let Ok(stdout) = String::from_utf8(output.stdout) {
                return stdout
                    .lines()
                    .map(|line| root.join(line))
                    .filter(|path| should_check_file(path, root))
                    .collect();
            }
        }
    }

    let mut files = Vec::new();
    walk_directory(root, root, &mut files);
    files
}

fn walk_directory(dir: &Path, root: &Path, files: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            let excluded = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|name| EXCLUDED_DIRS.contains(&name));
            if !excluded {
                walk_directory(&path, root, files);
            }
        } else if should_check_file(&path, root) {
            files.push(path);
        }
    }
}

fn should_check_file(path: &Path, root: &Path) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    if !CHECKED_EXTENSIONS.contains(&ext) {
        return false;
    }

    let Ok(rel_path) = path.strip_prefix(root) else {
        return true;
    };
    if EXCLUDED_FILES.contains(&rel_path.to_string_lossy().as_ref()) {
        return false;
    }
    !rel_path.components().any(|component| {
        component
            .as_os_str()
            .to_str()
            .is_some_and(|name| EXCLUDED_DIRS.contains(&name))
    })
}

fn enforce_no_dead_code_allows(sources: &[Source]) {
    let mut violations = Violations::new();
    for source in sources {
        for (line_num, line) in source.content.lines().enumerate() {
            let trimmed = line.trim();
            if (trimmed.starts_with("#[allow(") || trimmed.starts_with("#![allow("))
                && trimmed.contains("dead_code")
            {
                violations.push((source.rel_path.clone(), line_num + 1, line.to_string()));
            }
        }
    }

    fail(
        "#[allow(dead_code)] IS NOT ALLOWED",
        &violations,
        &[
            "Do NOT use #[allow(dead_code)] to silence warnings.",
            "",
            "Instead:",
            "  - DELETE unused code entirely",
            "  - If the code is for tests, use #[cfg(test)]",
            "  - If the code is a public API, make it actually public",
        ],
        "#[allow(dead_code)] occurrence(s) found. Remove the dead code.",
    );
}

/// A `#[test]` / `#[tokio::test]` function located by scanning lines.
struct TestFn<'a> {
    name: String,
    start: usize,
    serial: bool,
    body: Vec<(i32, &'a str)>,
}

/// Splits a source file into its test functions by brace depth.
fn test_functions(content: &str) -> Vec<TestFn<'_>> {
    let lines: Vec<&str> = content.lines().collect();
    let mut tests = Vec::new();
    let mut current: Option<(TestFn<'_>, i32)> = None;
    let mut pending_serial = false;

    for (i, line) in lines.iter().enumerate() {
        let trimmed = line.trim();

        if trimmed == "#[serial]" || trimmed == "#[serial_test::serial]" {
            match current.as_mut() {
                Some((test, _)) => test.serial = true,
                None => pending_serial = true,
            }
        }

        if current.is_none() && (trimmed == "#[test]" || trimmed.starts_with("#[tokio::test")) {
            let name = lines
                .iter()
                .skip(i + 1)
                .take(4)
                .find_map(|l| {
                    let after_fn = l.split_once("fn ")?.1;
                    Some(after_fn.split_once('(')?.0.trim().to_string())
                })
                .unwrap_or_default();
            current = Some((
                TestFn {
                    name,
                    start: i + 1,
                    serial: std::mem::take(&mut pending_serial),
                    body: Vec::new(),
                },
                0,
            ));
        }

        let mut finished = false;
        if let Some((test, depth)) = current.as_mut() {
            let depth_before = *depth;
            test.body.push((depth_before, *line));
            let mut opened = false;
            for c in line.chars() {
                match c {
                    '{' => {
                        *depth += 1;
                        opened = true;
                    }
                    '}' => *depth -= 1,
                    _ => {}
                }
            }
            finished = (opened || depth_before > 0) && *depth <= 0;
        }
        if finished {
            if let Some((test, _)) = current.take() {
                tests.push(test);
            }
        }
    }

    tests
}

/// Bans tests that silently skip instead of failing.
fn enforce_no_test_skips(sources: &[Source]) {
    const SKIP_PATTERNS: &[&str] = &["Skipping test", "skipping test", "Test skipped", "test skipped"];

    let mut violations = Violations::new();
    for source in sources {
        for test in test_functions(&source.content) {
            let pattern = test
                .body
                .iter()
                .find_map(|(_, line)| SKIP_PATTERNS.iter().find(|p| line.contains(**p)));
            if let Some(pattern) = pattern {
                violations.push((
                    source.rel_path.clone(),
                    test.start,
                    format!("test `{}` contains skip pattern: {}", test.name, pattern),
                ));
            } else if test
                .body
                .iter()
                .any(|(depth, line)| *depth > 1 && line.trim() == "return;")
            {
                violations.push((
                    source.rel_path.clone(),
                    test.start,
                    format!("test `{}` has conditional early return (silent skip)", test.name),
                ));
            }
        }
    }

    fail(
        "SILENT TEST SKIPS ARE NOT ALLOWED",
        &violations,
        &[
            "Tests must FAIL if they cannot run, not silently pass.",
            "",
            "Instead of skipping:",
            "  - Spin up a local stub server or scripted transport",
            "  - Use assert!() to verify preconditions",
            "  - If truly optional, use #[ignore] with a reason",
        ],
        "silent test skip(s) found. Make tests fail instead of skip.",
    );
}

/// Bans spawning threads that create their own tokio runtime.
///
/// The heartbeat and the blocking transport share the main runtime's
/// blocking pool; a second runtime on a side thread would outlive neither.
fn enforce_no_nested_runtimes(sources: &[Source]) {
    let mut violations = Violations::new();
    for source in sources {
        let lines: Vec<&str> = source.content.lines().collect();
        for (i, line) in lines.iter().enumerate() {
            let trimmed = line.trim();
            if trimmed.starts_with("//") || !trimmed.contains("thread::spawn(") {
                continue;
            }
            let context = lines[i..(i + 20).min(lines.len())].join("\n");
            if context.contains("Runtime::new()") || context.contains("runtime::Builder") {
                violations.push((source.rel_path.clone(), i + 1, line.to_string()));
            }
        }
    }

    fail(
        "NESTED TOKIO RUNTIMES ARE NOT ALLOWED",
        &violations,
        &[
            "Instead:",
            "  - Make the function async and call it from the main runtime",
            "  - Use tokio::task::spawn_blocking() for blocking HTTP calls",
        ],
        "nested runtime(s) found. Use async functions instead.",
    );
}

/// Requires #[serial] for tests that mutate environment variables.
fn enforce_serial_for_env_mutations(sources: &[Source]) {
    let mut violations = Violations::new();
    for source in sources {
        for test in test_functions(&source.content) {
            let mutates = test.body.iter().any(|(_, line)| {
                let trimmed = line.trim();
                !trimmed.starts_with("//")
                    && (trimmed.contains("env::set_var") || trimmed.contains("env::remove_var"))
            });
            if mutates && !test.serial {
                violations.push((
                    source.rel_path.clone(),
                    test.start,
                    format!("test `{}` mutates env without #[serial]", test.name),
                ));
            }
        }
    }

    fail(
        "ENV MUTATIONS REQUIRE #[serial]",
        &violations,
        &[
            "Tests that call std::env::set_var or std::env::remove_var",
            "modify global state and cause flaky failures in parallel.",
            "",
            "Add #[serial_test::serial] to the test.",
        ],
        "test(s) mutate env vars without #[serial].",
    );
}
