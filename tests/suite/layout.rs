//! Source width kept within the rustfmt default.

use std::fs;
use std::path::{Path, PathBuf};

const MAX_WIDTH: usize = 100;
const SOURCE_DIRS: [&str; 6] = ["backend", "cli", "config", "core", "types", "tests"];

fn rust_files(dir: &Path, found: &mut Vec<PathBuf>) {
    for entry in fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            rust_files(&path, found);
        } else if path.extension().is_some_and(|ext| ext == "rs") {
            found.push(path);
        }
    }
}

#[test]
fn source_lines_fit_max_width() {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).parent().unwrap();
    let mut files = Vec::new();
    for dir in SOURCE_DIRS {
        rust_files(&root.join(dir), &mut files);
    }
    assert!(!files.is_empty());

    let mut too_wide = Vec::new();
    for file in &files {
        let text = fs::read_to_string(file).unwrap();
        for (n, line) in text.lines().enumerate() {
            if line.chars().count() > MAX_WIDTH {
                too_wide.push(format!("{}:{}", file.display(), n + 1));
            }
        }
    }
    assert!(too_wide.is_empty(), "lines over {MAX_WIDTH} columns: {too_wide:?}");
}
