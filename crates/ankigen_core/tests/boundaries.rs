use std::fs;
use std::path::{Path, PathBuf};

fn collect_rs_files(root: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(p) = stack.pop() {
        let entries = match fs::read_dir(&p) {
            Ok(e) => e,
            Err(_) => continue,
        };
        for ent in entries.flatten() {
            let path = ent.path();
            if path.is_dir() {
                stack.push(path);
            } else if path.extension().and_then(|s| s.to_str()) == Some("rs") {
                out.push(path);
            }
        }
    }
    out.sort();
    out
}

#[test]
fn text_pipeline_modules_are_pure() {
    // Segmenter, parser and deck operations are in-memory transformations: no filesystem,
    // network or sleeping.
    let src_root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("src");
    let mut files = Vec::new();
    for module in ["segment", "parse", "decks"] {
        files.extend(collect_rs_files(&src_root.join(module)));
    }
    assert!(!files.is_empty());

    for f in files {
        let text = fs::read_to_string(&f).unwrap_or_default();
        for forbidden in ["std::fs", "std::net", "thread::sleep", "ureq::"] {
            assert!(
                !text.contains(forbidden),
                "forbidden `{forbidden}` found in {}",
                f.display()
            );
        }
    }
}
