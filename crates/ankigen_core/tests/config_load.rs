use ankigen_core::config::{load_config, AppConfig};
use ankigen_core::parse::{LineKind, LineMatchers};

#[test]
fn toml_sections_override_defaults() {
    let cfg = AppConfig::from_toml_str(
        r#"
[segmenter]
max_chars = 800

[model]
model = "llama3"
max_attempts = 2

[[parser.patterns]]
kind = "question"
pattern = '^P:\s*(.*)$'
"#,
    )
    .expect("parse");
    assert_eq!(cfg.segmenter.max_chars, 800);
    assert_eq!(cfg.decks.max_decks, 6);
    assert_eq!(cfg.model.model, "llama3");
    assert_eq!(cfg.model.max_attempts, 2);
    assert_eq!(cfg.model.history_window, 10);
    assert_eq!(cfg.parser.patterns.len(), 1);
    assert_eq!(cfg.parser.patterns[0].kind, LineKind::Question);
    assert!(LineMatchers::from_specs(&cfg.parser.patterns).is_ok());
}

#[test]
fn unknown_keys_are_rejected() {
    let err = AppConfig::from_toml_str("[segmenter]\nmax_char = 10\n").expect_err("typo");
    assert_eq!(err.code, "CONFIG_PARSE_FAILED");
}

#[test]
fn out_of_range_values_fail_validation() {
    let cfg = AppConfig::from_toml_str("[decks]\nmax_decks = 0\n").expect("parse");
    assert_eq!(cfg.validate().expect_err("invalid").code, "CONFIG_INVALID");

    let cfg = AppConfig::from_toml_str("[model]\nhistory_window = 1\n").expect("parse");
    assert!(cfg.validate().is_err());
}

#[test]
fn missing_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = load_config(Some(&dir.path().join("absent.toml"))).expect("load");
    assert_eq!(cfg.segmenter.max_chars, 1500);
}

#[test]
fn file_is_loaded_when_present() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("ankigen.toml");
    std::fs::write(&path, "[decks]\nmax_decks = 3\n").expect("write");
    let cfg = load_config(Some(&path)).expect("load");
    assert_eq!(cfg.decks.max_decks, 3);
}

#[test]
fn transcript_and_vision_model_are_configurable() {
    let cfg = AppConfig::default();
    assert_eq!(cfg.logging.transcript, None);
    assert_eq!(cfg.model.vision_model, "llava");

    let cfg = AppConfig::from_toml_str(
        "[logging]\ntranscript = \"prompts_log.txt\"\n\n[model]\nvision_model = \"\"\n",
    )
    .expect("parse");
    assert_eq!(
        cfg.logging.transcript,
        Some(std::path::PathBuf::from("prompts_log.txt"))
    );
    assert!(cfg.model.vision_model.is_empty());
    assert!(cfg.validate().is_ok());
}
