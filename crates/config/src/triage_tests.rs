// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::io::Write;

const SAMPLE: &str = r#"
triage:
  repo: acme/widgets
  stages:
    - id: stale-context
      mode: print
      label: stale
      outcomes:
        "yes": done
        "no": already-implemented
    - id: already-implemented
      mode: async
      prompt_template: prompts/triage/implemented.md
      outcomes:
        "no": done
"#;

fn load_sample() -> TriageConfig {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(SAMPLE.as_bytes()).unwrap();
    TriageConfig::load(file.path()).unwrap()
}

#[test]
fn loads_triage_config() {
    let config = load_sample();
    assert_eq!(config.stages.len(), 2);
    assert_eq!(config.first_stage().unwrap().id, "stale-context");
    assert_eq!(config.stage("stale-context").unwrap().mode, TriageMode::Print);
    assert_eq!(
        config.stage("already-implemented").unwrap().mode,
        TriageMode::Async
    );
}

#[test]
fn outcome_routing() {
    let config = load_sample();
    let stage = config.stage("stale-context").unwrap();
    // "done" ends triage
    assert_eq!(stage.route("yes"), None);
    // named target routes onward
    assert_eq!(stage.route("no"), Some("already-implemented"));
    // unmapped outcome ends triage
    assert_eq!(stage.route("maybe"), None);
}

#[test]
fn mode_defaults_to_async() {
    let yaml = r#"{ id: classify, outcomes: {} }"#;
    let stage: TriageStageDef = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(stage.mode, TriageMode::Async);
}

#[test]
fn rejects_unknown_outcome_target() {
    let config = TriageConfig {
        repo: String::new(),
        stages: vec![TriageStageDef {
            id: "a".into(),
            mode: TriageMode::Print,
            prompt_template: None,
            label: None,
            outcomes: IndexMap::from([("yes".to_string(), "ghost".to_string())]),
        }],
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::UnknownOutcomeTarget { .. })
    ));
}
