//! End-to-end tests driving the engine with YAML rule documents

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use defval_core::{
    DefvalEngine, DefvalError, FindingKind, FnHelper, HelperError, HelperRegistry, Pass,
    PluginCatalog, RegistryError, RuleDocument, Tree, VALIDATOR_SECTION,
};

const RULES: &str = r##"
defval:
  helpers:
    deflt_setter:
      - "@ref": build_area
        "@module": builtin_defaults.rs
        "@method": temp_dir
      - "@ref": enabled
        "@module": builtin_defaults.py
        "@method": enabled
    validator:
      - "@ref": nonempty
        "@module": builtin_checks.rs
        "@method": is_nonempty
      - "@ref": abs_path
        "@module": builtin_checks.rs
        "@method": is_absolute_path
      - "@ref": bool
        "@module": builtin_checks.py
        "@method": is_bool
      - "@ref": not_empty_text
        "@module": builtin_checks.py
        "@method": is_nonempty
        "@invert": "false"
  default:
    - "@nodepath": distro/img_params/build_area
      "@type": element
      "@from": helper
      "#text": build_area
    - "@nodepath": distro/img_params/output_image/compress
      "@type": element
      "@from": value
      "@missing_parent": create
      "#text": gzip
    - "@nodepath": distro/http_proxy
      "@type": attribute
      "@from": helper
      "#text": enabled
  validate:
    - "@nodepath": distro/img_params/build_area
      "#text": abs_path, nonempty
    - "@nodepath": distro/http_proxy
      "#text": bool
    - "@group": nonempty
      "#text": distro/img_params/pkg distro/img_params/absent
    - "@exclude": not_empty_text
      "#text": /distro /distro/img_params /distro/img_params/output_image
"##;

const DATA: &str = r#"
distro:
  "@name": demo
  img_params:
    pkg:
      - SUNWcs
      - SUNWcsd
"#;

fn rules() -> RuleDocument {
    let value: serde_json::Value = serde_yaml::from_str(RULES).unwrap();
    RuleDocument::from_value(&value).unwrap()
}

fn data() -> Tree {
    let value: serde_json::Value = serde_yaml::from_str(DATA).unwrap();
    Tree::from_value(&value).unwrap()
}

#[test]
fn test_full_run_over_yaml_documents() {
    let engine = DefvalEngine::default();
    let mut data = data();

    let report = engine.apply(&mut data, &rules()).unwrap();

    assert_eq!(
        report.defaults.created,
        vec![
            "/distro/img_params/build_area",
            "/distro/img_params/output_image/compress",
            "/distro/http_proxy",
        ]
    );
    assert_eq!(report.validation.singles.checks, 3);
    assert_eq!(report.validation.group.checks, 2);
    assert!(report.validation.exclude.checks > 0);

    let proxy = data.find("distro/http_proxy")[0];
    assert_eq!(data.node(proxy).value(), "true");
    let image = data.find("distro/img_params/output_image")[0];
    assert_eq!(data.node(image).value(), "");
}

#[test]
fn test_second_run_creates_nothing() {
    let engine = DefvalEngine::default();
    let rules = rules();
    let mut data = data();

    engine.apply(&mut data, &rules).unwrap();
    let snapshot = data.to_value();
    let report = engine.apply(&mut data, &rules).unwrap();

    assert!(report.defaults.created.is_empty());
    assert_eq!(data.to_value(), snapshot);
}

#[test]
fn test_duplicate_ref_rejected_before_any_rule_applies() {
    let rules_text = r##"
defval:
  helpers:
    deflt_setter:
      - { "@ref": dup, "@module": builtin_defaults.rs, "@method": enabled }
      - { "@ref": dup, "@module": builtin_defaults.rs, "@method": disabled }
  default:
    "@nodepath": distro/flag
    "@type": element
    "@from": value
    "#text": "yes"
"##;
    let value: serde_json::Value = serde_yaml::from_str(rules_text).unwrap();
    let rules = RuleDocument::from_value(&value).unwrap();
    let mut data = data();

    let err = DefvalEngine::default().apply(&mut data, &rules).unwrap_err();
    assert!(matches!(
        err,
        DefvalError::Registry(RegistryError::DuplicateRef { .. })
    ));
    assert!(data.find("distro/flag").is_empty());
}

#[test]
fn test_instance_sharing_across_refs() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let catalog = PluginCatalog::new().with_helper("site", move || {
        counter.fetch_add(1, Ordering::SeqCst);
        FnHelper::new("site").with_method("ok", |_| Ok(true.into()))
    });

    let registry = HelperRegistry::build(&rules_with_site_validators(), VALIDATOR_SECTION, &catalog)
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(registry.len(), 3);
    assert_eq!(registry.instance_count(), 1);
    assert!(!registry.has_inverts());
}

fn rules_with_site_validators() -> RuleDocument {
    let text = r#"
defval:
  helpers:
    validator:
      - { "@ref": a, "@module": site.py, "@method": ok }
      - { "@ref": b, "@module": site.rs, "@method": ok, "@invert": "FALSE" }
      - { "@ref": c, "@module": site.py, "@method": ok, "@invert": "0" }
"#;
    let value: serde_json::Value = serde_yaml::from_str(text).unwrap();
    RuleDocument::from_value(&value).unwrap()
}

#[test]
fn test_validator_errors_fail_closed_and_setter_errors_are_recorded() {
    let catalog = PluginCatalog::new().with_helper("flaky", || {
        FnHelper::new("flaky")
            .with_method("explode", |_| Err(HelperError::failed("plugin crashed")))
            .with_method("value", |_| Ok("computed".into()))
    });
    let text = r##"
defval:
  helpers:
    deflt_setter:
      - { "@ref": explode, "@module": flaky.py, "@method": explode }
      - { "@ref": value, "@module": flaky.py, "@method": value }
    validator:
      - { "@ref": explode, "@module": flaky.py, "@method": explode, "@invert": "true" }
  default:
    - { "@nodepath": distro/first, "@type": element, "@from": helper, "#text": explode }
    - { "@nodepath": distro/second, "@type": element, "@from": helper, "#text": value }
  validate:
    "@group": explode
    "#text": distro/img_params
"##;
    let value: serde_json::Value = serde_yaml::from_str(text).unwrap();
    let rules = RuleDocument::from_value(&value).unwrap();
    let engine = DefvalEngine::new(catalog);
    let mut data = data();

    let err = engine.inject_defaults(&mut data, &rules).unwrap_err();
    assert_eq!(err.findings().len(), 1);
    assert_eq!(err.findings()[0].kind, FindingKind::HelperFailed);
    let second = data.find("distro/second")[0];
    assert_eq!(data.node(second).value(), "computed");

    let err = engine.validate_content(&data, &rules).unwrap_err();
    match err {
        DefvalError::BatchValidation { failed, findings } => {
            assert_eq!(failed, vec![Pass::Group]);
            assert_eq!(findings[0].kind, FindingKind::HelperFailed);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_rule_document_root_name_is_irrelevant() {
    let text = r##"
anything_goes:
  default:
    "@nodepath": distro/flag
    "@type": attribute
    "@from": value
    "#text": "on"
"##;
    let value: serde_json::Value = serde_yaml::from_str(text).unwrap();
    let rules = RuleDocument::from_value(&value).unwrap();
    let mut data = data();

    let summary = DefvalEngine::default()
        .inject_defaults(&mut data, &rules)
        .unwrap();
    assert_eq!(summary.created, vec!["/distro/flag"]);
}
