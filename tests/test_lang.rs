//! Language registry, catalogs and status display text.

use dagrun::{
    DagrunError, FnElement, GraphBuilder, GraphRunner, InMemoryCatalog, LangRegistry,
    MessageCatalog, RunnerConfig, StatusCode, StatusFormatter, EN_US, ZH_CN,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn formatter() -> StatusFormatter {
    let registry = Arc::new(LangRegistry::default());
    let catalog = InMemoryCatalog::new(registry.clone())
        .with("node.failed", ZH_CN, "节点执行失败")
        .unwrap()
        .with("node.failed", "en", "node failed")
        .unwrap()
        .with("node.slow", "zh", "节点执行缓慢")
        .unwrap();
    StatusFormatter::new(registry, Arc::new(catalog))
}

#[test]
fn test_requested_language_is_used() {
    let formatter = formatter();
    let status = StatusCode::error("E1", "node.failed");
    assert_eq!(formatter.message(&status, "en-US", "?"), "node failed");
    assert_eq!(formatter.message(&status, "EN", "?"), "node failed");
    assert_eq!(formatter.message(&status, "zh-CN", "?"), "节点执行失败");
}

#[test]
fn test_fallback_chain() {
    let formatter = formatter();
    // Unknown tag normalizes to the default language.
    assert_eq!(formatter.text("node.failed", "fr-FR", "?"), "节点执行失败");
    // Missing English text falls back to the default language.
    assert_eq!(formatter.text("node.slow", EN_US, "?"), "节点执行缓慢");
    // Missing everywhere: caller default.
    assert_eq!(formatter.text("node.unknown", EN_US, "fallback"), "fallback");
    // Ok statuses carry no key.
    assert_eq!(formatter.message(&StatusCode::ok(), EN_US, "all good"), "all good");
}

#[test]
fn test_registering_unsupported_language_fails() {
    let registry = Arc::new(LangRegistry::default());
    let catalog = InMemoryCatalog::new(registry);
    let err = catalog.insert("node.failed", "fr", "échec").unwrap_err();
    assert!(matches!(err, DagrunError::UnsupportedLanguage { .. }));
    assert!(catalog.is_empty());

    // Blank tags register under the default language.
    catalog.insert("node.failed", " ", "节点执行失败").unwrap();
    assert_eq!(catalog.lookup("node.failed", ZH_CN).as_deref(), Some("节点执行失败"));
}

#[test]
fn test_custom_registry() {
    let registry = LangRegistry::new(EN_US)
        .with_language("de-DE", &["de"])
        .with_default("de")
        .unwrap();
    assert_eq!(registry.default_tag(), "de-DE");
    assert_eq!(registry.normalize("zh"), "de-DE");
    assert_eq!(registry.supported().collect::<Vec<_>>(), vec![EN_US, "de-DE"]);
    assert!(LangRegistry::default().with_default("ja").is_err());
}

#[tokio::test]
async fn test_report_message() {
    let mut builder = GraphBuilder::new();
    builder
        .add_node("a", FnElement::new(|| StatusCode::error("E1", "node.failed")))
        .unwrap();
    let graph = Arc::new(builder.build().unwrap());

    let report = GraphRunner::new(RunnerConfig::sequential())
        .unwrap()
        .run(&graph)
        .await
        .unwrap();

    let formatter = formatter();
    assert_eq!(report.message(&formatter, "en_US", "?"), "node failed");
    assert_eq!(report.message(&formatter, "", "?"), "节点执行失败");
}
