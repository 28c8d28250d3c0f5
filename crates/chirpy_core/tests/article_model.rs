use chirpy_core::model::article::{LANGUAGE_UNKNOWN, NO_SUMMARY_PLACEHOLDER};
use chirpy_core::{Article, NewArticle};

#[test]
fn new_article_starts_without_enrichment_state() {
    let article = NewArticle::new("https://example.com/a");

    assert_eq!(article.link, "https://example.com/a");
    assert_eq!(article.title, None);
    assert_eq!(article.published, None);
    assert_eq!(article.summary, None);
}

#[test]
fn has_summary_rejects_blank_and_placeholder_bodies() {
    assert!(!sample_article(None).has_summary());
    assert!(!sample_article(Some("")).has_summary());
    assert!(!sample_article(Some("   \n\t")).has_summary());
    assert!(!sample_article(Some(NO_SUMMARY_PLACEHOLDER)).has_summary());
    assert!(sample_article(Some("actual body text")).has_summary());
}

#[test]
fn display_title_falls_back_for_missing_or_blank_titles() {
    let mut article = sample_article(Some("body"));
    assert_eq!(article.display_title(), "Title");

    article.title = None;
    assert_eq!(article.display_title(), "No title");

    article.title = Some("   ".to_string());
    assert_eq!(article.display_title(), "No title");
}

#[test]
fn article_serializes_with_snake_case_field_names() {
    let article = sample_article(Some("body"));

    let value = serde_json::to_value(&article).unwrap();
    assert_eq!(value["id"], 7);
    assert_eq!(value["link"], "https://example.com/a");
    assert_eq!(value["detected_language"], LANGUAGE_UNKNOWN);
    assert_eq!(value["is_translated"], false);
    assert_eq!(value["original_summary"], serde_json::Value::Null);

    let decoded: Article = serde_json::from_value(value).unwrap();
    assert_eq!(decoded, article);
}

fn sample_article(summary: Option<&str>) -> Article {
    Article {
        id: 7,
        title: Some("Title".to_string()),
        link: "https://example.com/a".to_string(),
        published: Some("2026-08-01T08:00:00Z".to_string()),
        summary: summary.map(str::to_string),
        detected_language: LANGUAGE_UNKNOWN.to_string(),
        original_summary: None,
        is_translated: false,
    }
}
