//! Side sheet value lookups against a scripted detail panel

use std::time::Duration;

use super::{init_tracing, LogCapture};
use crate::side_sheet::ValueFault;
use crate::{
    get_side_sheet_value, AutomationError, El, MemoryEngine, Page, SideSheetCoordinate,
    SideSheetError, SideSheetLayout,
};

fn row(label: &str, value: &str) -> El {
    El::new("div")
        .class("transaction-list-item")
        .child(El::new("p").text(label))
        .child(El::new("p").child(El::new("span").text(value)))
}

fn card(rows: Vec<El>) -> El {
    El::new("div")
        .class("list-card")
        .child(El::new("div").class("transaction-list").children(rows))
}

/// Five cards; the fifth holds the transaction details.
fn side_sheet_page() -> Page {
    let filler = |title: &str| card(vec![row(title, "-")]);
    let details = card(vec![
        row("Amount", " 12 500 AMD "),
        row("RRN", "603219937057"),
        row("Terminal ID", "19126142"),
        row("Note", "   "),
    ]);
    Page::from_engine(MemoryEngine::with_body(
        El::new("div").class("side-sheet__container").child(
            El::new("div").class("side-sheet__content").children([
                filler("Status"),
                filler("Merchant"),
                filler("Card"),
                filler("Dates"),
                details,
            ]),
        ),
    ))
}

fn layout() -> SideSheetLayout {
    SideSheetLayout::default()
        .section("DETAILS_CARD", 5)
        .item("AMOUNT", 0)
        .item("RRN_1", 1)
        .item("TERMINAL_ID", 2)
        .timeout_ms(200)
}

#[tokio::test]
async fn test_named_and_positional_coordinates_agree() {
    init_tracing();
    let page = side_sheet_page();
    let panel = page.locator(".side-sheet__container");
    let layout = layout();

    let named = get_side_sheet_value(&panel, "DETAILS_CARD", "RRN_1", &layout)
        .await
        .unwrap();
    let positional = get_side_sheet_value(&panel, 5usize, 1usize, &layout)
        .await
        .unwrap();
    let mixed = get_side_sheet_value(&panel, "DETAILS_CARD", 1usize, &layout)
        .await
        .unwrap();

    assert_eq!(named, "603219937057");
    assert_eq!(named, positional);
    assert_eq!(named, mixed);
}

#[tokio::test]
async fn test_value_is_trimmed() {
    let page = side_sheet_page();
    let panel = page.locator(".side-sheet__container");
    let value = get_side_sheet_value(&panel, "DETAILS_CARD", "AMOUNT", &layout())
        .await
        .unwrap();
    assert_eq!(value, "12 500 AMD");
}

#[tokio::test]
async fn test_unknown_names_fail_before_touching_the_page() {
    let page = side_sheet_page();
    let panel = page.locator(".side-sheet__container");

    let err = get_side_sheet_value(&panel, "NOPE", 1usize, &layout())
        .await
        .unwrap_err();
    assert!(matches!(err, SideSheetError::UnknownSection(ref s) if s == "NOPE"));

    let err = get_side_sheet_value(&panel, 5usize, "MISSING", &layout())
        .await
        .unwrap_err();
    assert!(matches!(err, SideSheetError::UnknownItem(ref s) if s == "MISSING"));
}

#[tokio::test]
async fn test_blank_value_is_an_empty_value_error() {
    let page = side_sheet_page();
    let panel = page.locator(".side-sheet__container");
    let err = get_side_sheet_value(&panel, 5usize, 3usize, &layout())
        .await
        .unwrap_err();

    assert!(err.is_empty_value());
    let message = err.to_string();
    assert!(message.starts_with("Failed to retrieve Side Sheet value at section 5 (idx: 5), item 3 (idx: 3)."));
    assert!(message.contains("Side Sheet value is empty"));
}

#[tokio::test]
async fn test_missing_item_times_out_with_coordinates_in_message() {
    let page = side_sheet_page();
    let panel = page.locator(".side-sheet__container");
    let started = std::time::Instant::now();
    let err = get_side_sheet_value(&panel, "DETAILS_CARD", 9usize, &layout())
        .await
        .unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(!err.is_empty_value());
    match &err {
        SideSheetError::Lookup {
            section,
            section_index,
            item,
            item_index,
            ..
        } => {
            assert_eq!(section, &SideSheetCoordinate::Named("DETAILS_CARD".to_string()));
            assert_eq!(*section_index, 5);
            assert_eq!(item, &SideSheetCoordinate::Index(9));
            assert_eq!(*item_index, 9);
        }
        other => panic!("expected a lookup error, got {other:?}"),
    }
    assert!(err
        .to_string()
        .contains("section DETAILS_CARD (idx: 5), item 9 (idx: 9)"));
}

#[tokio::test]
async fn test_value_rendered_late_is_still_read() {
    let engine = std::sync::Arc::new(MemoryEngine::with_body(
        El::new("main").child(
            El::new("div")
                .class("side-sheet__content")
                .child(card(Vec::new())),
        ),
    ));
    engine
        .mutate(|dom| {
            dom.defer(Duration::from_millis(80), |dom| {
                if let Ok(Some(list)) = dom.query_first(".transaction-list") {
                    dom.append(list, row("RRN", "603219937057"));
                }
            });
        })
        .unwrap();
    let page = Page::new(engine);
    let layout = SideSheetLayout::default().timeout_ms(1_000);

    let value = get_side_sheet_value(&page.locator("main"), 1usize, 0usize, &layout)
        .await
        .unwrap();
    assert_eq!(value, "603219937057");
}

#[tokio::test]
async fn test_failed_lookup_logs_every_item_of_the_section() {
    let page = side_sheet_page();
    let panel = page.locator(".side-sheet__container");
    let logs = LogCapture::default();
    let _guard = logs.install();

    let err = get_side_sheet_value(&panel, "DETAILS_CARD", 3usize, &layout())
        .await
        .unwrap_err();
    assert!(err.is_empty_value());
    let out = logs.contents();
    assert!(out.contains("Found 4 items in section 5"), "{out}");
    assert!(out.contains(" - Item 1: \"RRN 603219937057\""), "{out}");
    assert!(out.contains(" - Item 3: \"Note\""), "{out}");

    let err = get_side_sheet_value(&panel, "DETAILS_CARD", 9usize, &layout())
        .await
        .unwrap_err();
    assert!(!err.is_empty_value());
    assert_eq!(logs.contents().matches("Found 4 items in section 5").count(), 2);
}

#[tokio::test]
async fn test_item_sweep_failure_keeps_the_lookup_error() {
    let page = side_sheet_page();
    let panel = page.locator(".side-sheet__container");
    let logs = LogCapture::default();
    let _guard = logs.install();

    // No seventh card: the sweep finds nothing.
    let err = get_side_sheet_value(&panel, 7usize, 0usize, &layout())
        .await
        .unwrap_err();
    assert!(matches!(err, SideSheetError::Lookup { section_index: 7, .. }));
    assert!(logs.contents().contains("Found 0 items in section 7"));

    // The sweep cannot even list the items; the original error still comes back.
    let mut broken = layout();
    broken.selectors.item_container = ".transaction-list[".to_string();
    let err = get_side_sheet_value(&panel, 5usize, 1usize, &broken)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SideSheetError::Lookup {
            source: ValueFault::Automation(AutomationError::InvalidSelector(_)),
            ..
        }
    ));
    assert!(logs.contents().contains("Failed to log items"));
}

#[test]
fn test_layout_deserializes_with_defaults() {
    let layout: SideSheetLayout = serde_json::from_str(
        r#"{ "sections": { "DETAILS_CARD": 5 }, "items": { "RRN_1": 1 } }"#,
    )
    .unwrap();
    assert_eq!(layout.timeout, 15_000);
    assert_eq!(layout.selectors.card, ".list-card");
    assert_eq!(
        layout.resolve_section(&"DETAILS_CARD".into()).unwrap(),
        5
    );
    assert_eq!(layout.resolve_item(&SideSheetCoordinate::Index(7)).unwrap(), 7);
}
