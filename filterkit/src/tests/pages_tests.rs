//! Page object behaviour on scripted dashboard fragments

use std::sync::Arc;
use std::time::Duration;

use crate::pages::{
    apply_date_range, filter_by_label, open_details_side_sheet, reset_filters, wait_for_table_loaded,
    FilterComponent, PageError, Sidebar, END_DATE_INPUT,
};
use crate::{ActionKind, El, FixtureError, FixtureStore, MemoryEngine, Page, Trigger};

const FIXTURES: &str = r#"{
    "creationDateFilters": {
        "standardRange": { "startDate": "01-12-2023", "endDate": "01-02-2024" },
        "exactDate": { "startDate": "01-02-2024" }
    }
}"#;

fn date_popup(show_end_input: bool) -> Arc<MemoryEngine> {
    Arc::new(MemoryEngine::with_body(
        El::new("div")
            .child(
                El::new("div")
                    .class("filter-chip")
                    .attr("data-filter-id", "creationDate")
                    .text("Creation date"),
            )
            .child(
                El::new("div")
                    .class("filter-popup show")
                    .child(El::new("input").attr("name", "transactionStartDate"))
                    .child(
                        El::new("input")
                            .attr("name", END_DATE_INPUT)
                            .hidden(!show_end_input),
                    ),
            ),
    ))
}

fn kinds_and_values(engine: &MemoryEngine) -> Vec<(ActionKind, Option<String>)> {
    engine
        .actions()
        .into_iter()
        .map(|a| (a.kind, a.value))
        .collect()
}

#[tokio::test]
async fn test_date_range_fills_both_inputs_and_submits_with_enter() {
    let engine = date_popup(true);
    let page = Page::new(engine.clone());
    let fixtures = FixtureStore::from_json(FIXTURES).unwrap();

    apply_date_range(&page, &fixtures, "standardRange").await.unwrap();

    assert_eq!(
        kinds_and_values(&engine),
        vec![
            (ActionKind::Click, None),
            (ActionKind::Fill, Some("01-12-2023".to_string())),
            (ActionKind::Fill, Some("01-02-2024".to_string())),
            (ActionKind::Press, Some("Enter".to_string())),
        ]
    );
    let end = page
        .locator(format!("input[name=\"{END_DATE_INPUT}\"]"))
        .input_value()
        .await
        .unwrap();
    assert_eq!(end, "01-02-2024");
}

#[tokio::test]
async fn test_date_range_skips_hidden_end_input() {
    let engine = date_popup(false);
    let page = Page::new(engine.clone());
    let fixtures = FixtureStore::from_json(FIXTURES).unwrap();

    apply_date_range(&page, &fixtures, "standardRange").await.unwrap();

    let fills: Vec<_> = kinds_and_values(&engine)
        .into_iter()
        .filter(|(kind, _)| *kind == ActionKind::Fill)
        .collect();
    assert_eq!(fills, vec![(ActionKind::Fill, Some("01-12-2023".to_string()))]);
}

#[tokio::test]
async fn test_unknown_date_preset_touches_nothing() {
    let engine = date_popup(true);
    let page = Page::new(engine.clone());
    let fixtures = FixtureStore::from_json(FIXTURES).unwrap();

    let err = apply_date_range(&page, &fixtures, "lastQuarter")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PageError::Fixture(FixtureError::UnknownPreset(ref name)) if name == "lastQuarter"
    ));
    assert!(engine.actions().is_empty());
}

#[tokio::test]
async fn test_reset_filters_only_when_chip_present() {
    let without = Page::from_engine(MemoryEngine::with_body(El::new("div")));
    assert!(!reset_filters(&without).await.unwrap());

    let engine = Arc::new(MemoryEngine::with_body(
        El::new("div").child(
            El::new("div")
                .class("filter-chip")
                .attr("data-filter-id", "reset")
                .text("Reset"),
        ),
    ));
    let page = Page::new(engine.clone());
    assert!(reset_filters(&page).await.unwrap());
    assert_eq!(engine.actions().len(), 1);
    assert_eq!(engine.actions()[0].kind, ActionKind::Click);
}

fn transactions_page() -> Arc<MemoryEngine> {
    let rows = (0..3).map(|i| {
        El::new("tr")
            .attr("data-row", &i.to_string())
            .child(El::new("td").text(&format!("tx-{i}")))
    });
    let engine = Arc::new(MemoryEngine::with_body(
        El::new("div")
            .child(
                El::new("div").class("transactions-wrapper__listing").child(
                    El::new("table").child(
                        El::new("tbody")
                            .child(El::new("div").class("react-loading-skeleton"))
                            .children(rows),
                    ),
                ),
            )
            .child(
                El::new("div")
                    .class("side-sheet__container")
                    .hidden(true)
                    .child(El::new("div").class("side-sheet__content")),
            ),
    ));
    engine
        .mutate(|dom| {
            dom.defer(Duration::from_millis(60), |dom| {
                if let Ok(Some(skeleton)) = dom.query_first(".react-loading-skeleton") {
                    dom.remove(skeleton);
                }
            });
        })
        .unwrap();
    engine
        .on(Trigger::Click, "tbody tr", |dom, _row, _| {
            if let Ok(Some(sheet)) = dom.query_first(".side-sheet__container") {
                dom.node_mut(sheet).hidden = false;
            }
        })
        .unwrap();
    engine
}

#[tokio::test]
async fn test_details_side_sheet_opens_after_table_loads() {
    let engine = transactions_page();
    let page = Page::new(engine.clone());

    let sheet = open_details_side_sheet(&page, 1).await.unwrap();

    assert!(sheet.is_visible().await.unwrap());
    let clicks: Vec<String> = engine
        .actions()
        .into_iter()
        .filter(|a| a.kind == ActionKind::Click)
        .map(|a| a.target)
        .collect();
    assert_eq!(clicks.len(), 1);
    assert!(clicks[0].starts_with("tr"), "clicked {:?}", clicks[0]);
}

#[tokio::test]
async fn test_table_wait_fails_when_table_never_shows() {
    let page = Page::from_engine(MemoryEngine::with_body(El::new("div")));
    let started = tokio::time::Instant::now();
    // The table timeout is long; bound the test instead of waiting it out.
    let outcome = tokio::time::timeout(Duration::from_millis(300), wait_for_table_loaded(&page)).await;
    assert!(outcome.is_err());
    assert!(started.elapsed() < Duration::from_secs(1));
}

fn add_filter_menu() -> Arc<MemoryEngine> {
    Arc::new(MemoryEngine::with_body(
        El::new("div")
            .child(El::new("div").class("filter-chip").text("+ Add filter"))
            .child(
                El::new("div").class("add-filter").children([
                    El::new("div").class("add-filter-item").text("Status"),
                    El::new("div")
                        .class("add-filter-item")
                        .attr("id", "range")
                        .text("Terminal ID range"),
                    El::new("div")
                        .class("add-filter-item")
                        .attr("id", "tid")
                        .text("Terminal ID"),
                    El::new("div").class("add-filter-list").children([
                        El::new("div").class("add-filter-list__item").text("Terminal ID extended"),
                        El::new("div").class("add-filter-list__item").text(" terminal id "),
                    ]),
                ]),
            ),
    ))
}

#[tokio::test]
async fn test_filter_component_opens_its_menu_entry() {
    let engine = add_filter_menu();
    let page = Page::new(engine.clone());
    let component = FilterComponent::new("Terminal ID");
    assert_eq!(component.label(), "Terminal ID");

    component.open(&page).await.unwrap();

    let targets: Vec<String> = engine.actions().into_iter().map(|a| a.target).collect();
    assert_eq!(targets.len(), 2);
    assert!(targets[0].contains("filter-chip"));
    assert!(targets[1].contains("add-filter-item"));
    // The longer label listed first is not picked.
    assert!(targets[1].contains("#tid"), "{}", targets[1]);
}

#[tokio::test]
async fn test_filter_by_label_is_exact_and_case_insensitive() {
    let page = Page::new(add_filter_menu());
    let item = filter_by_label(&page, "Terminal ID").await.unwrap();
    assert_eq!(item.count().await.unwrap(), 1);
    assert_eq!(item.inner_text().await.unwrap(), "terminal id");
}

#[tokio::test]
async fn test_sidebar_navigation() {
    let engine = Arc::new(MemoryEngine::with_body(
        El::new("nav").class("side-navigation").children([
            El::new("div")
                .class("navigation-item__inner active")
                .child(El::new("a").attr("href", "/dashboard").child(El::new("p").text("Dashboard"))),
            El::new("div")
                .class("navigation-item__inner")
                .child(El::new("a").attr("href", "/reports").child(El::new("p").text("Reports"))),
        ]),
    ));
    let page = Page::new(engine.clone());
    let sidebar = Sidebar::new(&page);

    assert!(sidebar.is_active("Dashboard").await.unwrap());
    assert!(!sidebar.is_active("Reports").await.unwrap());

    sidebar.navigate("Reports").await.unwrap();
    sidebar.navigate_by_href("/dashboard").await.unwrap();
    let targets: Vec<String> = engine.actions().into_iter().map(|a| a.target).collect();
    assert_eq!(targets.len(), 2);
    assert!(targets.iter().all(|t| t.starts_with('a')));
}
