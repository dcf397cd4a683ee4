use std::sync::Arc;

use anyhow::Result;
use filterkit::{
    filter_dropdown, get_side_sheet_value, El, FilterConfig, MemoryEngine, Page,
    SideSheetLayout, Trigger,
};

/// Scripted Page Demo
///
/// Builds a small filter popup and side sheet in memory and runs the helpers
/// against them, no browser needed.

fn candidate(value: &str) -> El {
    El::new("div")
        .class("checked-list__item")
        .child(El::new("input").attr("type", "checkbox"))
        .child(
            El::new("div")
                .class("controller__right")
                .child(El::new("div").class("flexbox").text(value)),
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    let engine = Arc::new(MemoryEngine::with_body(
        El::new("main")
            .child(
                El::new("div").class("filter-popup show").children([
                    El::new("div")
                        .class("search")
                        .child(El::new("input").attr("name", "search")),
                    El::new("div")
                        .class("checked-list")
                        .children(["191261420", "19126142"].map(candidate)),
                    El::new("div")
                        .class("filter-popup__footer")
                        .child(El::new("button").attr("type", "submit").text("Apply")),
                ]),
            )
            .child(
                El::new("div").class("side-sheet__container").child(
                    El::new("div").class("side-sheet__content").child(
                        El::new("div").class("list-card").child(
                            El::new("div").class("transaction-list").child(
                                El::new("div")
                                    .class("transaction-list-item")
                                    .child(El::new("p").text("RRN"))
                                    .child(El::new("p").child(El::new("span").text("603219937057"))),
                            ),
                        ),
                    ),
                ),
            ),
    ));
    // Submitting closes the popup.
    engine.on(Trigger::Click, "button[type=\"submit\"]", |dom, _, _| {
        if let Ok(Some(popup)) = dom.query_first(".filter-popup") {
            dom.remove_class(popup, "show");
        }
    })?;

    let page = Page::new(engine.clone());
    let config = FilterConfig::default()
        .search_debounce_ms(100)
        .verify_delay_ms(50);

    let result = filter_dropdown(&page, "19126142", &config).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);

    let layout = SideSheetLayout::default().section("DETAILS_CARD", 1).item("RRN_1", 0);
    let rrn = get_side_sheet_value(
        &page.locator(".side-sheet__container"),
        "DETAILS_CARD",
        "RRN_1",
        &layout,
    )
    .await?;
    println!("RRN: {rrn}");

    for action in engine.actions() {
        println!("{:?} {} {:?}", action.kind, action.target, action.value);
    }
    Ok(())
}
