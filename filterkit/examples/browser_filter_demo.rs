use anyhow::Result;
use filterkit::{filter_dropdown, list_tabs, FilterConfig, FilterStep, Page};

/// Browser Filter Demo
///
/// Attaches to a running Chromium over the DevTools protocol and selects a
/// terminal id in the filter popup that is currently open on the dashboard.
///
/// Requirements:
/// 1. Launch Chrome with debugging: chrome --remote-debugging-port=9222
/// 2. Log in to the dashboard and open the "Terminal ID" filter popup
/// 3. Run this example: cargo run --example browser_filter_demo -- 19126142

#[tokio::main]
async fn main() -> Result<()> {
    let value = std::env::args().nth(1).unwrap_or_else(|| "19126142".to_string());

    println!("🚀 Browser Filter Demo");
    println!("======================");

    println!("\n1️⃣ Listing browser tabs...");
    let tabs = match list_tabs(9222).await {
        Ok(tabs) => tabs,
        Err(e) => {
            println!("❌ No browser with DevTools on port 9222: {e}");
            println!("\n🔧 Start one with: chrome --remote-debugging-port=9222");
            return Ok(());
        }
    };
    for (i, tab) in tabs.iter().enumerate() {
        println!("   Tab {}: {} - {}", i + 1, tab.title, tab.url);
    }

    println!("\n2️⃣ Attaching to the dashboard tab...");
    let page = Page::connect_cdp(9222, Some("dashboard")).await?;
    println!("✅ Attached to {}", page.current_url().await?);

    println!("\n3️⃣ Selecting {value:?}...");
    match filter_dropdown(&page, &value, &FilterConfig::default()).await {
        Ok(result) => println!(
            "✅ Selected {} in {:?} (already checked: {})",
            result.selected_value, result.duration, result.was_already_checked
        ),
        Err(e) if e.step == FilterStep::VisibilityWait => {
            println!("⚠️  No filter popup is open: {e}");
        }
        Err(e) => println!("❌ {e}"),
    }

    Ok(())
}
