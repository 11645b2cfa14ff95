//! A Parent and Child wired together in the simulated browser.
//!
//! Run: `cargo run -p pymrs --example embed`

use std::time::Duration;

use pymrs::endpoint::sim::{SimBrowser, SimPage};
use pymrs::endpoint::Viewport;
use pymrs::{Child, ChildConfig, Parent, ParentConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let browser = SimBrowser::new();
    let page = browser.page("https://news.example/story.html", "Election results");
    page.add_container("results", 640.0, 480.0);

    let parent = Parent::new(
        page.clone(),
        "results",
        "https://graphics.example/results.html",
        ParentConfig {
            xdomain: Some("https://graphics.example".to_string()),
            ..Default::default()
        },
    )?;
    parent.on_message("selected", |district| {
        println!("parent: reader selected {district}");
        Ok(())
    });

    let frame = page.frame("results").ok_or("iframe was not created")?;
    frame.set_content_height(900.0);

    let render_frame = frame.clone();
    let child = Child::new(
        frame.clone(),
        ChildConfig::default()
            .with_xdomain("https://news.example")
            .with_render_callback(move |width| {
                // Narrow layouts stack the map above the table.
                render_frame.set_content_height(if width < 480.0 { 1400.0 } else { 900.0 });
            }),
    )?;

    child.send_message("selected", "district-7")?;
    browser.run_until_idle();
    println!("iframe height: {}", iframe_height(&page));

    page.set_container_width("results", 360.0);
    page.resize(Viewport {
        width: 390.0,
        height: 844.0,
    });
    browser.advance(Duration::from_millis(50));
    println!("iframe height after resize: {}", iframe_height(&page));

    for entry in browser.transcript() {
        println!("{:>4}ms {} -> {}: {}", entry.at_ms, entry.from, entry.to, entry.data);
    }
    Ok(())
}

fn iframe_height(page: &SimPage) -> String {
    page.iframe("results")
        .map(|iframe| iframe.height_style())
        .unwrap_or_default()
}
