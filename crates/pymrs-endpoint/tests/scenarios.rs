use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;

use pymrs_endpoint::sim::{SimBrowser, SimFrame, SimPage, PAGE_LABEL};
use pymrs_endpoint::{
    auto_init, Child, ChildConfig, ConfigurationError, EndpointError, IFrameElement, Parent,
    ParentConfig, Viewport,
};
use pymrs_frame::{encode_envelope, FrameError, MessageKind, ReservedKind, ViewportPosition};
use pymrs_transport::TransportError;

const PAGE_URL: &str = "https://news.example/2024/story.html";
const CHILD_URL: &str = "https://embed.example/chart.html";

struct Embed {
    browser: SimBrowser,
    page: Rc<SimPage>,
    frame: Rc<SimFrame>,
    parent: Parent<SimPage>,
}

fn embed(config: ParentConfig) -> Embed {
    let browser = SimBrowser::new();
    let page = browser.page(PAGE_URL, "Story");
    page.add_container("graphic", 600.0, 300.0);
    let parent = Parent::new(page.clone(), "graphic", CHILD_URL, config).unwrap();
    let frame = page.frame("graphic").unwrap();
    Embed {
        browser,
        page,
        frame,
        parent,
    }
}

fn heights_sent(browser: &SimBrowser) -> Vec<(u64, String)> {
    browser
        .transcript()
        .into_iter()
        .filter(|entry| entry.to == PAGE_LABEL)
        .filter_map(|entry| {
            let envelope = entry.envelope()?;
            (envelope.message.kind == MessageKind::Reserved(ReservedKind::Height))
                .then_some((entry.at_ms, envelope.message.payload))
        })
        .collect()
}

fn sent_to_child(browser: &SimBrowser, kind: ReservedKind) -> Vec<String> {
    browser
        .transcript()
        .into_iter()
        .filter(|entry| entry.to == "iframe#graphic")
        .filter_map(|entry| entry.envelope())
        .filter(|envelope| envelope.message.kind == MessageKind::Reserved(kind))
        .map(|envelope| envelope.message.payload)
        .collect()
}

#[test]
fn child_reads_contract_from_its_url() {
    let embed = embed(ParentConfig::default());
    let child = Child::new(embed.frame.clone(), ChildConfig::default()).unwrap();

    assert_eq!(child.id(), "graphic");
    assert_eq!(child.parent_url(), Some(PAGE_URL));
    assert_eq!(child.parent_title(), Some("Story"));
    assert_eq!(child.initial_width(), Some(600.0));
    assert_eq!(
        embed.page.iframe("graphic").unwrap().attribute("scrolling"),
        Some("no")
    );
}

#[test]
fn polling_child_sends_height_every_period_until_removed() {
    let embed = embed(ParentConfig::default());
    embed.frame.set_content_height(450.0);
    let child = Child::new(
        embed.frame.clone(),
        ChildConfig::default().with_polling(Duration::from_millis(100)),
    )
    .unwrap();

    embed.browser.advance(Duration::from_millis(350));
    let heights = heights_sent(&embed.browser);
    let times: Vec<u64> = heights.iter().map(|(at, _)| *at).collect();
    assert_eq!(times, vec![0, 100, 200, 300]);
    assert!(heights.iter().all(|(_, height)| height == "450"));

    child.remove();
    embed.browser.clear_transcript();
    embed.browser.advance(Duration::from_millis(1000));
    assert!(embed.browser.transcript().is_empty());
    assert_eq!(embed.frame.message_listener_count(), 0);
}

#[test]
fn event_driven_child_resends_height_on_mutation() {
    let embed = embed(ParentConfig::default());
    let _child = Child::new(embed.frame.clone(), ChildConfig::default()).unwrap();

    embed.frame.set_content_height(320.0);
    embed.frame.set_content_height(640.0);
    embed.browser.run_until_idle();

    let heights: Vec<String> = heights_sent(&embed.browser)
        .into_iter()
        .map(|(_, height)| height)
        .collect();
    assert_eq!(heights, vec!["0", "320", "640"]);
    assert_eq!(embed.page.iframe("graphic").unwrap().height_style(), "640px");
}

#[test]
fn parent_applies_height_and_clamps_negative_values() {
    let embed = embed(ParentConfig::default());
    let iframe = embed.page.iframe("graphic").unwrap();
    let origin = embed.frame.origin().to_string();

    let height = |value: &str| {
        encode_envelope("graphic", &ReservedKind::Height.into(), value).unwrap()
    };

    embed.page.deliver_from(&origin, &height("450"));
    embed.browser.run_until_idle();
    assert_eq!(iframe.height_style(), "450px");

    embed.page.deliver_from(&origin, &height("-5"));
    embed.browser.run_until_idle();
    assert_eq!(iframe.height_style(), "0px");

    embed.page.deliver_from(&origin, &height("NaN"));
    embed.page.deliver_from(&origin, &height("tall"));
    embed.browser.run_until_idle();
    assert_eq!(iframe.height_style(), "0px");
}

#[test]
fn scroll_to_child_position_accounts_for_iframe_offset() {
    let embed = embed(ParentConfig::default());
    let child = Child::new(embed.frame.clone(), ChildConfig::default()).unwrap();
    embed.page.user_scroll(50.0);

    child.scroll_parent_to_child_pos(120.0);
    embed.browser.run_until_idle();

    // Container sits 300px down the page.
    assert_eq!(embed.page.scrolls(), vec![(0.0, 420.0)]);
    assert_eq!(embed.page.scroll_y(), 420.0);
}

#[test]
fn scroll_to_child_element_and_parent_hash() {
    let embed = embed(ParentConfig::default());
    embed.frame.add_element("chart-2", 800.0);
    let child = Child::new(embed.frame.clone(), ChildConfig::default()).unwrap();

    child.scroll_parent_to_child_el("chart-2");
    child.scroll_parent_to_child_el("missing");
    child.scroll_parent_to("#comments");
    embed.browser.run_until_idle();

    assert_eq!(embed.page.scrolls(), vec![(0.0, 1100.0)]);
    assert_eq!(embed.page.navigations(), vec!["#comments"]);
}

#[test]
fn navigate_parent_to_changes_page_location() {
    let embed = embed(ParentConfig::default());
    let child = Child::new(embed.frame.clone(), ChildConfig::default()).unwrap();

    child.navigate_parent_to("https://news.example/next.html");
    embed.browser.run_until_idle();

    assert_eq!(embed.page.navigations(), vec!["https://news.example/next.html"]);
}

#[test]
fn missing_container_is_a_configuration_error() {
    let browser = SimBrowser::new();
    let page = browser.page(PAGE_URL, "Story");

    let err =
        Parent::new(page.clone(), "nowhere", CHILD_URL, ParentConfig::default()).unwrap_err();

    let EndpointError::Configuration(ConfigurationError::MissingContainer(id)) = &err else {
        panic!("expected a missing container error, got {err:?}");
    };
    assert_eq!(id, "nowhere");
    assert!(page.iframe("nowhere").is_none());
    assert_eq!(page.message_listener_count(), 0);
    assert!(browser.transcript().is_empty());
}

#[test]
fn parent_callbacks_fire_in_order_despite_failures() {
    let embed = embed(ParentConfig::default());
    let child = Child::new(embed.frame.clone(), ChildConfig::default()).unwrap();
    let log = Rc::new(RefCell::new(Vec::new()));

    let first = log.clone();
    embed.parent.on_message("vote", move |payload| {
        first.borrow_mut().push(format!("first:{payload}"));
        Err("first callback failed".into())
    });
    let second = log.clone();
    embed.parent.on_message("vote", move |payload| {
        second.borrow_mut().push(format!("second:{payload}"));
        Ok(())
    });

    child.send_message("vote", "yes").unwrap();
    embed.browser.run_until_idle();

    assert_eq!(*log.borrow(), vec!["first:yes", "second:yes"]);
}

#[test]
fn width_changes_trigger_render_and_height() {
    let embed = embed(ParentConfig::default());
    let rendered = Rc::new(Cell::new(0.0));

    let seen = rendered.clone();
    let frame = embed.frame.clone();
    let _child = Child::new(
        embed.frame.clone(),
        ChildConfig::default().with_render_callback(move |width| {
            seen.set(width);
            frame.set_content_height(if width < 500.0 { 900.0 } else { 450.0 });
        }),
    )
    .unwrap();
    embed.browser.run_until_idle();

    embed.page.set_container_width("graphic", 320.0);
    embed.page.resize(Viewport {
        width: 360.0,
        height: 640.0,
    });
    embed.browser.run_until_idle();

    assert_eq!(rendered.get(), 320.0);
    assert_eq!(sent_to_child(&embed.browser, ReservedKind::Width), vec!["320"]);
    assert_eq!(embed.page.iframe("graphic").unwrap().height_style(), "900px");
}

#[test]
fn child_refuses_reserved_width() {
    let embed = embed(ParentConfig::default());
    let child = Child::new(embed.frame.clone(), ChildConfig::default()).unwrap();

    assert!(matches!(
        child.send_message("width", "100"),
        Err(EndpointError::ReservedKind(_))
    ));
    assert!(matches!(
        child.on_message("width", |_| Ok(())),
        Err(EndpointError::ReservedKind(_))
    ));
    assert!(child.send_message("votexPYM", "x").is_err());
}

#[test]
fn custom_kinds_may_contain_spaces() {
    let embed = embed(ParentConfig::default());
    let child = Child::new(embed.frame.clone(), ChildConfig::default()).unwrap();
    let received = Rc::new(RefCell::new(Vec::new()));

    let sink = received.clone();
    child
        .on_message("chart ready", move |payload| {
            sink.borrow_mut().push(payload.to_string());
            Ok(())
        })
        .unwrap();

    embed.parent.send_message("chart ready", "1").unwrap();
    embed.browser.run_until_idle();

    assert_eq!(*received.borrow(), vec!["1"]);
}

#[test]
fn container_ids_ending_like_the_delimiter_are_refused() {
    let browser = SimBrowser::new();
    let page = browser.page(PAGE_URL, "Story");
    page.add_container("mapxPYM", 600.0, 0.0);

    let err =
        Parent::new(page.clone(), "mapxPYM", CHILD_URL, ParentConfig::default()).unwrap_err();
    assert!(matches!(
        err,
        EndpointError::Frame(FrameError::InvalidInstanceId(ref id)) if id == "mapxPYM"
    ));
    assert!(page.iframe("mapxPYM").is_none());

    let frame = browser.detached_frame(CHILD_URL);
    let err = Child::new(frame, ChildConfig::default().with_id("mapxPYM")).unwrap_err();
    assert!(matches!(
        err,
        EndpointError::Transport(TransportError::Frame(FrameError::InvalidInstanceId(_)))
    ));
}

#[test]
fn container_ids_with_delimiter_letters_still_resize() {
    let browser = SimBrowser::new();
    let page = browser.page(PAGE_URL, "Story");
    page.add_container("mapx", 600.0, 0.0);
    let _parent = Parent::new(page.clone(), "mapx", CHILD_URL, ParentConfig::default()).unwrap();
    let frame = page.frame("mapx").unwrap();
    frame.set_content_height(450.0);

    let _child = Child::new(frame, ChildConfig::default()).unwrap();
    browser.run_until_idle();

    assert_eq!(page.iframe("mapx").unwrap().height_style(), "450px");
}

#[test]
fn child_rejects_messages_from_other_origins() {
    let embed = embed(ParentConfig::default());
    let child = Child::new(
        embed.frame.clone(),
        ChildConfig::default().with_xdomain("https://news.example"),
    )
    .unwrap();
    let hits = Rc::new(Cell::new(0));
    let counter = hits.clone();
    child
        .on_message("vote", move |_| {
            counter.set(counter.get() + 1);
            Ok(())
        })
        .unwrap();

    let vote = encode_envelope("graphic", &MessageKind::parse("vote"), "yes").unwrap();
    embed.frame.deliver_from("https://evil.example", &vote);
    embed.frame.deliver_from("https://news.example", &vote);
    embed.browser.run_until_idle();

    assert_eq!(hits.get(), 1);
}

#[test]
fn messages_from_other_origins_never_reach_callbacks() {
    let embed = embed(ParentConfig {
        xdomain: Some("https://embed.example".to_string()),
        ..Default::default()
    });
    let hits = Rc::new(Cell::new(0));
    let counter = hits.clone();
    embed.parent.on_message("vote", move |_| {
        counter.set(counter.get() + 1);
        Ok(())
    });

    let vote = encode_envelope("graphic", &MessageKind::parse("vote"), "yes").unwrap();
    embed.page.deliver_from("https://evil.example", &vote);
    embed.page.deliver_from("https://embed.example", &vote);
    embed.browser.run_until_idle();

    assert_eq!(hits.get(), 1);
}

#[test]
fn restricted_parent_posts_with_exact_target_origin() {
    let embed = embed(ParentConfig {
        xdomain: Some("https://embed.example".to_string()),
        ..Default::default()
    });

    embed.parent.send_width();
    let transcript = embed.browser.transcript();
    assert_eq!(transcript.len(), 1);
    assert_eq!(transcript[0].target_origin, "https://embed.example");
    assert!(transcript[0].delivered);
}

#[test]
fn child_posts_to_parent_origin_from_query() {
    let embed = embed(ParentConfig::default());
    let _child = Child::new(embed.frame.clone(), ChildConfig::default()).unwrap();

    let transcript = embed.browser.transcript();
    assert_eq!(transcript[0].from, "iframe#graphic");
    assert_eq!(transcript[0].target_origin, "https://news.example");
}

#[test]
fn messages_for_other_instances_are_ignored() {
    let embed = embed(ParentConfig::default());
    let iframe = embed.page.iframe("graphic").unwrap();
    let origin = embed.frame.origin().to_string();

    let foreign = encode_envelope("other", &ReservedKind::Height.into(), "999").unwrap();
    embed.page.deliver_from(&origin, &foreign);
    embed.page.deliver_from(&origin, "not a pym message");
    embed.browser.run_until_idle();

    assert_eq!(iframe.height_style(), "");
}

#[test]
fn track_scroll_reports_position_throttled() {
    let embed = embed(ParentConfig {
        track_scroll: true,
        scroll_wait_ms: Some(100),
        ..Default::default()
    });
    embed.page.iframe("graphic").unwrap().set_height_style("200px");

    for y in [10.0, 20.0, 30.0, 40.0] {
        embed.page.user_scroll(y);
        embed.browser.advance(Duration::from_millis(10));
    }
    embed.browser.advance(Duration::from_millis(200));

    let reports = sent_to_child(&embed.browser, ReservedKind::ViewportIframePosition);
    assert_eq!(reports.len(), 2);

    let leading = ViewportPosition::parse(&reports[0]).unwrap();
    assert_eq!(leading.top, 290.0);
    assert_eq!(leading.bottom, 490.0);
    let trailing = ViewportPosition::parse(&reports[1]).unwrap();
    assert_eq!(trailing.top, 260.0);
    assert_eq!(trailing.viewport_width, 1024.0);
}

#[test]
fn child_can_request_position_info() {
    let embed = embed(ParentConfig::default());
    let child = Child::new(embed.frame.clone(), ChildConfig::default()).unwrap();
    let received = Rc::new(RefCell::new(None));

    let slot = received.clone();
    child
        .on_message("viewport-iframe-position", move |payload| {
            *slot.borrow_mut() = Some(ViewportPosition::parse(payload)?);
            Ok(())
        })
        .unwrap();

    child.get_parent_position_info();
    embed.browser.run_until_idle();

    let position = received.borrow().unwrap();
    assert_eq!(position.viewport_height, 768.0);
    assert_eq!(position.top, 300.0);
    assert!(position.is_iframe_visible());
}

#[test]
fn remove_is_idempotent_and_silences_both_sides() {
    let embed = embed(ParentConfig::default());
    let child = Child::new(embed.frame.clone(), ChildConfig::default()).unwrap();
    embed.browser.run_until_idle();

    embed.parent.remove();
    embed.parent.remove();
    assert!(embed.parent.is_removed());
    assert!(embed.page.iframe("graphic").unwrap().is_removed());
    assert!(embed.frame.is_closed());
    assert_eq!(embed.page.message_listener_count(), 0);

    child.remove();
    child.remove();
    assert_eq!(embed.frame.message_listener_count(), 0);

    embed.browser.clear_transcript();
    embed.parent.send_width();
    embed.parent.send_message("vote", "late").unwrap();
    child.send_height();
    child.send_message("vote", "late").unwrap();
    child.send_message("width", "1").unwrap();
    child.on_message("width", |_| Ok(())).unwrap();
    child.navigate_parent_to("https://news.example/");
    child.scroll_parent_to_child_pos(10.0);
    embed.browser.run_until_idle();

    assert!(child.is_removed());
    assert!(embed.browser.transcript().is_empty());
}

#[test]
fn remove_from_inside_a_handler() {
    let embed = embed(ParentConfig::default());
    let parent = Rc::new(embed.parent);
    let child = Child::new(embed.frame.clone(), ChildConfig::default()).unwrap();
    let after = Rc::new(Cell::new(false));

    let weak = Rc::downgrade(&parent);
    parent.on_message("close", move |_| {
        if let Some(parent) = weak.upgrade() {
            parent.remove();
        }
        Ok(())
    });
    let flag = after.clone();
    parent.on_message("close", move |_| {
        flag.set(true);
        Ok(())
    });

    child.send_message("close", "").unwrap();
    child.send_message("close", "").unwrap();
    embed.browser.run_until_idle();

    assert!(parent.is_removed());
    assert!(!after.get());
}

#[test]
fn child_remove_from_inside_a_handler() {
    let embed = embed(ParentConfig::default());
    let child = Rc::new(Child::new(embed.frame.clone(), ChildConfig::default()).unwrap());
    let after = Rc::new(Cell::new(false));

    let weak = Rc::downgrade(&child);
    child
        .on_message("close", move |_| {
            if let Some(child) = weak.upgrade() {
                child.remove();
            }
            Ok(())
        })
        .unwrap();
    let flag = after.clone();
    child
        .on_message("close", move |_| {
            flag.set(true);
            Ok(())
        })
        .unwrap();

    embed.parent.send_message("close", "").unwrap();
    embed.parent.send_message("close", "").unwrap();
    embed.browser.run_until_idle();

    assert!(child.is_removed());
    assert!(!after.get());
    assert_eq!(embed.frame.message_listener_count(), 0);
}

#[test]
fn child_without_instance_id_fails_unless_configured() {
    let browser = SimBrowser::new();
    let frame = browser.detached_frame("https://embed.example/chart.html");

    let err = Child::new(frame.clone(), ChildConfig::default()).unwrap_err();
    assert!(matches!(
        err,
        EndpointError::Configuration(ConfigurationError::MissingChildId)
    ));

    let child = Child::new(frame, ChildConfig::default().with_id("graphic")).unwrap();
    assert_eq!(child.id(), "graphic");
    assert!(browser.transcript().is_empty());
}

#[test]
fn auto_init_handles_each_container_once() {
    let browser = SimBrowser::new();
    let page = browser.page(PAGE_URL, "Story");
    let attributes = |src: &str| -> BTreeMap<String, String> {
        [
            ("data-pym-src".to_string(), src.to_string()),
            ("data-pym-title".to_string(), "Chart".to_string()),
        ]
        .into_iter()
        .collect()
    };
    page.add_container_with_attributes("first", 600.0, 0.0, attributes(CHILD_URL));
    page.add_container_with_attributes("second", 600.0, 800.0, attributes("map.html"));
    page.add_container("plain", 600.0, 1600.0);

    let parents = auto_init(&page);
    assert_eq!(parents.len(), 2);
    assert_eq!(
        page.iframe("second").unwrap().src().split('?').next(),
        Some("https://news.example/2024/map.html")
    );
    assert_eq!(page.iframe("first").unwrap().attribute("title"), Some("Chart"));
    assert!(page
        .container_attribute("first", "data-pym-auto-initialized")
        .is_some());

    assert!(auto_init(&page).is_empty());
    assert!(page.iframe("plain").is_none());
}
