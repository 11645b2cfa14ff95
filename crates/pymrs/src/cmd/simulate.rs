use pymrs::endpoint::sim::{SimBrowser, TranscriptEntry};
use pymrs::{Child, ChildConfig, Parent, ParentConfig};
use serde::Serialize;
use tracing::info;

use crate::cmd::{parse_duration, SimulateArgs};
use crate::exit::{endpoint_error, json_error, CliError, CliResult, INTERNAL, SUCCESS, USAGE};
use crate::output::{preview, print_json, table, OutputFormat};

const CONTAINER: &str = "pym-sim";
const CONTAINER_TOP: f64 = 200.0;

#[derive(Serialize)]
struct MessageRow {
    at_ms: u64,
    from: String,
    to: String,
    kind: String,
    payload: String,
    delivered: bool,
}

impl From<TranscriptEntry> for MessageRow {
    fn from(entry: TranscriptEntry) -> Self {
        let (kind, payload) = match entry.envelope() {
            Some(envelope) => (
                envelope.message.kind.as_str().to_string(),
                envelope.message.payload,
            ),
            None => ("-".to_string(), entry.data.clone()),
        };
        Self {
            at_ms: entry.at_ms,
            from: entry.from,
            to: entry.to,
            kind,
            payload,
            delivered: entry.delivered,
        }
    }
}

#[derive(Serialize)]
struct SimulationOutput {
    src: String,
    elapsed_ms: u64,
    iframe_height: String,
    scroll_y: f64,
    navigations: Vec<String>,
    messages: Vec<MessageRow>,
}

pub fn run(args: SimulateArgs, format: OutputFormat) -> CliResult<i32> {
    let duration = parse_duration(&args.duration)?;
    let polling = args.polling.as_deref().map(parse_duration).transpose()?;
    if !args.height.is_finite() || !args.viewport_width.is_finite() {
        return Err(CliError::new(USAGE, "simulate: sizes must be finite numbers"));
    }
    let parent_config: ParentConfig = match &args.parent_config {
        Some(json) => {
            serde_json::from_str(json).map_err(|err| json_error("simulate: --parent-config", err))?
        }
        None => ParentConfig::default(),
    };

    let browser = SimBrowser::new();
    let page = browser.page(&args.parent_url, "pymrs simulation");
    page.add_container(CONTAINER, args.viewport_width, CONTAINER_TOP);

    let parent = Parent::new(page.clone(), CONTAINER, &args.child_url, parent_config)
        .map_err(|err| endpoint_error("simulate: parent", err))?;
    let frame = page
        .frame(CONTAINER)
        .ok_or_else(|| CliError::new(INTERNAL, "simulate: iframe was not created"))?;
    frame.set_content_height(args.height);

    let mut child_config = ChildConfig::default();
    if let Some(period) = polling {
        child_config = child_config.with_polling(period);
    }
    let child = Child::new(frame.clone(), child_config)
        .map_err(|err| endpoint_error("simulate: child", err))?;

    browser.run_until_idle();
    if let Some(position) = args.scroll_to_pos {
        child.scroll_parent_to_child_pos(position);
    }
    browser.advance(duration);

    let out = SimulationOutput {
        src: parent.iframe_src().to_string(),
        elapsed_ms: u64::try_from(browser.now().as_millis()).unwrap_or(u64::MAX),
        iframe_height: page
            .iframe(CONTAINER)
            .map(|iframe| iframe.height_style())
            .unwrap_or_default(),
        scroll_y: page.scroll_y(),
        navigations: page.navigations(),
        messages: browser.transcript().into_iter().map(MessageRow::from).collect(),
    };
    info!(
        messages = out.messages.len(),
        elapsed_ms = out.elapsed_ms,
        "simulation finished"
    );

    child.remove();
    parent.remove();

    print_simulation(&out, format);
    Ok(SUCCESS)
}

fn print_simulation(out: &SimulationOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table => {
            let mut messages = table(vec!["AT", "FROM", "TO", "KIND", "PAYLOAD", "DELIVERED"]);
            for row in &out.messages {
                messages.add_row(vec![
                    format!("{}ms", row.at_ms),
                    row.from.clone(),
                    row.to.clone(),
                    row.kind.clone(),
                    preview(&row.payload, 48),
                    row.delivered.to_string(),
                ]);
            }
            println!("{messages}");
            println!(
                "iframe height: {}  scroll: {}  elapsed: {}ms",
                display_or_unset(&out.iframe_height),
                out.scroll_y,
                out.elapsed_ms
            );
        }
        OutputFormat::Pretty => {
            println!("src: {}", out.src);
            for row in &out.messages {
                let marker = if row.delivered { "->" } else { "-x" };
                println!(
                    "[{:>6}ms] {} {marker} {}: {} {}",
                    row.at_ms, row.from, row.to, row.kind, row.payload
                );
            }
            println!("iframe height: {}", display_or_unset(&out.iframe_height));
            println!("page scroll: {}", out.scroll_y);
            for url in &out.navigations {
                println!("navigated: {url}");
            }
        }
        OutputFormat::Raw => {
            for row in &out.messages {
                println!("{} {} {}", row.at_ms, row.kind, row.payload);
            }
        }
    }
}

fn display_or_unset(value: &str) -> &str {
    if value.is_empty() {
        "(unset)"
    } else {
        value
    }
}
