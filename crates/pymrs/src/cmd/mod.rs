use std::time::Duration;

use clap::{Args, Subcommand};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod simulate;
pub mod src;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Frame a message for one Parent/Child pair.
    Encode(EncodeArgs),
    /// Decode a framed message.
    Decode(DecodeArgs),
    /// Build the iframe src a Parent would create.
    Src(SrcArgs),
    /// Run a Parent/Child pair in the simulator and print the message transcript.
    Simulate(SimulateArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Encode(args) => encode::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Src(args) => src::run(args, format),
        Command::Simulate(args) => simulate::run(args, format),
        Command::Version(args) => version::run(args, format),
    }
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Instance id (the Parent's container id).
    #[arg(long)]
    pub id: String,
    /// Message kind, e.g. `height` or an application kind.
    pub kind: String,
    /// Message payload.
    #[arg(default_value = "")]
    pub payload: String,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Framed message as posted between windows.
    pub raw: String,
    /// Fail unless the message is addressed to this instance.
    #[arg(long)]
    pub id: Option<String>,
}

#[derive(Args, Debug)]
pub struct SrcArgs {
    /// Child page URL, absolute or relative to --parent-url.
    pub url: String,
    /// Container id, passed to the child as `childId`.
    #[arg(long)]
    pub container: String,
    /// URL of the hosting page.
    #[arg(long)]
    pub parent_url: String,
    /// Hosting page title.
    #[arg(long, default_value = "")]
    pub title: String,
    /// Query parameter carrying the parent URL.
    #[arg(long, default_value = pymrs::endpoint::DEFAULT_PARENT_URL_PARAM)]
    pub param: String,
    /// Extra query string appended to the src (e.g. `&lang=en`).
    #[arg(long)]
    pub optional_params: Option<String>,
    /// Container width in pixels, sent as `initialWidth`.
    #[arg(long, default_value_t = 600.0)]
    pub width: f64,
}

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Child content height in pixels.
    #[arg(long, default_value_t = 450.0)]
    pub height: f64,
    /// Child polling interval (e.g. 100ms, 1s). Default: event driven.
    #[arg(long)]
    pub polling: Option<String>,
    /// Virtual time to run for (e.g. 500ms, 2s).
    #[arg(long, default_value = "1s")]
    pub duration: String,
    /// Ask the parent to scroll to this child offset after start-up.
    #[arg(long)]
    pub scroll_to_pos: Option<f64>,
    /// Width of the embedding container in pixels.
    #[arg(long, default_value_t = 600.0)]
    pub viewport_width: f64,
    /// Parent options as JSON, using pym option names (e.g. `{"trackscroll":true}`).
    #[arg(long, value_name = "JSON")]
    pub parent_config: Option<String>,
    /// Child page URL.
    #[arg(long, default_value = "https://embed.example/graphic.html")]
    pub child_url: String,
    /// Hosting page URL.
    #[arg(long, default_value = "https://news.example/story.html")]
    pub parent_url: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse `150ms`, `2s` or a bare number of seconds.
pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .trim()
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0ms").is_err());
        assert!(parse_duration("soon").is_err());
        assert!(parse_duration("").is_err());
    }
}
