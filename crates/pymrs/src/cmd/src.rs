use pymrs::endpoint::{build_iframe_src, IframeSrc};
use serde::Serialize;

use crate::cmd::SrcArgs;
use crate::exit::{configuration_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_fields, print_json, OutputFormat};

#[derive(Serialize)]
struct SrcOutput<'a> {
    container: &'a str,
    parent_url: &'a str,
    src: &'a str,
}

pub fn run(args: SrcArgs, format: OutputFormat) -> CliResult<i32> {
    if !args.width.is_finite() || args.width < 0.0 {
        return Err(CliError::new(USAGE, "src: --width must be a non-negative number"));
    }

    let src = build_iframe_src(
        &args.parent_url,
        &IframeSrc {
            url: &args.url,
            child_id: &args.container,
            initial_width: args.width,
            parent_title: &args.title,
            parent_url_param: &args.param,
            parent_url_value: &args.parent_url,
            optional_params: args.optional_params.as_deref(),
        },
    )
    .map_err(|err| configuration_error("src", err))?;

    match format {
        OutputFormat::Json => print_json(&SrcOutput {
            container: &args.container,
            parent_url: &args.parent_url,
            src: &src,
        }),
        OutputFormat::Table => print_fields(&[
            ("container", args.container.clone()),
            ("parent", args.parent_url.clone()),
            ("src", src.clone()),
        ]),
        OutputFormat::Pretty | OutputFormat::Raw => println!("{src}"),
    }
    Ok(SUCCESS)
}
