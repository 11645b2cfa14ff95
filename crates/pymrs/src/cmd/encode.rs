use pymrs::frame::{encode_envelope, MessageKind};
use serde::Serialize;

use crate::cmd::EncodeArgs;
use crate::exit::{frame_error, CliResult, SUCCESS};
use crate::output::{print_fields, print_json, OutputFormat};

#[derive(Serialize)]
struct EncodeOutput<'a> {
    instance_id: &'a str,
    kind: &'a str,
    reserved: bool,
    payload: &'a str,
    encoded: &'a str,
}

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let kind = MessageKind::parse(&args.kind);
    let encoded =
        encode_envelope(&args.id, &kind, &args.payload).map_err(|err| frame_error("encode", err))?;

    let out = EncodeOutput {
        instance_id: &args.id,
        kind: kind.as_str(),
        reserved: kind.is_reserved(),
        payload: &args.payload,
        encoded: &encoded,
    };
    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => print_fields(&[
            ("instance", out.instance_id.to_string()),
            ("kind", out.kind.to_string()),
            ("reserved", out.reserved.to_string()),
            ("encoded", out.encoded.to_string()),
        ]),
        OutputFormat::Pretty | OutputFormat::Raw => println!("{encoded}"),
    }
    Ok(SUCCESS)
}
