use pymrs::frame::{
    decode_envelope, parse_dimension, MessageKind, ReservedKind, ScrollTarget, ViewportPosition,
};
use serde::Serialize;

use crate::cmd::DecodeArgs;
use crate::exit::{CliError, CliResult, DATA_INVALID, FAILURE, SUCCESS};
use crate::output::{print_fields, print_json, OutputFormat};

#[derive(Serialize)]
struct DecodeOutput {
    instance_id: String,
    kind: String,
    reserved: bool,
    payload: String,
    /// Interpretation of a reserved payload, or why it is malformed.
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let envelope = decode_envelope(&args.raw)
        .ok_or_else(|| CliError::new(DATA_INVALID, "decode: not a pym message"))?;

    if let Some(expected) = &args.id {
        if &envelope.instance_id != expected {
            return Err(CliError::new(
                FAILURE,
                format!(
                    "decode: message is for instance {:?}, not {expected:?}",
                    envelope.instance_id
                ),
            ));
        }
    }

    let kind = &envelope.message.kind;
    let out = DecodeOutput {
        detail: describe(kind, &envelope.message.payload),
        instance_id: envelope.instance_id.clone(),
        kind: kind.as_str().to_string(),
        reserved: kind.is_reserved(),
        payload: envelope.message.payload.clone(),
    };

    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => {
            let mut fields = vec![
                ("instance", out.instance_id.clone()),
                ("kind", out.kind.clone()),
                ("reserved", out.reserved.to_string()),
                ("payload", out.payload.clone()),
            ];
            if let Some(detail) = &out.detail {
                fields.push(("detail", detail.clone()));
            }
            print_fields(&fields);
        }
        OutputFormat::Pretty => {
            print!(
                "instance={} kind={} reserved={} payload={:?}",
                out.instance_id, out.kind, out.reserved, out.payload
            );
            match &out.detail {
                Some(detail) => println!(" ({detail})"),
                None => println!(),
            }
        }
        OutputFormat::Raw => println!("{}", out.payload),
    }
    Ok(SUCCESS)
}

fn describe(kind: &MessageKind, payload: &str) -> Option<String> {
    let MessageKind::Reserved(reserved) = kind else {
        return None;
    };

    let detail = match reserved {
        ReservedKind::Height | ReservedKind::Width => {
            match parse_dimension(reserved.as_str(), payload) {
                Ok(px) => format!("{px}px"),
                Err(err) => err.to_string(),
            }
        }
        ReservedKind::ScrollTo => match ScrollTarget::parse(payload) {
            Ok(ScrollTarget::Hash(hash)) => format!("scroll page to #{hash}"),
            Ok(ScrollTarget::ChildElement { id, offset }) => {
                format!("scroll to child element #{id} at {offset}px")
            }
            Ok(ScrollTarget::ChildPosition(offset)) => format!("scroll to child offset {offset}px"),
            Err(err) => err.to_string(),
        },
        ReservedKind::ViewportIframePosition => match ViewportPosition::parse(payload) {
            Ok(position) => format!(
                "viewport {}x{}, iframe top={} bottom={} visible={}",
                position.viewport_width,
                position.viewport_height,
                position.top,
                position.bottom,
                position.is_iframe_visible()
            ),
            Err(err) => err.to_string(),
        },
        ReservedKind::NavigateTo => format!("navigate page to {payload}"),
        ReservedKind::ParentPositionInfo => "request viewport position".to_string(),
        ReservedKind::Default => return None,
    };
    Some(detail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describes_reserved_payloads() {
        let height = MessageKind::Reserved(ReservedKind::Height);
        assert_eq!(describe(&height, "450").as_deref(), Some("450px"));

        let scroll = MessageKind::Reserved(ReservedKind::ScrollTo);
        assert_eq!(
            describe(&scroll, "position 120").as_deref(),
            Some("scroll to child offset 120px")
        );
    }

    #[test]
    fn custom_kinds_have_no_detail() {
        assert_eq!(describe(&MessageKind::parse("vote"), "yes"), None);
    }

    #[test]
    fn malformed_reserved_payload_is_explained() {
        let width = MessageKind::Reserved(ReservedKind::Width);
        let detail = describe(&width, "wide").unwrap();
        assert!(detail.contains("width"));
    }
}
