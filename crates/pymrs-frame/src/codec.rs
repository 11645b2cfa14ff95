use crate::error::{FrameError, Result};
use crate::kind::{MessageKind, ReservedKind};

/// Separator between envelope tag, instance id, kind and payload.
///
/// Kinds and instance ids must not contain it or end in `xPYM`; either way the
/// first split would land inside the name.
pub const DELIMITER: &str = "xPYMx";

/// Leading tag identifying our traffic among other `postMessage` users.
pub const ENVELOPE_TAG: &str = "pym";

/// A decoded message: kind plus text payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub kind: MessageKind,
    pub payload: String,
}

impl Message {
    pub fn new(kind: impl Into<MessageKind>, payload: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            payload: payload.into(),
        }
    }
}

/// A message addressed to one Parent/Child pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub instance_id: String,
    pub message: Message,
}

/// Encode `kind + DELIMITER + payload`.
///
/// ```text
/// height xPYMx 450
/// ^kind  ^delim ^payload (may itself contain the delimiter)
/// ```
pub fn encode_message(kind: &MessageKind, payload: &str) -> Result<String> {
    validate_kind(kind)?;
    let name = kind.as_str();
    let mut out = String::with_capacity(name.len() + DELIMITER.len() + payload.len());
    out.push_str(name);
    out.push_str(DELIMITER);
    out.push_str(payload);
    Ok(out)
}

/// Decode a message body by splitting on the first delimiter.
///
/// A body without a usable kind (no delimiter, or an empty kind) is the payload
/// of the default kind.
pub fn decode_message(raw: &str) -> Message {
    match raw.split_once(DELIMITER) {
        Some((name, payload)) if is_valid_name(name) => Message {
            kind: MessageKind::parse(name),
            payload: payload.to_string(),
        },
        _ => Message {
            kind: MessageKind::Reserved(ReservedKind::Default),
            payload: raw.to_string(),
        },
    }
}

/// Encode a complete wire string: `pym + D + instance_id + D + kind + D + payload`.
pub fn encode_envelope(instance_id: &str, kind: &MessageKind, payload: &str) -> Result<String> {
    validate_instance_id(instance_id)?;
    let body = encode_message(kind, payload)?;
    Ok([ENVELOPE_TAG, instance_id, &body].join(DELIMITER))
}

/// Decode a wire string.
///
/// Returns `None` for strings that are not enveloped (foreign traffic) or whose
/// envelope is truncated.
pub fn decode_envelope(raw: &str) -> Option<Envelope> {
    let rest = raw.strip_prefix(ENVELOPE_TAG)?.strip_prefix(DELIMITER)?;
    let (instance_id, body) = rest.split_once(DELIMITER)?;
    if instance_id.is_empty() {
        return None;
    }
    Some(Envelope {
        instance_id: instance_id.to_string(),
        message: decode_message(body),
    })
}

/// Check that an instance id can be carried in an envelope.
pub fn validate_instance_id(instance_id: &str) -> Result<()> {
    if !is_valid_name(instance_id) {
        return Err(FrameError::InvalidInstanceId(instance_id.to_string()));
    }
    Ok(())
}

/// Parse a `height`/`width` payload into a finite number of pixels.
pub fn parse_dimension(kind: &'static str, payload: &str) -> Result<f64> {
    let value: f64 = payload
        .trim()
        .parse()
        .map_err(|_| FrameError::malformed(kind, format!("not a number: {payload:?}")))?;
    if !value.is_finite() {
        return Err(FrameError::malformed(kind, format!("not finite: {payload:?}")));
    }
    Ok(value)
}

/// Check that a kind can be sent.
///
/// A `Custom` kind spelled like a reserved one is refused: it would come back
/// as the reserved variant.
pub fn validate_kind(kind: &MessageKind) -> Result<()> {
    match kind {
        MessageKind::Reserved(_) => Ok(()),
        MessageKind::Custom(name)
            if is_valid_name(name) && ReservedKind::from_name(name).is_none() =>
        {
            Ok(())
        }
        MessageKind::Custom(name) => Err(FrameError::InvalidKind(name.clone())),
    }
}

/// The first delimiter in `name + DELIMITER` must be the appended one.
fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && format!("{name}{DELIMITER}").find(DELIMITER) == Some(name.len())
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_encode_decode_height() {
        let raw = encode_message(&ReservedKind::Height.into(), "450").unwrap();
        assert_eq!(raw, "heightxPYMx450");

        let message = decode_message(&raw);
        assert_eq!(message.kind, MessageKind::Reserved(ReservedKind::Height));
        assert_eq!(message.payload, "450");
    }

    #[test]
    fn test_decode_splits_on_first_delimiter() {
        let message = decode_message("notexPYMxaxPYMxb");
        assert_eq!(message.kind, MessageKind::Custom("note".to_string()));
        assert_eq!(message.payload, "axPYMxb");
    }

    #[test]
    fn test_decode_without_delimiter_uses_default_kind() {
        let message = decode_message("just some text");
        assert_eq!(message.kind, MessageKind::Reserved(ReservedKind::Default));
        assert_eq!(message.payload, "just some text");
    }

    #[test]
    fn test_decode_empty_kind_uses_default_kind() {
        let message = decode_message("xPYMxorphan");
        assert_eq!(message.kind, MessageKind::Reserved(ReservedKind::Default));
        assert_eq!(message.payload, "xPYMxorphan");
    }

    #[test]
    fn test_encode_rejects_invalid_kinds() {
        for name in ["", "axPYMxb", "abxPYM", "height"] {
            let result = encode_message(&MessageKind::Custom(name.to_string()), "x");
            assert!(matches!(result, Err(FrameError::InvalidKind(_))), "{name:?}");
        }
    }

    #[test]
    fn test_kind_with_spaces_round_trips() {
        let kind = MessageKind::Custom("chart ready".to_string());
        let raw = encode_message(&kind, "1").unwrap();
        assert_eq!(raw, "chart readyxPYMx1");
        assert_eq!(decode_message(&raw), Message::new(kind, "1"));
    }

    #[test]
    fn test_kind_may_contain_delimiter_letters() {
        for name in ["xPYMap", "abx", "abxP", "abxPY", "PYMx"] {
            let kind = MessageKind::Custom(name.to_string());
            let raw = encode_message(&kind, "7").unwrap();
            assert_eq!(decode_message(&raw), Message::new(kind, "7"), "{name:?}");
        }
    }

    #[test]
    fn test_envelope_layout() {
        let raw = encode_envelope("graphic", &ReservedKind::Width.into(), "640").unwrap();
        assert_eq!(raw, "pymxPYMxgraphicxPYMxwidthxPYMx640");

        let envelope = decode_envelope(&raw).unwrap();
        assert_eq!(envelope.instance_id, "graphic");
        assert_eq!(envelope.message, Message::new(ReservedKind::Width, "640"));
    }

    #[test]
    fn test_envelope_ignores_foreign_traffic() {
        assert!(decode_envelope("{\"type\":\"analytics\"}").is_none());
        assert!(decode_envelope("pym").is_none());
        assert!(decode_envelope("pymxPYMxonly-id").is_none());
        assert!(decode_envelope("pymxPYMxxPYMxheightxPYMx1").is_none());
    }

    #[test]
    fn test_envelope_rejects_bad_instance_id() {
        let result = encode_envelope("", &ReservedKind::Height.into(), "1");
        assert!(matches!(result, Err(FrameError::InvalidInstanceId(_))));
        for id in ["axPYMxb", "gxPYM"] {
            let result = encode_envelope(id, &ReservedKind::Height.into(), "1");
            assert!(matches!(result, Err(FrameError::InvalidInstanceId(_))), "{id:?}");
        }
    }

    #[test]
    fn test_parse_dimension() {
        assert_eq!(parse_dimension("height", "450").unwrap(), 450.0);
        assert_eq!(parse_dimension("height", " 12.5 ").unwrap(), 12.5);
        assert_eq!(parse_dimension("height", "-5").unwrap(), -5.0);
        assert!(parse_dimension("height", "tall").is_err());
        assert!(parse_dimension("height", "NaN").is_err());
        assert!(parse_dimension("height", "inf").is_err());
    }

    /// Names built from delimiter fragments, letters and spaces.
    fn name_strategy() -> impl Strategy<Value = String> {
        proptest::collection::vec(
            prop_oneof![
                Just("x".to_string()),
                Just("xP".to_string()),
                Just("xPYM".to_string()),
                Just("PYMx".to_string()),
                "[a-zA-Z0-9 _.:-]{1,6}",
            ],
            1..6,
        )
        .prop_map(|parts| parts.concat())
    }

    fn kind_strategy() -> impl Strategy<Value = MessageKind> {
        prop_oneof![
            proptest::sample::select(ReservedKind::ALL.to_vec()).prop_map(MessageKind::Reserved),
            name_strategy().prop_map(|name| MessageKind::parse(&name)),
        ]
    }

    proptest! {
        #[test]
        fn decode_inverts_encode(kind in kind_strategy(), payload in any::<String>()) {
            // Names that overlap the delimiter must be refused, never mis-split.
            if let Ok(raw) = encode_message(&kind, &payload) {
                let message = decode_message(&raw);
                prop_assert_eq!(message.kind, kind);
                prop_assert_eq!(message.payload, payload);
            }
        }

        #[test]
        fn accepted_names_end_clear_of_the_delimiter(name in name_strategy()) {
            let accepted = validate_instance_id(&name).is_ok();
            let clear = !name.ends_with("xPYM") && !name.contains(DELIMITER);
            prop_assert_eq!(accepted, clear);
        }

        #[test]
        fn envelope_preserves_instance_id(
            id in name_strategy(),
            kind in kind_strategy(),
            payload in any::<String>(),
        ) {
            prop_assume!(validate_instance_id(&id).is_ok());
            let Ok(raw) = encode_envelope(&id, &kind, &payload) else {
                return Ok(());
            };
            let envelope = decode_envelope(&raw).unwrap();
            prop_assert_eq!(envelope.instance_id, id);
            prop_assert_eq!(envelope.message.kind, kind);
            prop_assert_eq!(envelope.message.payload, payload);
        }
    }
}
