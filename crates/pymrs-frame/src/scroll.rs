//! `scrollTo` payload encoding.
//!
//! The first space-separated token tags the variant:
//!
//! ```text
//! hash <anchor>             scroll the hosting page to one of its own anchors
//! element <offset> <id>     scroll to a child element, offset already resolved by the child
//! position <offset>         scroll to a child-relative vertical offset
//! ```

use std::fmt;

use crate::error::{FrameError, Result};
use crate::kind::SCROLL_TO;

const TAG_HASH: &str = "hash";
const TAG_ELEMENT: &str = "element";
const TAG_POSITION: &str = "position";

/// Where the Child wants the hosting page scrolled.
#[derive(Debug, Clone, PartialEq)]
pub enum ScrollTarget {
    /// An anchor in the hosting page, without the leading `#`.
    Hash(String),
    /// An element inside the iframe, with its offset from the top of the child document.
    ChildElement { id: String, offset: f64 },
    /// A vertical offset from the top of the child document.
    ChildPosition(f64),
}

impl ScrollTarget {
    pub fn encode(&self) -> String {
        self.to_string()
    }

    pub fn parse(payload: &str) -> Result<Self> {
        let (tag, rest) = payload.split_once(' ').unwrap_or((payload, ""));
        match tag {
            TAG_HASH => {
                let hash = rest.trim_start_matches('#');
                if hash.is_empty() {
                    return Err(FrameError::malformed(SCROLL_TO, "empty hash"));
                }
                Ok(ScrollTarget::Hash(hash.to_string()))
            }
            TAG_ELEMENT => {
                let (offset, id) = rest
                    .split_once(' ')
                    .ok_or_else(|| FrameError::malformed(SCROLL_TO, "element without id"))?;
                if id.is_empty() {
                    return Err(FrameError::malformed(SCROLL_TO, "element without id"));
                }
                Ok(ScrollTarget::ChildElement {
                    id: id.to_string(),
                    offset: parse_offset(offset)?,
                })
            }
            TAG_POSITION => Ok(ScrollTarget::ChildPosition(parse_offset(rest)?)),
            other => Err(FrameError::malformed(
                SCROLL_TO,
                format!("unknown target tag {other:?}"),
            )),
        }
    }

    /// Child-relative vertical offset, if this target lives inside the iframe.
    pub fn child_offset(&self) -> Option<f64> {
        match self {
            ScrollTarget::Hash(_) => None,
            ScrollTarget::ChildElement { offset, .. } => Some(*offset),
            ScrollTarget::ChildPosition(offset) => Some(*offset),
        }
    }
}

impl fmt::Display for ScrollTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScrollTarget::Hash(hash) => write!(f, "{TAG_HASH} {hash}"),
            ScrollTarget::ChildElement { id, offset } => write!(f, "{TAG_ELEMENT} {offset} {id}"),
            ScrollTarget::ChildPosition(offset) => write!(f, "{TAG_POSITION} {offset}"),
        }
    }
}

fn parse_offset(raw: &str) -> Result<f64> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| FrameError::malformed(SCROLL_TO, format!("bad offset {raw:?}")))?;
    if !value.is_finite() {
        return Err(FrameError::malformed(SCROLL_TO, format!("bad offset {raw:?}")));
    }
    Ok(value)
}
