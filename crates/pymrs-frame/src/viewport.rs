use std::fmt;

use crate::error::{FrameError, Result};
use crate::kind::VIEWPORT_IFRAME_POSITION;

/// Viewport size plus the iframe's bounding rect, as sent to the Child.
///
/// Wire form is six space-separated numbers:
/// `viewport_width viewport_height top left bottom right`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ViewportPosition {
    pub viewport_width: f64,
    pub viewport_height: f64,
    pub top: f64,
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
}

impl ViewportPosition {
    pub fn encode(&self) -> String {
        self.to_string()
    }

    pub fn parse(payload: &str) -> Result<Self> {
        let values = payload
            .split_whitespace()
            .map(|part| {
                part.parse::<f64>()
                    .ok()
                    .filter(|value| value.is_finite())
                    .ok_or_else(|| {
                        FrameError::malformed(
                            VIEWPORT_IFRAME_POSITION,
                            format!("bad number {part:?}"),
                        )
                    })
            })
            .collect::<Result<Vec<f64>>>()?;

        let [viewport_width, viewport_height, top, left, bottom, right] = values[..] else {
            return Err(FrameError::malformed(
                VIEWPORT_IFRAME_POSITION,
                format!("expected 6 numbers, got {}", values.len()),
            ));
        };

        Ok(Self {
            viewport_width,
            viewport_height,
            top,
            left,
            bottom,
            right,
        })
    }

    /// True when any part of the iframe intersects the viewport.
    pub fn is_iframe_visible(&self) -> bool {
        self.bottom > 0.0
            && self.top < self.viewport_height
            && self.right > 0.0
            && self.left < self.viewport_width
    }
}

impl fmt::Display for ViewportPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {}",
            self.viewport_width, self.viewport_height, self.top, self.left, self.bottom, self.right
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_space_joined() {
        let position = ViewportPosition {
            viewport_width: 1280.0,
            viewport_height: 720.0,
            top: 150.0,
            left: 0.0,
            bottom: 600.5,
            right: 640.0,
        };
        assert_eq!(position.encode(), "1280 720 150 0 600.5 640");
        assert_eq!(ViewportPosition::parse(&position.encode()).unwrap(), position);
    }

    #[test]
    fn rejects_wrong_arity_and_garbage() {
        assert!(ViewportPosition::parse("1 2 3 4 5").is_err());
        assert!(ViewportPosition::parse("1 2 3 4 5 6 7").is_err());
        assert!(ViewportPosition::parse("1 2 3 4 five 6").is_err());
        assert!(ViewportPosition::parse("").is_err());
    }

    #[test]
    fn visibility() {
        let mut position = ViewportPosition {
            viewport_width: 800.0,
            viewport_height: 600.0,
            top: 100.0,
            left: 0.0,
            bottom: 400.0,
            right: 800.0,
        };
        assert!(position.is_iframe_visible());

        position.top = 700.0;
        position.bottom = 1000.0;
        assert!(!position.is_iframe_visible());
    }
}
