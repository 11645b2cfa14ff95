use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use pymrs_transport::OriginPolicy;
use serde::{Deserialize, Serialize};

use crate::query::DEFAULT_PARENT_URL_PARAM;

/// Default minimum interval between scroll-triggered position reports.
pub const DEFAULT_SCROLL_WAIT: Duration = Duration::from_millis(100);

/// Invoked with the new iframe width whenever the Parent reports one.
pub type RenderCallback = Box<dyn Fn(f64)>;

/// Configuration for a [`Child`](crate::Child).
#[derive(Default)]
pub struct ChildConfig {
    /// Re-render hook run before the height is re-sent on a width change.
    pub render_callback: Option<RenderCallback>,
    /// Origins accepted for inbound messages. Unset means any origin.
    pub xdomain: Option<String>,
    /// Send the height on this interval instead of on resize/mutation events.
    pub polling: Option<Duration>,
    /// Instance id used when the iframe URL carries no `childId`
    /// (e.g. after the child navigated to another page).
    pub id: Option<String>,
    /// Query parameter carrying the parent URL. Default: `parentUrl`.
    pub parent_url_param: Option<String>,
}

impl ChildConfig {
    pub fn with_render_callback(mut self, callback: impl Fn(f64) + 'static) -> Self {
        self.render_callback = Some(Box::new(callback));
        self
    }

    pub fn with_xdomain(mut self, xdomain: impl Into<String>) -> Self {
        self.xdomain = Some(xdomain.into());
        self
    }

    pub fn with_polling(mut self, period: Duration) -> Self {
        self.polling = Some(period);
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_parent_url_param(mut self, param: impl Into<String>) -> Self {
        self.parent_url_param = Some(param.into());
        self
    }
}

impl fmt::Debug for ChildConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChildConfig")
            .field(
                "render_callback",
                &self.render_callback.as_ref().map(|_| "<fn>"),
            )
            .field("xdomain", &self.xdomain)
            .field("polling", &self.polling)
            .field("id", &self.id)
            .field("parent_url_param", &self.parent_url_param)
            .finish()
    }
}

/// Configuration for a [`Parent`](crate::Parent).
///
/// Field names serialize as the pym option names (`parenturlparam`, ...).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParentConfig {
    /// Origins accepted for inbound messages. Unset means any origin.
    pub xdomain: Option<String>,
    pub title: Option<String>,
    pub name: Option<String>,
    /// `id` attribute of the iframe element.
    pub id: Option<String>,
    #[serde(rename = "allowfullscreen")]
    pub allow_fullscreen: bool,
    pub sandbox: Option<String>,
    /// Query parameter the parent URL is passed under. Default: `parentUrl`.
    #[serde(rename = "parenturlparam")]
    pub parent_url_param: Option<String>,
    /// Value passed under `parent_url_param`. Default: the page location.
    #[serde(rename = "parenturlvalue")]
    pub parent_url_value: Option<String>,
    /// Extra query string appended to the iframe src (`&a=1&b=2`).
    #[serde(rename = "optionalparams")]
    pub optional_params: Option<String>,
    /// Report viewport and iframe position to the child on scroll.
    #[serde(rename = "trackscroll")]
    pub track_scroll: bool,
    /// Minimum milliseconds between scroll reports. Default: 100.
    #[serde(rename = "scrollwait")]
    pub scroll_wait_ms: Option<u64>,
}

impl ParentConfig {
    /// Build a config from `data-pym-*` attributes of a container element.
    pub fn from_data_attributes(attributes: &BTreeMap<String, String>) -> Self {
        let text = |name: &str| attributes.get(&format!("data-pym-{name}")).cloned();
        let flag = |name: &str| {
            attributes
                .get(&format!("data-pym-{name}"))
                .is_some_and(|value| value != "false")
        };

        Self {
            xdomain: text("xdomain"),
            title: text("title"),
            name: text("name"),
            id: text("id"),
            allow_fullscreen: flag("allowfullscreen"),
            sandbox: text("sandbox"),
            parent_url_param: text("parenturlparam"),
            parent_url_value: text("parenturlvalue"),
            optional_params: text("optionalparams"),
            track_scroll: flag("trackscroll"),
            scroll_wait_ms: text("scrollwait").and_then(|value| value.trim().parse().ok()),
        }
    }

    pub(crate) fn origin_policy(&self) -> OriginPolicy {
        self.xdomain
            .as_deref()
            .map(OriginPolicy::parse)
            .unwrap_or_default()
    }

    pub(crate) fn parent_url_param(&self) -> &str {
        self.parent_url_param
            .as_deref()
            .filter(|param| !param.is_empty())
            .unwrap_or(DEFAULT_PARENT_URL_PARAM)
    }

    pub(crate) fn scroll_wait(&self) -> Duration {
        self.scroll_wait_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_SCROLL_WAIT)
    }
}
