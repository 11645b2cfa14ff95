//! The iframe URL query contract.
//!
//! The Parent appends `initialWidth`, `childId`, `parentTitle` and the parent
//! URL to the iframe `src`; the Child reads them back from its own location.

use url::Url;

use crate::error::ConfigurationError;

pub const CHILD_ID_PARAM: &str = "childId";
pub const INITIAL_WIDTH_PARAM: &str = "initialWidth";
pub const PARENT_TITLE_PARAM: &str = "parentTitle";
/// Default query parameter carrying the parent URL.
pub const DEFAULT_PARENT_URL_PARAM: &str = "parentUrl";

/// Inputs for an iframe `src`.
#[derive(Debug, Clone, PartialEq)]
pub struct IframeSrc<'a> {
    /// Child page URL, absolute or relative to the parent location.
    pub url: &'a str,
    pub child_id: &'a str,
    pub initial_width: f64,
    pub parent_title: &'a str,
    pub parent_url_param: &'a str,
    pub parent_url_value: &'a str,
    /// Extra `&`-separated query string, appended last.
    pub optional_params: Option<&'a str>,
}

/// Build the iframe `src` for `params`, resolving relative URLs against
/// `parent_location`. Any fragment of the child URL is kept at the end.
pub fn build_iframe_src(
    parent_location: &str,
    params: &IframeSrc<'_>,
) -> Result<String, ConfigurationError> {
    let mut url = resolve(parent_location, params.url)?;

    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair(INITIAL_WIDTH_PARAM, &params.initial_width.to_string())
            .append_pair(CHILD_ID_PARAM, params.child_id)
            .append_pair(PARENT_TITLE_PARAM, params.parent_title)
            .append_pair(params.parent_url_param, params.parent_url_value);

        if let Some(extra) = params.optional_params {
            let extra = extra.trim_start_matches(['&', '?']);
            for (key, value) in url::form_urlencoded::parse(extra.as_bytes()) {
                query.append_pair(&key, &value);
            }
        }
    }

    Ok(url.into())
}

fn resolve(parent_location: &str, raw: &str) -> Result<Url, ConfigurationError> {
    let invalid = |err: url::ParseError| ConfigurationError::InvalidUrl {
        url: raw.to_string(),
        reason: err.to_string(),
    };

    match Url::parse(raw) {
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(parent_location)
            .and_then(|base| base.join(raw))
            .map_err(invalid),
        Err(err) => Err(invalid(err)),
    }
}

/// Parameters the Child finds in its own location.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChildQuery {
    pub child_id: Option<String>,
    pub initial_width: Option<f64>,
    pub parent_title: Option<String>,
    pub parent_url: Option<String>,
}

impl ChildQuery {
    /// Read the query of `location`, taking the parent URL from `parent_url_param`.
    pub fn parse(location: &str, parent_url_param: &str) -> Result<Self, ConfigurationError> {
        let url = Url::parse(location).map_err(|err| ConfigurationError::InvalidUrl {
            url: location.to_string(),
            reason: err.to_string(),
        })?;

        let mut query = ChildQuery::default();
        for (key, value) in url.query_pairs() {
            let value = value.into_owned();
            if key == CHILD_ID_PARAM {
                query.child_id = Some(value).filter(|v| !v.is_empty());
            } else if key == INITIAL_WIDTH_PARAM {
                query.initial_width = value.parse().ok().filter(|w: &f64| w.is_finite());
            } else if key == PARENT_TITLE_PARAM {
                query.parent_title = Some(value);
            } else if key == parent_url_param {
                query.parent_url = Some(value).filter(|v| !v.is_empty());
            }
        }
        Ok(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn src<'a>(url: &'a str) -> IframeSrc<'a> {
        IframeSrc {
            url,
            child_id: "graphic",
            initial_width: 600.0,
            parent_title: "Budget & Taxes",
            parent_url_param: DEFAULT_PARENT_URL_PARAM,
            parent_url_value: "https://news.example/story?id=7",
            optional_params: None,
        }
    }

    #[test]
    fn appends_contract_parameters() {
        let params = src("https://embed.example/chart.html");
        let built = build_iframe_src("https://news.example/story", &params).unwrap();
        assert_eq!(
            built,
            "https://embed.example/chart.html?initialWidth=600&childId=graphic\
             &parentTitle=Budget+%26+Taxes&parentUrl=https%3A%2F%2Fnews.example%2Fstory%3Fid%3D7"
        );
    }

    #[test]
    fn keeps_existing_query_and_fragment() {
        let mut params = src("https://embed.example/chart.html?theme=dark#top");
        params.optional_params = Some("&lang=en&mode=lite");
        let built = build_iframe_src("https://news.example/", &params).unwrap();

        assert!(built.starts_with("https://embed.example/chart.html?theme=dark&initialWidth=600"));
        assert!(built.ends_with("&lang=en&mode=lite#top"));
    }

    #[test]
    fn resolves_relative_urls_against_the_parent() {
        let params = src("embeds/chart.html");
        let built = build_iframe_src("https://news.example/2024/story.html", &params).unwrap();
        assert!(built.starts_with("https://news.example/2024/embeds/chart.html?"));
    }

    #[test]
    fn rejects_unusable_urls() {
        let err = build_iframe_src("not a url", &src("chart.html")).unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidUrl { .. }));
    }

    #[test]
    fn child_reads_back_what_the_parent_wrote() {
        let mut params = src("https://embed.example/chart.html");
        params.parent_url_param = "host";
        let built = build_iframe_src("https://news.example/", &params).unwrap();

        let query = ChildQuery::parse(&built, "host").unwrap();
        assert_eq!(query.child_id.as_deref(), Some("graphic"));
        assert_eq!(query.initial_width, Some(600.0));
        assert_eq!(query.parent_title.as_deref(), Some("Budget & Taxes"));
        assert_eq!(query.parent_url.as_deref(), Some("https://news.example/story?id=7"));
    }

    #[test]
    fn child_query_tolerates_missing_parameters() {
        let location = "https://embed.example/chart.html?initialWidth=wide";
        let query = ChildQuery::parse(location, DEFAULT_PARENT_URL_PARAM).unwrap();
        assert_eq!(query, ChildQuery::default());
    }
}
