//! Sitemap discovery
//!
//! Best-effort `<loc>` extraction from XML sitemaps. A missing or
//! malformed sitemap yields an empty URL list; the crawl proceeds from the
//! seed alone.

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

static LOC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<loc>\s*([^<]+?)\s*</loc>").expect("static pattern compiles")
});

/// The sitemap location for a crawl: the configured override or the
/// conventional `/sitemap.xml` at the seed's origin
#[must_use]
pub fn sitemap_url_for(seed: &Url, configured: Option<&str>) -> String {
    match configured {
        Some(explicit) => explicit.to_string(),
        None => format!("{}/sitemap.xml", seed.origin().ascii_serialization()),
    }
}

/// Extract the URL entries from a sitemap body
#[must_use]
pub fn parse_sitemap(body: &str) -> Vec<String> {
    LOC_RE
        .captures_iter(body)
        .map(|cap| cap[1].to_string())
        .collect()
}

/// Fetch and parse a sitemap, degrading to an empty list on any failure
pub async fn fetch_sitemap(client: &reqwest::Client, sitemap_url: &str) -> Vec<String> {
    match client.get(sitemap_url).send().await {
        Ok(response) if response.status().is_success() => match response.text().await {
            Ok(body) => {
                let urls = parse_sitemap(&body);
                debug!("sitemap {sitemap_url} listed {} urls", urls.len());
                urls
            }
            Err(err) => {
                warn!("failed to read sitemap {sitemap_url}: {err}");
                Vec::new()
            }
        },
        Ok(response) => {
            warn!("sitemap {sitemap_url} returned {}", response.status());
            Vec::new()
        }
        Err(err) => {
            warn!("failed to fetch sitemap {sitemap_url}: {err}");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_loc_entries() {
        let body = r"<?xml version='1.0'?>
            <urlset>
              <url><loc>https://example.com/</loc></url>
              <url><loc> https://example.com/about </loc></url>
            </urlset>";
        assert_eq!(
            parse_sitemap(body),
            vec![
                "https://example.com/".to_string(),
                "https://example.com/about".to_string()
            ]
        );
    }

    #[test]
    fn malformed_body_yields_nothing() {
        assert!(parse_sitemap("not a sitemap at all").is_empty());
    }

    #[test]
    fn default_location_is_origin_sitemap_xml() {
        let seed = Url::parse("https://example.com/deep/page").expect("url");
        assert_eq!(
            sitemap_url_for(&seed, None),
            "https://example.com/sitemap.xml"
        );
        assert_eq!(
            sitemap_url_for(&seed, Some("https://example.com/custom.xml")),
            "https://example.com/custom.xml"
        );
    }
}
