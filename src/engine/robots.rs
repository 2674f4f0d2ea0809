//! robots.txt fetching, parsing, and per-origin caching
//!
//! Rules are best-effort: an unreachable or malformed robots.txt degrades to
//! allow-all rather than blocking the crawl. Only the wildcard user-agent
//! group is honored.

use dashmap::DashMap;
use log::{debug, warn};
use std::sync::Arc;
use url::Url;

/// Parsed rules from one origin's robots.txt
#[derive(Debug, Default)]
pub struct RobotsRules {
    /// (path prefix, allowed) pairs from the `*` group
    rules: Vec<(String, bool)>,
}

impl RobotsRules {
    /// Rules that permit every path
    #[must_use]
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Parse the wildcard group out of a robots.txt body
    ///
    /// Unknown directives and other user-agent groups are ignored; an empty
    /// or unparseable body yields allow-all.
    #[must_use]
    pub fn parse(body: &str) -> Self {
        let mut rules = Vec::new();
        let mut in_wildcard_group = false;
        let mut saw_user_agent = false;

        for line in body.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let Some((field, value)) = line.split_once(':') else {
                continue;
            };
            let field = field.trim().to_ascii_lowercase();
            let value = value.trim();

            match field.as_str() {
                "user-agent" => {
                    // A run of user-agent lines opens a new group.
                    if saw_user_agent {
                        in_wildcard_group = in_wildcard_group || value == "*";
                    } else {
                        in_wildcard_group = value == "*";
                    }
                    saw_user_agent = true;
                }
                "disallow" if in_wildcard_group => {
                    saw_user_agent = false;
                    if !value.is_empty() {
                        rules.push((value.to_string(), false));
                    }
                }
                "allow" if in_wildcard_group => {
                    saw_user_agent = false;
                    if !value.is_empty() {
                        rules.push((value.to_string(), true));
                    }
                }
                _ => saw_user_agent = false,
            }
        }

        Self { rules }
    }

    /// Whether the rules permit fetching the given path
    ///
    /// Longest matching prefix wins; no match means allowed.
    #[must_use]
    pub fn allows(&self, path: &str) -> bool {
        self.rules
            .iter()
            .filter(|(prefix, _)| path.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .is_none_or(|(_, allowed)| *allowed)
    }
}

/// Per-origin robots rules cache
pub struct RobotsCache {
    client: reqwest::Client,
    origins: DashMap<String, Arc<RobotsRules>>,
}

impl RobotsCache {
    #[must_use]
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            origins: DashMap::new(),
        }
    }

    /// Rules for the URL's origin, fetching and caching on first use
    pub async fn rules_for(&self, url: &Url) -> Arc<RobotsRules> {
        let origin = url.origin().ascii_serialization();
        if let Some(rules) = self.origins.get(&origin) {
            return Arc::clone(&rules);
        }

        let rules = Arc::new(self.fetch(&origin).await);
        // Concurrent fetches for one origin may race; last writer wins and
        // both results came from the same document.
        self.origins.insert(origin, Arc::clone(&rules));
        rules
    }

    async fn fetch(&self, origin: &str) -> RobotsRules {
        let robots_url = format!("{origin}/robots.txt");
        match self.client.get(&robots_url).send().await {
            Ok(response) if response.status().is_success() => match response.text().await {
                Ok(body) => {
                    debug!("loaded robots rules from {robots_url}");
                    RobotsRules::parse(&body)
                }
                Err(err) => {
                    warn!("failed to read {robots_url}: {err}, allowing all");
                    RobotsRules::allow_all()
                }
            },
            Ok(response) => {
                debug!(
                    "{robots_url} returned {}, allowing all",
                    response.status()
                );
                RobotsRules::allow_all()
            }
            Err(err) => {
                warn!("failed to fetch {robots_url}: {err}, allowing all");
                RobotsRules::allow_all()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_body_allows_everything() {
        let rules = RobotsRules::parse("");
        assert!(rules.allows("/"));
        assert!(rules.allows("/anything"));
    }

    #[test]
    fn wildcard_disallow_blocks_prefix() {
        let rules = RobotsRules::parse("User-agent: *\nDisallow: /private/\n");
        assert!(!rules.allows("/private/page"));
        assert!(rules.allows("/public/page"));
    }

    #[test]
    fn longest_prefix_wins() {
        let rules = RobotsRules::parse(
            "User-agent: *\nDisallow: /docs/\nAllow: /docs/public/\n",
        );
        assert!(!rules.allows("/docs/internal"));
        assert!(rules.allows("/docs/public/guide"));
    }

    #[test]
    fn other_agent_groups_are_ignored() {
        let rules = RobotsRules::parse(
            "User-agent: special-bot\nDisallow: /\n\nUser-agent: *\nDisallow: /admin/\n",
        );
        assert!(rules.allows("/home"));
        assert!(!rules.allows("/admin/panel"));
    }

    #[test]
    fn comments_are_stripped() {
        let rules = RobotsRules::parse(
            "# site policy\nUser-agent: * # everyone\nDisallow: /tmp/ # scratch\n",
        );
        assert!(!rules.allows("/tmp/file"));
    }
}
