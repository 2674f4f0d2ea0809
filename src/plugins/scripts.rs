//! In-page extraction scripts
//!
//! Each metric plugin evaluates one of these against the loaded page and
//! decodes the structured return value. The scripts are plain IIFEs so they
//! leave no globals behind.

/// Extracts the SEO-relevant head/document signals
pub const SEO_SCRIPT: &str = r#"
    (() => {
        const meta = {};
        document.querySelectorAll('meta').forEach(tag => {
            const name = tag.getAttribute('name') || tag.getAttribute('property');
            if (name) {
                meta[name.toLowerCase()] = tag.getAttribute('content');
            }
        });

        return {
            title: document.title || null,
            meta_description: meta['description'] || null,
            meta_keywords: meta['keywords'] || null,
            canonical_url: document.querySelector('link[rel="canonical"]')?.href || null,
            robots_directives: meta['robots'] || null,
            h1_count: document.querySelectorAll('h1').length,
            h2_count: document.querySelectorAll('h2').length,
            open_graph_tags: Object.keys(meta).filter(k => k.startsWith('og:')).length,
            structured_data_blocks:
                document.querySelectorAll('script[type="application/ld+json"]').length,
            language: document.documentElement.lang || null
        };
    })()
"#;

/// Extracts anchor statistics for the links plugin
pub const LINKS_SCRIPT: &str = r#"
    (() => {
        const host = window.location.host;
        let internal = 0, external = 0, nofollow = 0, emptyAnchor = 0;
        const externalDomains = new Set();

        document.querySelectorAll('a[href]').forEach(a => {
            let url;
            try { url = new URL(a.href, window.location.href); } catch { return; }
            if (url.protocol !== 'http:' && url.protocol !== 'https:') return;

            if (url.host === host) {
                internal += 1;
            } else {
                external += 1;
                externalDomains.add(url.host);
            }
            if ((a.rel || '').split(/\s+/).includes('nofollow')) nofollow += 1;
            if (!a.textContent.trim() && !a.querySelector('img[alt]')) emptyAnchor += 1;
        });

        return {
            internal_links: internal,
            external_links: external,
            nofollow_links: nofollow,
            empty_anchor_links: emptyAnchor,
            external_domains: Array.from(externalDomains).sort()
        };
    })()
"#;

/// Collects the absolute outbound hrefs used to grow the crawl frontier
pub const DISCOVER_LINKS_SCRIPT: &str = r#"
    (() => {
        const seen = new Set();
        document.querySelectorAll('a[href]').forEach(a => {
            let url;
            try { url = new URL(a.href, window.location.href); } catch { return; }
            if (url.protocol === 'http:' || url.protocol === 'https:') {
                seen.add(url.href);
            }
        });
        return Array.from(seen);
    })()
"#;

/// Reads the navigation-timing and resource facts for the performance plugin
pub const PERFORMANCE_SCRIPT: &str = r"
    (() => {
        const nav = performance.getEntriesByType('navigation')[0] || {};
        const paint = performance.getEntriesByType('paint')
            .find(e => e.name === 'first-contentful-paint');
        const resources = performance.getEntriesByType('resource');

        return {
            ttfb_ms: nav.responseStart || 0,
            dom_content_loaded_ms: nav.domContentLoadedEventEnd || 0,
            load_event_ms: nav.loadEventEnd || 0,
            first_contentful_paint_ms: paint ? paint.startTime : 0,
            resource_count: resources.length,
            transfer_size_bytes: resources.reduce(
                (sum, r) => sum + (r.transferSize || 0), nav.transferSize || 0)
        };
    })()
";

/// Page-context security signals (transport, mixed content, CSP, link hygiene)
pub const SECURITY_SCRIPT: &str = r#"
    (() => {
        const isHttps = window.location.protocol === 'https:';
        const mixedContent = isHttps
            ? performance.getEntriesByType('resource')
                .filter(r => r.name.startsWith('http://')).length
            : 0;

        let insecureForms = 0;
        document.querySelectorAll('form[action]').forEach(f => {
            try {
                if (new URL(f.action, window.location.href).protocol === 'http:') {
                    insecureForms += 1;
                }
            } catch {}
        });

        let unsafeCrossOrigin = 0;
        document.querySelectorAll('a[target="_blank"]').forEach(a => {
            const rel = (a.rel || '').split(/\s+/);
            if (!rel.includes('noopener') && !rel.includes('noreferrer')) {
                unsafeCrossOrigin += 1;
            }
        });

        return {
            is_https: isHttps,
            mixed_content_count: mixedContent,
            has_csp_meta:
                !!document.querySelector('meta[http-equiv="Content-Security-Policy"]'),
            insecure_form_actions: insecureForms,
            unsafe_cross_origin_links: unsafeCrossOrigin
        };
    })()
"#;

/// Mobile-friendliness signals
pub const MOBILE_SCRIPT: &str = r#"
    (() => {
        const viewportMeta = document.querySelector('meta[name="viewport"]');
        const viewportWidth = window.innerWidth;

        let smallFonts = 0;
        document.querySelectorAll('p, span, li, a, td').forEach(el => {
            if (!el.textContent.trim()) return;
            const size = parseFloat(getComputedStyle(el).fontSize);
            if (size && size < 12) smallFonts += 1;
        });

        let oversizeImages = 0;
        document.querySelectorAll('img').forEach(img => {
            if (img.naturalWidth > viewportWidth * 1.5) oversizeImages += 1;
        });

        return {
            has_viewport_meta: !!viewportMeta,
            viewport_content: viewportMeta ? viewportMeta.getAttribute('content') : null,
            small_font_elements: smallFonts,
            oversize_images: oversizeImages,
            uses_responsive_images: !!document.querySelector('img[srcset], picture source')
        };
    })()
"#;

/// Body-text and media facts for the content-quality plugin
pub const CONTENT_SCRIPT: &str = r"
    (() => {
        const bodyText = document.body ? document.body.innerText : '';
        const words = bodyText.split(/\s+/).filter(w => w.length > 0);
        const images = document.querySelectorAll('img');
        const missingAlt = Array.from(images).filter(img => !img.alt).length;
        const htmlLength = document.documentElement.outerHTML.length;

        return {
            word_count: words.length,
            paragraph_count: document.querySelectorAll('p').length,
            heading_count: document.querySelectorAll('h1, h2, h3, h4, h5, h6').length,
            image_count: images.length,
            images_missing_alt: missingAlt,
            text_ratio: htmlLength > 0 ? bodyText.length / htmlLength : 0
        };
    })()
";

/// Detects analytics/tag-manager instrumentation on the page
pub const ANALYTICS_SCRIPT: &str = r#"
    (() => {
        const trackerIds = new Set();
        document.querySelectorAll('script[src]').forEach(s => {
            const m = s.src.match(/[?&]id=(G-[A-Z0-9]+|UA-[0-9-]+|GTM-[A-Z0-9]+)/);
            if (m) trackerIds.add(m[1]);
        });

        return {
            has_google_analytics:
                typeof window.gtag === 'function' || typeof window.ga === 'function',
            has_tag_manager: Array.isArray(window.dataLayer),
            tracker_ids: Array.from(trackerIds).sort()
        };
    })()
"#;

/// Detects the Search Console site-verification meta tag
pub const SEARCH_CONSOLE_SCRIPT: &str = r#"
    (() => {
        const tag = document.querySelector('meta[name="google-site-verification"]');
        return { has_verification_meta: !!tag };
    })()
"#;
