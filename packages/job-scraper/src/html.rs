//! HTML helpers: anchor extraction and visible text.

use std::collections::HashSet;

use scraper::{Html, Selector};

const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "head"];

/// Every `href` of every `<a>` element, trimmed, in document order.
pub fn extract_hrefs(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let selector = match Selector::parse("a[href]") {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };

    document
        .select(&selector)
        .filter_map(|el| el.value().attr("href"))
        .map(|href| href.trim().to_string())
        .collect()
}

/// Drop anchors that can never lead to a posting (fragments, `javascript:`,
/// `mailto:`, `tel:`, empty) and repeated hrefs. Order is kept.
pub fn navigable_hrefs(hrefs: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    hrefs
        .iter()
        .filter(|href| !is_noise(href))
        .filter(|href| seen.insert(href.as_str()))
        .cloned()
        .collect()
}

fn is_noise(href: &str) -> bool {
    let lower = href.to_ascii_lowercase();
    lower.is_empty()
        || lower.starts_with('#')
        || ["javascript:", "mailto:", "tel:", "data:"]
            .iter()
            .any(|scheme| lower.starts_with(scheme))
}

/// Text a reader would see, whitespace-collapsed. Script, style and similar
/// elements are skipped.
pub fn visible_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let root = Selector::parse("body")
        .ok()
        .and_then(|body| document.select(&body).next())
        .unwrap_or_else(|| document.root_element());

    let mut out = String::new();
    for node in root.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| HIDDEN_ELEMENTS.contains(&el.name()))
        });
        if hidden {
            continue;
        }
        for word in text.split_whitespace() {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(word);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r##"
        <html><head><title>Careers</title></head><body>
          <nav><a href="/">Home</a><a href="#main">Skip</a></nav>
          <a href=" /jobs/1 ">Engineer</a>
          <a href="../jobs/2">Designer</a>
          <a href="/jobs/1">Engineer again</a>
          <a href="mailto:jobs@acme.test">Email us</a>
          <a href="javascript:void(0)">Menu</a>
          <a>no href</a>
        </body></html>
    "##;

    #[test]
    fn test_extract_hrefs_in_order() {
        assert_eq!(
            extract_hrefs(LISTING),
            vec![
                "/",
                "#main",
                "/jobs/1",
                "../jobs/2",
                "/jobs/1",
                "mailto:jobs@acme.test",
                "javascript:void(0)"
            ]
        );
    }

    #[test]
    fn test_navigable_hrefs_filters_noise() {
        let hrefs = extract_hrefs(LISTING);
        assert_eq!(navigable_hrefs(&hrefs), vec!["/", "/jobs/1", "../jobs/2"]);
    }

    #[test]
    fn test_visible_text_skips_scripts() {
        let html = r#"
            <html><head><style>body { color: red }</style></head>
            <body>
              <h1>Senior   Engineer</h1>
              <script>var tracking = true;</script>
              <p>Acme Corp,
                 Remote</p>
            </body></html>
        "#;

        assert_eq!(visible_text(html), "Senior Engineer Acme Corp, Remote");
    }

    #[test]
    fn test_visible_text_of_fragment() {
        assert_eq!(visible_text("plain <b>text</b>"), "plain text");
        assert_eq!(visible_text(""), "");
    }
}
