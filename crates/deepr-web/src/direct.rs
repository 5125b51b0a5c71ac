//! Direct page fetch with local HTML-to-text extraction, for setups without
//! a reader endpoint.

use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use deepr_core::{Error, PageFetcher};

use crate::transport_error;

const CONTENT_SELECTORS: &str = "main, article, [role=main], .content, #content, .post, .entry";
const SKIPPED_TAGS: &[&str] = &[
    "script", "style", "nav", "footer", "header", "aside", "noscript", "svg", "form",
];

pub struct DirectFetcher {
    client: Client,
}

impl DirectFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageFetcher for DirectFetcher {
    fn name(&self) -> &str {
        "direct"
    }

    async fn fetch_text(&self, url: &str) -> Result<String, Error> {
        let parsed = Url::parse(url)
            .map_err(|e| Error::invalid_request(format!("invalid url '{}': {}", url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::invalid_request(format!(
                "unsupported scheme '{}' in {}",
                parsed.scheme(),
                url
            )));
        }

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::api(status.as_u16(), format!("HTTP error fetching {}", url)));
        }

        let is_html = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.contains("html"))
            .unwrap_or(true);

        let body = response.text().await.map_err(transport_error)?;
        if is_html {
            Ok(html_to_text(&body))
        } else {
            Ok(collapse_whitespace(&body))
        }
    }
}

/// Readable text of an HTML document: the main-content regions when the page
/// marks any, otherwise the whole body.
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);

    let mut blocks: Vec<String> = Vec::new();
    if let Ok(selector) = Selector::parse(CONTENT_SELECTORS) {
        blocks = document.select(&selector).map(element_text).collect();
    }
    if blocks.iter().all(|b| b.is_empty()) {
        blocks = match Selector::parse("body") {
            Ok(body) => document.select(&body).map(element_text).collect(),
            Err(_) => vec![element_text(document.root_element())],
        };
    }

    collapse_whitespace(&blocks.join("\n\n"))
}

fn element_text(element: ElementRef<'_>) -> String {
    let mut text = String::new();
    collect_text(element, &mut text);
    text
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(child_el) = ElementRef::wrap(child) {
            if SKIPPED_TAGS.contains(&child_el.value().name()) {
                continue;
            }
            let is_block = matches!(
                child_el.value().name(),
                "p" | "div" | "section" | "li" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "br" | "tr" | "pre"
            );
            if is_block && !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            collect_text(child_el, out);
        } else if let Some(t) = child.value().as_text() {
            let trimmed = t.trim();
            if !trimmed.is_empty() {
                if !out.is_empty() && !out.ends_with(' ') && !out.ends_with('\n') {
                    out.push(' ');
                }
                out.push_str(trimmed);
            }
        }
    }
}

/// Collapse runs of spaces to one and runs of blank lines to at most one.
fn collapse_whitespace(text: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut blank_run = 0;

    for line in text.lines() {
        let line = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if line.is_empty() {
            blank_run += 1;
            if blank_run == 1 && !lines.is_empty() {
                lines.push(String::new());
            }
        } else {
            blank_run = 0;
            lines.push(line);
        }
    }

    lines.join("\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapse_whitespace() {
        let input = "  Hello   world  \n\n\n\n  Test  ";
        assert_eq!(collapse_whitespace(input), "Hello world\n\nTest");
    }

    #[test]
    fn test_prefers_main_content() {
        let html = r#"<html><body>
            <nav>Home | About</nav>
            <article><h1>Title</h1><p>First paragraph.</p><script>track()</script><p>Second.</p></article>
            <footer>Copyright</footer>
        </body></html>"#;
        let text = html_to_text(html);
        assert!(text.contains("Title"));
        assert!(text.contains("First paragraph."));
        assert!(text.contains("Second."));
        assert!(!text.contains("track()"));
        assert!(!text.contains("Home | About"));
        assert!(!text.contains("Copyright"));
    }

    #[test]
    fn test_falls_back_to_body() {
        let html = "<html><body><p>Hello</p><style>p{}</style><p>World</p></body></html>";
        let text = html_to_text(html);
        assert!(text.contains("Hello"));
        assert!(text.contains("World"));
        assert!(!text.contains("p{}"));
    }

    #[test]
    fn test_empty_page() {
        assert_eq!(html_to_text("<html><body><script>x()</script></body></html>"), "");
    }

    #[tokio::test]
    async fn test_rejects_non_http_scheme() {
        let fetcher = DirectFetcher::new(Client::new());
        let err = fetcher.fetch_text("file:///etc/passwd").await.unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
        let err = fetcher.fetch_text("not a url").await.unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }
}
