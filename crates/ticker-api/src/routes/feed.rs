//! 신디케이션 피드 (`GET /v1/feed?format=rss|atom`).
//!
//! 타임라인과 같은 항목을 RSS 2.0 또는 Atom 1.0 문서로 렌더링합니다.
//! `atom`이 아닌 형식은 모두 RSS로 처리합니다.

use std::fmt::Write as _;
use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{header::CONTENT_TYPE, HeaderValue},
    response::{IntoResponse, Response},
    Extension,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use ticker_core::{Pagination, Ticker};

use super::public::timeline_entries;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::types::TimelineEntry;

pub const FEED_CONTENT_TYPE: &str = "application/xml; charset=utf-8";

const FEED_ITEM_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedFormat {
    Rss,
    Atom,
}

impl FeedFormat {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::to_ascii_lowercase).as_deref() {
            Some("atom") => FeedFormat::Atom,
            _ => FeedFormat::Rss,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct FeedQuery {
    pub format: Option<String>,
}

/// `GET /v1/feed`
pub async fn feed(
    State(state): State<Arc<AppState>>,
    ticker: Option<Extension<Ticker>>,
    query: Result<Query<FeedQuery>, QueryRejection>,
) -> ApiResult<Response> {
    let Some(Extension(ticker)) = ticker else {
        return Err(ApiError::ticker_not_found());
    };
    let query = query.map(|Query(q)| q).unwrap_or_default();
    let format = FeedFormat::parse(query.format.as_deref());

    let entries = if ticker.active {
        timeline_entries(&state, ticker.id, Pagination::new(FEED_ITEM_LIMIT)).await?
    } else {
        Vec::new()
    };

    let body = match format {
        FeedFormat::Rss => render_rss(&ticker, &entries),
        FeedFormat::Atom => render_atom(&ticker, &entries),
    };

    let mut response = body.into_response();
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(FEED_CONTENT_TYPE));
    Ok(response)
}

fn feed_link(ticker: &Ticker) -> String {
    if !ticker.information.url.is_empty() {
        return ticker.information.url.clone();
    }
    ticker
        .websites
        .first()
        .map(|w| format!("https://{}", w.origin))
        .unwrap_or_default()
}

fn item_title(entry: &TimelineEntry) -> String {
    let first_line = entry.text.lines().next().unwrap_or_default();
    if first_line.chars().count() > 80 {
        let mut title: String = first_line.chars().take(79).collect();
        title.push('…');
        title
    } else {
        first_line.to_string()
    }
}

fn updated_at(ticker: &Ticker, entries: &[TimelineEntry]) -> DateTime<Utc> {
    entries
        .iter()
        .map(|e| e.created_at)
        .max()
        .unwrap_or(ticker.updated_at)
}

/// RSS 2.0 문서를 렌더링합니다.
pub fn render_rss(ticker: &Ticker, entries: &[TimelineEntry]) -> String {
    let link = feed_link(ticker);
    let mut xml = String::new();

    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    xml.push_str(r#"<rss version="2.0"><channel>"#);
    let _ = write!(
        xml,
        "<title>{}</title><link>{}</link><description>{}</description><lastBuildDate>{}</lastBuildDate>",
        escape_xml(&ticker.title),
        escape_xml(&link),
        escape_xml(&ticker.description),
        updated_at(ticker, entries).to_rfc2822(),
    );
    if !ticker.information.author.is_empty() {
        let _ = write!(
            xml,
            "<managingEditor>{} ({})</managingEditor>",
            escape_xml(&ticker.information.email),
            escape_xml(&ticker.information.author)
        );
    }

    for entry in entries {
        let _ = write!(
            xml,
            "<item><title>{}</title><description>{}</description><guid isPermaLink=\"false\">{}</guid><pubDate>{}</pubDate>",
            escape_xml(&item_title(entry)),
            escape_xml(&entry.text),
            entry.id,
            entry.created_at.to_rfc2822(),
        );
        for attachment in &entry.attachments {
            let _ = write!(
                xml,
                "<enclosure url=\"{}\" type=\"{}\" length=\"0\"/>",
                escape_xml(&attachment.url),
                escape_xml(&attachment.content_type)
            );
        }
        xml.push_str("</item>");
    }

    xml.push_str("</channel></rss>");
    xml
}

/// Atom 1.0 문서를 렌더링합니다.
pub fn render_atom(ticker: &Ticker, entries: &[TimelineEntry]) -> String {
    let link = feed_link(ticker);
    let mut xml = String::new();

    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    xml.push_str(r#"<feed xmlns="http://www.w3.org/2005/Atom">"#);
    let _ = write!(
        xml,
        "<id>tag:ticker,{}</id><title>{}</title><subtitle>{}</subtitle><link href=\"{}\"/><updated>{}</updated>",
        ticker.id,
        escape_xml(&ticker.title),
        escape_xml(&ticker.description),
        escape_xml(&link),
        updated_at(ticker, entries).to_rfc3339(),
    );
    if !ticker.information.author.is_empty() {
        let _ = write!(
            xml,
            "<author><name>{}</name><email>{}</email></author>",
            escape_xml(&ticker.information.author),
            escape_xml(&ticker.information.email)
        );
    }

    for entry in entries {
        let _ = write!(
            xml,
            "<entry><id>tag:ticker,{}:{}</id><title>{}</title><updated>{}</updated><content type=\"text\">{}</content>",
            ticker.id,
            entry.id,
            escape_xml(&item_title(entry)),
            entry.created_at.to_rfc3339(),
            escape_xml(&entry.text),
        );
        for attachment in &entry.attachments {
            let _ = write!(
                xml,
                "<link rel=\"enclosure\" href=\"{}\" type=\"{}\"/>",
                escape_xml(&attachment.url),
                escape_xml(&attachment.content_type)
            );
        }
        xml.push_str("</entry>");
    }

    xml.push_str("</feed>");
    xml
}

/// XML 특수 문자를 이스케이프합니다.
pub fn escape_xml(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: i64, text: &str) -> TimelineEntry {
        TimelineEntry {
            id,
            created_at: Utc::now(),
            text: text.to_string(),
            attachments: Vec::new(),
        }
    }

    #[test]
    fn test_format_fallback() {
        assert_eq!(FeedFormat::parse(Some("atom")), FeedFormat::Atom);
        assert_eq!(FeedFormat::parse(Some("ATOM")), FeedFormat::Atom);
        assert_eq!(FeedFormat::parse(Some("rss")), FeedFormat::Rss);
        assert_eq!(FeedFormat::parse(Some("json")), FeedFormat::Rss);
        assert_eq!(FeedFormat::parse(None), FeedFormat::Rss);
    }

    #[test]
    fn test_render_rss_escapes_content() {
        let ticker = Ticker::new("Demo & Co").with_website("a.example");
        let xml = render_rss(&ticker, &[entry(1, "<b>hi</b>")]);

        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("<title>Demo &amp; Co</title>"));
        assert!(xml.contains("<link>https://a.example</link>"));
        assert!(xml.contains("&lt;b&gt;hi&lt;/b&gt;"));
        assert!(!xml.contains("<b>hi</b>"));
    }

    #[test]
    fn test_render_atom_entries() {
        let ticker = Ticker::new("Demo");
        let xml = render_atom(&ticker, &[entry(7, "first"), entry(6, "second")]);

        assert!(xml.contains(r#"<feed xmlns="http://www.w3.org/2005/Atom">"#));
        assert_eq!(xml.matches("<entry>").count(), 2);
        assert!(xml.contains(":7</id>"));
    }
}
