//! arXiv search client.
//!
//! Queries the arXiv export API and parses its Atom feed into `Paper`
//! records. Search itself stays an external service call; only the feed
//! parsing lives here.

use crate::state::Paper;
use quick_xml::events::Event;
use quick_xml::Reader;
use scholar_core::{AppError, AppResult};

const DEFAULT_BASE_URL: &str = "http://export.arxiv.org";

/// Client for the arXiv export API.
pub struct ArxivClient {
    base_url: String,
    client: reqwest::Client,
}

impl ArxivClient {
    /// Create a client against the public arXiv endpoint.
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Create a client against a custom endpoint (used by tests and mirrors).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Search arXiv for papers relevant to the query.
    ///
    /// The query text is stripped of question marks and trimmed before
    /// submission. Returns at most `max_results` papers sorted by relevance;
    /// an empty result set is not an error.
    pub async fn search(&self, query: &str, max_results: u32) -> AppResult<Vec<Paper>> {
        let search_terms = query.replace('?', "");
        let search_terms = search_terms.trim();

        if search_terms.is_empty() {
            return Err(AppError::Pipeline("Search query cannot be empty".to_string()));
        }

        let url = format!("{}/api/query", self.base_url);

        tracing::info!("Searching arXiv for: {}", search_terms);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("search_query", format!("all:{}", search_terms).as_str()),
                ("start", "0"),
                ("max_results", &max_results.to_string()),
                ("sortBy", "relevance"),
            ])
            .send()
            .await
            .map_err(|e| AppError::Pipeline(format!("arXiv request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Pipeline(format!(
                "arXiv API error ({})",
                status
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AppError::Pipeline(format!("Failed to read arXiv response: {}", e)))?;

        let papers = parse_feed(&body)?;

        tracing::info!("arXiv returned {} papers", papers.len());

        Ok(papers)
    }
}

impl Default for ArxivClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Fields captured while walking an `<entry>` element.
#[derive(Default)]
struct EntryBuilder {
    id: String,
    title: String,
    summary: String,
    published: String,
    authors: Vec<String>,
    alternate_url: Option<String>,
    pdf_url: Option<String>,
}

impl EntryBuilder {
    fn into_paper(self) -> Paper {
        let url = self.alternate_url.unwrap_or_else(|| self.id.clone());
        Paper {
            id: self.id,
            title: normalize_whitespace(&self.title),
            authors: self.authors,
            abstract_text: normalize_whitespace(&self.summary),
            // Atom timestamps are RFC 3339; keep the date part
            published: self.published.chars().take(10).collect(),
            url,
            pdf_url: self.pdf_url,
        }
    }
}

/// Element currently receiving text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextField {
    Id,
    Title,
    Summary,
    Published,
    AuthorName,
}

/// Parse an arXiv Atom feed into papers.
pub fn parse_feed(xml: &str) -> AppResult<Vec<Paper>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut papers = Vec::new();
    let mut entry: Option<EntryBuilder> = None;
    let mut in_author = false;
    let mut field: Option<TextField> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                match e.name().as_ref() {
                    b"entry" => {
                        entry = Some(EntryBuilder::default());
                    }
                    b"author" if entry.is_some() => {
                        in_author = true;
                    }
                    b"name" if in_author => {
                        field = Some(TextField::AuthorName);
                    }
                    b"id" if entry.is_some() => field = Some(TextField::Id),
                    b"title" if entry.is_some() => field = Some(TextField::Title),
                    b"summary" if entry.is_some() => field = Some(TextField::Summary),
                    b"published" if entry.is_some() => field = Some(TextField::Published),
                    b"link" => {
                        if let Some(ref mut builder) = entry {
                            read_link(&e, builder)?;
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Empty(e)) => {
                if e.name().as_ref() == b"link" {
                    if let Some(ref mut builder) = entry {
                        read_link(&e, builder)?;
                    }
                }
            }
            Ok(Event::Text(t)) => {
                if let (Some(builder), Some(current)) = (entry.as_mut(), field) {
                    let text = t
                        .unescape()
                        .map_err(|e| AppError::Pipeline(format!("Invalid feed text: {}", e)))?;

                    match current {
                        TextField::Id => builder.id.push_str(&text),
                        TextField::Title => builder.title.push_str(&text),
                        TextField::Summary => builder.summary.push_str(&text),
                        TextField::Published => builder.published.push_str(&text),
                        TextField::AuthorName => builder.authors.push(text.trim().to_string()),
                    }
                }
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"entry" => {
                    if let Some(builder) = entry.take() {
                        papers.push(builder.into_paper());
                    }
                }
                b"author" => {
                    in_author = false;
                    field = None;
                }
                b"id" | b"title" | b"summary" | b"published" | b"name" => {
                    field = None;
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(AppError::Pipeline(format!(
                    "Failed to parse arXiv feed: {}",
                    e
                )))
            }
            _ => {}
        }
    }

    Ok(papers)
}

/// Pull URL attributes from a `<link>` element into the builder.
fn read_link(
    e: &quick_xml::events::BytesStart<'_>,
    builder: &mut EntryBuilder,
) -> AppResult<()> {
    let mut href = None;
    let mut rel = None;
    let mut title = None;

    for attr in e.attributes().flatten() {
        let value = attr
            .unescape_value()
            .map_err(|e| AppError::Pipeline(format!("Invalid link attribute: {}", e)))?
            .to_string();

        match attr.key.as_ref() {
            b"href" => href = Some(value),
            b"rel" => rel = Some(value),
            b"title" => title = Some(value),
            _ => {}
        }
    }

    if let Some(href) = href {
        if title.as_deref() == Some("pdf") {
            builder.pdf_url = Some(href);
        } else if rel.as_deref() == Some("alternate") {
            builder.alternate_url = Some(href);
        }
    }

    Ok(())
}

/// Collapse runs of whitespace (Atom feeds wrap titles and abstracts).
fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>ArXiv Query: search_query=all:hallucination</title>
  <entry>
    <id>http://arxiv.org/abs/2401.00001v1</id>
    <updated>2024-01-16T00:00:00Z</updated>
    <published>2024-01-15T18:30:00Z</published>
    <title>Mitigating Hallucinations in
        Large Language Models</title>
    <summary>We survey techniques for reducing
        hallucinations &amp; improving grounding.</summary>
    <author>
      <name>Ada Lovelace</name>
    </author>
    <author>
      <name>Alan Turing</name>
    </author>
    <link href="http://arxiv.org/abs/2401.00001v1" rel="alternate" type="text/html"/>
    <link title="pdf" href="http://arxiv.org/pdf/2401.00001v1" rel="related" type="application/pdf"/>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/2401.00002v2</id>
    <published>2023-11-02T09:00:00Z</published>
    <title>Retrieval-Augmented Generation Revisited</title>
    <summary>A second abstract.</summary>
    <author>
      <name>Grace Hopper</name>
    </author>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_feed_entries() {
        let papers = parse_feed(SAMPLE_FEED).unwrap();
        assert_eq!(papers.len(), 2);
    }

    #[test]
    fn test_whitespace_normalized() {
        let papers = parse_feed(SAMPLE_FEED).unwrap();
        assert_eq!(
            papers[0].title,
            "Mitigating Hallucinations in Large Language Models"
        );
        assert_eq!(
            papers[0].abstract_text,
            "We survey techniques for reducing hallucinations & improving grounding."
        );
    }

    #[test]
    fn test_authors_and_dates() {
        let papers = parse_feed(SAMPLE_FEED).unwrap();
        assert_eq!(papers[0].authors, vec!["Ada Lovelace", "Alan Turing"]);
        assert_eq!(papers[0].published, "2024-01-15");
        assert_eq!(papers[1].authors, vec!["Grace Hopper"]);
    }

    #[test]
    fn test_links() {
        let papers = parse_feed(SAMPLE_FEED).unwrap();
        assert_eq!(papers[0].url, "http://arxiv.org/abs/2401.00001v1");
        assert_eq!(
            papers[0].pdf_url.as_deref(),
            Some("http://arxiv.org/pdf/2401.00001v1")
        );
        // Entry without an alternate link falls back to its id
        assert_eq!(papers[1].url, "http://arxiv.org/abs/2401.00002v2");
        assert!(papers[1].pdf_url.is_none());
    }

    #[test]
    fn test_empty_feed() {
        let xml = r#"<?xml version="1.0"?><feed xmlns="http://www.w3.org/2005/Atom"><title>empty</title></feed>"#;
        let papers = parse_feed(xml).unwrap();
        assert!(papers.is_empty());
    }

    #[test]
    fn test_malformed_feed() {
        let result = parse_feed("<feed><entry><title>broken");
        // Truncated XML either errors or produces no complete entries
        match result {
            Ok(papers) => assert!(papers.is_empty()),
            Err(_) => {}
        }
    }
}
