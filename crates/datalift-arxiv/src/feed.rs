//! arXiv Atom feed parser using quick-xml
//!
//! Only the fields needed to locate and name PDFs are extracted.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use datalift_core::DownloadError;

/// One query result page.
#[derive(Debug, Default)]
pub struct Feed {
    /// `opensearch:totalResults`, when present
    pub total_results: Option<usize>,
    pub entries: Vec<FeedEntry>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    /// Abstract page URL, e.g. `http://arxiv.org/abs/2401.00001v1`
    pub id: String,
    pub title: String,
    pub summary: String,
    /// `<link title="pdf" ...>` href
    pub pdf_link: Option<String>,
}

impl FeedEntry {
    /// Last path segment of the id (`2401.00001v1`, or `0211159v1` for
    /// old-style `math/0211159v1` ids).
    pub fn arxiv_id(&self) -> &str {
        self.id.rsplit('/').next().unwrap_or(&self.id)
    }

    /// Local file name for the PDF.
    pub fn file_name(&self) -> String {
        format!("{}.pdf", self.arxiv_id())
    }

    /// Direct PDF URL: the feed's pdf link, else derived from the abstract URL.
    pub fn pdf_url(&self) -> String {
        let base = match &self.pdf_link {
            Some(link) => link.clone(),
            None => self.id.replacen("/abs/", "/pdf/", 1),
        };
        if base.ends_with(".pdf") {
            base
        } else {
            format!("{base}.pdf")
        }
    }

    /// The API reports query errors as a single entry with an errors id.
    pub fn is_error(&self) -> bool {
        self.id.contains("/api/errors")
    }
}

#[derive(Clone, Copy)]
enum Field {
    Id,
    Title,
    Summary,
    TotalResults,
}

fn xml_err(e: impl std::fmt::Display) -> DownloadError {
    DownloadError::Feed(format!("XML parse error: {e}"))
}

/// Parse an Atom response from the arXiv query API.
///
/// An error entry is turned into `DownloadError::Feed` with its summary.
pub fn parse_feed(xml: &str) -> Result<Feed, DownloadError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut feed = Feed::default();
    let mut entry: Option<FeedEntry> = None;
    let mut field: Option<Field> = None;
    let mut total = String::new();

    loop {
        match reader.read_event().map_err(xml_err)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"entry" => entry = Some(FeedEntry::default()),
                b"id" if entry.is_some() => field = Some(Field::Id),
                b"title" if entry.is_some() => field = Some(Field::Title),
                b"summary" if entry.is_some() => field = Some(Field::Summary),
                b"totalResults" => field = Some(Field::TotalResults),
                b"link" => read_link(&e, entry.as_mut())?,
                _ => field = None,
            },
            Event::Empty(e) if e.local_name().as_ref() == b"link" => {
                read_link(&e, entry.as_mut())?;
            }
            Event::Text(t) => {
                let Some(f) = field else { continue };
                let text = t.unescape().map_err(xml_err)?;
                match (f, entry.as_mut()) {
                    (Field::TotalResults, _) => total.push_str(&text),
                    (Field::Id, Some(en)) => en.id.push_str(&text),
                    (Field::Title, Some(en)) => push_collapsed(&mut en.title, &text),
                    (Field::Summary, Some(en)) => push_collapsed(&mut en.summary, &text),
                    _ => {}
                }
            }
            Event::End(e) => {
                field = None;
                if e.local_name().as_ref() == b"entry" {
                    if let Some(done) = entry.take() {
                        if done.is_error() {
                            return Err(DownloadError::Feed(format!(
                                "arXiv API error: {}",
                                done.summary
                            )));
                        }
                        feed.entries.push(done);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    feed.total_results = total.trim().parse().ok();
    Ok(feed)
}

fn read_link(e: &BytesStart<'_>, entry: Option<&mut FeedEntry>) -> Result<(), DownloadError> {
    let Some(entry) = entry else { return Ok(()) };
    let mut href = None;
    let mut is_pdf = false;
    for attr in e.attributes() {
        let attr = attr.map_err(xml_err)?;
        let value = attr.unescape_value().map_err(xml_err)?;
        match attr.key.as_ref() {
            b"href" => href = Some(value.into_owned()),
            b"title" if value == "pdf" => is_pdf = true,
            b"type" if value == "application/pdf" => is_pdf = true,
            _ => {}
        }
    }
    if is_pdf {
        entry.pdf_link = href;
    }
    Ok(())
}

/// Titles and abstracts wrap over several lines; fold them to single spaces.
fn push_collapsed(dst: &mut String, text: &str) {
    for word in text.split_whitespace() {
        if !dst.is_empty() {
            dst.push(' ');
        }
        dst.push_str(word);
    }
}
