//! Turns one HTML file into a [`DocumentRecord`].
//!
//! The markup is walked as a flat token stream rather than a repaired DOM: an element
//! only counts if it is literally present in the file. In particular a document with no
//! `<body>` tag gets an empty `body`, and text before an explicit `<body>` is not body text.

use std::path::Path;

use encoding_rs::Encoding;
use html5ever::tendril::StrTendril;
use html5ever::tokenizer::states::RawKind;
use html5ever::tokenizer::{
    BufferQueue, Tag, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
};

use crate::error::{ExtractionCause, ExtractionFailure};
use crate::record::DocumentRecord;

/// Read `file` with the run's fixed `encoding` and extract its searchable fields.
///
/// `key` becomes the record's `path`. Read errors and bytes that are not valid in
/// `encoding` come back as an [`ExtractionFailure`]; nothing here panics on bad input.
pub fn extract_document(
    file: &Path,
    key: &str,
    encoding: &'static Encoding,
) -> Result<DocumentRecord, ExtractionFailure> {
    let bytes = std::fs::read(file).map_err(|err| ExtractionFailure {
        path: file.to_path_buf(),
        cause: ExtractionCause::Read(err),
    })?;

    let text = encoding
        .decode_without_bom_handling_and_without_replacement(&bytes)
        .ok_or_else(|| ExtractionFailure {
            path: file.to_path_buf(),
            cause: ExtractionCause::Decode {
                encoding: encoding.name(),
            },
        })?;

    Ok(extract_fields(&text, key))
}

/// Extract the record fields from already-decoded markup.
pub fn extract_fields(html: &str, key: &str) -> DocumentRecord {
    let mut input = BufferQueue::new();
    input.push_back(StrTendril::from_slice(html));

    let mut tokenizer = Tokenizer::new(FieldCollector::default(), TokenizerOpts::default());
    let _ = tokenizer.feed(&mut input);
    tokenizer.end();

    tokenizer.sink.finish(key)
}

const HEADING_TAGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6"];

#[derive(Debug, Default, PartialEq)]
enum TitleState {
    #[default]
    Before,
    Inside,
    Done,
}

/// Token sink that accumulates the four text fields in document order.
#[derive(Default)]
struct FieldCollector {
    title: String,
    title_state: TitleState,
    headings: Vec<String>,
    current_heading: Option<String>,
    meta_contents: Vec<String>,
    body_strings: Vec<String>,
    /// Character data since the last non-text token; one text node.
    pending_text: String,
    in_body: bool,
    /// Inside `<script>` or `<style>`, whose contents are never searchable text.
    in_code: bool,
}

impl FieldCollector {
    fn on_characters(&mut self, text: &str) {
        if self.in_code {
            return;
        }
        if self.title_state == TitleState::Inside {
            self.title.push_str(text);
        }
        if let Some(heading) = self.current_heading.as_mut() {
            heading.push_str(text);
        }
        if self.in_body {
            self.pending_text.push_str(text);
        }
    }

    /// Close the current text node. Called before any non-text token changes state.
    fn flush_text(&mut self) {
        if !self.pending_text.is_empty() {
            self.body_strings.push(std::mem::take(&mut self.pending_text));
        }
    }

    fn finish_heading(&mut self) {
        if let Some(heading) = self.current_heading.take() {
            self.headings.push(heading);
        }
    }

    fn on_start_tag(&mut self, tag: &Tag) -> TokenSinkResult<()> {
        let name: &str = &tag.name;
        match name {
            "body" => self.in_body = true,
            "title" if !tag.self_closing => {
                if self.title_state == TitleState::Before {
                    self.title_state = TitleState::Inside;
                }
                return TokenSinkResult::RawData(RawKind::Rcdata);
            }
            "textarea" if !tag.self_closing => return TokenSinkResult::RawData(RawKind::Rcdata),
            "script" if !tag.self_closing => {
                self.in_code = true;
                return TokenSinkResult::RawData(RawKind::ScriptData);
            }
            "style" if !tag.self_closing => {
                self.in_code = true;
                return TokenSinkResult::RawData(RawKind::Rawtext);
            }
            "meta" => {
                let content = tag
                    .attrs
                    .iter()
                    .find(|attr| &*attr.name.local == "content")
                    .map(|attr| String::from(&*attr.value));
                if let Some(content) = content
                    && !content.is_empty()
                {
                    self.meta_contents.push(content);
                }
            }
            _ if HEADING_TAGS.contains(&name) && !tag.self_closing => {
                self.finish_heading();
                self.current_heading = Some(String::new());
            }
            _ => {}
        }
        TokenSinkResult::Continue
    }

    fn on_end_tag(&mut self, tag: &Tag) {
        let name: &str = &tag.name;
        match name {
            "body" => self.in_body = false,
            "title" => {
                if self.title_state == TitleState::Inside {
                    self.title_state = TitleState::Done;
                }
            }
            "script" | "style" => self.in_code = false,
            _ if HEADING_TAGS.contains(&name) => self.finish_heading(),
            _ => {}
        }
    }

    fn finish(&mut self, key: &str) -> DocumentRecord {
        self.flush_text();
        self.finish_heading();

        DocumentRecord {
            title: self.title.trim().to_string(),
            headings: self.headings.join(" ").trim().to_string(),
            meta_tags: self.meta_contents.join(" ").trim().to_string(),
            body: self.body_strings.join(" ").trim().to_string(),
            path: key.to_string(),
        }
    }
}

impl TokenSink for FieldCollector {
    type Handle = ();

    fn process_token(&mut self, token: Token, _line_number: u64) -> TokenSinkResult<()> {
        match token {
            Token::CharacterTokens(text) => {
                self.on_characters(&text);
                TokenSinkResult::Continue
            }
            Token::TagToken(tag) => {
                self.flush_text();
                match tag.kind {
                    TagKind::StartTag => self.on_start_tag(&tag),
                    TagKind::EndTag => {
                        self.on_end_tag(&tag);
                        TokenSinkResult::Continue
                    }
                }
            }
            Token::CommentToken(_) | Token::DoctypeToken(_) | Token::EOFToken => {
                self.flush_text();
                TokenSinkResult::Continue
            }
            Token::NullCharacterToken | Token::ParseError(_) => TokenSinkResult::Continue,
        }
    }
}
