//! HTML-to-text stripping for search indexing.
//!
//! Runs the page through the html5ever tokenizer and keeps the character
//! tokens in document order. html5ever has already resolved character
//! references by then, so named (including the legacy forms written without
//! a semicolon), decimal and hexadecimal references come out decoded and
//! unknown ones are kept verbatim.

mod collector;

use html5ever::tendril::StrTendril;
use html5ever::tokenizer::{BufferQueue, Tokenizer, TokenizerOpts};
use tracing::{debug, instrument};

use htmlpage_shared::Result;

use collector::TextCollector;

/// Strip all markup from `html`, returning its decoded text.
///
/// Tags, comments, doctypes, bogus comments such as `</ p>` and the contents
/// of `<script>`/`<style>` elements are dropped. Text is otherwise preserved
/// exactly: no whitespace is collapsed and tags do not introduce separators.
///
/// Fails with [`htmlpage_shared::IndexerError::Parse`] when the input ends
/// inside a tag, comment, doctype or CDATA section.
#[instrument(skip(html), fields(len = html.len()))]
pub fn strip(html: &str) -> Result<String> {
    let input = BufferQueue::default();
    input.push_back(StrTendril::from_slice(html));

    let tokenizer = Tokenizer::new(
        TextCollector::with_capacity(html.len()),
        TokenizerOpts {
            exact_errors: true,
            ..Default::default()
        },
    );
    let _ = tokenizer.feed(&input);
    tokenizer.end();

    let text = tokenizer.sink.finish()?;
    debug!(
        tags = tokenizer.sink.tag_count(),
        text_len = text.len(),
        "markup stripped"
    );
    Ok(text)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
