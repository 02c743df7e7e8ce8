//! html5ever token sink that keeps the text of a page.

use std::cell::{Cell, RefCell};

use html5ever::tokenizer::states::RawKind;
use html5ever::tokenizer::{Tag, TagKind, Token, TokenSink, TokenSinkResult};

use htmlpage_shared::{IndexerError, Result};

/// Collects character tokens in document order.
///
/// Script and style bodies are switched to their raw tokenizer states, as a
/// tree builder would, and their text is dropped. The first end-of-file
/// error raised inside an open construct is kept and reported by
/// [`TextCollector::finish`].
#[derive(Default)]
pub(crate) struct TextCollector {
    text: RefCell<String>,
    in_hidden_element: Cell<bool>,
    tags: Cell<usize>,
    error: RefCell<Option<IndexerError>>,
}

impl TextCollector {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            text: RefCell::new(String::with_capacity(capacity)),
            ..Self::default()
        }
    }

    /// Number of start and end tags seen.
    pub(crate) fn tag_count(&self) -> usize {
        self.tags.get()
    }

    /// The collected text, or the construct left open at end of input.
    pub(crate) fn finish(&self) -> Result<String> {
        match self.error.take() {
            Some(err) => Err(err),
            None => Ok(self.text.take()),
        }
    }

    fn tag(&self, tag: &Tag) -> TokenSinkResult<()> {
        self.tags.set(self.tags.get() + 1);
        match (tag.kind, &*tag.name) {
            (TagKind::StartTag, "script") => {
                self.in_hidden_element.set(true);
                TokenSinkResult::RawData(RawKind::ScriptData)
            }
            (TagKind::StartTag, "style") => {
                self.in_hidden_element.set(true);
                TokenSinkResult::RawData(RawKind::Rawtext)
            }
            (TagKind::StartTag, "title" | "textarea") => TokenSinkResult::RawData(RawKind::Rcdata),
            (TagKind::EndTag, "script" | "style") => {
                self.in_hidden_element.set(false);
                TokenSinkResult::Continue
            }
            _ => TokenSinkResult::Continue,
        }
    }
}

/// Whether a tokenizer error means input ended inside a tag, comment,
/// doctype or CDATA section. Character reference errors do not count.
fn is_eof_in_construct(message: &str) -> bool {
    message == "Unexpected EOF" || message.starts_with("Saw EOF in state")
}

impl TokenSink for TextCollector {
    type Handle = ();

    fn process_token(&self, token: Token, line_number: u64) -> TokenSinkResult<()> {
        match token {
            Token::CharacterTokens(chars) => {
                if !self.in_hidden_element.get() {
                    self.text.borrow_mut().push_str(&chars);
                }
            }
            Token::TagToken(tag) => return self.tag(&tag),
            Token::ParseError(message) if is_eof_in_construct(&message) => {
                let mut error = self.error.borrow_mut();
                if error.is_none() {
                    *error = Some(IndexerError::parse(message, line_number));
                }
            }
            _ => {}
        }
        TokenSinkResult::Continue
    }
}
