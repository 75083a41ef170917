use std::{
    fmt::{Display, Formatter},
    path::{Path, PathBuf},
    string::FromUtf8Error,
    sync::Arc,
};

use bramble_grammar::{tokenizer, Token, Tokens};

use crate::{Lang, Outline};

/// A single piece of text, along with its tokens.  This roughly corresponds to a file on-disk,
/// but buffers can be created without having a corresponding file.
#[derive(Debug, Clone)]
pub struct Buffer {
    /// The file which this `Buffer` was loaded from, if any
    path: Option<PathBuf>,
    /// The [`Lang`]uage of this `Buffer`'s text
    lang: Arc<Lang>,
    text: String,
    tokens: Tokens,
}

impl Buffer {
    /// Creates a new `Buffer` holding the contents of the file at a given [`Path`]
    pub fn load_file(path: impl AsRef<Path>, lang: Arc<Lang>) -> Result<Self, Error> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| Error::Io(path.to_owned(), e))?;
        let text = String::from_utf8(bytes).map_err(Error::Utf8)?;
        let mut buffer = Self::from_text(text, lang)?;
        buffer.path = Some(path.to_owned());
        Ok(buffer)
    }

    /// Creates a new `Buffer` which isn't connected to any file
    pub fn from_text(text: String, lang: Arc<Lang>) -> Result<Self, Error> {
        let tokens = lang.tokenize(&text).map_err(Error::Tokenize)?;
        log::debug!(
            "Tokenized {} bytes of {} into {} tokens",
            text.len(),
            lang.name(),
            tokens.tokens.len()
        );
        Ok(Self {
            path: None,
            lang,
            text,
            tokens,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn lang(&self) -> &Arc<Lang> {
        &self.lang
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens.tokens
    }

    /// The regions which were still open at the end of the text (see
    /// [`UnterminatedPolicy`](bramble_grammar::UnterminatedPolicy))
    pub fn unclosed(&self) -> &[bramble_grammar::NodeId] {
        &self.tokens.unclosed
    }

    /// The slice of this `Buffer`'s text covered by `token`
    pub fn token_text(&self, token: &Token) -> &str {
        self.text.get(token.range()).unwrap_or("")
    }

    /// Fold this `Buffer`'s tokens into a tree of scopes
    pub fn outline(&self) -> Outline {
        Outline::from_tokens(&self.tokens.tokens)
    }
}

/// The errors generated when loading files
#[derive(Debug)]
pub enum Error {
    Io(PathBuf, std::io::Error),
    Utf8(FromUtf8Error),
    Tokenize(tokenizer::Error),
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(path, e) => write!(f, "Can't read {:?}: {}", path, e),
            Error::Utf8(e) => write!(f, "File isn't valid UTF-8: {}", e),
            Error::Tokenize(e) => write!(f, "Tokenization failed: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(_, e) => Some(e),
            Error::Utf8(e) => Some(e),
            Error::Tokenize(e) => Some(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{Buffer, Error};
    use crate::Lang;

    fn words() -> Arc<Lang> {
        let lang = Lang::from_json(
            r#"{ "name": "Words", "patterns": [{ "name": "word", "match": "[a-z]+" }] }"#,
        )
        .unwrap();
        Arc::new(lang)
    }

    #[test]
    fn token_text() {
        let buffer = Buffer::from_text("hi there".to_owned(), words()).unwrap();
        let texts = buffer
            .tokens()
            .iter()
            .map(|t| buffer.token_text(t))
            .collect::<Vec<_>>();
        assert_eq!(texts, vec!["hi", " ", "there"]);
        assert!(buffer.path().is_none());
        assert!(buffer.unclosed().is_empty());
        assert_eq!(buffer.lang().name(), "Words");
    }

    #[test]
    fn missing_file() {
        assert!(matches!(
            Buffer::load_file("no/such/file.txt", words()),
            Err(Error::Io(_, _))
        ));
    }
}
