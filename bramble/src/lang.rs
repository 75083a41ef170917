use std::{
    fmt::{Display, Formatter},
    path::{Path, PathBuf},
    sync::Arc,
};

use bramble_grammar::{tokenizer, ConvertError, Repository, SpecGrammar, Tokens, TokenizerConfig};
use serde::Deserialize;

/// The data required for Bramble to tokenize a language.
#[derive(Debug, Clone)]
pub struct Lang {
    header: Header,
    // This is stored in an `Arc` so that it can be shared between the threads tokenizing
    // different buffers
    repo: Arc<Repository>,
    tokenizer: TokenizerConfig,
}

impl Lang {
    /// Load a language from either a `.toml` language file or a bare `.json` grammar, depending
    /// on the file's extension.
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let extension = path.extension().and_then(|ext| ext.to_str());
        let parse: fn(&str) -> Result<Self, LoadError> = match extension {
            Some("toml") => Self::from_toml,
            Some("json") => Self::from_json,
            _ => return Err(LoadError::UnknownExtension(path.to_owned())),
        };
        let contents =
            std::fs::read_to_string(path).map_err(|e| LoadError::Io(path.to_owned(), e))?;
        let lang = parse(&contents)?;
        log::info!("Loaded language '{}' from {:?}", lang.name(), path);
        Ok(lang)
    }

    /// Parse a language file, consisting of a `[lang]` header, an optional `[tokenizer]` config
    /// and the `[grammar]` itself.
    pub fn from_toml(s: &str) -> Result<Self, LoadError> {
        let lang_file: LangFile = toml::from_str(s).map_err(LoadError::Toml)?;
        Self::new(lang_file.header, lang_file.grammar, lang_file.tokenizer)
    }

    /// Parse a bare JSON grammar, which is tokenized with the default [`TokenizerConfig`].  The
    /// language takes its name from the grammar.
    pub fn from_json(s: &str) -> Result<Self, LoadError> {
        let grammar: SpecGrammar = serde_json::from_str(s).map_err(LoadError::Json)?;
        let header = Header {
            name: grammar.name.clone().unwrap_or_default(),
        };
        Self::new(header, grammar, TokenizerConfig::default())
    }

    fn new(
        header: Header,
        grammar: SpecGrammar,
        tokenizer: TokenizerConfig,
    ) -> Result<Self, LoadError> {
        let repo = grammar.into_repository().map_err(LoadError::Convert)?;
        Ok(Self {
            header,
            repo: Arc::new(repo),
            tokenizer,
        })
    }

    pub fn name(&self) -> &str {
        &self.header.name
    }

    pub fn repository(&self) -> &Arc<Repository> {
        &self.repo
    }

    pub fn tokenizer_config(&self) -> &TokenizerConfig {
        &self.tokenizer
    }

    pub fn tokenizer_config_mut(&mut self) -> &mut TokenizerConfig {
        &mut self.tokenizer
    }

    /// Tokenize `text` according to this language's grammar and [`TokenizerConfig`]
    pub fn tokenize(&self, text: &str) -> Result<Tokens, tokenizer::Error> {
        self.repo.tokenize_with(text, &self.tokenizer)
    }
}

/// Data relating to this language that is parsed from the file but not dependent on the
/// grammar
#[derive(Debug, Clone, Deserialize)]
struct Header {
    name: String,
}

//////////////////////////
// FILE PARSING/LOADING //
//////////////////////////

/// Data structure into which TOML files get [`Deserialize`]d.
#[derive(Debug, Clone, Deserialize)]
struct LangFile {
    #[serde(rename = "lang")]
    header: Header,
    #[serde(default)]
    tokenizer: TokenizerConfig,
    grammar: SpecGrammar,
}

#[derive(Debug)]
pub enum LoadError {
    Io(PathBuf, std::io::Error),
    Json(serde_json::Error),
    Toml(toml::de::Error),
    Convert(ConvertError),
    /// Languages can only be loaded from `.toml` or `.json` files
    UnknownExtension(PathBuf),
}

impl Display for LoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::Io(path, e) => write!(f, "Can't read {:?}: {}", path, e),
            LoadError::Json(e) => write!(f, "Invalid JSON grammar: {}", e),
            LoadError::Toml(e) => write!(f, "Invalid language file: {}", e),
            LoadError::Convert(e) => write!(f, "Invalid grammar: {}", e),
            LoadError::UnknownExtension(path) => {
                write!(f, "Expected a `.toml` or `.json` file, got {:?}", path)
            }
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Io(_, e) => Some(e),
            LoadError::Json(e) => Some(e),
            LoadError::Toml(e) => Some(e),
            LoadError::Convert(e) => Some(e),
            LoadError::UnknownExtension(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use bramble_grammar::{ConvertError, UnterminatedPolicy};

    use super::{Lang, LoadError};

    const ARITH: &str = r##"
[lang]
name = "Arithmetic"

[tokenizer]
unterminated = "leave-open"
merge-unmatched = true

[grammar]
scopeName = "source.arith"
patterns = [{ include = "#paren" }, { include = "#number" }]

[grammar.repository.number]
name = "constant.numeric"
match = '\d+'

[grammar.repository.paren]
name = "meta.paren"
begin = '\('
end = '\)'
patterns = [{ include = "$self" }]
"##;

    #[test]
    fn toml_lang() {
        let lang = Lang::from_toml(ARITH).unwrap();
        assert_eq!(lang.name(), "Arithmetic");
        assert_eq!(lang.repository().scope_name(), Some("source.arith"));
        assert_eq!(
            lang.tokenizer_config().unterminated,
            UnterminatedPolicy::LeaveOpen
        );
        assert!(lang.tokenizer_config().merge_unmatched);

        let tokens = lang.tokenize("(1 ab").unwrap();
        // `(`, `1` and ` ab`
        assert_eq!(tokens.tokens.len(), 3);
        assert_eq!(tokens.tokens[2].range(), 2..5);
        assert_eq!(tokens.unclosed.len(), 1);
    }

    #[test]
    fn json_lang() {
        let lang = Lang::from_json(
            r#"{ "name": "Digits", "patterns": [{ "name": "digit", "match": "\\d" }] }"#,
        )
        .unwrap();
        assert_eq!(lang.name(), "Digits");
        let tokens = lang.tokenize("1a").unwrap().tokens;
        let digit = lang.repository().node_id("$self-p0").unwrap();
        assert_eq!(tokens[0].ty, Some(digit));
        assert_eq!(tokens[1].ty, None);
    }

    #[test]
    fn config_override() {
        let mut lang = Lang::from_toml(ARITH).unwrap();
        lang.tokenizer_config_mut().merge_unmatched = false;
        assert_eq!(lang.tokenize("ab").unwrap().tokens.len(), 2);
    }

    #[test]
    fn bundled_grammars() {
        let dir = concat!(env!("CARGO_MANIFEST_DIR"), "/../grammars/");

        let json = Lang::load_file(format!("{}json.toml", dir)).unwrap();
        assert_eq!(json.name(), "JSON");
        let tokens = json.tokenize(r#"{"a": [1, -2.5e3, true, "\n\q"]}"#).unwrap();
        assert!(crate::Outline::from_tokens(&tokens.tokens).is_balanced());
        let illegal = json.repository().node_id("string-p1").unwrap();
        assert_eq!(tokens.tokens.iter().filter(|t| t.ty == Some(illegal)).count(), 1);
        // Keywords only match as whole words
        let constant = json.repository().node_id("constant").unwrap();
        let tokens = json.tokenize("[xtrue, true]").unwrap().tokens;
        assert_eq!(tokens.iter().filter(|t| t.ty == Some(constant)).count(), 1);

        let arith = Lang::load_file(format!("{}arith.json", dir)).unwrap();
        assert_eq!(arith.name(), "Arithmetic");
        let tokens = arith.tokenize("max[1, (2+3)] /* todo */").unwrap();
        assert!(crate::Outline::from_tokens(&tokens.tokens).is_balanced());
    }

    #[test]
    fn load_errors() {
        assert!(matches!(
            Lang::load_file("grammar.txt"),
            Err(LoadError::UnknownExtension(_))
        ));
        assert!(matches!(
            Lang::load_file("this/file/does/not/exist.toml"),
            Err(LoadError::Io(_, _))
        ));
        assert!(matches!(Lang::from_json("{"), Err(LoadError::Json(_))));
        assert!(matches!(
            Lang::from_toml("[grammar]\npatterns = []"),
            Err(LoadError::Toml(_))
        ));
        assert!(matches!(
            Lang::from_json(r##"{ "patterns": [{ "include": "#nope" }] }"##),
            Err(LoadError::Convert(ConvertError::InvalidGrammar { .. }))
        ));
    }
}
