//! User-configurable parameters of the `bramble` binary, loaded from an optional TOML file and
//! then overridden by command-line flags.

use std::{
    fmt::{Display, Formatter},
    path::{Path, PathBuf},
    str::FromStr,
};

use bramble_grammar::TokenizerConfig;
use serde::Deserialize;

/// The ways that tokens can be printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Format {
    /// One token per line
    Tokens,
    /// A JSON array of token objects
    Json,
    /// The tree of scopes described by the tokens
    Outline,
}

impl Default for Format {
    fn default() -> Self {
        Format::Tokens
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tokens" => Ok(Format::Tokens),
            "json" => Ok(Format::Json),
            "outline" => Ok(Format::Outline),
            _ => Err(format!(
                "Unknown format '{}' (expected tokens, json or outline)",
                s
            )),
        }
    }
}

/// The entire run-time configuration of the `bramble` binary
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    pub format: Format,
    /// Replaces the tokenizer config of the language being loaded
    pub tokenizer: Option<TokenizerConfig>,
    /// Default log filter, used if `RUST_LOG` isn't set
    pub log: Option<String>,
}

impl Config {
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let contents =
            std::fs::read_to_string(path).map_err(|e| Error::Io(path.to_owned(), e))?;
        toml::from_str(&contents).map_err(|e| Error::Toml(path.to_owned(), e))
    }
}

#[derive(Debug)]
pub enum Error {
    Io(PathBuf, std::io::Error),
    Toml(PathBuf, toml::de::Error),
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(path, e) => write!(f, "Can't read config {:?}: {}", path, e),
            Error::Toml(path, e) => write!(f, "Invalid config {:?}: {}", path, e),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use bramble_grammar::UnterminatedPolicy;

    use super::{Config, Format};

    #[test]
    fn parse_config() {
        let config: Config = toml::from_str(
            r#"
format = "outline"
log = "debug"

[tokenizer]
unterminated = "leave-open"
step-limit = 100
"#,
        )
        .unwrap();
        assert_eq!(config.format, Format::Outline);
        assert_eq!(config.log.as_deref(), Some("debug"));
        let tokenizer = config.tokenizer.unwrap();
        assert_eq!(tokenizer.unterminated, UnterminatedPolicy::LeaveOpen);
        assert_eq!(tokenizer.step_limit, Some(100));
        assert!(!tokenizer.merge_unmatched);

        assert_eq!(toml::from_str::<Config>("").unwrap(), Config::default());
        assert!(toml::from_str::<Config>("colour = true").is_err());
    }

    #[test]
    fn parse_format() {
        assert_eq!("json".parse::<Format>(), Ok(Format::Json));
        assert!("yaml".parse::<Format>().is_err());
    }
}
