//! Code to fuzz Bramble's tokenizer.  Inputs are built by gluing together random samples of the
//! grammar's own patterns (so that rules actually match) with runs of junk characters (so that
//! regions are left unterminated and the unmatched fallback is exercised).

use std::{borrow::Cow, ops::Deref};

use bramble::{Lang, Outline};
use bramble_grammar::{Token, UnterminatedPolicy};
use itertools::Itertools;
use rand::{prelude::SliceRandom, Rng};
use rand_distr::Geometric;

use crate::{runner, Arbitrary};

pub fn fuzz(lang: &Lang, iteration_limit: Option<usize>, average_length_fragments: f64) {
    let config = Config {
        average_length_fragments,
        ..Config::default()
    };
    runner::fuzz::<Fragments>(lang, iteration_limit, config);
}

/// A string built out of fragments, each either a sample of a pattern or a run of junk
#[derive(Debug, Clone, Eq, PartialEq)]
struct Fragments {
    pieces: Vec<String>,
}

impl<'lang> Arbitrary<'lang> for Fragments {
    type Config = Config;
    type StaticData = StaticData<'lang>;
    type SampleTable = SampleTable;
    type Shrink = Shrink;

    fn gen_static_data(lang: &'lang Lang, config: &Self::Config) -> Self::StaticData {
        // Not every pattern can be sampled (e.g. ones containing anchors), but those can still
        // be matched by the junk
        let generators = lang
            .repository()
            .matchers()
            .filter_map(|m| rand_regex::Regex::compile(m.source(), config.max_regex_repeats).ok())
            .collect_vec();
        StaticData {
            junk_len_distr: Geometric::new(1.0 / config.average_junk_length).unwrap(),
            stream_len_distr: Geometric::new(1.0 / config.average_length_fragments).unwrap(),
            lang,
            generators,
            junk_chars: JUNK_CHARS.chars().collect_vec(),
        }
    }

    fn gen_table(
        data: &Self::StaticData,
        rng: &mut impl Rng,
        _config: &Self::Config,
    ) -> Self::SampleTable {
        let mut fragments = (0..1000)
            .map(|_| {
                let len = rng.sample(data.junk_len_distr) as usize;
                (0..len)
                    .filter_map(|_| data.junk_chars.choose(rng))
                    .collect::<String>()
            })
            .collect_vec();
        if !data.generators.is_empty() {
            fragments.extend((0..3000).filter_map(|_| {
                let generator = data.generators.choose(rng)?;
                Some(rng.sample::<String, _>(generator))
            }));
        }
        SampleTable { fragments }
    }

    fn gen(
        data: &Self::StaticData,
        table: &Self::SampleTable,
        _config: &Self::Config,
        rng: &mut impl Rng,
    ) -> Self {
        let stream_length = rng.sample(data.stream_len_distr);
        let pieces = (0..stream_length)
            .filter_map(|_| table.fragments.choose(rng).cloned())
            .collect_vec();
        Self { pieces }
    }

    fn unparse(&self, _data: &Self::StaticData, s: &mut String) {
        s.clear();
        for piece in &self.pieces {
            s.push_str(piece);
        }
    }

    fn check(data: &Self::StaticData, s: &str) -> Result<(), String> {
        let tokens = data
            .lang
            .tokenize(s)
            .map_err(|e| format!("Tokenizing failed: {}", e))?;
        check_coverage(&tokens.tokens, s)?;

        let outline = Outline::from_tokens(&tokens.tokens);
        if let Some(mismatch) = outline.mismatched.first() {
            return Err(format!("Unbalanced close: {:?}", mismatch));
        }
        let force_closes = data.lang.tokenizer_config().unterminated == UnterminatedPolicy::ForceClose;
        if force_closes && !outline.is_balanced() {
            return Err(format!("Regions left open: {:?}", tokens.unclosed));
        }
        Ok(())
    }
}

/// Check that the tokens cover `s` exactly, and only split it on `char` boundaries
fn check_coverage(tokens: &[Token], s: &str) -> Result<(), String> {
    let mut pos = 0;
    for t in tokens {
        if t.start != pos || t.end < t.start {
            return Err(format!("Expected a token starting at {}, got {:?}", pos, t));
        }
        if !s.is_char_boundary(t.end) {
            return Err(format!("Token ends inside a char: {:?}", t));
        }
        pos = t.end;
    }
    if pos != s.len() {
        return Err(format!("Tokens stop at {} of {}", pos, s.len()));
    }
    Ok(())
}

/// Characters which commonly start or end regions, or aren't matched by anything
const JUNK_CHARS: &str = " \t\n{}[]()<>\"'`\\/*#,.;:=+-_0aZé€😀";

/// Configuration parameters for generating fragment strings
#[derive(Debug, Clone)]
struct Config {
    /// The average number of fragments in each generated string
    average_length_fragments: f64,
    /// The average length of each run of junk characters
    average_junk_length: f64,
    /// The maximum number of times an unbounded repetition is expanded when sampling a pattern
    max_regex_repeats: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            average_length_fragments: 1_000.0,
            average_junk_length: 3.0,
            max_regex_repeats: 8,
        }
    }
}

/// Static data for generating fragment strings of a given language
#[derive(Debug, Clone)]
struct StaticData<'lang> {
    junk_len_distr: Geometric,
    stream_len_distr: Geometric,
    lang: &'lang Lang,
    /// One generator per pattern of the grammar (if the pattern could be compiled for sampling)
    generators: Vec<rand_regex::Regex>,
    junk_chars: Vec<char>,
}

/// Table in which random samples are cached to speed up generation
#[derive(Debug, Clone)]
struct SampleTable {
    fragments: Vec<String>,
}

#[derive(Debug, Clone)]
struct Shrink(Fragments);

impl From<Fragments> for Shrink {
    fn from(s: Fragments) -> Self {
        Self(s)
    }
}

impl From<Shrink> for Fragments {
    fn from(s: Shrink) -> Self {
        s.0
    }
}

impl Deref for Shrink {
    type Target = Fragments;

    fn deref(&self) -> &Fragments {
        &self.0
    }
}

impl crate::Shrink for Shrink {
    /// First try removing whole fragments, then try removing the last `char` of each fragment
    fn smaller_cases<'s>(&'s self) -> Box<dyn Iterator<Item = Cow<'s, Self>> + 's> {
        let pieces = &self.0.pieces;
        let removals = (0..pieces.len()).map(move |idx| {
            let mut pieces = pieces.clone();
            pieces.remove(idx);
            Cow::Owned(Shrink(Fragments { pieces }))
        });
        let truncations = (0..pieces.len())
            .filter(move |&idx| !pieces[idx].is_empty())
            .map(move |idx| {
                let mut pieces = pieces.clone();
                pieces[idx].pop();
                Cow::Owned(Shrink(Fragments { pieces }))
            });
        Box::new(removals.chain(truncations))
    }
}
