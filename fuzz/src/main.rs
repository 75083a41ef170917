//! Automated random testing and benchmarking of Bramble's tokenizer.
//!
//! Usage: `fuzz [LANG_FILE] [ITERATIONS]`

mod runner;
mod tokenizer;

use std::{borrow::Cow, ops::Deref};

use bramble::Lang;
use rand::Rng;

fn main() {
    let mut args = std::env::args().skip(1);
    let lang_path = args.next().unwrap_or_else(|| "grammars/json.toml".to_owned());
    let iteration_limit = args.next().and_then(|s| s.parse::<usize>().ok());

    let lang = match Lang::load_file(&lang_path) {
        Ok(lang) => lang,
        Err(e) => {
            eprintln!("Can't load {}: {}", lang_path, e);
            std::process::exit(1);
        }
    };
    // Average length should be around 1k fragments
    tokenizer::fuzz(&lang, iteration_limit.or(Some(10_000)), 1_000.0);
}

pub trait Arbitrary<'lang>: Sized + Clone {
    /// Configuration parameters passed into the [`fuzz`] function
    type Config: Default;
    /// Static data generated once before entering the fuzzing loop
    type StaticData;
    /// Sample tables generated every couple of thousand fuzzing iterations.  This allows the
    /// program to cache commonly computed values (e.g. samples of each pattern) to speed up sample
    /// generation.
    type SampleTable;
    /// A shrunk instance of `Self`.  Extra state can be added to this to implement more complex
    /// shrinking strategies.
    type Shrink: Shrink + From<Self> + Into<Self> + Deref<Target = Self>;

    /* STATIC TABLE GENERATION */
    fn gen_static_data(lang: &'lang Lang, config: &Self::Config) -> Self::StaticData;
    fn gen_table(
        data: &Self::StaticData,
        rng: &mut impl Rng,
        config: &Self::Config,
    ) -> Self::SampleTable;

    /* TESTING */
    /// Create a new sample to test
    fn gen(
        data: &Self::StaticData,
        table: &Self::SampleTable,
        config: &Self::Config,
        rng: &mut impl Rng,
    ) -> Self;
    /// Write this sample to a string
    fn unparse(&self, data: &Self::StaticData, s: &mut String);
    /// Run the component under test on a string generated by `unparse`, returning a description
    /// of the first invariant which doesn't hold
    fn check(data: &Self::StaticData, s: &str) -> Result<(), String>;
}

pub trait Shrink: Clone {
    fn smaller_cases<'s>(&'s self) -> Box<dyn Iterator<Item = Cow<'s, Self>> + 's>;
}
