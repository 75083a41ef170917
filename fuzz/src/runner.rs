use std::{
    fmt::Debug,
    time::{Duration, Instant},
};

use bramble::Lang;
use number_prefix::NumberPrefix;
use rand::{rngs::StdRng, SeedableRng};

use crate::{Arbitrary, Shrink};

/// How many samples are drawn from each sample table before it is regenerated
const SAMPLES_PER_TABLE: usize = 1_000;

/// Run the fuzzer on some component of Bramble, panicking with a minimal failing sample if any
/// sample breaks an invariant.
pub fn fuzz<'lang, A: Arbitrary<'lang> + Debug>(
    lang: &'lang Lang,
    iteration_limit: Option<usize>,
    config: A::Config,
) {
    let seed = rand::random::<u64>();
    println!("Fuzzing {} with seed {}", lang.name(), seed);
    let mut runner = Runner::<A>::new(lang, config, seed);
    if let Some(failure) = runner.run(iteration_limit) {
        dbg!(&failure.sample, &failure.text, &failure.reason);
        panic!("Tokenizer invariant broken (seed {})", seed);
    }
}

/// A sample which broke an invariant, along with its text and the reason it failed
#[derive(Debug)]
struct Failure<A> {
    sample: A,
    text: String,
    reason: String,
}

/// The state of one fuzzing session
struct Runner<'lang, A: Arbitrary<'lang>> {
    rng: StdRng,
    static_data: A::StaticData,
    config: A::Config,
    stats: Stats,
    /// Buffer into which each sample is unparsed
    text: String,
}

impl<'lang, A: Arbitrary<'lang> + Debug> Runner<'lang, A> {
    fn new(lang: &'lang Lang, config: A::Config, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            static_data: A::gen_static_data(lang, &config),
            config,
            stats: Stats::new(),
            text: String::new(),
        }
    }

    /// Run the mainloop of the fuzzer, returning the first (shrunk) failure
    fn run(&mut self, iteration_limit: Option<usize>) -> Option<Failure<A>> {
        loop {
            // Sample tables are regenerated every so often, so that samples aren't always drawn
            // from the same finite set
            let table = A::gen_table(&self.static_data, &mut self.rng, &self.config);
            for _ in 0..SAMPLES_PER_TABLE {
                let sample = A::gen(&self.static_data, &table, &self.config, &mut self.rng);
                if let Err(reason) = self.check(&sample) {
                    println!("Found a failing sample ({}), shrinking...", reason);
                    return Some(self.shrink(sample, reason));
                }

                self.stats.iterations += 1;
                let is_done = Some(self.stats.iterations) >= iteration_limit;
                self.stats.print_if_due(is_done);
                if is_done {
                    return None;
                }
            }
        }
    }

    /// Repeatedly replace the failing sample with the first of its smaller cases which also
    /// fails, until none of them fail
    fn shrink(&mut self, sample: A, reason: String) -> Failure<A> {
        let mut witness = A::Shrink::from(sample);
        let mut reason = reason;
        loop {
            let mut next_witness = None;
            for smaller_case in witness.smaller_cases() {
                if let Err(smaller_reason) = self.check(&smaller_case) {
                    next_witness = Some((smaller_case.into_owned(), smaller_reason));
                    break;
                }
            }
            match next_witness {
                Some((smaller_case, smaller_reason)) => {
                    witness = smaller_case;
                    reason = smaller_reason;
                }
                None => break,
            }
        }

        let sample: A = witness.into();
        self.text.clear();
        sample.unparse(&self.static_data, &mut self.text);
        Failure {
            sample,
            text: self.text.clone(),
            reason,
        }
    }

    fn check(&mut self, sample: &A) -> Result<(), String> {
        self.text.clear();
        sample.unparse(&self.static_data, &mut self.text);
        let start = Instant::now();
        let result = A::check(&self.static_data, &self.text);
        self.stats.bytes += self.text.len();
        self.stats.time_checking += start.elapsed();
        result
    }
}

/// Throughput statistics, printed roughly once a second
#[derive(Debug, Clone)]
struct Stats {
    start: Instant,
    last_print_secs: u64,
    iterations: usize,
    bytes: usize,
    time_checking: Duration,
}

impl Stats {
    fn new() -> Self {
        Self {
            start: Instant::now(),
            last_print_secs: 0,
            iterations: 0,
            bytes: 0,
            time_checking: Duration::ZERO,
        }
    }

    fn print_if_due(&mut self, force: bool) {
        let elapsed_secs = self.start.elapsed().as_secs();
        if elapsed_secs <= self.last_print_secs && !force {
            return;
        }
        self.last_print_secs = elapsed_secs;
        println!(
            "{} iters.  {} in {:?} = {}/s",
            self.iterations,
            format_bytes(self.bytes as f64),
            self.time_checking,
            format_bytes(self.bytes as f64 / self.time_checking.as_secs_f64())
        );
    }
}

/// Formats a (possibly fractional) number of bytes with a decimal SI prefix, e.g. `12.3 kB`
fn format_bytes(num: f64) -> String {
    match NumberPrefix::decimal(num) {
        NumberPrefix::Standalone(n) => format!("{:.0} bytes", n),
        NumberPrefix::Prefixed(prefix, n) => format!("{:.1} {}B", n, prefix),
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn format_bytes() {
        assert_eq!(super::format_bytes(12.0), "12 bytes");
        assert_eq!(super::format_bytes(12_300.0), "12.3 kB");
        assert_eq!(super::format_bytes(4_500_000.0), "4.5 MB");
    }
}
