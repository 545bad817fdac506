//! Mutation and crossover over genome bit strings.
//!
//! Operators work on the textual `'0'`/`'1'` form so a replacement pair can
//! be supplied from outside the crate. Whatever they return is checked
//! against the length/alphabet contract before it becomes a [`Genome`].
//!
//! [`Genome`]: crate::genome::Genome

use rand::{Rng, RngCore};

use crate::error::{GenomeError, OperatorError};
use crate::genome::{Genome, GenomeLayout};

/// Probability that the default crossover switches parent after each bit.
pub const CROSSOVER_SWITCH_PROBABILITY: f64 = 0.4;

/// A pluggable mutate/crossover pair.
///
/// Implementations must keep the genome length and only ever write `'0'`
/// or `'1'`; anything else is rejected by the caller.
pub trait GeneticOperators {
    fn mutate(&self, bits: &mut String, rng: &mut dyn RngCore);

    /// Builds a child from two equal length parents.
    fn crossover(&self, a: &str, b: &str, rng: &mut dyn RngCore) -> String;

    fn name(&self) -> &str {
        "custom"
    }
}

/// Single random bit flip, and a parent-switching multi-point crossover.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultOperators;

impl GeneticOperators for DefaultOperators {
    fn mutate(&self, bits: &mut String, rng: &mut dyn RngCore) {
        if bits.is_empty() {
            return;
        }
        let index = rng.random_range(0..bits.len());
        let flipped = if bits.as_bytes()[index] == b'0' { "1" } else { "0" };
        bits.replace_range(index..=index, flipped);
    }

    fn crossover(&self, a: &str, b: &str, rng: &mut dyn RngCore) -> String {
        let parents = [a.as_bytes(), b.as_bytes()];
        let mut current = usize::from(rng.random_bool(0.5));
        let mut child = String::with_capacity(a.len());
        for i in 0..a.len() {
            child.push(char::from(parents[current][i]));
            if rng.random_bool(CROSSOVER_SWITCH_PROBABILITY) {
                current = 1 - current;
            }
        }
        child
    }

    fn name(&self) -> &str {
        "default"
    }
}

/// Checks the length/alphabet contract for an operator's output.
pub fn check_bits(bits: &str, expected_len: usize) -> Result<(), GenomeError> {
    if bits.is_empty() {
        return Err(GenomeError::Empty);
    }
    if bits.len() != expected_len {
        return Err(GenomeError::WrongLength {
            expected: expected_len,
            actual: bits.len(),
        });
    }
    if let Some((position, found)) = bits.char_indices().find(|&(_, c)| c != '0' && c != '1') {
        return Err(GenomeError::NonBinary { position, found });
    }
    Ok(())
}

/// Runs a candidate pair once on random genomes and reports which half of
/// the contract it breaks, if any.
pub fn check_operators(
    operators: &dyn GeneticOperators,
    layout: GenomeLayout,
    rng: &mut dyn RngCore,
) -> Result<(), OperatorError> {
    let a = Genome::random(layout, rng);
    let b = Genome::random(layout, rng);
    a.mutated(operators, rng)?;
    Genome::crossover(&a, &b, operators, rng)?;
    Ok(())
}
