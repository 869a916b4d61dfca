//! Weighted and uniform selection.
//!
//! Every selection consumes exactly one draw from the generator, which keeps
//! replay checkpoints aligned regardless of which option is picked.

use serde::{Deserialize, Serialize};

use crate::error::{ChoiceError, Result};
use crate::mt::Mt19937;

/// A single weighted option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightedOption<T> {
    /// Selection weight, always positive
    pub weight: u32,
    /// The option value
    pub value: T,
}

/// An ordered set of weighted options with a positive total weight.
///
/// The invariant is checked once at construction so selection itself cannot
/// fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightedSet<T> {
    options: Vec<WeightedOption<T>>,
    total: u32,
}

impl<T> WeightedSet<T> {
    /// Build a set from `(weight, value)` pairs.
    ///
    /// Rejects empty input, zero weights and totals that overflow `u32`.
    pub fn new<I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (u32, T)>,
    {
        let mut options = Vec::new();
        let mut total: u32 = 0;

        for (index, (weight, value)) in pairs.into_iter().enumerate() {
            if weight == 0 {
                return Err(ChoiceError::ZeroWeight { index });
            }
            total = total
                .checked_add(weight)
                .ok_or(ChoiceError::WeightOverflow)?;
            options.push(WeightedOption { weight, value });
        }

        if options.is_empty() {
            return Err(ChoiceError::EmptySet);
        }

        Ok(Self { options, total })
    }

    /// Build a set where every option has weight 1.
    pub fn uniform<I>(values: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
    {
        Self::new(values.into_iter().map(|v| (1, v)))
    }

    /// Pick one option. One draw.
    pub fn choose(&self, rng: &mut Mt19937) -> &T {
        &self.options[self.pick_index(rng)].value
    }

    /// Pick the index of one option. One draw.
    pub fn pick_index(&self, rng: &mut Mt19937) -> usize {
        let mut roll = rng.next_u32() % self.total;
        for (i, option) in self.options.iter().enumerate() {
            if roll < option.weight {
                return i;
            }
            roll -= option.weight;
        }
        // Unreachable while `total` equals the sum of weights.
        self.options.len() - 1
    }

    /// Sum of all weights.
    pub fn total_weight(&self) -> u32 {
        self.total
    }

    /// Number of options.
    pub fn len(&self) -> usize {
        self.options.len()
    }

    /// Always false; kept for API symmetry with collections.
    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// Iterate over the options in order.
    pub fn iter(&self) -> impl Iterator<Item = &WeightedOption<T>> {
        self.options.iter()
    }
}

/// Pick one option from a weighted set. One draw.
pub fn choose_weighted<'a, T>(set: &'a WeightedSet<T>, rng: &mut Mt19937) -> &'a T {
    set.choose(rng)
}

/// Pick one item uniformly. One draw.
pub fn choose_uniform<'a, T>(items: &'a [T], rng: &mut Mt19937) -> Result<&'a T> {
    if items.is_empty() {
        return Err(ChoiceError::EmptySet);
    }
    let index = rng.next_u32() as usize % items.len();
    Ok(&items[index])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty_and_zero() {
        let empty: Vec<(u32, &str)> = Vec::new();
        assert_eq!(WeightedSet::new(empty).unwrap_err(), ChoiceError::EmptySet);
        assert_eq!(
            WeightedSet::new(vec![(2, "a"), (0, "b")]).unwrap_err(),
            ChoiceError::ZeroWeight { index: 1 }
        );
        assert_eq!(
            WeightedSet::new(vec![(u32::MAX, "a"), (1, "b")]).unwrap_err(),
            ChoiceError::WeightOverflow
        );
    }

    #[test]
    fn test_one_to_three_convergence() {
        let set = WeightedSet::new(vec![(1, 'A'), (3, 'B')]).unwrap();
        let mut rng = Mt19937::new(20240);

        let mut a = 0u32;
        let mut b = 0u32;
        for _ in 0..4_000 {
            match set.choose(&mut rng) {
                'A' => a += 1,
                _ => b += 1,
            }
        }

        let ratio = f64::from(b) / f64::from(a);
        assert!((2.6..3.4).contains(&ratio), "ratio {ratio} (A={a}, B={b})");
    }

    #[test]
    fn test_exactly_one_draw() {
        let set = WeightedSet::new(vec![(5, 1), (7, 2), (1, 3)]).unwrap();
        let mut a = Mt19937::new(8);
        let mut b = Mt19937::new(8);

        set.choose(&mut a);
        b.next_u32();
        assert_eq!(a.next_u32(), b.next_u32());

        choose_uniform(&[1, 2, 3], &mut a).unwrap();
        b.next_u32();
        assert_eq!(a.next_u32(), b.next_u32());
    }

    #[test]
    fn test_cumulative_walk() {
        // With weights 1 and 3, a roll of 0 picks the first option and
        // rolls 1..=3 pick the second.
        let set = WeightedSet::new(vec![(1, "first"), (3, "second")]).unwrap();
        let mut rng = Mt19937::new(1);
        let mut probe = rng.clone();
        for _ in 0..64 {
            let expected = if probe.next_u32() % 4 == 0 {
                "first"
            } else {
                "second"
            };
            assert_eq!(*set.choose(&mut rng), expected);
        }
    }

    #[test]
    fn test_uniform_empty_is_error() {
        let mut rng = Mt19937::default();
        let items: [u8; 0] = [];
        assert_eq!(
            choose_uniform(&items, &mut rng).unwrap_err(),
            ChoiceError::EmptySet
        );
    }
}
