//! jsmash Core - Deterministic randomness for the generation engine.
//!
//! This crate provides the leaf types every other jsmash crate builds on:
//!
//! - [`mt`]: The MT19937 pseudo-random generator with full state export and import
//! - [`choice`]: Weighted and uniform selection backed by the generator
//! - [`error`]: Contract-violation errors raised by selection
//!
//! # Reproducibility
//!
//! Every draw made during generation goes through a single [`Mt19937`]
//! instance owned by the caller. Replay depends on the exact number of draws
//! each operation consumes, so every helper documents its draw count.
//!
//! # Example
//!
//! ```
//! use jsmash_core::{Mt19937, WeightedSet};
//!
//! let mut rng = Mt19937::new(5489);
//! assert_eq!(rng.next_u32(), 3499211612);
//!
//! let set = WeightedSet::new(vec![(1, "rare"), (3, "common")]).unwrap();
//! let picked = set.choose(&mut rng);
//! assert!(*picked == "rare" || *picked == "common");
//! ```

pub mod choice;
pub mod error;
pub mod mt;

pub use choice::{choose_uniform, choose_weighted, WeightedOption, WeightedSet};
pub use error::ChoiceError;
pub use mt::{Mt19937, PrngState, DEFAULT_SEED, STATE_WORDS};
