//! Title text handling
//!
//! Normalization, tokenization and script detection shared by the
//! similarity scorer, the resolver and query expansion.

mod normalize;

pub use normalize::*;
