//! Object model for the targeting side of an ad server client.
//!
//! # Overview
//!
//! Targetable things (ad units, geographies, custom key/values and so on) are plain [`Target`]
//! values. They combine into a [`TargetingCriterion`], a boolean expression over targets built
//! with AND, OR and NOT. Criteria compare by meaning rather than by construction order, so
//! `a & (b & c)` equals `(c & a) & b`.
//!
//! Hierarchical targets arrive from the server as flat records that point at their parent.
//! [`NodeTree::build`] turns them into a navigable tree, and a [`TreeBuilder`] does the same for
//! records pulled from a [`TargetSource`].
//!
//! Every model converts to and from a JSON [`record::Document`] through the [`Record`] trait.
//! Documents of polymorphic values carry their type under a reserved `_metadata` key, so a
//! criterion or tree can be stored and rebuilt without knowing its contents up front.
//!
//! # Error Handling
//!
//! Errors are represented by the [`Error`] enum. They all describe bad input (an impossible
//! criterion, an unknown document type, a broken hierarchy) and are never worth retrying.
//!
//! # Logging
//!
//! The package uses the [`log`](https://docs.rs/log/latest/log/) crate for logging
//! messages under the `adtargeting` target. Consider integrating a `log`-compatible logger
//! implementation for visibility into tree construction and document decoding.
//!
//! # Examples
//!
//! A runnable example lives in the `demos/simple` directory of the repository.

#![warn(rustdoc::missing_crate_level_docs)]
#![warn(missing_docs)]

mod config;
mod error;
pub mod record;
mod targeting;
mod tree;

pub use config::TreeBuilderConfig;
pub use error::{Error, Result};
pub use record::{Model, Record};
pub use targeting::*;
pub use tree::{NodeTree, TargetSource, TargetType, TreeBuilder};
