//! Document model types shared by every renderer.
//!
//! This module defines the format-agnostic intermediate representation that
//! sits between the loaders and the format renderers. A [`Document`] is built
//! once per input and only ever borrowed immutably afterwards, so the same
//! instance can be fanned out to several renderers at once.

mod document;
mod section;

pub use document::{Document, MetaValue, Metadata};
pub use section::{clamp_level, Section, TableData};
