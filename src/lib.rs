//! cardsync: contact records from vision-model output.
//!
//! Raw model text goes through the [`extraction`] pipeline (interpreter,
//! fallback extractor, validator) and comes out as validated contact
//! records. The [`projection`] engine maps those records onto a live
//! destination schema. [`verification`] checks the model API credential
//! before a batch starts, and [`batch`] ties the stages together.
//!
//! See `DESIGN.md` for the architecture notes.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod credentials;
pub mod http;
pub mod logging;
pub mod text;

pub mod extraction;
pub mod projection;

pub mod destinations;
pub mod verification;

pub mod batch;
