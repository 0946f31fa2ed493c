//! Command handlers.
//!
//! This module contains handlers for the generate, cleanup, cleanup-s3 and
//! sample-pdfs commands.

pub mod args;
pub mod cleanup;
pub mod generate;
pub mod sample_pdfs;

pub use args::{CleanupArgs, CleanupS3Args, GenerateArgs, SamplePdfsArgs};
