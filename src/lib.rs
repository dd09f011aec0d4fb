#![forbid(unsafe_code)]

//! Acquisition pipeline for auxiliary video metadata: viewer comments,
//! thumbnails and transcripts for the videos listed in CSV manifests.

pub mod cli;
pub mod comments;
pub mod config;
pub mod logging;
pub mod manifest;
pub mod outcome;
pub mod pipeline;
pub mod store;
pub mod thumbnails;
pub mod transcripts;
pub mod video_id;

#[cfg(test)]
mod test_support;
