//! Shared fixtures for the integration tests.
//!
//! All audio is synthesized in-process so tests never depend on checked-in
//! media files.

// Allow dead code in test fixtures - not every test binary uses every helper
#![allow(dead_code)]

pub mod audio_fixtures;
