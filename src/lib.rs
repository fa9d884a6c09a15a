//! mib2-l10n - Locale maintenance for the MIB2 Controller app
//!
//! Merges translation patches into the app's JSON locale files, scans the
//! TSX/TS sources for hardcoded text, alert calls and translation key usage,
//! translates locales through glossaries or a chat completion endpoint, and
//! renders the store listing images and promo video with ffmpeg.

pub mod cli;
pub mod config;
pub mod error;
pub mod keys;
pub mod locale;
pub mod patch;
pub mod scan;
pub mod translate;
pub mod media;
pub mod assets;
pub mod promo;
pub mod workflow;
