//! Pipeline stages for URL-to-PDF conversion.
//!
//! Each submodule implements exactly one transformation step and consumes
//! the previous step's artifact.
//!
//! ## Data Flow
//!
//! ```text
//! validate ──▶ fetch ──▶ platform ──▶ strip ──▶ normalize ──┐
//!  (URL)     (HTTP GET)  (per-host)   (ads)     (blocks)     ├─▶ layout ──▶ render
//!                 └──────────────▶ metadata ─────────────────┘  (pages)    (pdfium)
//! ```
//!
//! 1. [`validate`]  — reject malformed, non-http(s) or disallowed URLs
//! 2. [`fetch`]     — one bounded GET through an injected [`fetch::Transport`];
//!    the only stage with network I/O
//! 3. [`platform`]  — drop known page furniture for Medium, WordPress,
//!    Blogger and Substack
//! 4. [`strip`]     — generic ad, navigation and script removal
//! 5. [`normalize`] — markup to typed [`crate::document::ContentBlock`]s
//! 6. [`metadata`]  — title, author, date and canonical URL
//! 7. [`layout`]    — word-wrap and paginate; pure arithmetic
//! 8. [`render`]    — replay the layout onto a PDF surface; runs in
//!    `spawn_blocking` because pdfium is not async-safe

pub mod fetch;
pub mod layout;
pub mod metadata;
pub mod normalize;
pub mod platform;
pub mod render;
pub mod strip;
pub mod validate;
