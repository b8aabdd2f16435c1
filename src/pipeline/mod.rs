//! Pipeline stages for image-to-Markdown conversion.
//!
//! ```text
//! input ──▶ encode ──▶ llm
//! (path)    (base64)   (VLM)
//! ```
//!
//! 1. [`input`] : expand and check paths, scan batch directories
//! 2. [`encode`]: read the image and base64-wrap it for the request body
//! 3. [`llm`]   : the single network call to the vision model
//!
//! Writing the result lives in [`crate::convert`].

pub mod encode;
pub mod input;
pub mod llm;
