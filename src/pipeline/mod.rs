//! Pipeline stages for strip split/merge runs.
//!
//! Each submodule implements exactly one step and is usable on its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ order ──▶ split | merge ──▶ encode ──▶ package
//! (folder/   (file-name   (bands or       (RGB →      (zip, memory
//!  buffers)   numbers)     stacked groups) JPEG/PNG)   or atomic file)
//! ```
//!
//! 1. [`input`]   decode accepted files into an [`input::ImageSet`]
//! 2. [`order`]   stable natural sort by numbers in file names
//! 3. [`split`]   one image → `P` equal-height bands
//! 4. [`merge`]   `N` images → `ceil(N / K)` vertically stacked strips
//! 5. [`encode`]  alpha flattening and JPEG/PNG encoding
//! 6. [`package`] zip archive with unique, caller-chosen entry names

pub mod encode;
pub mod input;
pub mod merge;
pub mod order;
pub mod package;
pub mod split;
