#![allow(unreachable_pub)]

//! # Macros
//!
//! Procedural macros for the message hub infrastructure.
//!
//! ## Usage
//! ```toml
//! [dependencies]
//! msghub-derive.workspace = true
//! thiserror.workspace = true
//! ```
//!
//! The expansion refers to `::thiserror`, so consuming crates must depend on `thiserror`
//! themselves.

mod error;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// Turns an enum into an error type wired for the hub infrastructure.
///
/// # Features
///
/// * **Automatic Derives**: Injects `Debug` and `thiserror::Error` unless already derived.
/// * **Context Support**: Generates a companion `<Name>Ext` trait that adds `.context(..)`
///   to `Result<T, Name>` and to results of every wrapped source error type.
/// * **Source Conversions**: Implements `From<Source>` for variants carrying a `source` field
///   (or a field marked `#[source]`/`#[from]`), so `?` lifts upstream errors.
/// * **Internal Fallback**: Implements `From<&'static str>` and `From<String>` when an
///   `Internal { message, context }` variant exists.
/// * **`format_context`**: Emits a module-level helper that renders the optional context as
///   ` (context)` for use inside `#[error(..)]` strings.
///
/// # Requirements
///
/// 1. Only enums are accepted.
/// 2. Every variant uses named fields; tuple and unit variants are rejected.
/// 3. A variant with a source must also carry `context: Option<Cow<'static, str>>`.
///
/// # Example
///
/// ```rust,ignore
/// use msghub_derive::hub_error;
/// use std::borrow::Cow;
///
/// #[hub_error]
/// pub enum StoreError {
///     #[error("IO error{}: {source}", format_context(.context))]
///     Io { source: std::io::Error, context: Option<Cow<'static, str>> },
///
///     #[error("Internal fault{}: {message}", format_context(.context))]
///     Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
/// }
///
/// fn load() -> Result<Vec<u8>, StoreError> {
///     std::fs::read("snapshot.bin").context("Reading snapshot")
/// }
/// ```
#[proc_macro_attribute]
pub fn hub_error(_args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    error::expand(&input).into()
}
