//! Language profiles: data-driven lexical descriptions of source languages.
//!
//! The matcher is syntax-light, so a language is fully described by its
//! comment markers, string quotes and delimiter pairs. Profiles are selected
//! by file extension or forced with `--matcher`.

pub mod errors;
pub mod profile;

pub use errors::LanguageProfileError;
pub use profile::LanguageProfile;
