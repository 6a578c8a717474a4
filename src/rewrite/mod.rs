//! Rewrite templates: substitution of match environments into output text.
//!
//! # Template syntax
//!
//! ```text
//! :[x]  :[[x]]  :[x:e]      value bound to x
//! :[x].UPPERCASE            value through a property
//! :[id()]                   new identifier each time
//! :[id(label)]              one identifier per label per match
//! ```
//!
//! Properties: `value`, `length`, `Capitalize`, `uncapitalize`,
//! `UPPERCASE`, `lowercase`, `UpperCamelCase`, `lowerCamelCase`,
//! `UPPER_SNAKE_CASE`, `lower_snake_case`.
//!
//! A rule may instead carry a [`RegexFix`], which runs a regular expression
//! substitution over the matched text.

pub mod case;
pub mod errors;
mod fresh;
mod properties;
mod regex_fix;
mod render;
mod template;

pub use errors::RewriteError;
pub use fresh::{identifiers, FreshIds, FreshScope};
pub use properties::Property;
pub use regex_fix::RegexFix;
pub use render::{apply_regex_fix, apply_rewrite, render, Fix, Replacement, Rewritten};
pub use template::{RewriteTemplate, TemplatePart};
