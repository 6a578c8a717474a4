use crate::lang::profile::LanguageProfile;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LanguageProfileError {
    #[error("unknown language '{name}'{}", suggestion_suffix(.suggestion))]
    Unknown {
        name: String,
        suggestion: Option<String>,
    },

    #[error("cannot detect language of {path}: no extension (use --matcher)")]
    NoExtension { path: PathBuf },
}

impl LanguageProfileError {
    /// Build an `Unknown` error, suggesting the closest known extension.
    pub fn unknown(name: impl Into<String>) -> Self {
        let name = name.into();
        let needle = name.trim_start_matches('.').to_ascii_lowercase();
        let suggestion = LanguageProfile::all()
            .iter()
            .flat_map(|p| p.extensions.iter())
            .map(|ext| (strsim::jaro_winkler(&needle, ext), *ext))
            .filter(|(score, _)| *score > 0.8)
            .max_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, ext)| format!(".{ext}"));
        LanguageProfileError::Unknown { name, suggestion }
    }
}

fn suggestion_suffix(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(s) => format!(" (did you mean '{s}'?)"),
        None => String::new(),
    }
}
