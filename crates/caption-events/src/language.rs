use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// ISO-639-1 style caption language code, e.g. `hi` or `en`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Language(String);

impl Language {
	pub fn new(code: impl AsRef<str>) -> Self {
		Self(code.as_ref().trim().to_ascii_lowercase())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for Language {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unsupported caption language `{0}`")]
pub struct UnsupportedLanguage(pub String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageInfo {
	pub code: Language,
	pub name: String,
	/// Locale form the transcription backend expects, e.g. `hi-IN`.
	pub locale: String,
}

// code, display name, backend locale
const BUILTIN: [(&str, &str, &str); 10] = [
	("hi", "Hindi", "hi-IN"),
	("bn", "Bengali", "bn-IN"),
	("te", "Telugu", "te-IN"),
	("mr", "Marathi", "mr-IN"),
	("ta", "Tamil", "ta-IN"),
	("gu", "Gujarati", "gu-IN"),
	("kn", "Kannada", "kn-IN"),
	("ml", "Malayalam", "ml-IN"),
	("pa", "Punjabi", "pa-IN"),
	("en", "English", "en-IN"),
];

/// The fixed set of languages captions may be requested in.
///
/// Defaults to the built-in catalogue; deployments extend it through configuration
/// with [`SupportedLanguages::from_codes`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportedLanguages {
	entries: Vec<LanguageInfo>,
}

impl Default for SupportedLanguages {
	fn default() -> Self {
		Self::from_codes(BUILTIN.iter().map(|(code, _, _)| *code))
	}
}

impl SupportedLanguages {
	/// Build a catalogue from codes. Known codes keep their display name and locale,
	/// unknown ones use the code for both. Duplicates and blanks are skipped.
	pub fn from_codes<I, S>(codes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let mut entries: Vec<LanguageInfo> = Vec::new();

		for code in codes {
			let code = Language::new(code);
			if code.as_str().is_empty() || entries.iter().any(|e| e.code == code) {
				continue;
			}

			let info = match BUILTIN.iter().find(|(c, _, _)| *c == code.as_str()) {
				Some((_, name, locale)) => LanguageInfo {
					code,
					name: (*name).to_string(),
					locale: (*locale).to_string(),
				},
				None => LanguageInfo {
					name: code.as_str().to_string(),
					locale: code.as_str().to_string(),
					code,
				},
			};
			entries.push(info);
		}

		Self { entries }
	}

	/// Resolve a user-supplied code against the catalogue.
	pub fn resolve(&self, code: &str) -> Result<Language, UnsupportedLanguage> {
		let language = Language::new(code);
		if self.contains(&language) {
			Ok(language)
		} else {
			Err(UnsupportedLanguage(code.to_string()))
		}
	}

	pub fn contains(&self, language: &Language) -> bool {
		self.entries.iter().any(|e| &e.code == language)
	}

	pub fn info(&self, language: &Language) -> Option<&LanguageInfo> {
		self.entries.iter().find(|e| &e.code == language)
	}

	pub fn iter(&self) -> impl Iterator<Item = &LanguageInfo> {
		self.entries.iter()
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}
