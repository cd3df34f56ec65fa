/// Lines the headless player reads from stdin
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerCommand {
	/// `media <path|url>`
	Media(String),
	/// `lang <code>`
	Language(String),
	Reconnect,
	Quit,
}

impl PlayerCommand {
	pub fn parse(line: &str) -> Result<Self, String> {
		let line = line.trim();
		let (word, rest) = line.split_once(char::is_whitespace).map_or((line, ""), |(w, r)| (w, r.trim()));

		match (word.to_ascii_lowercase().as_str(), rest) {
			("media" | "open", "") => Err("usage: media <path|url>".to_string()),
			("media" | "open", target) => Ok(Self::Media(target.to_string())),
			("lang" | "language", "") => Err("usage: lang <code>".to_string()),
			("lang" | "language", code) => Ok(Self::Language(code.to_string())),
			("reconnect", _) => Ok(Self::Reconnect),
			("quit" | "exit", _) => Ok(Self::Quit),
			("", _) => Err("empty command".to_string()),
			(other, _) => Err(format!("unknown command `{other}` (media, lang, reconnect, quit)")),
		}
	}
}
