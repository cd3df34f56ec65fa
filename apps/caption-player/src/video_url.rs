use once_cell::sync::Lazy;
use regex::Regex;

/// Watch, short, embed, live and legacy `/v/` links on youtube.com, youtube-nocookie.com
/// and youtu.be. The id must be followed by the end of the URL or a separator so a
/// 12-character id is not silently truncated.
static VIDEO_URL: Lazy<Option<Regex>> = Lazy::new(|| {
	Regex::new(
		r"^(?:https?://)?(?:(?:www|m|music)\.)?(?:youtube(?:-nocookie)?\.com/(?:watch\?(?:[^#\s]*&)?v=|(?:embed|shorts|live|v)/)|youtu\.be/)([A-Za-z0-9_-]{11})(?:[?&#/]\S*)?$",
	)
	.ok()
});

/// The 11-character video id of a remote video URL
pub fn extract_video_id(url: &str) -> Option<String> {
	let captures = VIDEO_URL.as_ref()?.captures(url.trim())?;
	captures.get(1).map(|m| m.as_str().to_string())
}
