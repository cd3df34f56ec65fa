/// `MM:SS` badge for a caption start time. Negative or non-finite input renders as `00:00`.
pub fn format_timestamp(seconds: f64) -> String {
	if !seconds.is_finite() || seconds <= 0.0 {
		return "00:00".to_string();
	}

	#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
	let whole = seconds.floor() as u64;
	format!("{:02}:{:02}", whole / 60, whole % 60)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_format_timestamp() {
		assert_eq!(format_timestamp(0.0), "00:00");
		assert_eq!(format_timestamp(9.99), "00:09");
		assert_eq!(format_timestamp(61.2), "01:01");
		assert_eq!(format_timestamp(3600.0), "60:00");
	}

	#[test]
	fn test_format_timestamp_degenerate_input() {
		assert_eq!(format_timestamp(-4.0), "00:00");
		assert_eq!(format_timestamp(f64::NAN), "00:00");
	}
}
