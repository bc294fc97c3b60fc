/// Frame numbers are signed so that fade arithmetic near frame 0 never wraps.
pub type Frame = i64;

/// Parse a frame number the way a browser number field does: optional
/// surrounding whitespace, an optional sign, then the leading run of digits.
/// Trailing garbage is ignored (`"12px"` is `12`); no digits at all is `None`.
pub fn parse_frame(input: &str) -> Option<Frame> {
    let trimmed = input.trim_start();
    let (sign, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (-1, &trimmed[1..]),
        Some(b'+') => (1, &trimmed[1..]),
        _ => (1, trimmed),
    };
    let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits_len == 0 {
        return None;
    }
    rest[..digits_len].parse::<Frame>().ok().map(|n| sign * n)
}
