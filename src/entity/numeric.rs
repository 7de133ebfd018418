/// Lenient number extraction for free-text metric cells.
///
/// Keeps digits, decimal points and a minus sign that precedes every other
/// kept character, then parses what is left. Returns `None` when nothing
/// parseable remains or the result is not finite.
///
/// ```
/// use counsel_rank::entity::tolerant_number;
///
/// assert_eq!(tolerant_number("Rank: 5th"), Some(5.0));
/// assert_eq!(tolerant_number("n/a"), None);
/// ```
pub fn tolerant_number(raw: &str) -> Option<f64> {
    let mut cleaned = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '0'..='9' | '.' => cleaned.push(c),
            '-' if cleaned.is_empty() => cleaned.push(c),
            _ => {}
        }
    }

    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}
