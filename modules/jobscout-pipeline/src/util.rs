use std::time::Duration;

/// Sleep for a random duration inside the configured delay window.
/// Self-imposed pacing between page loads and person-level actions.
pub(crate) async fn jitter_delay(min_ms: u64, max_ms: u64) {
    if max_ms == 0 {
        return;
    }
    let ms = {
        let mut rng = rand::rng();
        rand::Rng::random_range(&mut rng, min_ms..=max_ms.max(min_ms))
    };
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

/// Truncate text to `max` bytes on a char boundary. Keeps judge prompts
/// inside token limits without splitting a multi-byte character.
pub(crate) fn clip(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Trim a judge reason to at most two sentences for concise logging.
pub(crate) fn short_reason(reason: &str) -> String {
    let trimmed = reason.trim();
    if trimmed.is_empty() {
        return "No reason provided".to_string();
    }
    let mut out = String::new();
    let mut sentences = 0;
    for ch in trimmed.chars() {
        out.push(ch);
        if matches!(ch, '.' | '!' | '?') {
            sentences += 1;
            if sentences == 2 {
                break;
            }
        }
    }
    let out = out.trim().to_string();
    if out.is_empty() {
        trimmed.chars().take(240).collect()
    } else {
        out
    }
}
