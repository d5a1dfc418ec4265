//! Message formatting for notification channels.

use crate::domain::ConfirmedGlitch;

/// Format a glitch into a plain-text message (webhook channels).
#[must_use]
pub fn format_glitch_message(glitch: &ConfirmedGlitch) -> String {
    let title = truncate(&glitch.title, 80);
    let original = glitch
        .original_price
        .map_or_else(String::new, |p| format!(" (was ${p:.2})"));

    let mut msg = format!(
        "🚨 Price glitch: {title}\n\
         💵 ${price:.2}{original} — {discount:.0}% off\n\
         🏬 {retailer} · {category}\n\
         ✅ Confidence: {confidence:.0}%",
        price = glitch.price,
        discount = glitch.discount_percentage,
        retailer = glitch.retailer,
        category = glitch.category,
        confidence = glitch.confidence,
    );

    if !glitch.reasoning.is_empty() {
        msg.push_str(&format!("\n💡 {}", truncate(&glitch.reasoning, 160)));
    }

    msg
}

/// Format a glitch for Telegram `MarkdownV2`.
#[must_use]
pub fn format_glitch_markdown(glitch: &ConfirmedGlitch) -> String {
    let title = truncate(&glitch.title, 80);
    let original = glitch
        .original_price
        .map_or_else(String::new, |p| format!(" \\(was ${p:.2}\\)"));

    format!(
        "🚨 *Price Glitch*\n\
         \n\
         📋 {}\n\
         💵 `${:.2}`{} — `{:.0}%` off\n\
         🏬 {}\n\
         ✅ Confidence: `{:.0}%`",
        escape_markdown(&title),
        glitch.price,
        original,
        glitch.discount_percentage,
        escape_markdown(&glitch.retailer),
        glitch.confidence
    )
}

/// Truncate a string with ellipsis (Unicode-safe).
pub fn truncate(s: &str, max_chars: usize) -> String {
    let char_count = s.chars().count();
    if char_count > max_chars {
        let truncated: String = s.chars().take(max_chars).collect();
        format!("{}...", truncated)
    } else {
        s.to_string()
    }
}

/// Escape special characters for Telegram `MarkdownV2`.
pub fn escape_markdown(text: &str) -> String {
    let special_chars = [
        '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
    ];
    let mut result = String::with_capacity(text.len() * 2);

    for c in text.chars() {
        if special_chars.contains(&c) {
            result.push('\\');
        }
        result.push(c);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::glitch;

    #[test]
    fn plain_message_carries_price_and_discount() {
        let msg = format_glitch_message(&glitch());
        assert!(msg.contains("$120.00"));
        assert!(msg.contains("80% off"));
        assert!(msg.contains("amazon"));
    }

    #[test]
    fn markdown_message_escapes_title() {
        let mut g = glitch();
        g.title = "50% off! (limited)".into();
        let msg = format_glitch_markdown(&g);
        assert!(msg.contains("50% off\\! \\(limited\\)"));
    }

    #[test]
    fn test_escape_markdown() {
        assert_eq!(escape_markdown("hello"), "hello");
        assert_eq!(escape_markdown("hello_world"), "hello\\_world");
        assert_eq!(escape_markdown("test.com"), "test\\.com");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world", 5), "hello...");
        assert_eq!(truncate("日本語テスト", 3), "日本語...");
    }
}
