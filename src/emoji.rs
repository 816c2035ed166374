const EMOJIS: &[(&str, &str)] = &[
    ("happy", "😊"),
    ("sad", "😢"),
    ("angry", "😠"),
    ("neutral", "😐"),
    ("surprised", "😲"),
    ("fearful", "😰"),
    ("disgusted", "🤢"),
    ("excited", "🤩"),
];

const FALLBACK: &str = "😐";

/// Emoji shown next to an emotion label. Unknown labels get a neutral face.
pub fn for_label(label: &str) -> &'static str {
    EMOJIS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(label.trim()))
        .map(|(_, emoji)| *emoji)
        .unwrap_or(FALLBACK)
}
