//! Glyphs drawn on the certificate and language → flag resolution.

/// Placeholder for language codes without a known flag.
pub const UNKNOWN_FLAG: &str = "🏳️";

/// Decorative glyphs used by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Glyph {
    /// Active streak
    Fire,
    /// No active streak
    Snowflake,
    Star,
    Globe,
    Pen,
    Flag(&'static str),
}

impl Glyph {
    pub fn as_str(&self) -> &'static str {
        match self {
            Glyph::Fire => "🔥",
            Glyph::Snowflake => "❄️",
            Glyph::Star => "⭐️",
            Glyph::Globe => "🌍",
            Glyph::Pen => "🖊️",
            Glyph::Flag(f) => *f,
        }
    }
}

/// Streak icon: lit only for a strictly positive streak. Absent, zero and
/// negative values all resolve to the "no streak" glyph.
pub fn streak_glyph(streak: Option<i64>) -> Glyph {
    match streak {
        Some(n) if n > 0 => Glyph::Fire,
        _ => Glyph::Snowflake,
    }
}

/// Flag for a language code. Total: unknown or missing codes resolve to
/// [`UNKNOWN_FLAG`].
pub fn flag(code: Option<&str>) -> &'static str {
    let Some(code) = code else {
        return UNKNOWN_FLAG;
    };
    let base = code
        .trim()
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();

    match base.as_str() {
        "en" => "🇺🇸",
        "es" => "🇪🇸",
        "fr" => "🇫🇷",
        "de" => "🇩🇪",
        "it" => "🇮🇹",
        "pt" => "🇧🇷",
        "ja" => "🇯🇵",
        "ko" => "🇰🇷",
        // Duolingo uses zs/zc for simplified Chinese and Cantonese
        "zh" | "zs" => "🇨🇳",
        "zc" | "yue" => "🇭🇰",
        "ru" => "🇷🇺",
        "ar" => "🇸🇦",
        "hi" => "🇮🇳",
        "nl" | "dn" => "🇳🇱",
        "sv" => "🇸🇪",
        "no" | "nb" => "🇳🇴",
        "da" => "🇩🇰",
        "fi" => "🇫🇮",
        "pl" => "🇵🇱",
        "tr" => "🇹🇷",
        "el" => "🇬🇷",
        "he" => "🇮🇱",
        "uk" => "🇺🇦",
        "vi" => "🇻🇳",
        "id" => "🇮🇩",
        "cs" => "🇨🇿",
        "hu" => "🇭🇺",
        "ro" => "🇷🇴",
        "ga" => "🇮🇪",
        "cy" => "🏴󠁧󠁢󠁷󠁬󠁳󠁿",
        "gd" => "🏴󠁧󠁢󠁳󠁣󠁴󠁿",
        "sw" => "🇰🇪",
        "ht" => "🇭🇹",
        "tl" => "🇵🇭",
        "zu" => "🇿🇦",
        "eo" => "💚",
        "la" => "🏛️",
        "haw" => "🌺",
        "hv" => "🐉",
        "kl" | "tlh" => "🖖",
        "yi" => "🕍",
        "nv" => "🏜️",
        _ => UNKNOWN_FLAG,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn streak_zero_and_absent_are_unlit() {
        assert_eq!(streak_glyph(Some(0)), Glyph::Snowflake);
        assert_eq!(streak_glyph(None), streak_glyph(Some(0)));
        assert_eq!(streak_glyph(Some(-3)), Glyph::Snowflake);
        assert_eq!(streak_glyph(Some(15)), Glyph::Fire);
    }

    #[test]
    fn known_codes_ignore_case_and_region() {
        assert_eq!(flag(Some("es")), "🇪🇸");
        assert_eq!(flag(Some("FR")), "🇫🇷");
        assert_eq!(flag(Some("pt-BR")), "🇧🇷");
        assert_eq!(flag(Some("zh_CN")), "🇨🇳");
        assert_eq!(flag(Some("zs")), "🇨🇳");
    }

    #[test]
    fn unknown_codes_resolve_to_placeholder() {
        for code in ["", "  ", "xx", "-", "qq-ZZ", "🙂", "eeeeeeeeeeeeeeeeeeeeeee"] {
            assert_eq!(flag(Some(code)), UNKNOWN_FLAG, "code {:?}", code);
        }
        assert_eq!(flag(None), UNKNOWN_FLAG);
    }
}
