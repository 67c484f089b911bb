/// Artifact file naming

use super::ArtifactFormat;

/// Stem used when nothing of the user's name survives sanitizing.
pub const FALLBACK_FILE_STEM: &str = "duolingo_user";

const MAX_STEM_CHARS: usize = 64;
const FORBIDDEN: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];
const RESERVED: &[&str] = &[
    "con", "prn", "aux", "nul", "com1", "com2", "com3", "com4", "com5", "com6", "com7", "com8", "com9", "lpt1",
    "lpt2", "lpt3", "lpt4", "lpt5", "lpt6", "lpt7", "lpt8", "lpt9",
];

/// Make `name` safe to use as a file stem on every common filesystem.
pub fn sanitize_file_stem(name: &str) -> String {
    let mut stem: String = name
        .chars()
        .filter(|c| !FORBIDDEN.contains(c) && !c.is_control())
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect();

    stem = stem.trim_matches(|c| c == '.' || c == '_').to_string();
    if stem.chars().count() > MAX_STEM_CHARS {
        stem = stem.chars().take(MAX_STEM_CHARS).collect();
        stem = stem.trim_end_matches(|c| c == '.' || c == '_').to_string();
    }
    if stem.is_empty() {
        return FALLBACK_FILE_STEM.to_string();
    }
    if RESERVED.contains(&stem.to_ascii_lowercase().as_str()) {
        stem.push('_');
    }
    stem
}

/// `<stem>_achievement_certificate.<ext>`
pub fn filename_for(name: &str, format: ArtifactFormat) -> String {
    format!("{}_achievement_certificate.{}", sanitize_file_stem(name), format.extension())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_path_separators_and_reserved_characters() {
        assert_eq!(sanitize_file_stem("Jürgen/Test:1"), "JürgenTest1");
        assert_eq!(sanitize_file_stem("../../etc/passwd"), "etcpasswd");
        assert_eq!(sanitize_file_stem("ana maria"), "ana_maria");
    }

    #[test]
    fn falls_back_when_nothing_survives() {
        assert_eq!(sanitize_file_stem(""), FALLBACK_FILE_STEM);
        assert_eq!(sanitize_file_stem("///"), FALLBACK_FILE_STEM);
        assert_eq!(sanitize_file_stem(" . "), FALLBACK_FILE_STEM);
    }

    #[test]
    fn reserved_device_names_are_suffixed() {
        assert_eq!(sanitize_file_stem("CON"), "CON_");
        assert_eq!(sanitize_file_stem("console"), "console");
    }

    #[test]
    fn long_names_are_capped() {
        let long = "a".repeat(200);
        assert_eq!(sanitize_file_stem(&long).chars().count(), 64);
    }

    #[test]
    fn file_names_carry_format_extension() {
        assert_eq!(filename_for("ana", ArtifactFormat::Png), "ana_achievement_certificate.png");
        assert_eq!(filename_for("", ArtifactFormat::Pdf), "duolingo_user_achievement_certificate.pdf");
    }
}
