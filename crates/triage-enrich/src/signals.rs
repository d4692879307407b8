//! Per-language fraud keyword tables, ported verbatim from the crawler's
//! original worker (`spec.md` §4.4 step 8).

use crate::context::ScamSignal;
use triage_core::domain::Language;

pub const SCAM_KEYWORD_WEIGHT: f64 = 2.0;
pub const URGENCY_WEIGHT: f64 = 1.5;

pub const SCAM_KEYWORDS: &[ScamSignal] = &[
    // English
    signal("urgent", Language::En),
    signal("limited time", Language::En),
    signal("act now", Language::En),
    signal("guaranteed", Language::En),
    signal("free money", Language::En),
    signal("lottery", Language::En),
    signal("winner", Language::En),
    // Hindi
    signal("तत्काल", Language::Hi),
    signal("सीमित समय", Language::Hi),
    signal("अभी करें", Language::Hi),
    signal("गारंटी", Language::Hi),
    signal("मुफ्त पैसा", Language::Hi),
    signal("लॉटरी", Language::Hi),
    signal("विजेता", Language::Hi),
    // Tamil
    signal("அவசரம்", Language::Ta),
    signal("வரம்புக்குட்பட்ட நேரம்", Language::Ta),
    signal("இப்போது செய்யுங்கள்", Language::Ta),
    signal("உத்தரவாதம்", Language::Ta),
    signal("இலவச பணம்", Language::Ta),
    signal("லாட்டரி", Language::Ta),
    signal("வெற்றியாளர்", Language::Ta),
    // Kannada
    signal("ತುರ್ತು", Language::Kn),
    signal("ಸೀಮಿತ ಸಮಯ", Language::Kn),
    signal("ಈಗ ಮಾಡಿ", Language::Kn),
    signal("ಖಾತರಿ", Language::Kn),
    signal("ಉಚಿತ ಹಣ", Language::Kn),
    signal("ಲಾಟರಿ", Language::Kn),
    signal("ವಿಜೇತ", Language::Kn),
];

/// `const fn` constructor so the table above can be a `const` array.
const fn signal(keyword: &'static str, language: Language) -> ScamSignal {
    ScamSignal {
        keyword,
        language,
        weight: SCAM_KEYWORD_WEIGHT,
    }
}

pub const URGENCY_WORDS: &[&str] = &["urgent", "immediate", "hurry", "limited", "expires"];

/// English wordlist used by the script-range fallback (step 2).
pub const ENGLISH_WORDLIST: &[&str] = &["the", "and", "is", "in", "to", "of", "a", "that", "it", "with"];

/// Romanized Hindi markers used by the transliteration flag (step 3).
pub const HINDI_ROMANIZATION_MARKERS: &[&str] =
    &["hai", "hain", "ka", "ki", "ke", "ko", "se", "mein", "par", "aur"];

pub fn keywords_for(language: Language) -> impl Iterator<Item = &'static ScamSignal> {
    SCAM_KEYWORDS.iter().filter(move |s| s.language == language)
}
