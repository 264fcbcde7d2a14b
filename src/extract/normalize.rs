//! Unicode normalization for code extraction
//!
//! Channel posts routinely dress codes up with fullwidth letters, lookalike
//! Cyrillic/Greek characters, zero-width joiners and typographic dashes.
//! Everything here folds those back to plain ASCII so the regex pass sees
//! what a human reads. Normalizing twice gives the same result as once.

use unicode_normalization::UnicodeNormalization;

/// Zero-width, invisible and bidirectional formatting characters
const INVISIBLE_CHARS: &[char] = &[
    '\u{200B}', // ZERO WIDTH SPACE
    '\u{200C}', // ZERO WIDTH NON-JOINER
    '\u{200D}', // ZERO WIDTH JOINER
    '\u{2060}', // WORD JOINER
    '\u{FEFF}', // ZERO WIDTH NO-BREAK SPACE
    '\u{034F}', // COMBINING GRAPHEME JOINER
    '\u{00AD}', // SOFT HYPHEN
    '\u{180E}', // MONGOLIAN VOWEL SEPARATOR
    '\u{200E}', // LEFT-TO-RIGHT MARK
    '\u{200F}', // RIGHT-TO-LEFT MARK
    '\u{202A}', // LEFT-TO-RIGHT EMBEDDING
    '\u{202B}', // RIGHT-TO-LEFT EMBEDDING
    '\u{202C}', // POP DIRECTIONAL FORMATTING
    '\u{202D}', // LEFT-TO-RIGHT OVERRIDE
    '\u{202E}', // RIGHT-TO-LEFT OVERRIDE
    '\u{2066}', // LEFT-TO-RIGHT ISOLATE
    '\u{2067}', // RIGHT-TO-LEFT ISOLATE
    '\u{2068}', // FIRST STRONG ISOLATE
    '\u{2069}', // POP DIRECTIONAL ISOLATE
];

/// Lookalike characters and their Latin counterparts
const HOMOGLYPHS: &[(char, char)] = &[
    // Cyrillic lowercase
    ('а', 'a'),
    ('в', 'b'),
    ('е', 'e'),
    ('к', 'k'),
    ('м', 'm'),
    ('н', 'h'),
    ('о', 'o'),
    ('р', 'p'),
    ('с', 'c'),
    ('т', 't'),
    ('у', 'y'),
    ('х', 'x'),
    ('і', 'i'),
    ('ј', 'j'),
    ('ѕ', 's'),
    // Cyrillic uppercase
    ('А', 'A'),
    ('В', 'B'),
    ('Е', 'E'),
    ('К', 'K'),
    ('М', 'M'),
    ('Н', 'H'),
    ('О', 'O'),
    ('Р', 'P'),
    ('С', 'C'),
    ('Т', 'T'),
    ('У', 'Y'),
    ('Х', 'X'),
    ('І', 'I'),
    ('Ј', 'J'),
    ('Ѕ', 'S'),
    // Greek
    ('α', 'a'),
    ('ε', 'e'),
    ('ι', 'i'),
    ('κ', 'k'),
    ('ν', 'v'),
    ('ο', 'o'),
    ('ρ', 'p'),
    ('τ', 't'),
    ('υ', 'u'),
    ('χ', 'x'),
    ('Α', 'A'),
    ('Β', 'B'),
    ('Ε', 'E'),
    ('Ζ', 'Z'),
    ('Η', 'H'),
    ('Ι', 'I'),
    ('Κ', 'K'),
    ('Μ', 'M'),
    ('Ν', 'N'),
    ('Ο', 'O'),
    ('Ρ', 'P'),
    ('Τ', 'T'),
    ('Υ', 'Y'),
    ('Χ', 'X'),
    // Dashes
    ('‐', '-'),
    ('‑', '-'),
    ('‒', '-'),
    ('–', '-'),
    ('—', '-'),
    ('―', '-'),
    ('−', '-'),
];

/// Map a single lookalike character to ASCII, if it has a counterpart
pub fn fold_homoglyph(ch: char) -> char {
    HOMOGLYPHS
        .iter()
        .find(|(lookalike, _)| *lookalike == ch)
        .map(|(_, latin)| *latin)
        .unwrap_or(ch)
}

/// NFKC-normalize, drop invisible characters and fold homoglyphs
pub fn normalize_text(text: &str) -> String {
    // Folding can leave an ASCII base in front of a combining mark, so the
    // result is composed once more.
    text.nfkc()
        .filter(|ch| !INVISIBLE_CHARS.contains(ch))
        .map(fold_homoglyph)
        .nfkc()
        .collect()
}
