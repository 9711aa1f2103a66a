//! Emoji substitution.
//!
//! Most fonts that cover Japanese have no colour emoji, and a missing glyph shows up
//! as an empty box in the PDF. The status emoji that reports commonly use are
//! rewritten to short bracketed tags before any text is measured or drawn.

use std::borrow::Cow;

/// Glyph → replacement tag. Sequences with a variation selector come before the
/// bare glyph so the selector is consumed too.
pub static EMOJI_TAGS: &[(&str, &str)] = &[
    ("\u{2705}", "[OK]"),
    ("\u{26a0}\u{fe0f}", "[WARN]"),
    ("\u{26a0}", "[WARN]"),
    ("\u{274c}", "[NG]"),
    ("\u{2b55}", "[O]"),
    ("\u{1f534}", "[!]"),
    ("\u{1f4dd}", "[NOTE]"),
    ("\u{1f4cc}", "[PIN]"),
    ("\u{1f680}", "[GO]"),
    ("\u{1f4a1}", "[TIP]"),
    ("\u{2692}\u{fe0f}", "[WIP]"),
    ("\u{2692}", "[WIP]"),
    ("\u{1f3af}", "[TARGET]"),
];

/// Replace every mapped emoji with its tag; all other characters are untouched.
pub fn sanitize(text: &str) -> Cow<'_, str> {
    if !EMOJI_TAGS.iter().any(|(glyph, _)| text.contains(glyph)) {
        return Cow::Borrowed(text);
    }

    let mut out = text.to_string();
    for (glyph, tag) in EMOJI_TAGS {
        if out.contains(glyph) {
            out = out.replace(glyph, tag);
        }
    }
    Cow::Owned(out)
}

fn is_pictograph(c: char) -> bool {
    matches!(
        c as u32,
        0x1f600..=0x1f64f // emoticons
            | 0x1f300..=0x1f5ff // symbols and pictographs
            | 0x1f680..=0x1f6ff // transport and map
            | 0x1f1e0..=0x1f1ff // flags
            | 0x2702..=0x27b0 // dingbats
            | 0xfe0f
    )
}

/// Drop pictographs that survived [`sanitize`].
pub fn strip_unmapped(text: &str) -> Cow<'_, str> {
    if !text.chars().any(is_pictograph) {
        return Cow::Borrowed(text);
    }
    Cow::Owned(text.chars().filter(|c| !is_pictograph(*c)).collect())
}
