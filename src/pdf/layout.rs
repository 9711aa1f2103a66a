//! Line breaking for mixed Japanese and Latin text.
//!
//! Wrapping is greedy. A line may break at whitespace (which is then dropped) and
//! on either side of any CJK character, so Japanese runs wrap per character while
//! Latin words stay whole. A word wider than the whole line is split wherever it
//! overflows.

/// Whether a character belongs to a script that is written without spaces.
pub fn is_cjk(c: char) -> bool {
    matches!(
        c as u32,
        0x3000..=0x303f // CJK symbols and punctuation
            | 0x3040..=0x30ff // hiragana, katakana
            | 0x31f0..=0x31ff
            | 0x3400..=0x4dbf
            | 0x4e00..=0x9fff
            | 0xf900..=0xfaff
            | 0xff00..=0xffef // half- and full-width forms
            | 0x20000..=0x2ffff
    )
}

/// Wrap `text` into lines no wider than `max_width`, measuring with `char_width`.
///
/// Explicit newlines always break. Never returns an empty vector for non-empty text.
pub fn wrap_text(text: &str, max_width: f32, char_width: impl Fn(char) -> f32) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut line = String::new();
        let mut width = 0.0f32;
        // byte offset in `line` where it may be split
        let mut break_at: Option<usize> = None;

        for c in paragraph.chars() {
            let w = char_width(c);

            if c.is_whitespace() {
                if line.is_empty() {
                    continue;
                }
                if width + w > max_width {
                    lines.push(line.trim_end().to_string());
                    line.clear();
                    width = 0.0;
                    break_at = None;
                    continue;
                }
                break_at = Some(line.len());
                line.push(c);
                width += w;
                continue;
            }

            let after_cjk = line.chars().next_back().is_some_and(is_cjk);
            if !line.is_empty() && (is_cjk(c) || after_cjk) {
                break_at = Some(line.len());
            }

            if width + w > max_width && !line.is_empty() {
                match break_at.take() {
                    Some(at) if at > 0 => {
                        let rest = line.split_off(at);
                        lines.push(line.trim_end().to_string());
                        line = rest.trim_start().to_string();
                    }
                    _ => lines.push(std::mem::take(&mut line)),
                }
                width = line.chars().map(&char_width).sum();

                // what was carried over still does not leave room for `c`
                if width + w > max_width && !line.is_empty() {
                    lines.push(std::mem::take(&mut line));
                    width = 0.0;
                }
            }

            line.push(c);
            width += w;
        }

        let line = line.trim_end();
        if !line.is_empty() || lines.is_empty() {
            lines.push(line.to_string());
        }
    }

    lines
}

/// Shorten `text` so it fits in `max_width`, marking the cut with `...`.
pub fn clip_text(text: &str, max_width: f32, char_width: impl Fn(char) -> f32) -> String {
    let full: f32 = text.chars().map(&char_width).sum();
    if full <= max_width {
        return text.to_string();
    }

    let ellipsis = "...";
    let budget = max_width - ellipsis.chars().map(&char_width).sum::<f32>();
    let mut clipped = String::new();
    let mut width = 0.0;
    for c in text.chars() {
        let w = char_width(c);
        if width + w > budget {
            break;
        }
        clipped.push(c);
        width += w;
    }
    clipped.truncate(clipped.trim_end().len());
    clipped.push_str(ellipsis);
    clipped
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every character is one unit wide.
    fn unit(_: char) -> f32 {
        1.0
    }

    #[test]
    fn short_text_is_one_line() {
        assert_eq!(wrap_text("hello world", 20.0, unit), vec!["hello world"]);
    }

    #[test]
    fn latin_text_breaks_between_words() {
        assert_eq!(
            wrap_text("the quick brown fox", 10.0, unit),
            vec!["the quick", "brown fox"]
        );
    }

    #[test]
    fn japanese_text_breaks_between_characters() {
        assert_eq!(
            wrap_text("ログイン画面の確認", 4.0, unit),
            vec!["ログイン", "画面の確", "認"]
        );
    }

    #[test]
    fn mixed_text_keeps_latin_words_whole() {
        assert_eq!(
            wrap_text("画面でLoginを押す", 6.0, unit),
            vec!["画面で", "Loginを", "押す"]
        );
    }

    #[test]
    fn long_words_are_split() {
        assert_eq!(
            wrap_text("abcdefghij", 4.0, unit),
            vec!["abcd", "efgh", "ij"]
        );
    }

    #[test]
    fn newlines_always_break() {
        assert_eq!(wrap_text("one\ntwo", 20.0, unit), vec!["one", "two"]);
    }

    #[test]
    fn empty_text_is_a_single_empty_line() {
        assert_eq!(wrap_text("", 20.0, unit), vec![""]);
    }

    #[test]
    fn lines_never_exceed_the_width() {
        let text = "検証結果 OK: the login page 表示 works as expected with テスト data";
        for line in wrap_text(text, 7.0, unit) {
            assert!(line.chars().count() <= 7, "line too long: {line:?}");
        }
    }

    #[test]
    fn clips_with_an_ellipsis() {
        assert_eq!(clip_text("short", 10.0, unit), "short");
        assert_eq!(clip_text("a much longer cell", 10.0, unit), "a much...");
    }
}
