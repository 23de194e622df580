//! Greedy line wrapping and placement of the clause on a page.
//!
//! Coordinates are PDF points with the origin at the bottom-left of the
//! page, so `y` grows upward.

use crate::config::ClauseStyle;

/// Layout parameters for one page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutConfig {
    pub font_size: f64,
    pub line_height: f64,
    pub margin_bottom: f64,
    pub margin_sides: f64,
    pub centered: bool,
    pub page_width: f64,
    /// Printable width: page width minus both side margins
    pub max_width: f64,
}

impl LayoutConfig {
    pub fn for_page(style: &ClauseStyle, page_width: f64) -> Self {
        Self {
            font_size: style.font_size,
            line_height: style.line_height,
            margin_bottom: style.margin_bottom,
            margin_sides: style.margin_sides,
            centered: style.centered,
            page_width,
            max_width: page_width - 2.0 * style.margin_sides,
        }
    }
}

/// A wrapped line and its width at the layout font size.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasuredLine {
    pub text: String,
    pub width: f64,
}

/// A line ready to be drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionedLine {
    pub line: MeasuredLine,
    pub x: f64,
    pub y: f64,
    pub font_size: f64,
    pub line_height: f64,
}

/// Wrap `text` greedily into lines narrower than `max_width`.
///
/// Words are separated by single spaces. A word that does not fit on the
/// current line starts a new one; a word too wide for an empty line is
/// placed on it anyway and overflows. Empty text yields one empty line.
pub fn wrap<M>(text: &str, measure: M, max_width: f64, font_size: f64) -> Vec<MeasuredLine>
where
    M: Fn(&str, f64) -> f64,
{
    let words: Vec<&str> = text.split(' ').collect();
    let mut lines = Vec::new();
    // Built as " word word", the leading space is dropped when sealed
    let mut current = String::new();
    let mut holds_word = false;
    let mut cursor = 0;

    while cursor < words.len() {
        let candidate = format!("{} {}", current, words[cursor]);
        if !holds_word || measure(&candidate, font_size) < max_width {
            current = candidate;
            holds_word = true;
            cursor += 1;
        } else {
            lines.push(seal(&current, &measure, font_size));
            current.clear();
            holds_word = false;
        }
    }
    lines.push(seal(&current, &measure, font_size));

    lines
}

fn seal<M>(line: &str, measure: &M, font_size: f64) -> MeasuredLine
where
    M: Fn(&str, f64) -> f64,
{
    let text = line.strip_prefix(' ').unwrap_or(line).to_string();
    let width = measure(&text, font_size);
    MeasuredLine { text, width }
}

/// Position wrapped lines on the page.
///
/// The last line sits on the bottom margin and earlier lines stack above
/// it, so the block grows upward however many lines there are.
pub fn place(lines: Vec<MeasuredLine>, config: &LayoutConfig) -> Vec<PositionedLine> {
    let count = lines.len();
    lines
        .into_iter()
        .enumerate()
        .map(|(index, line)| {
            let x = if config.centered {
                config.page_width / 2.0 - line.width / 2.0
            } else {
                config.margin_sides
            };
            let y = config.margin_bottom + config.line_height * (count - 1 - index) as f64;
            PositionedLine {
                line,
                x,
                y,
                font_size: config.font_size,
                line_height: config.line_height,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// One unit per character, independent of size
    fn char_count(text: &str, _size: f64) -> f64 {
        text.chars().count() as f64
    }

    /// Monospaced font with advance = half the font size
    fn half_em(text: &str, size: f64) -> f64 {
        text.chars().count() as f64 * size * 0.5
    }

    fn texts(lines: &[MeasuredLine]) -> Vec<&str> {
        lines.iter().map(|l| l.text.as_str()).collect()
    }

    fn config(centered: bool) -> LayoutConfig {
        LayoutConfig::for_page(
            &ClauseStyle {
                font_size: 11.0,
                line_height: 17.0,
                margin_bottom: 60.0,
                margin_sides: 43.0,
                centered,
            },
            595.0,
        )
    }

    #[test]
    fn test_layout_config_max_width() {
        let config = config(true);
        assert_eq!(config.max_width, 595.0 - 86.0);
        assert_eq!(config.page_width, 595.0);
    }

    #[test]
    fn test_one_word_per_line() {
        let lines = wrap("A B C", char_count, 3.0, 11.0);
        assert_eq!(texts(&lines), vec!["A", "B", "C"]);

        let placed = place(lines, &config(false));
        assert_eq!(placed[2].line.text, "C");
        assert_eq!(placed[2].y, 60.0);
        assert_eq!(placed[1].y, 77.0);
        assert_eq!(placed[0].y, 94.0);
    }

    #[test]
    fn test_wraps_at_width() {
        let lines = wrap("the quick brown fox jumps", char_count, 11.0, 11.0);
        assert_eq!(texts(&lines), vec!["the quick", "brown fox", "jumps"]);
        assert_eq!(lines[1].width, 9.0);

        // " the quick" is 10 units and the limit is strict
        let lines = wrap("the quick brown fox jumps", char_count, 10.0, 11.0);
        assert_eq!(texts(&lines), vec!["the", "quick", "brown", "fox", "jumps"]);
    }

    #[test]
    fn test_everything_fits_on_one_line() {
        let lines = wrap("the quick brown fox", char_count, 100.0, 11.0);
        assert_eq!(texts(&lines), vec!["the quick brown fox"]);
        assert_eq!(lines[0].width, 19.0);
    }

    #[test]
    fn test_width_measured_at_font_size() {
        let lines = wrap("aa bb", half_em, 100.0, 10.0);
        assert_eq!(lines[0].width, 25.0);

        // At size 20 "aa bb" no longer fits in 40
        let lines = wrap("aa bb", half_em, 40.0, 20.0);
        assert_eq!(texts(&lines), vec!["aa", "bb"]);
    }

    #[test]
    fn test_overlong_word_gets_its_own_line() {
        let lines = wrap("a incomprehensibilities b", char_count, 5.0, 11.0);
        assert_eq!(texts(&lines), vec!["a", "incomprehensibilities", "b"]);
        assert_eq!(lines[1].width, 21.0);
    }

    #[test]
    fn test_overlong_first_word() {
        let lines = wrap("incomprehensibilities", char_count, 5.0, 11.0);
        assert_eq!(texts(&lines), vec!["incomprehensibilities"]);
    }

    #[test]
    fn test_non_positive_width_still_terminates() {
        let lines = wrap("a b c", char_count, 0.0, 11.0);
        assert_eq!(texts(&lines), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_empty_text() {
        let lines = wrap("", char_count, 100.0, 11.0);
        assert_eq!(lines, vec![MeasuredLine { text: String::new(), width: 0.0 }]);
    }

    #[test]
    fn test_consecutive_spaces_are_kept() {
        let lines = wrap("a  b", char_count, 100.0, 11.0);
        assert_eq!(texts(&lines), vec!["a  b"]);
    }

    #[test]
    fn test_single_line_sits_on_bottom_margin() {
        let lines = wrap("short", char_count, 100.0, 11.0);
        let placed = place(lines, &config(false));
        assert_eq!(placed.len(), 1);
        assert_eq!(placed[0].y, 60.0);
        assert_eq!(placed[0].x, 43.0);
    }

    #[test]
    fn test_centered_lines() {
        let lines = vec![
            MeasuredLine { text: "wide line".into(), width: 200.0 },
            MeasuredLine { text: "narrow".into(), width: 95.0 },
        ];
        let placed = place(lines, &config(true));
        assert_eq!(placed[0].x, 197.5);
        assert_eq!(placed[1].x, 250.0);
        for line in &placed {
            assert!((line.x + line.line.width - (595.0 - line.x)).abs() < 1e-9);
        }
    }

    #[test]
    fn test_size_and_height_pass_through() {
        let lines = wrap("one two", char_count, 4.0, 11.0);
        for line in place(lines, &config(false)) {
            assert_eq!(line.font_size, 11.0);
            assert_eq!(line.line_height, 17.0);
        }
    }

    fn word_list() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec("[a-zA-Z]{1,12}", 0..40)
    }

    proptest! {
        /// Lines never exceed the width once every word fits on its own
        #[test]
        fn prop_lines_fit_when_words_fit(words in word_list(), slack in 0.0f64..200.0, size in 6.0f64..24.0) {
            let text = words.join(" ");
            let widest = words.iter().map(|w| half_em(w, size)).fold(0.0, f64::max);
            let max_width = widest + slack;

            for line in wrap(&text, half_em, max_width, size) {
                prop_assert!(line.width <= max_width, "{:?} wider than {}", line, max_width);
            }
        }

        /// Joining the lines gives back the words in order
        #[test]
        fn prop_words_preserved(words in word_list(), max_width in 1.0f64..400.0) {
            let text = words.join(" ");
            let lines = wrap(&text, half_em, max_width, 11.0);
            let joined = lines.iter().map(|l| l.text.as_str()).collect::<Vec<_>>().join(" ");
            prop_assert_eq!(joined, text);
        }

        /// Re-wrapping the joined output changes nothing
        #[test]
        fn prop_rewrap_is_stable(words in word_list(), max_width in 1.0f64..400.0) {
            let text = words.join(" ");
            let lines = wrap(&text, half_em, max_width, 11.0);
            let joined = lines.iter().map(|l| l.text.as_str()).collect::<Vec<_>>().join(" ");
            prop_assert_eq!(wrap(&joined, half_em, max_width, 11.0), lines);
        }

        /// Last line on the bottom margin, first one N-1 line heights above
        #[test]
        fn prop_vertical_stacking(words in word_list(), max_width in 1.0f64..400.0, centered in any::<bool>()) {
            let config = config(centered);
            let lines = wrap(&words.join(" "), half_em, max_width, config.font_size);
            let count = lines.len();
            let placed = place(lines, &config);

            prop_assert_eq!(placed[count - 1].y, config.margin_bottom);
            prop_assert_eq!(placed[0].y, config.margin_bottom + config.line_height * (count - 1) as f64);
            for line in &placed {
                if centered {
                    prop_assert!((line.x + line.line.width - (config.page_width - line.x)).abs() < 1e-6);
                } else {
                    prop_assert_eq!(line.x, config.margin_sides);
                }
            }
        }
    }
}
