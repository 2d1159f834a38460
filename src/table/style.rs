use super::RenderError;
use std::fmt;

/// How a cell's text is placed within its column width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
    Center,
}

impl Align {
    fn letter(self) -> char {
        match self {
            Align::Left => 'l',
            Align::Right => 'r',
            Align::Center => 'c',
        }
    }
}

/// One symbol of a style string: a border position or an aligned slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    Border,
    Slot(Align),
}

/// A parsed style string: the token sequence plus one width limit entry
/// per slot token (`None` = size to content).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StyleSpec {
    pub tokens: Vec<Token>,
    pub limits: Vec<Option<usize>>,
}

impl StyleSpec {
    /// Parse a style string like `|c|l:15|r|`. A `|` is a border, the
    /// letters `l`/`r`/`c` are aligned slots, and a letter may carry a
    /// `:digits` width limit for its column.
    pub fn parse(input: &str) -> Result<Self, RenderError> {
        let mut tokens = Vec::new();
        let mut limits = Vec::new();
        let mut chars = input.chars().peekable();
        while let Some(ch) = chars.next() {
            match ch {
                '|' => tokens.push(Token::Border),
                'l' | 'r' | 'c' => {
                    let align = match ch {
                        'l' => Align::Left,
                        'r' => Align::Right,
                        _ => Align::Center,
                    };
                    tokens.push(Token::Slot(align));
                    if chars.next_if_eq(&':').is_some() {
                        let mut digits = String::new();
                        while let Some(d) = chars.next_if(char::is_ascii_digit) {
                            digits.push(d);
                        }
                        if digits.is_empty() {
                            return Err(RenderError::Grammar(format!(
                                "expected digits after ':' in {input:?}"
                            )));
                        }
                        let limit = digits.parse::<usize>().map_err(|_| {
                            RenderError::Grammar(format!("width limit {digits:?} is out of range"))
                        })?;
                        if limit == 0 {
                            return Err(RenderError::Grammar(format!(
                                "width limit must be positive in {input:?}"
                            )));
                        }
                        limits.push(Some(limit));
                    } else {
                        limits.push(None);
                    }
                }
                other => {
                    return Err(RenderError::Grammar(format!(
                        "unexpected character {other:?} in {input:?}"
                    )));
                }
            }
        }
        Ok(StyleSpec { tokens, limits })
    }

    /// The default style for `n` rows or columns: every slot centered,
    /// with a border before each slot and after the last.
    pub fn default_for(n: usize) -> Self {
        let mut tokens = vec![Token::Border];
        for _ in 0..n {
            tokens.push(Token::Slot(Align::Center));
            tokens.push(Token::Border);
        }
        StyleSpec {
            tokens,
            limits: vec![None; n],
        }
    }

    /// Number of slot (non-border) tokens.
    pub fn slot_count(&self) -> usize {
        self.tokens
            .iter()
            .filter(|t| matches!(t, Token::Slot(_)))
            .count()
    }

    /// Alignments of the slot tokens, in order.
    pub fn aligns(&self) -> Vec<Align> {
        self.tokens
            .iter()
            .filter_map(|t| match t {
                Token::Slot(a) => Some(*a),
                Token::Border => None,
            })
            .collect()
    }
}

impl fmt::Display for StyleSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut slot = 0;
        for token in &self.tokens {
            match token {
                Token::Border => write!(f, "|")?,
                Token::Slot(a) => {
                    write!(f, "{}", a.letter())?;
                    if let Some(Some(limit)) = self.limits.get(slot) {
                        write!(f, ":{limit}")?;
                    }
                    slot += 1;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_borders_and_slots() {
        let spec = StyleSpec::parse("|c|l|r|").unwrap();
        assert_eq!(spec.tokens.len(), 7);
        assert_eq!(spec.slot_count(), 3);
        assert_eq!(spec.aligns(), vec![Align::Center, Align::Left, Align::Right]);
        assert_eq!(spec.limits, vec![None, None, None]);
    }

    #[test]
    fn test_parse_width_limits() {
        let spec = StyleSpec::parse("|c|l:15|r|c:14rl:13|").unwrap();
        assert_eq!(spec.slot_count(), 6);
        assert_eq!(
            spec.limits,
            vec![None, Some(15), None, Some(14), None, Some(13)]
        );
        assert_eq!(
            spec.aligns(),
            vec![
                Align::Center,
                Align::Left,
                Align::Right,
                Align::Center,
                Align::Right,
                Align::Left
            ]
        );
    }

    #[test]
    fn test_parse_empty_string() {
        let spec = StyleSpec::parse("").unwrap();
        assert!(spec.tokens.is_empty());
        assert!(spec.limits.is_empty());
    }

    #[test]
    fn test_colon_without_digits_is_an_error() {
        assert!(matches!(
            StyleSpec::parse("c:"),
            Err(RenderError::Grammar(_))
        ));
        assert!(matches!(
            StyleSpec::parse("|c:|l|"),
            Err(RenderError::Grammar(_))
        ));
    }

    #[test]
    fn test_zero_limit_is_an_error() {
        assert!(matches!(
            StyleSpec::parse("l:0"),
            Err(RenderError::Grammar(_))
        ));
        assert!(matches!(
            StyleSpec::parse("|c|l:00|"),
            Err(RenderError::Grammar(_))
        ));
    }

    #[test]
    fn test_unknown_character_is_an_error() {
        assert!(matches!(
            StyleSpec::parse("|c|x|"),
            Err(RenderError::Grammar(_))
        ));
        assert!(matches!(
            StyleSpec::parse("| c |"),
            Err(RenderError::Grammar(_))
        ));
    }

    #[test]
    fn test_default_style_shape() {
        let spec = StyleSpec::default_for(3);
        assert_eq!(spec.to_string(), "|c|c|c|");
        assert_eq!(spec.slot_count(), 3);
        assert_eq!(spec.limits, vec![None, None, None]);
    }

    #[test]
    fn test_display_round_trip() {
        for s in ["", "|c|l:15|r|", "c:1", "|c|c|c|", "lrc", "|c|l:15|r|c:14rl:13|"] {
            let parsed = StyleSpec::parse(s).unwrap();
            let reparsed = StyleSpec::parse(&parsed.to_string()).unwrap();
            assert_eq!(parsed, reparsed, "round trip diverged for {s:?}");
        }
    }
}
