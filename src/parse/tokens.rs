//! Note-string tokenizer
//!
//! One token per leaf: a head (pitch, chord, `r`, `s` or `R`), an optional
//! duration with dots, an optional `* n/d` multiplier and an optional tie.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{ScoreError, ScoreResult};
use crate::models::duration::{Duration, Rational};
use crate::models::pitch::Pitch;

static LEAF_TOKEN: Lazy<Result<Regex, String>> = Lazy::new(|| {
    Regex::new(
        r"(?x)
        (?P<head> <[^>]*> | [a-g][a-z]*[',]* | [rsR] )
        (?P<duration> \\breve | \\longa | \\maxima | \d+ )?
        (?P<dots> \.* )
        (?: \s* \* \s* (?P<num> \d+ ) (?: / (?P<den> \d+ ) )? )?
        (?P<tie> \s* ~ )?
        ",
    )
    .map_err(|e| e.to_string())
});

/// What a token sounds as
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Head {
    Note(Pitch),
    Chord(Vec<Pitch>),
    Rest,
    Skip,
    MultimeasureRest,
}

/// One leaf's worth of input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub head: Head,
    /// Written duration; `None` carries over the previous token's
    pub duration: Option<Duration>,
    pub multiplier: Option<Rational>,
    pub tie: bool,
}

fn parse_error(token: &str, reason: impl Into<String>) -> ScoreError {
    ScoreError::Parse {
        token: token.to_string(),
        reason: reason.into(),
    }
}

fn leaf_token() -> ScoreResult<&'static Regex> {
    LEAF_TOKEN
        .as_ref()
        .map_err(|e| parse_error("", format!("bad token pattern: {}", e)))
}

/// Split `text` into leaf tokens; anything between tokens must be whitespace
pub fn tokenize(text: &str) -> ScoreResult<Vec<Token>> {
    let regex = leaf_token()?;
    let mut tokens = Vec::new();
    let mut position = 0;
    for captures in regex.captures_iter(text) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        let gap = &text[position..whole.start()];
        if !gap.trim().is_empty() {
            return Err(parse_error(gap.trim(), "unrecognized input"));
        }
        position = whole.end();

        let token_text = whole.as_str().trim();
        let head_text = captures.name("head").map_or("", |m| m.as_str());
        let head = parse_head(head_text)?;
        let dots = captures.name("dots").map_or(0, |m| m.as_str().len());
        let duration = match captures.name("duration") {
            Some(m) => Some(parse_duration(token_text, m.as_str(), dots)?),
            None if dots > 0 => return Err(parse_error(token_text, "dots without a duration")),
            None => None,
        };
        let multiplier = match captures.name("num") {
            Some(num) => {
                let numerator = parse_number(token_text, num.as_str())?;
                let denominator = match captures.name("den") {
                    Some(den) => parse_number(token_text, den.as_str())?,
                    None => 1,
                };
                if numerator == 0 || denominator == 0 {
                    return Err(parse_error(token_text, "multiplier must be positive"));
                }
                Some(Rational::new(numerator, denominator))
            }
            None => None,
        };
        tokens.push(Token {
            text: token_text.to_string(),
            head,
            duration,
            multiplier,
            tie: captures.name("tie").is_some(),
        });
    }
    let rest = &text[position..];
    if !rest.trim().is_empty() {
        return Err(parse_error(rest.trim(), "unrecognized input"));
    }
    Ok(tokens)
}

fn parse_number(token: &str, digits: &str) -> ScoreResult<i64> {
    digits
        .parse::<i64>()
        .map_err(|_| parse_error(token, format!("number {} out of range", digits)))
}

fn parse_head(text: &str) -> ScoreResult<Head> {
    match text {
        "r" => Ok(Head::Rest),
        "s" => Ok(Head::Skip),
        "R" => Ok(Head::MultimeasureRest),
        chord if chord.starts_with('<') => {
            let inner = chord.trim_start_matches('<').trim_end_matches('>');
            let pitches = inner
                .split_whitespace()
                .map(Pitch::from_name)
                .collect::<ScoreResult<Vec<_>>>()?;
            if pitches.is_empty() {
                return Err(parse_error(chord, "empty chord"));
            }
            Ok(Head::Chord(pitches))
        }
        name => Ok(Head::Note(Pitch::from_name(name)?)),
    }
}

/// `4`, `8.`, `\breve` and the like; the base must be a power of two
/// Longest dot run and shortest note value the tokenizer accepts
const MAX_DOTS: usize = 8;
const MAX_DENOMINATOR: i64 = 1 << 16;

fn parse_duration(token: &str, base: &str, dots: usize) -> ScoreResult<Duration> {
    if dots > MAX_DOTS {
        return Err(parse_error(token, format!("more than {} dots", MAX_DOTS)));
    }
    let base = match base {
        "\\breve" => Rational::from_integer(2),
        "\\longa" => Rational::from_integer(4),
        "\\maxima" => Rational::from_integer(8),
        digits => {
            let denominator = parse_number(token, digits)?;
            if denominator <= 0 || denominator & (denominator - 1) != 0 {
                return Err(parse_error(token, "duration must be a power of two"));
            }
            if denominator > MAX_DENOMINATOR {
                return Err(parse_error(token, "duration too short"));
            }
            Rational::new(1, denominator)
        }
    };
    let mut value = base;
    let mut addition = base;
    for _ in 0..dots {
        addition /= 2;
        value += addition;
    }
    Ok(Duration::from_rational(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_mixed_input() {
        let tokens = tokenize("c'8 d' <c' e' g'>4. r4 s1 * 1/16 R\\breve").unwrap();
        assert_eq!(tokens.len(), 6);
        assert_eq!(tokens[0].duration, Some(Duration::new(1, 8)));
        assert_eq!(tokens[1].duration, None);
        assert!(matches!(&tokens[2].head, Head::Chord(p) if p.len() == 3));
        assert_eq!(tokens[2].duration, Some(Duration::new(3, 8)));
        assert_eq!(tokens[3].head, Head::Rest);
        assert_eq!(tokens[4].multiplier, Some(Rational::new(1, 16)));
        assert_eq!(tokens[5].head, Head::MultimeasureRest);
        assert_eq!(tokens[5].duration, Some(Duration::new(2, 1)));
    }

    #[test]
    fn test_ties() {
        let tokens = tokenize("c'4 ~ c'16 d'4~ d'4").unwrap();
        let ties: Vec<bool> = tokens.iter().map(|t| t.tie).collect();
        assert_eq!(ties, vec![true, false, true, false]);
    }

    #[test]
    fn test_errors() {
        assert!(matches!(tokenize("c'4 %%"), Err(ScoreError::Parse { .. })));
        assert!(matches!(tokenize("c'3"), Err(ScoreError::Parse { .. })));
        assert!(matches!(tokenize("h'4"), Err(ScoreError::Parse { .. })));
        assert!(matches!(tokenize("<>4"), Err(ScoreError::Parse { .. })));
    }

    #[test]
    fn test_dot_runs_are_capped() {
        let eight_dots = tokenize("c'4........").unwrap()[0].duration.unwrap();
        assert!(eight_dots > Duration::new(7, 16) && eight_dots < Duration::new(1, 2));
        let dotted = format!("c'4{}", ".".repeat(64));
        assert!(matches!(tokenize(&dotted), Err(ScoreError::Parse { .. })));
        assert!(matches!(tokenize("c'4611686018427387904."), Err(ScoreError::Parse { .. })));
    }
}
