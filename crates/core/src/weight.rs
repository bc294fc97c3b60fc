//! Per-frame blend weight of a prompt.
//!
//! The weight is rendered as text because a custom weight is a formula for
//! the downstream renderer, not a number this crate can evaluate.

use crate::prompt::{OverlapType, Prompt};
use crate::types::Frame;

/// Significant digits used when rendering a fade weight.
pub const WEIGHT_PRECISION: usize = 4;

/// The weight of a prompt at one frame.
#[derive(Debug, Clone, PartialEq)]
pub enum PromptWeight {
    /// Full weight, rendered as `1`.
    Full,
    /// Partial weight inside a linear fade window.
    Fade(f64),
    /// Unevaluated custom formula, rendered as `${formula}`.
    Formula(String),
}

impl PromptWeight {
    /// Numeric value when known.
    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Full => Some(1.0),
            Self::Fade(w) => Some(*w),
            Self::Formula(_) => None,
        }
    }
}

impl std::fmt::Display for PromptWeight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Full => f.write_str("1"),
            Self::Fade(w) => f.write_str(&to_precision(*w, WEIGHT_PRECISION)),
            Self::Formula(formula) => write!(f, "${{{formula}}}"),
        }
    }
}

/// Compute the weight of `prompt` at `frame`.
///
/// For a linear overlap the fade-in window is checked first; the fade-out
/// window only applies outside it. A prompt shorter than
/// `in_frames + out_frames` therefore never reaches full weight.
pub fn prompt_weight(prompt: &Prompt, frame: Frame, last_frame: Frame) -> PromptWeight {
    match prompt.overlap.kind {
        OverlapType::None => PromptWeight::Full,
        OverlapType::Custom => PromptWeight::Formula(prompt.overlap.custom.clone()),
        OverlapType::Linear => {
            let start = prompt.start();
            let end = prompt.end(last_frame);
            let fade_in = prompt.overlap.in_frames;
            let fade_out = prompt.overlap.out_frames;

            if fade_in > 0 && frame < start.saturating_add(fade_in) {
                PromptWeight::Fade((frame as f64 - start as f64) / fade_in as f64)
            } else if fade_out > 0 && frame > end.saturating_sub(fade_out) {
                let offset = frame as f64 - end.saturating_sub(fade_out) as f64;
                PromptWeight::Fade(1.0 - offset / fade_out as f64)
            } else {
                PromptWeight::Full
            }
        }
    }
}

/// Rendered weight of `prompt` at `frame`.
pub fn weight(prompt: &Prompt, frame: Frame, last_frame: Frame) -> String {
    prompt_weight(prompt, frame, last_frame).to_string()
}

/// Format `x` with `digits` significant digits.
///
/// Fixed notation is used for decimal exponents in `-6..digits`, scientific
/// notation (`1.234e+21`) otherwise, so `0.5` renders as `0.5000` and `0`
/// as `0.000`.
pub fn to_precision(x: f64, digits: usize) -> String {
    let digits = digits.clamp(1, 100);
    if !x.is_finite() {
        return x.to_string();
    }
    if x == 0.0 {
        return format!("{:.*}", digits - 1, 0.0);
    }

    // Exact decimal expansion of the magnitude; every finite f64 fits in 800
    // fractional digits, so the rounding below sees the true tail.
    let exact = format!("{:.800e}", x.abs());
    let Some((mantissa, exponent)) = exact.split_once('e') else {
        return exact;
    };
    let mut exponent: i32 = exponent.parse().unwrap_or(0);
    let all: Vec<u8> = mantissa
        .bytes()
        .filter(u8::is_ascii_digit)
        .map(|b| b - b'0')
        .collect();

    // Ties round away from zero.
    let mut kept: Vec<u8> = all.iter().copied().take(digits).collect();
    if all.get(digits).is_some_and(|&next| next >= 5) {
        let mut carry = true;
        for d in kept.iter_mut().rev() {
            if *d == 9 {
                *d = 0;
            } else {
                *d += 1;
                carry = false;
                break;
            }
        }
        if carry {
            kept.insert(0, 1);
            kept.pop();
            exponent += 1;
        }
    }
    let text: String = kept.iter().map(|&d| char::from(b'0' + d)).collect();

    let body = if exponent < -6 || exponent >= digits as i32 {
        let (lead, rest) = text.split_at(1);
        let sign = if exponent < 0 { '-' } else { '+' };
        if rest.is_empty() {
            format!("{lead}e{sign}{}", exponent.abs())
        } else {
            format!("{lead}.{rest}e{sign}{}", exponent.abs())
        }
    } else if exponent >= 0 {
        let (int, frac) = text.split_at(exponent as usize + 1);
        if frac.is_empty() {
            int.to_string()
        } else {
            format!("{int}.{frac}")
        }
    } else {
        format!("0.{}{text}", "0".repeat((-exponent - 1) as usize))
    };

    if x < 0.0 {
        format!("-{body}")
    } else {
        body
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn linear(from: Frame, to: Frame, fade_in: Frame, fade_out: Frame) -> Prompt {
        let mut p = Prompt::numbered(1, from, to);
        p.overlap.kind = OverlapType::Linear;
        p.overlap.in_frames = fade_in;
        p.overlap.out_frames = fade_out;
        p
    }

    // -- to_precision --

    #[test]
    fn formats_significant_digits() {
        assert_eq!(to_precision(0.0, 4), "0.000");
        assert_eq!(to_precision(0.5, 4), "0.5000");
        assert_eq!(to_precision(1.0, 4), "1.000");
        assert_eq!(to_precision(1.0 / 3.0, 4), "0.3333");
        assert_eq!(to_precision(0.04, 4), "0.04000");
        assert_eq!(to_precision(-0.25, 4), "-0.2500");
        assert_eq!(to_precision(12.5, 4), "12.50");
        assert_eq!(to_precision(0.015625, 4), "0.01563");
        assert_eq!(to_precision(-0.015625, 4), "-0.01563");
        assert_eq!(to_precision(2.5, 1), "3");
    }

    #[test]
    fn rounding_carries_into_next_decade() {
        assert_eq!(to_precision(0.99996, 4), "1.000");
    }

    #[test]
    fn extreme_exponents_use_scientific_notation() {
        assert_eq!(to_precision(12346.0, 4), "1.235e+4");
        assert_eq!(to_precision(0.00000012346, 4), "1.235e-7");
    }

    // -- prompt_weight --

    #[test]
    fn none_is_full_weight() {
        let p = Prompt::numbered(1, 0, 10);
        assert_eq!(weight(&p, 5, 10), "1");
    }

    #[test]
    fn custom_is_forwarded_unevaluated() {
        let mut p = Prompt::numbered(1, 0, 10);
        p.overlap.kind = OverlapType::Custom;
        p.overlap.custom = "sin(t) * 0.5".to_string();
        assert_eq!(weight(&p, 5, 10), "${sin(t) * 0.5}");
        assert_eq!(prompt_weight(&p, 5, 10).value(), None);
    }

    #[test]
    fn fade_in_starts_at_zero() {
        let p = linear(10, 50, 10, 0);
        assert_eq!(weight(&p, 10, 100), "0.000");
        assert_eq!(weight(&p, 15, 100), "0.5000");
        assert_eq!(weight(&p, 20, 100), "1");
    }

    #[test]
    fn fade_out_ends_at_zero() {
        let p = linear(10, 50, 0, 10);
        assert_eq!(weight(&p, 40, 100), "1");
        assert_eq!(weight(&p, 45, 100), "0.5000");
        assert_eq!(weight(&p, 50, 100), "0.000");
    }

    #[test]
    fn exact_tie_rounds_up() {
        let p = linear(0, 100, 64, 0);
        assert_eq!(weight(&p, 1, 100), "0.01563");
    }

    #[test]
    fn unbounded_intervals_do_not_overflow() {
        let p = linear(Frame::MIN, Frame::MAX, Frame::MAX, Frame::MAX);
        assert_eq!(weight(&p, Frame::MIN, Frame::MAX), "0.000");
        assert_eq!(prompt_weight(&p, Frame::MIN / 2, Frame::MAX).value(), Some(0.5));

        let p = linear(0, Frame::MAX, 10, Frame::MAX);
        assert_eq!(weight(&p, 5, Frame::MAX), "0.5000");
    }

    #[test]
    fn between_fades_is_full_weight() {
        let p = linear(0, 100, 10, 10);
        for frame in 10..=90 {
            assert_eq!(weight(&p, frame, 100), "1", "frame {frame}");
        }
    }

    #[test]
    fn all_frames_fades_over_whole_timeline() {
        let mut p = linear(40, 60, 10, 10);
        p.all_frames = true;
        assert_eq!(weight(&p, 0, 100), "0.000");
        assert_eq!(weight(&p, 100, 100), "0.000");
        assert_eq!(weight(&p, 50, 100), "1");
    }

    #[test]
    fn short_prompt_never_reaches_full_weight() {
        let p = linear(0, 10, 8, 8);
        for frame in 0..=10 {
            assert_ne!(weight(&p, frame, 100), "1", "frame {frame}");
        }
    }
}
