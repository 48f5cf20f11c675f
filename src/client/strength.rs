//! Advisory password strength meter. It never blocks submission.

const SYMBOLS: &str = "!@#$%^&*(),.?\":{}|<>";

const LABELS: [&str; 5] = ["Very Weak", "Weak", "Medium", "Strong", "Very Strong"];
const COLORS: [&str; 5] = ["#F44336", "#FF9800", "#FFEB3B", "#8BC34A", "#4CAF50"];

pub const MAX_SCORE: u8 = 5;
const FULL_METER_SCORE: u8 = 4;

/// One point per satisfied rule, 0..=5.
#[must_use]
pub fn strength_score(password: &str) -> u8 {
    let rules = [
        password.chars().count() > 8,
        password.chars().any(|c| c.is_ascii_uppercase()),
        password.chars().any(|c| c.is_ascii_lowercase()),
        password.chars().any(|c| c.is_ascii_digit()),
        password.chars().any(|c| SYMBOLS.contains(c)),
    ];
    // at most 5
    rules.iter().filter(|rule| **rule).count() as u8
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Strength {
    pub score: u8,
    pub label: &'static str,
    pub color: &'static str,
    pub fill_percent: u8,
}

impl Strength {
    #[must_use]
    pub fn of(password: &str) -> Self {
        Self::from_score(strength_score(password))
    }

    /// Scores past the end of the table display as the last entry. The meter
    /// fills in quarters and is full from a score of 4.
    #[must_use]
    pub fn from_score(score: u8) -> Self {
        let index = usize::from(score.min(FULL_METER_SCORE));
        let fill_percent = score.min(FULL_METER_SCORE) * 25;
        Self {
            score,
            label: LABELS[index],
            color: COLORS[index],
            fill_percent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_password_scores_zero() {
        assert_eq!(strength_score(""), 0);
    }

    #[test]
    fn all_rules_score_five() {
        assert_eq!(strength_score("Abc12345!"), 5);
    }

    #[test]
    fn score_grows_with_character_classes() {
        let steps = ["abc", "abcD", "abcD1", "abcD1!", "abcD1!xyz"];
        let mut previous = 0;
        for step in steps {
            let score = strength_score(step);
            assert!(score >= previous, "{step} scored lower than its prefix");
            assert!(score <= MAX_SCORE);
            previous = score;
        }
        assert_eq!(previous, 5);
    }

    #[test]
    fn length_rule_counts_chars() {
        // 9 chars, lowercase only
        assert_eq!(strength_score("ééééééééé"), 1);
        assert_eq!(strength_score("abcdefgh"), 1);
        assert_eq!(strength_score("abcdefghi"), 2);
    }

    #[test]
    fn non_ascii_letters_do_not_count_as_cases() {
        assert_eq!(strength_score("ÄÖ"), 0);
    }

    #[test]
    fn unlisted_symbols_do_not_count() {
        assert_eq!(strength_score("-_+="), 0);
        assert_eq!(strength_score("\""), 1);
    }

    #[test]
    fn top_score_uses_last_table_entry() {
        let strength = Strength::from_score(5);
        assert_eq!(strength.label, "Very Strong");
        assert_eq!(strength.color, "#4CAF50");
        assert_eq!(strength.fill_percent, 100);
    }

    #[test]
    fn labels_follow_score() {
        assert_eq!(Strength::from_score(0).label, "Very Weak");
        assert_eq!(Strength::from_score(2).label, "Medium");
        assert_eq!(Strength::from_score(4).label, "Very Strong");
        assert_eq!(Strength::of("abc").color, "#FF9800");
    }

    #[test]
    fn meter_fills_in_quarters() {
        let fills: Vec<u8> = (0..=MAX_SCORE)
            .map(|score| Strength::from_score(score).fill_percent)
            .collect();
        assert_eq!(fills, [0, 25, 50, 75, 100, 100]);
    }
}
