//! Classification of a run's output against the expected answer.

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Verdict {
    #[default]
    Unknown,
    Accepted,
    WrongAnswer,
}

impl Verdict {
    pub fn label(self) -> &'static str {
        match self {
            Verdict::Accepted => "Verdict : AC",
            Verdict::WrongAnswer => "Verdict : WA",
            Verdict::Unknown => "Verdict : **",
        }
    }

    /// Colour used when rendering the verdict, `None` for the default text colour.
    pub fn color(self) -> Option<[u8; 3]> {
        match self {
            Verdict::Accepted => Some([0, 180, 0]),
            Verdict::WrongAnswer => Some([255, 0, 0]),
            Verdict::Unknown => None,
        }
    }
}

/// Compares program output against the expected answer.
///
/// Carriage returns are dropped, then lines and space-separated tokens are
/// walked in lock-step. Anything present on only one side has to be blank;
/// tokens present on both sides have to match exactly.
pub fn is_verdict_pass(actual: &str, expected: &str) -> bool {
    let actual = actual.replace('\r', "");
    let expected = expected.replace('\r', "");

    let actual_lines: Vec<&str> = actual.split('\n').collect();
    let expected_lines: Vec<&str> = expected.split('\n').collect();

    lockstep_match(&actual_lines, &expected_lines, |a, b| {
        let a_words: Vec<&str> = a.split(' ').collect();
        let b_words: Vec<&str> = b.split(' ').collect();
        lockstep_match(&a_words, &b_words, |a, b| a == b)
    })
}

fn lockstep_match<F>(a: &[&str], b: &[&str], mut same: F) -> bool
where
    F: FnMut(&str, &str) -> bool,
{
    for index in 0..a.len().max(b.len()) {
        match (a.get(index), b.get(index)) {
            (Some(a), Some(b)) => {
                if !same(a, b) {
                    return false;
                }
            }
            (Some(extra), None) | (None, Some(extra)) => {
                if !extra.trim().is_empty() {
                    return false;
                }
            }
            (None, None) => break,
        }
    }
    true
}
