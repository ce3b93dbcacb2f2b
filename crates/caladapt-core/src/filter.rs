//! Summary filters and their URL-safe serialization.
//!
//! A filter serializes as `<mode>(<opt1>.-<opt2>...)`, e.g.
//! `0(Föreläsning)` or `1(Tentamen.-Omtenta)`. Several filters are
//! concatenated without a separator by [`FilterSlicer`](crate::slicer::FilterSlicer);
//! the balanced parentheses make each one self-delimiting.

use std::fmt;
use std::str::FromStr;

use crate::calendar::Event;
use crate::error::{CoreError, CoreResult};

/// Separator between serialized filter options.
pub const OPTION_DIVIDER: &str = ".-";

/// Characters reserved by the surrounding URL grammar.
const RESERVED_CHARS: &[char] = &['?', '&', '/'];

/// How a filter matches an event summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterMode {
    /// The summary contains the first option.
    SummaryIncludes = 0,
    /// The summary starts with the first option.
    SummaryStartsWith = 1,
}

impl FilterMode {
    /// All modes, indexed by their numeric value.
    pub const ALL: [FilterMode; 2] = [Self::SummaryIncludes, Self::SummaryStartsWith];

    /// Returns the numeric value used in the serialized form.
    pub fn as_index(self) -> usize {
        self as usize
    }

    /// Looks up a mode by its numeric value.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Converts a raw numeric mode, flooring fractional values.
    ///
    /// # Errors
    ///
    /// NaN, negative and out-of-range values are rejected.
    pub fn from_raw(raw: f64) -> CoreResult<Self> {
        if raw.is_nan() || raw < 0.0 {
            return Err(CoreError::invalid_input(format!(
                "filter mode must be a non-negative integer, got {raw}"
            )));
        }
        let floored = raw.floor();
        if floored >= Self::ALL.len() as f64 {
            return Err(CoreError::invalid_input(format!(
                "unknown filter mode {floored}"
            )));
        }
        Ok(Self::ALL[floored as usize])
    }
}

/// A predicate on event summaries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Filter {
    mode: FilterMode,
    options: Vec<String>,
}

impl Filter {
    /// Creates a filter, validating its options.
    ///
    /// # Errors
    ///
    /// Options must be non-empty and must not contain the option divider,
    /// any of `? & /`, or unbalanced parentheses.
    pub fn new<I, S>(mode: FilterMode, options: I) -> CoreResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let options: Vec<String> = options.into_iter().map(Into::into).collect();
        for option in &options {
            validate_option(option)?;
        }
        Ok(Self { mode, options })
    }

    /// Creates a filter from a raw numeric mode (see [`FilterMode::from_raw`]).
    pub fn from_raw_mode<I, S>(mode: f64, options: I) -> CoreResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(FilterMode::from_raw(mode)?, options)
    }

    /// Shorthand for a [`FilterMode::SummaryIncludes`] filter.
    pub fn includes(needle: impl Into<String>) -> CoreResult<Self> {
        Self::new(FilterMode::SummaryIncludes, [needle.into()])
    }

    /// Shorthand for a [`FilterMode::SummaryStartsWith`] filter.
    pub fn starts_with(prefix: impl Into<String>) -> CoreResult<Self> {
        Self::new(FilterMode::SummaryStartsWith, [prefix.into()])
    }

    /// Returns the mode.
    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    /// Returns the options in declared order.
    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// Tests an event against this filter.
    ///
    /// Events without a summary and filters without options never match.
    pub fn test(&self, event: &Event) -> bool {
        let (Some(summary), Some(option)) = (event.summary.as_deref(), self.options.first())
        else {
            return false;
        };
        match self.mode {
            FilterMode::SummaryIncludes => summary.contains(option.as_str()),
            FilterMode::SummaryStartsWith => summary.starts_with(option.as_str()),
        }
    }

    /// Parses the serialized form `<mode>(<options>)`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidInput`] for a missing `(`, a missing
    /// trailing `)`, a non-integer mode or invalid options.
    pub fn from_serialized(serialized: &str) -> CoreResult<Self> {
        let open = serialized.find('(').ok_or_else(|| {
            CoreError::invalid_input(format!("filter {serialized:?} has no options list"))
        })?;
        let interior = serialized[open + 1..].strip_suffix(')').ok_or_else(|| {
            CoreError::invalid_input(format!("filter {serialized:?} is not closed"))
        })?;

        let mode_text = &serialized[..open];
        let mode: usize = mode_text.parse().map_err(|_| {
            CoreError::invalid_input(format!("filter mode {mode_text:?} is not an integer"))
        })?;
        let mode = FilterMode::from_index(mode)
            .ok_or_else(|| CoreError::invalid_input(format!("unknown filter mode {mode}")))?;

        let options: Vec<&str> = if interior.is_empty() {
            Vec::new()
        } else {
            interior.split(OPTION_DIVIDER).collect()
        };
        Self::new(mode, options)
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({})",
            self.mode.as_index(),
            self.options.join(OPTION_DIVIDER)
        )
    }
}

impl FromStr for Filter {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_serialized(s)
    }
}

fn validate_option(option: &str) -> CoreResult<()> {
    if option.is_empty() {
        return Err(CoreError::invalid_input("filter options must not be empty"));
    }
    if option.contains(OPTION_DIVIDER) {
        return Err(CoreError::invalid_input(format!(
            "filter option {option:?} contains the divider {OPTION_DIVIDER:?}"
        )));
    }
    if let Some(c) = option.chars().find(|c| RESERVED_CHARS.contains(c)) {
        return Err(CoreError::invalid_input(format!(
            "filter option {option:?} contains reserved character {c:?}"
        )));
    }

    let mut depth = 0i32;
    for c in option.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            _ => {}
        }
        if depth < 0 {
            break;
        }
    }
    if depth != 0 {
        return Err(CoreError::invalid_input(format!(
            "filter option {option:?} has unbalanced parentheses"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::tests::event;

    #[test]
    fn raw_modes_are_validated() {
        assert!(Filter::from_raw_mode(-1.0, ["a"]).is_err());
        assert!(Filter::from_raw_mode(f64::NAN, ["a"]).is_err());
        assert!(Filter::from_raw_mode(2.0, ["a"]).is_err());
        assert!(Filter::from_raw_mode(f64::INFINITY, ["a"]).is_err());
        assert!(Filter::from_raw_mode(-0.5, ["a"]).is_err());
    }

    #[test]
    fn fractional_modes_are_floored() {
        let filter = Filter::from_raw_mode(1.9, ["a"]).unwrap();
        assert_eq!(filter.mode(), FilterMode::SummaryStartsWith);

        let filter = Filter::from_raw_mode(0.4, ["a"]).unwrap();
        assert_eq!(filter.mode(), FilterMode::SummaryIncludes);
    }

    #[test]
    fn reserved_options_are_rejected() {
        for bad in ["", "a.-b", "what?", "a&b", "a/b", "(open", "close)", ")("] {
            assert!(
                Filter::includes(bad).is_err(),
                "option {bad:?} should be rejected"
            );
        }
        assert!(Filter::includes("Lab (grupp 2)").is_ok());
        assert!(Filter::includes("a.b-c").is_ok());
    }

    #[test]
    fn includes_and_starts_with() {
        let includes = Filter::includes("def").unwrap();
        assert!(includes.test(&event("1", "ABCdef")));
        assert!(!includes.test(&event("2", "ABC")));

        let starts = Filter::starts_with("ABC").unwrap();
        assert!(starts.test(&event("3", "ABCdef")));
        assert!(!starts.test(&event("4", "abcdef")));
    }

    #[test]
    fn missing_summary_or_options_never_match() {
        let mut no_summary = event("1", "x");
        no_summary.summary = None;
        assert!(!Filter::includes("x").unwrap().test(&no_summary));

        let no_options = Filter::new(FilterMode::SummaryIncludes, Vec::<String>::new()).unwrap();
        assert!(!no_options.test(&event("2", "anything")));
    }

    #[test]
    fn empty_options_cannot_be_constructed() {
        assert!(Filter::new(FilterMode::SummaryIncludes, [""]).is_err());
        assert!(Filter::new(FilterMode::SummaryStartsWith, ["a", ""]).is_err());
        assert!(Filter::starts_with("").is_err());
    }

    #[test]
    fn serialized_form() {
        let filter =
            Filter::new(FilterMode::SummaryStartsWith, ["Tentamen", "Omtenta"]).unwrap();
        assert_eq!(filter.to_string(), "1(Tentamen.-Omtenta)");

        let empty = Filter::new(FilterMode::SummaryIncludes, Vec::<String>::new()).unwrap();
        assert_eq!(empty.to_string(), "0()");
    }

    #[test]
    fn serialization_round_trip() {
        let filters = [
            Filter::includes("Föreläsning").unwrap(),
            Filter::new(FilterMode::SummaryStartsWith, ["b", "a", "c (x)"]).unwrap(),
            Filter::new(FilterMode::SummaryIncludes, Vec::<String>::new()).unwrap(),
            Filter::new(FilterMode::SummaryIncludes, ["y", "x"]).unwrap(),
        ];
        for filter in filters {
            let parsed: Filter = filter.to_string().parse().unwrap();
            assert_eq!(parsed, filter);
        }
    }

    #[test]
    fn malformed_serialized_filters() {
        for bad in [
            "", "0", "0(abc", "x(abc)", "-1(abc)", "5(abc)", "(abc)", "0(a/b)", "0(.-x)", "0(x.-)",
        ] {
            assert!(
                Filter::from_serialized(bad).is_err(),
                "{bad:?} should not parse"
            );
        }
    }
}
