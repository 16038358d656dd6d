//! Line numbers for titling divisions by the lines they span.

use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

lazy_static! {
    static ref RE_LINE_NUMBER: Regex = Regex::new(r"^(\D*?)(\d+)(\D*)$").unwrap();
}

/// A printed line label such as `"354a"`: a number with optional prefix and suffix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineNumber {
    pub pre: String,
    pub number: u32,
    pub post: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid line number: {0}")]
pub struct ParseLineNumberError(String);

impl FromStr for LineNumber {
    type Err = ParseLineNumberError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let caps = RE_LINE_NUMBER.captures(s.trim())
            .ok_or_else(|| ParseLineNumberError(s.to_string()))?;
        let number = caps[2].parse::<u32>()
            .map_err(|_| ParseLineNumberError(s.to_string()))?;

        Ok(LineNumber {
            pre: caps[1].to_string(),
            number,
            post: caps[3].to_string(),
        })
    }
}

impl fmt::Display for LineNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.pre, self.number, self.post)
    }
}

impl LineNumber {
    pub fn new(number: u32) -> Self {
        LineNumber { number, ..Default::default() }
    }

    /// Advance the number, keeping prefix and suffix.
    ///
    /// Returns false and leaves the number unchanged when it is already `u32::MAX`.
    pub fn increment(&mut self) -> bool {
        match self.number.checked_add(1) {
            Some(n) => {
                self.number = n;
                true
            }
            None => false,
        }
    }

    pub fn incremented(&self) -> Option<Self> {
        let mut next = self.clone();
        next.increment().then_some(next)
    }
}

/// First and last line of a closed unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRange {
    pub start: LineNumber,
    pub end: LineNumber,
}

impl LineRange {
    pub fn title(&self) -> String {
        format!("lines {}\u{2013}{}", self.start, self.end)
    }
}

/// Running line count across the units of one top-level division.
#[derive(Debug, Clone, Default)]
pub struct LineCounter {
    current: LineNumber,
    previous_end: LineNumber,
    markers_in_unit: usize,
}

impl LineCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one line marker. A label resets the count to that number.
    ///
    /// An unreadable label still counts as one line.
    pub fn observe(&mut self, label: Option<&str>) -> Result<(), ParseLineNumberError> {
        self.markers_in_unit += 1;

        match label {
            Some(l) => match l.parse::<LineNumber>() {
                Ok(n) => {
                    self.current = n;
                    Ok(())
                }
                Err(e) => self.advance().and(Err(e)),
            },
            None => self.advance(),
        }
    }

    fn advance(&mut self) -> Result<(), ParseLineNumberError> {
        if self.current.increment() {
            Ok(())
        } else {
            Err(ParseLineNumberError(format!("{} has no next line", self.current)))
        }
    }

    /// End the current unit. Returns its range if it saw any line markers.
    pub fn close_unit(&mut self) -> Option<LineRange> {
        if self.markers_in_unit == 0 {
            return None;
        }

        let range = LineRange {
            start: self.previous_end.incremented().unwrap_or_else(|| self.previous_end.clone()),
            end: self.current.clone(),
        };
        self.previous_end = self.current.clone();
        self.markers_in_unit = 0;

        Some(range)
    }

    /// Start counting from line 1 again.
    pub fn rebase(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let n: LineNumber = "354a".parse().unwrap();
        assert_eq!(n.number, 354);
        assert_eq!(n.post, "a");
        assert_eq!(n.to_string(), "354a");
        assert!("abc".parse::<LineNumber>().is_err());
    }

    #[test]
    fn test_increment_keeps_suffix() {
        let mut n: LineNumber = "354a".parse().unwrap();
        n.increment();
        assert_eq!(n.number, 355);
        assert_eq!(n.to_string(), "355a");
    }

    #[test]
    fn test_explicit_labels_reset_the_count() {
        let mut c = LineCounter::new();
        for n in ["1", "2", "3", "5"] {
            c.observe(Some(n)).unwrap();
        }
        assert_eq!(c.close_unit().unwrap().title(), "lines 1\u{2013}5");
    }

    #[test]
    fn test_consecutive_units() {
        let mut c = LineCounter::new();
        for _ in 0..4 {
            c.observe(None).unwrap();
        }
        assert_eq!(c.close_unit().unwrap().title(), "lines 1\u{2013}4");

        assert!(c.close_unit().is_none());

        c.observe(None).unwrap();
        c.observe(None).unwrap();
        assert_eq!(c.close_unit().unwrap().title(), "lines 5\u{2013}6");

        c.rebase();
        c.observe(None).unwrap();
        assert_eq!(c.close_unit().unwrap().title(), "lines 1\u{2013}1");
    }

    #[test]
    fn test_increment_stops_at_the_last_number() {
        let mut n = LineNumber::new(u32::MAX);
        assert!(!n.increment());
        assert_eq!(n.number, u32::MAX);
        assert_eq!(n.incremented(), None);
        assert_eq!(LineNumber::new(7).incremented(), Some(LineNumber::new(8)));
    }

    #[test]
    fn test_unlabelled_line_after_the_last_number() {
        let mut c = LineCounter::new();
        c.observe(Some("4294967295")).unwrap();
        assert!(c.observe(None).is_err());
        let range = c.close_unit().unwrap();
        assert_eq!(range.start, LineNumber::new(1));
        assert_eq!(range.end, LineNumber::new(u32::MAX));

        // The next unit has nowhere to start but the last number.
        c.observe(None).unwrap_err();
        assert_eq!(c.close_unit().unwrap().start, LineNumber::new(u32::MAX));
    }

    #[test]
    fn test_bad_label_still_counts() {
        let mut c = LineCounter::new();
        c.observe(None).unwrap();
        assert!(c.observe(Some("x")).is_err());
        assert_eq!(c.close_unit().unwrap().end, LineNumber::new(2));
    }
}
