//! Line tokenizer and numeric field parsing for mic text files

use crate::error::RowError;
use nom::{
    bytes::complete::take_till1,
    character::complete::{i64 as nom_i64, space0, space1},
    combinator::all_consuming,
    multi::separated_list0,
    number::complete::double,
    sequence::delimited,
    IResult, Parser,
};

/// One non-blank line split into whitespace-separated fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Line<'a> {
    /// 1-based line number in the source text.
    pub number: usize,
    pub fields: Vec<&'a str>,
}

impl<'a> Line<'a> {
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fail with [`RowError::TooFewColumns`] unless at least `expected` fields exist.
    pub fn require(&self, expected: usize) -> Result<(), RowError> {
        if self.fields.len() < expected {
            return Err(RowError::TooFewColumns {
                line: self.number,
                expected,
                found: self.fields.len(),
            });
        }
        Ok(())
    }

    pub fn f64(&self, column: usize) -> Result<f64, RowError> {
        parse_f64(self.fields[column]).ok_or_else(|| self.invalid(column))
    }

    pub fn i64(&self, column: usize) -> Result<i64, RowError> {
        parse_i64(self.fields[column]).ok_or_else(|| self.invalid(column))
    }

    pub fn i32(&self, column: usize) -> Result<i32, RowError> {
        self.i64(column)?
            .try_into()
            .map_err(|_| self.invalid(column))
    }

    /// Optional trailing column: `Ok(None)` when absent.
    pub fn opt_f64(&self, column: usize) -> Result<Option<f64>, RowError> {
        if column < self.fields.len() {
            self.f64(column).map(Some)
        } else {
            Ok(None)
        }
    }

    fn invalid(&self, column: usize) -> RowError {
        RowError::InvalidField {
            line: self.number,
            column: column + 1,
            value: self.fields[column].to_string(),
        }
    }
}

fn field(input: &str) -> IResult<&str, &str> {
    take_till1(|c: char| c == ' ' || c == '\t').parse(input)
}

fn fields(input: &str) -> IResult<&str, Vec<&str>> {
    delimited(space0, separated_list0(space1, field), space0).parse(input)
}

/// Split text into lines of whitespace-separated fields. Blank lines are dropped.
pub fn tokenize(text: &str) -> Vec<Line<'_>> {
    text.lines()
        .enumerate()
        .filter_map(|(i, raw)| {
            let raw = raw.trim_end_matches('\r');
            // `field` consumes everything that is not a space or tab, so the
            // parser always reaches the end of the line.
            let fields = fields(raw).map(|(_, f)| f).unwrap_or_default();
            if fields.is_empty() {
                None
            } else {
                Some(Line { number: i + 1, fields })
            }
        })
        .collect()
}

pub fn parse_f64(s: &str) -> Option<f64> {
    all_consuming(double::<&str, nom::error::Error<&str>>)
        .parse(s)
        .ok()
        .map(|(_, v)| v)
}

pub fn parse_i64(s: &str) -> Option<i64> {
    all_consuming(nom_i64::<&str, nom::error::Error<&str>>)
        .parse(s)
        .ok()
        .map(|(_, v)| v)
}
