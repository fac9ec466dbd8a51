//! Cron field parsing.
//!
//! A field expression is a comma-separated list of terms:
//!
//! ```text
//! field   := term ("," term)*
//! term    := base ["/" divisor]
//! base    := "*" | value | value "-" value
//! ```
//!
//! A divisor keeps only the values evenly divisible by it. Values outside the
//! field's domain are dropped; both ends of the domain are valid.

use std::fmt;

use crate::error::{CronError, CronResult, FieldErrorKind};

const WEEKDAY_NAMES: [&str; 7] = ["sun", "mon", "tue", "wed", "thu", "fri", "sat"];
const MONTH_NAMES: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// The five positions of a cron expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Minute,
    Hour,
    Day,
    Month,
    Weekday,
}

impl FieldKind {
    /// All kinds in expression order.
    pub const ALL: [FieldKind; 5] = [
        FieldKind::Minute,
        FieldKind::Hour,
        FieldKind::Day,
        FieldKind::Month,
        FieldKind::Weekday,
    ];

    /// Smallest accepted value.
    pub fn min(self) -> u32 {
        match self {
            FieldKind::Minute | FieldKind::Hour | FieldKind::Weekday => 0,
            FieldKind::Day | FieldKind::Month => 1,
        }
    }

    /// Largest accepted value. Weekday 7 is Sunday again.
    pub fn max(self) -> u32 {
        match self {
            FieldKind::Minute => 59,
            FieldKind::Hour => 23,
            FieldKind::Day => 31,
            FieldKind::Month => 12,
            FieldKind::Weekday => 7,
        }
    }

    /// Field name as used in error messages.
    pub fn name(self) -> &'static str {
        match self {
            FieldKind::Minute => "minute",
            FieldKind::Hour => "hour",
            FieldKind::Day => "day",
            FieldKind::Month => "month",
            FieldKind::Weekday => "weekday",
        }
    }

    fn alias(self, token: &str) -> Option<u32> {
        let names: &[&str] = match self {
            FieldKind::Weekday => &WEEKDAY_NAMES,
            FieldKind::Month => &MONTH_NAMES,
            _ => return None,
        };
        let position = names.iter().position(|n| n.eq_ignore_ascii_case(token))? as u32;
        Some(if self == FieldKind::Month { position + 1 } else { position })
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The set of values one cron field allows.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CronField {
    kind: FieldKind,
    bits: u64,
}

impl CronField {
    /// Parse `expr` for the given field.
    pub fn parse(kind: FieldKind, expr: &str) -> CronResult<Self> {
        let mut bits = expand(expr, kind.min(), kind.max(), |token| kind.alias(token)).map_err(
            |(token, reason)| CronError::InvalidField {
                field: kind,
                token,
                reason,
            },
        )?;
        if kind == FieldKind::Weekday && bits & (1 << 7) != 0 {
            bits = (bits & !(1 << 7)) | 1;
        }
        Ok(Self { kind, bits })
    }

    /// Which field this is.
    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Check whether `value` is allowed.
    pub fn contains(&self, value: u32) -> bool {
        value < 64 && self.bits & (1 << value) != 0
    }

    /// Allowed values in ascending order.
    pub fn values(&self) -> Vec<u32> {
        (0..64).filter(|v| self.contains(*v)).collect()
    }

    /// Number of allowed values.
    pub fn len(&self) -> usize {
        self.bits.count_ones() as usize
    }

    /// True when nothing can ever match.
    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }
}

impl fmt::Debug for CronField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CronField")
            .field("kind", &self.kind)
            .field("values", &self.values())
            .finish()
    }
}

type ExpandError = (String, FieldErrorKind);

/// Expand `expr` into a bitmask of the values in `[min, max]`.
fn expand(
    expr: &str,
    min: u32,
    max: u32,
    alias: impl Fn(&str) -> Option<u32>,
) -> Result<u64, ExpandError> {
    debug_assert!(min <= max && max < 64);

    let expr = expr.trim();
    if expr.is_empty() {
        return Err((expr.to_string(), FieldErrorKind::Empty));
    }

    let mut bits = 0u64;
    for term in expr.split(',') {
        bits |= expand_term(term.trim(), min, max, &alias)?;
    }
    Ok(bits)
}

fn expand_term(
    term: &str,
    min: u32,
    max: u32,
    alias: &impl Fn(&str) -> Option<u32>,
) -> Result<u64, ExpandError> {
    let fail = |reason| Err((term.to_string(), reason));
    if term.is_empty() {
        return fail(FieldErrorKind::Empty);
    }

    let mut parts = term.split('/');
    let base = parts.next().unwrap_or_default();
    let divisor = match (parts.next(), parts.next()) {
        (None, _) => 1,
        (Some(d), None) => match d.trim().parse::<u32>() {
            Ok(d) if d > 0 => d,
            _ => return fail(FieldErrorKind::InvalidDivisor),
        },
        (Some(_), Some(_)) => return fail(FieldErrorKind::MultipleDivisors),
    };

    let value = |token: &str| -> Result<u32, ExpandError> {
        let token = token.trim();
        token
            .parse::<u32>()
            .ok()
            .or_else(|| alias(token))
            .ok_or_else(|| (term.to_string(), FieldErrorKind::NotANumber))
    };

    let (low, high) = if base.trim() == "*" {
        (min, max)
    } else if base.contains('-') {
        let bounds: Vec<&str> = base.split('-').collect();
        if bounds.len() != 2 {
            return fail(FieldErrorKind::MultipleRanges);
        }
        let (low, high) = (value(bounds[0])?, value(bounds[1])?);
        if low > high {
            return fail(FieldErrorKind::ReversedRange);
        }
        (low, high)
    } else {
        let single = value(base)?;
        (single, single)
    };

    let mut bits = 0u64;
    for v in low.max(min)..=high.min(max) {
        if v % divisor == 0 {
            bits |= 1 << v;
        }
    }
    Ok(bits)
}

#[cfg(test)]
#[path = "field_tests.rs"]
mod tests;
