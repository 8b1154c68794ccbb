//! Public order numbers
//!
//! Orders are exposed to customers as `YYYYMMDD-XXXXXX`: the calendar date of
//! the order's partition followed by a zero-padded sequence number that is
//! unique within that date. The types here make it impossible to build an
//! identifier that does not round-trip through its string form.

use crate::domain::validation_constants::{order_number, partition};
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Offset, Utc};
use nutype::nutype;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors produced while building or parsing order numbers
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderNumberError {
    #[error("Order number must be {expected} characters long, got {actual}")]
    Length { expected: usize, actual: usize },

    #[error("Order number may only contain ASCII digits and a '-' separator")]
    NonDigit,

    #[error("Order number is missing the '-' separator")]
    MissingSeparator,

    #[error("'{0}' is not a valid calendar date")]
    InvalidDate(String),

    #[error("Sequence number {0} is outside 1..=999999")]
    SequenceOutOfRange(u32),

    #[error("UTC offset of {0} minutes is not supported")]
    InvalidOffset(i32),
}

/// Calendar day that partitions the sequence space
///
/// Years are limited to four digits so that the formatted partition is always
/// exactly eight characters.
#[nutype(
    validate(predicate = |date| (1..=9999).contains(&date.year())),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        Serialize,
        Deserialize,
        AsRef
    )
)]
pub struct DateKey(NaiveDate);

impl DateKey {
    /// Derive the partition for a timestamp as seen in `timezone`
    pub fn from_timestamp(
        timestamp: DateTime<Utc>,
        timezone: PartitionTimezone,
    ) -> Result<Self, OrderNumberError> {
        let local = timestamp.with_timezone(&timezone.offset()).date_naive();
        Self::try_new(local).map_err(|_| OrderNumberError::InvalidDate(local.to_string()))
    }

    /// Build a partition from year, month and day
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Result<Self, OrderNumberError> {
        NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|date| Self::try_new(date).ok())
            .ok_or_else(|| OrderNumberError::InvalidDate(format!("{year:04}{month:02}{day:02}")))
    }

    pub fn date(&self) -> NaiveDate {
        self.into_inner()
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let date = self.into_inner();
        write!(f, "{:04}{:02}{:02}", date.year(), date.month(), date.day())
    }
}

impl FromStr for DateKey {
    type Err = OrderNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != order_number::DATE_DIGITS {
            return Err(OrderNumberError::Length {
                expected: order_number::DATE_DIGITS,
                actual: s.len(),
            });
        }
        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(OrderNumberError::NonDigit);
        }

        let invalid = || OrderNumberError::InvalidDate(s.to_string());
        let year: i32 = s[0..4].parse().map_err(|_| invalid())?;
        let month: u32 = s[4..6].parse().map_err(|_| invalid())?;
        let day: u32 = s[6..8].parse().map_err(|_| invalid())?;

        Self::from_ymd(year, month, day).map_err(|_| invalid())
    }
}

/// 1-based position of an order within its date partition
#[nutype(
    validate(predicate = |n| (order_number::MIN_SEQUENCE..=order_number::MAX_SEQUENCE).contains(n)),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        Serialize,
        Deserialize,
        AsRef,
        Display
    )
)]
pub struct SequenceNumber(u32);

impl SequenceNumber {
    pub fn first() -> Self {
        Self::try_new(order_number::MIN_SEQUENCE).expect("Minimum sequence is valid")
    }

    pub fn last() -> Self {
        Self::try_new(order_number::MAX_SEQUENCE).expect("Maximum sequence is valid")
    }

    /// The following sequence number, or `None` once the partition is full
    pub fn next(self) -> Option<Self> {
        Self::try_new(self.into_inner() + 1).ok()
    }

    pub fn value(self) -> u32 {
        self.into_inner()
    }
}

/// Timezone used to decide which calendar day an order belongs to
///
/// Only fixed offsets are supported, so a partition never shifts across a
/// daylight-saving transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
#[display("UTC{_0}")]
pub struct PartitionTimezone(FixedOffset);

impl PartitionTimezone {
    pub fn utc() -> Self {
        Self(Utc.fix())
    }

    pub fn from_offset_minutes(minutes: i32) -> Result<Self, OrderNumberError> {
        if !(partition::MIN_UTC_OFFSET_MINUTES..=partition::MAX_UTC_OFFSET_MINUTES)
            .contains(&minutes)
        {
            return Err(OrderNumberError::InvalidOffset(minutes));
        }
        FixedOffset::east_opt(minutes * 60)
            .map(Self)
            .ok_or(OrderNumberError::InvalidOffset(minutes))
    }

    pub fn offset(&self) -> FixedOffset {
        self.0
    }
}

impl Default for PartitionTimezone {
    fn default() -> Self {
        Self::utc()
    }
}

/// Customer-facing order identifier, `YYYYMMDD-XXXXXX`
///
/// The derived ordering compares the partition first and the sequence second,
/// which is the same order as comparing the formatted strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PublicOrderId {
    partition: DateKey,
    sequence: SequenceNumber,
}

impl PublicOrderId {
    pub fn new(partition: DateKey, sequence: SequenceNumber) -> Self {
        Self {
            partition,
            sequence,
        }
    }

    pub fn partition(&self) -> DateKey {
        self.partition
    }

    pub fn sequence(&self) -> SequenceNumber {
        self.sequence
    }
}

impl fmt::Display for PublicOrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{:0width$}",
            self.partition,
            order_number::SEPARATOR,
            self.sequence.value(),
            width = order_number::SEQUENCE_DIGITS
        )
    }
}

impl FromStr for PublicOrderId {
    type Err = OrderNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !s.is_ascii() {
            return Err(OrderNumberError::NonDigit);
        }
        if s.len() != order_number::TOTAL_LENGTH {
            return Err(OrderNumberError::Length {
                expected: order_number::TOTAL_LENGTH,
                actual: s.len(),
            });
        }

        let (date, rest) = s.split_at(order_number::DATE_DIGITS);
        let sequence = rest
            .strip_prefix(order_number::SEPARATOR)
            .ok_or(OrderNumberError::MissingSeparator)?;
        if !sequence.bytes().all(|b| b.is_ascii_digit()) {
            return Err(OrderNumberError::NonDigit);
        }

        let partition = date.parse::<DateKey>()?;
        let value: u32 = sequence.parse().map_err(|_| OrderNumberError::NonDigit)?;
        let sequence =
            SequenceNumber::try_new(value).map_err(|_| OrderNumberError::SequenceOutOfRange(value))?;

        Ok(Self::new(partition, sequence))
    }
}

impl TryFrom<String> for PublicOrderId {
    type Error = OrderNumberError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PublicOrderId> for String {
    fn from(id: PublicOrderId) -> Self {
        id.to_string()
    }
}
