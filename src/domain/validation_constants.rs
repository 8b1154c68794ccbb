//! Validation constants for domain types
//!
//! This module centralizes the limits and magic numbers used throughout the
//! domain layer so the identifier format and the database schema agree.

/// Public order identifier layout (`YYYYMMDD-XXXXXX`)
pub mod order_number {
    /// Number of digits in the date partition
    pub const DATE_DIGITS: usize = 8;

    /// Number of digits in the zero-padded sequence part
    pub const SEQUENCE_DIGITS: usize = 6;

    /// Separator between the date and sequence parts
    pub const SEPARATOR: char = '-';

    /// Total length of a formatted identifier
    pub const TOTAL_LENGTH: usize = DATE_DIGITS + 1 + SEQUENCE_DIGITS;

    /// First sequence number issued in a partition
    pub const MIN_SEQUENCE: u32 = 1;

    /// Highest sequence number representable in six digits
    pub const MAX_SEQUENCE: u32 = 999_999;
}

/// Partition timezone limits
pub mod partition {
    /// Largest supported UTC offset in minutes (UTC+14:00)
    pub const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

    /// Smallest supported UTC offset in minutes (UTC-12:00)
    pub const MIN_UTC_OFFSET_MINUTES: i32 = -12 * 60;
}

/// Catalog and cart limits
pub mod catalog {
    /// Maximum product name length
    pub const MAX_PRODUCT_NAME_LENGTH: usize = 200;

    /// Maximum quantity of a single product on one order line
    pub const MAX_LINE_QUANTITY: u32 = 10_000;

    /// Decimal places kept for prices and order totals
    pub const PRICE_DECIMAL_PLACES: u32 = 2;

    /// Exclusive upper bound of a unit price (`NUMERIC(10, 2)`)
    pub const MAX_PRICE_EXCLUSIVE: i64 = 100_000_000;

    /// Exclusive upper bound of an order total (`NUMERIC(15, 2)`)
    pub const MAX_ORDER_TOTAL_EXCLUSIVE: i64 = 10_000_000_000_000;
}

/// Precision the order tables store
pub mod storage {
    /// Fractional second digits kept by `TIMESTAMPTZ`
    pub const TIMESTAMP_SUBSEC_DIGITS: u16 = 6;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_length_matches_layout() {
        assert_eq!(order_number::TOTAL_LENGTH, 15);
    }

    #[test]
    fn max_sequence_fits_in_sequence_digits() {
        let formatted = format!(
            "{:0width$}",
            order_number::MAX_SEQUENCE,
            width = order_number::SEQUENCE_DIGITS
        );
        assert_eq!(formatted.len(), order_number::SEQUENCE_DIGITS);
        assert_eq!(
            (order_number::MAX_SEQUENCE + 1).to_string().len(),
            order_number::SEQUENCE_DIGITS + 1
        );
    }

    #[test]
    fn largest_line_total_fits_an_order() {
        let line = i128::from(catalog::MAX_PRICE_EXCLUSIVE) * i128::from(catalog::MAX_LINE_QUANTITY);
        assert!(line <= i128::from(catalog::MAX_ORDER_TOTAL_EXCLUSIVE));
    }

    #[test]
    fn offset_bounds_are_ordered() {
        const {
            assert!(partition::MIN_UTC_OFFSET_MINUTES < partition::MAX_UTC_OFFSET_MINUTES);
        }
    }
}
