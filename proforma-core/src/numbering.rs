use chrono::NaiveDateTime;

/// Prefix shared by every generated quote number.
pub const NUMBER_PREFIX: &str = "PF";

/// Generates a quote number from a timestamp: `PF-YYYYMMDD-HHMMSS`.
///
/// ```
/// use chrono::NaiveDate;
/// use proforma_core::numbering::quote_number;
///
/// let at = NaiveDate::from_ymd_opt(2025, 3, 7)
///     .unwrap()
///     .and_hms_opt(14, 5, 9)
///     .unwrap();
///
/// assert_eq!(quote_number(at), "PF-20250307-140509");
/// ```
pub fn quote_number(at: NaiveDateTime) -> String {
    format!("{NUMBER_PREFIX}-{}", at.format("%Y%m%d-%H%M%S"))
}

/// Number used for the copy of `number`, e.g. `PF-20250307-140509-COPY`.
pub fn copy_number(number: &str) -> String {
    format!("{number}-COPY")
}
