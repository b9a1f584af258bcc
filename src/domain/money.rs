use std::fmt;

/// Amounts are stored as integer cents so sums never drift.
/// `4.50` is `450`, `1200.00` is `120000`.
pub type Cents = i64;

/// Render cents with two decimals, e.g. `450` -> `"4.50"`.
pub fn format_cents(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

/// Sum amounts, or `None` if the total does not fit in [`Cents`].
pub fn checked_total<I>(values: I) -> Option<Cents>
where
    I: IntoIterator<Item = Cents>,
{
    values
        .into_iter()
        .try_fold(0 as Cents, |acc, value| acc.checked_add(value))
}

/// Parse user input such as `"4.5"`, `"$1,200"` or `".99"` into cents.
///
/// A leading currency symbol and `,` grouping are ignored. Digits past the
/// second decimal place are truncated.
pub fn parse_cents(input: &str) -> Result<Cents, ParseCentsError> {
    let trimmed = input.trim();
    let (negative, rest) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };
    let rest = rest.trim_start_matches(['$', '€', '£']).replace(',', "");

    if rest.is_empty() {
        return Err(ParseCentsError::Empty);
    }

    let (units_str, fraction_str) = match rest.split_once('.') {
        Some((units, fraction)) => (units, fraction),
        None => (rest.as_str(), ""),
    };

    if fraction_str.contains('.') {
        return Err(ParseCentsError::InvalidFormat);
    }
    if !units_str.chars().all(|c| c.is_ascii_digit())
        || !fraction_str.chars().all(|c| c.is_ascii_digit())
    {
        return Err(ParseCentsError::InvalidFormat);
    }
    if units_str.is_empty() && fraction_str.is_empty() {
        return Err(ParseCentsError::InvalidFormat);
    }

    let units: i64 = if units_str.is_empty() {
        0
    } else {
        units_str.parse().map_err(|_| ParseCentsError::Overflow)?
    };

    let mut fraction_digits = fraction_str.chars().take(2).collect::<String>();
    while fraction_digits.len() < 2 {
        fraction_digits.push('0');
    }
    let fraction: i64 = fraction_digits
        .parse()
        .map_err(|_| ParseCentsError::InvalidFormat)?;

    let cents = units
        .checked_mul(100)
        .and_then(|c| c.checked_add(fraction))
        .ok_or(ParseCentsError::Overflow)?;

    Ok(if negative { -cents } else { cents })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseCentsError {
    Empty,
    InvalidFormat,
    Overflow,
}

impl fmt::Display for ParseCentsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseCentsError::Empty => write!(f, "amount is empty"),
            ParseCentsError::InvalidFormat => write!(f, "invalid money format"),
            ParseCentsError::Overflow => write!(f, "amount is too large"),
        }
    }
}

impl std::error::Error for ParseCentsError {}
