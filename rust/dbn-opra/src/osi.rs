//! Parsing of OCC Symbology Initiative (OSI) option contract symbols.

use std::{fmt, str::FromStr};

use dbn_live::Error;

/// The fixed length of an OSI option symbol.
pub const OSI_LEN: usize = 21;
/// The space-padded width of the root within an OSI symbol.
const ROOT_LEN: usize = 6;

/// A decoded OSI option contract symbol, e.g. `TSLA  250815C00100000`.
///
/// Roots must be correctly space-padded to six characters; i.e.
/// `TSLA  250815C00100000`, not `TSLA250815C00100000`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OsiSymbol {
    /// The root symbol without padding, e.g. `MSFT`, `SPY`.
    pub root: String,
    /// The expiration year, since 2000.
    pub exp_year: u8,
    /// The expiration month (1 - 12).
    pub exp_month: u8,
    /// The expiration day (1 - 31).
    pub exp_day: u8,
    /// Call or put.
    pub is_call: bool,
    /// The strike price in nanodollars.
    pub strike: u64,
}

impl OsiSymbol {
    /// Returns the calendar year of expiration.
    pub fn expiration_year(&self) -> u16 {
        2000 + u16::from(self.exp_year)
    }
}

impl FromStr for OsiSymbol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != OSI_LEN || !s.is_ascii() {
            return Err(Error::conversion::<OsiSymbol>(s));
        }
        // The root runs to the first space of the padded field.
        let root = s[..ROOT_LEN]
            .split(' ')
            .next()
            .unwrap_or_default()
            .to_owned();
        if root.is_empty() {
            return Err(Error::conversion::<OsiSymbol>(s));
        }
        let digits =
            |range: std::ops::Range<usize>| s[range].parse().map_err(|_| Error::conversion::<OsiSymbol>(s));
        let exp_year: u8 = digits(6..8)?;
        let exp_month: u8 = digits(8..10)?;
        let exp_day: u8 = digits(10..12)?;
        let is_call = match s.as_bytes()[12] {
            b'C' => true,
            b'P' => false,
            _ => return Err(Error::conversion::<OsiSymbol>(s)),
        };
        let strike_digits: u64 = s[13..OSI_LEN]
            .parse()
            .map_err(|_| Error::conversion::<OsiSymbol>(s))?;
        Ok(Self {
            root,
            exp_year,
            exp_month,
            exp_day,
            is_call,
            // The eight digits carry three implied decimals: dollars times
            // 1e3, so nanodollars are digits times 1e6.
            strike: strike_digits * 1_000_000,
        })
    }
}

impl fmt::Display for OsiSymbol {
    /// Formats the symbol in its canonical 21-character form.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<6}{:02}{:02}{:02}{}{:08}",
            self.root,
            self.exp_year,
            self.exp_month,
            self.exp_day,
            if self.is_call { 'C' } else { 'P' },
            self.strike / 1_000_000
        )
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_parse() {
        let osi: OsiSymbol = "TSLA  250815C00100000".parse().unwrap();
        assert_eq!(osi.root, "TSLA");
        assert_eq!(osi.exp_year, 25);
        assert_eq!(osi.expiration_year(), 2025);
        assert_eq!(osi.exp_month, 8);
        assert_eq!(osi.exp_day, 15);
        assert!(osi.is_call);
        assert_eq!(osi.strike, 100_000_000_000);
    }

    #[test]
    fn test_parse_put_fractional_strike() {
        let osi: OsiSymbol = "SPY   241220P00500500".parse().unwrap();
        assert!(!osi.is_call);
        // $500.50 in nanodollars.
        assert_eq!(osi.strike, 500_500_000_000);
    }

    #[rstest]
    #[case::too_short("SPY")]
    #[case::too_long("SPYSPYSPY 241220P005005000")]
    #[case::no_padding("TSLA250815C00100000")]
    #[case::bad_side("SPY   241220X00500500")]
    #[case::bad_digits("SPY   2412C0P00500500")]
    #[case::bad_strike("SPY   241220P0050050x")]
    #[case::empty_root("      241220P00500500")]
    fn test_parse_rejects(#[case] symbol: &str) {
        assert!(symbol.parse::<OsiSymbol>().is_err());
    }

    #[test]
    fn test_display_round_trip() {
        for symbol in ["TSLA  250815C00100000", "SPY   241220P00500500"] {
            let osi: OsiSymbol = symbol.parse().unwrap();
            assert_eq!(osi.to_string(), symbol);
        }
    }
}
