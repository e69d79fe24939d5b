//! The stitch catalog: the atomic knitting operations the language can name,
//! together with their stitch arithmetic and side-reversal behavior.
//!
//! Every stitch kind is pure data. The only operation that can fail is
//! [`Stitch::reverse`], which has no answer for pass-over: PSSO removes a
//! stitch that was slipped earlier in the same row, and that action has no
//! wrong-side equivalent. Reversing a pattern containing one is a hard error
//! rather than a silent no-op.

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// A single atomic stitch.
///
/// # Examples
///
/// ```rust
/// use skein::stitch::Stitch;
/// assert_eq!(Stitch::Knit.symbol(), "K");
/// assert_eq!(Stitch::Knit.reverse(), Some(Stitch::Purl));
/// assert_eq!(Stitch::PassOver.produces(), -1);
/// assert_eq!(Stitch::PassOver.reverse(), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stitch {
    CastOn,
    BindOff,
    Knit,
    Purl,
    Slip,
    PassOver,
    YarnOver,
    Knit2Tog,
    Purl2Tog,
    SlipSlipKnit,
    SlipSlipPurl,
}

impl Stitch {
    /// The abbreviation that represents this stitch in knitting instructions.
    pub fn symbol(self) -> &'static str {
        match self {
            Stitch::CastOn => "CO",
            Stitch::BindOff => "BO",
            Stitch::Knit => "K",
            Stitch::Purl => "P",
            Stitch::Slip => "SL",
            Stitch::PassOver => "PSSO",
            Stitch::YarnOver => "YO",
            Stitch::Knit2Tog => "K2TOG",
            Stitch::Purl2Tog => "P2TOG",
            Stitch::SlipSlipKnit => "SSK",
            Stitch::SlipSlipPurl => "SSP",
        }
    }

    /// The number of stitches this stitch consumes from the current row.
    pub fn consumes(self) -> i64 {
        match self {
            Stitch::CastOn | Stitch::PassOver | Stitch::YarnOver => 0,
            Stitch::BindOff | Stitch::Knit | Stitch::Purl | Stitch::Slip => 1,
            Stitch::Knit2Tog | Stitch::Purl2Tog | Stitch::SlipSlipKnit | Stitch::SlipSlipPurl => 2,
        }
    }

    /// The number of stitches this stitch produces for the next row.
    ///
    /// Pass-over produces -1: it removes a stitch already produced by an
    /// earlier operation in the same row.
    pub fn produces(self) -> i64 {
        match self {
            Stitch::BindOff => 0,
            Stitch::PassOver => -1,
            Stitch::CastOn
            | Stitch::Knit
            | Stitch::Purl
            | Stitch::Slip
            | Stitch::YarnOver
            | Stitch::Knit2Tog
            | Stitch::Purl2Tog
            | Stitch::SlipSlipKnit
            | Stitch::SlipSlipPurl => 1,
        }
    }

    /// The stitch that has the same effect when the fabric is read from the
    /// opposite side, or `None` if there is no such stitch.
    ///
    /// Pass-over is the one kind without a reverse.
    pub fn reverse(self) -> Option<Stitch> {
        match self {
            Stitch::Knit => Some(Stitch::Purl),
            Stitch::Purl => Some(Stitch::Knit),
            Stitch::Knit2Tog => Some(Stitch::SlipSlipPurl),
            Stitch::Purl2Tog => Some(Stitch::SlipSlipKnit),
            Stitch::SlipSlipKnit => Some(Stitch::Purl2Tog),
            Stitch::SlipSlipPurl => Some(Stitch::Knit2Tog),
            Stitch::CastOn | Stitch::BindOff | Stitch::Slip | Stitch::YarnOver => Some(self),
            Stitch::PassOver => None,
        }
    }

    /// Looks up a stitch by its instruction symbol, for use by parsers.
    pub fn from_symbol(symbol: &str) -> Option<Stitch> {
        BY_SYMBOL.get(symbol).copied()
    }

    /// Every stitch in the catalog.
    pub const ALL: [Stitch; 11] = [
        Stitch::CastOn,
        Stitch::BindOff,
        Stitch::Knit,
        Stitch::Purl,
        Stitch::Slip,
        Stitch::PassOver,
        Stitch::YarnOver,
        Stitch::Knit2Tog,
        Stitch::Purl2Tog,
        Stitch::SlipSlipKnit,
        Stitch::SlipSlipPurl,
    ];
}

static BY_SYMBOL: Lazy<HashMap<&'static str, Stitch>> =
    Lazy::new(|| Stitch::ALL.iter().map(|&s| (s.symbol(), s)).collect());

impl fmt::Display for Stitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reverse_is_an_involution_where_defined() {
        for stitch in Stitch::ALL {
            if let Some(reversed) = stitch.reverse() {
                assert_eq!(reversed.reverse(), Some(stitch), "{stitch} round-trips");
            }
        }
    }

    #[test]
    fn reversal_preserves_stitch_arithmetic() {
        for stitch in Stitch::ALL {
            if let Some(reversed) = stitch.reverse() {
                assert_eq!(stitch.consumes(), reversed.consumes());
                assert_eq!(stitch.produces(), reversed.produces());
            }
        }
    }

    #[test]
    fn pass_over_has_no_reverse() {
        assert_eq!(Stitch::PassOver.reverse(), None);
    }

    #[test]
    fn symbols_round_trip() {
        for stitch in Stitch::ALL {
            assert_eq!(Stitch::from_symbol(stitch.symbol()), Some(stitch));
        }
        assert_eq!(Stitch::from_symbol("XYZ"), None);
    }
}
