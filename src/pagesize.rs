//! Pre-defined page sizes for common paper formats.
//!
//! All sizes are provided in portrait orientation (width, height) where width ≤ height,
//! except `LEDGER` which is defined landscape. Sizes can also be looked up by their
//! common name with [`named`], which is how a layout engine usually asks for paper.
//!
//! # Example
//!
//! ```
//! use pdf_canvas::pagesize::{self, Orientation, LETTER};
//!
//! let letter = pagesize::named("Letter").unwrap();
//! assert_eq!(letter, LETTER);
//!
//! let (width, height) = Orientation::Landscape.apply(LETTER);
//! assert!(width.0 > height.0);
//! ```

use crate::units::*;

/// Page dimensions as (width, height) in points.
pub type PageSize = (Pt, Pt);

// north american sizes
pub const LETTER: PageSize = (Pt(8.5 * 72.0), Pt(11.0 * 72.0));
pub const HALF_LETTER: PageSize = (Pt(5.5 * 72.0), Pt(8.5 * 72.0));
pub const JUNIOR_LEGAL: PageSize = (Pt(5.0 * 72.0), Pt(8.0 * 72.0));
pub const LEGAL: PageSize = (Pt(8.5 * 72.0), Pt(14.0 * 72.0));
pub const TABLOID: PageSize = (Pt(11.0 * 72.0), Pt(17.0 * 72.0));
pub const LEDGER: PageSize = (Pt(17.0 * 72.0), Pt(11.0 * 72.0));
pub const EXECUTIVE: PageSize = (Pt(7.25 * 72.0), Pt(10.5 * 72.0));

// ansi sizes
pub const ANSI_A: PageSize = (Pt(8.5 * 72.0), Pt(11.0 * 72.0));
pub const ANSI_B: PageSize = (Pt(11.0 * 72.0), Pt(17.0 * 72.0));
pub const ANSI_C: PageSize = (Pt(17.0 * 72.0), Pt(22.0 * 72.0));
pub const ANSI_D: PageSize = (Pt(22.0 * 72.0), Pt(34.0 * 72.0));
pub const ANSI_E: PageSize = (Pt(34.0 * 72.0), Pt(44.0 * 72.0));

// traditional sizes
pub const FOLIO: PageSize = (Pt(12.0 * 72.0), Pt(19.0 * 72.0));
pub const QUARTO: PageSize = (Pt(9.5 * 72.0), Pt(12.0 * 72.0));
pub const OCTAVO: PageSize = (Pt(6.0 * 72.0), Pt(9.0 * 72.0));

// iso a-series (converted from mm to points)
pub const A0: PageSize = (Pt(841.0 * 72.0 / 25.4), Pt(1189.0 * 72.0 / 25.4));
pub const A1: PageSize = (Pt(594.0 * 72.0 / 25.4), Pt(841.0 * 72.0 / 25.4));
pub const A2: PageSize = (Pt(420.0 * 72.0 / 25.4), Pt(594.0 * 72.0 / 25.4));
pub const A3: PageSize = (Pt(297.0 * 72.0 / 25.4), Pt(420.0 * 72.0 / 25.4));
pub const A4: PageSize = (Pt(210.0 * 72.0 / 25.4), Pt(297.0 * 72.0 / 25.4));
pub const A5: PageSize = (Pt(148.0 * 72.0 / 25.4), Pt(210.0 * 72.0 / 25.4));
pub const A6: PageSize = (Pt(105.0 * 72.0 / 25.4), Pt(148.0 * 72.0 / 25.4));

// iso b-series
pub const B4: PageSize = (Pt(250.0 * 72.0 / 25.4), Pt(353.0 * 72.0 / 25.4));
pub const B5: PageSize = (Pt(176.0 * 72.0 / 25.4), Pt(250.0 * 72.0 / 25.4));

const NAMED: &[(&str, PageSize)] = &[
    ("letter", LETTER),
    ("half-letter", HALF_LETTER),
    ("junior-legal", JUNIOR_LEGAL),
    ("legal", LEGAL),
    ("tabloid", TABLOID),
    ("ledger", LEDGER),
    ("executive", EXECUTIVE),
    ("ansi-a", ANSI_A),
    ("ansi-b", ANSI_B),
    ("ansi-c", ANSI_C),
    ("ansi-d", ANSI_D),
    ("ansi-e", ANSI_E),
    ("folio", FOLIO),
    ("quarto", QUARTO),
    ("octavo", OCTAVO),
    ("a0", A0),
    ("a1", A1),
    ("a2", A2),
    ("a3", A3),
    ("a4", A4),
    ("a5", A5),
    ("a6", A6),
    ("b4", B4),
    ("b5", B5),
];

/// Look up a paper size by name. Matching ignores ASCII case and treats `_` and
/// spaces like `-`, so `"US Letter"` is not found but `"Half_Letter"` is.
pub fn named(name: &str) -> Option<PageSize> {
    let name: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '_' | ' ' => '-',
            c => c.to_ascii_lowercase(),
        })
        .collect();
    NAMED
        .iter()
        .find(|(candidate, _)| *candidate == name)
        .map(|&(_, size)| size)
}

/// How a named paper size is turned on the page.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum Orientation {
    #[default]
    Portrait,
    /// Width and height are swapped
    Landscape,
}

impl Orientation {
    /// Apply the orientation to a size. Landscape always swaps the two dimensions,
    /// whatever the size's natural orientation.
    pub fn apply(self, size: PageSize) -> PageSize {
        match self {
            Orientation::Portrait => size,
            Orientation::Landscape => (size.1, size.0),
        }
    }
}

impl std::str::FromStr for Orientation {
    type Err = std::convert::Infallible;

    /// Anything but `landscape` is portrait
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("landscape") {
            Ok(Orientation::Landscape)
        } else {
            Ok(Orientation::Portrait)
        }
    }
}
