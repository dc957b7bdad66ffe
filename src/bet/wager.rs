//! Wager model: stake entries grouped by bet family.
//!
//! A [`Wager`] is deserialized once from the inbound `bet` payload and never
//! mutated afterwards. Field names follow the wire format used by the
//! roulette clients and settlement workers.

use serde::{Deserialize, Serialize};

/// Stake on a specific number (`0..=36`, `37` standing for `00`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumberBet {
    /// Covered number.
    pub number: u8,
    /// Stake amount.
    pub amount: f64,
}

/// Stake on a named outcome class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryBet<K> {
    /// Selected outcome.
    #[serde(rename = "type")]
    pub kind: K,
    /// Stake amount.
    pub amount: f64,
}

/// Even / odd.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Parity {
    /// Even numbers.
    Even,
    /// Odd numbers.
    Odd,
}

/// Red / black.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Color {
    /// Red numbers.
    Red,
    /// Black numbers.
    Black,
}

/// Column or dozen selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Third {
    /// First column / dozen.
    First,
    /// Second column / dozen.
    Second,
    /// Third column / dozen.
    Third,
}

/// Low / high half of the wheel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HalfRange {
    /// 1 to 18.
    #[serde(rename = "1-18")]
    Low,
    /// 19 to 36.
    #[serde(rename = "19-36")]
    High,
}

/// Three-number specials touching the zeros.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cubre {
    /// 0, 1, 2.
    #[serde(rename = "0-1-2")]
    ZeroOneTwo,
    /// 0, 00, 2.
    #[serde(rename = "0-37-2")]
    ZeroDoubleZeroTwo,
    /// 00, 2, 3.
    #[serde(rename = "37-2-3")]
    DoubleZeroTwoThree,
}

/// Five-number top line (00, 0, 1, 2, 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpecialCalle {
    /// 00, 0, 1, 2, 3.
    #[serde(rename = "37-0-1-2-3")]
    TopLine,
}

/// Bet families whose single stake covers several numbers.
///
/// Clients send one [`NumberBet`] per covered number; consecutive windows of
/// [`GroupedFamily::group_size`] entries form one placed chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupedFamily {
    /// Split (two numbers).
    SemiPleno,
    /// Street (three numbers).
    Calle,
    /// Corner (four numbers).
    Cuadro,
    /// Six-line (six numbers).
    Linea,
}

impl GroupedFamily {
    /// All grouped families, smallest group first.
    pub const ALL: [Self; 4] = [Self::SemiPleno, Self::Calle, Self::Cuadro, Self::Linea];

    /// Number of entries that share one stake.
    #[must_use]
    pub const fn group_size(self) -> usize {
        match self {
            Self::SemiPleno => 2,
            Self::Calle => 3,
            Self::Cuadro => 4,
            Self::Linea => 6,
        }
    }

    /// Wire field name of the family.
    #[must_use]
    pub const fn field_name(self) -> &'static str {
        match self {
            Self::SemiPleno => "semiPlenoNumbers",
            Self::Calle => "calleNumbers",
            Self::Cuadro => "cuadroNumbers",
            Self::Linea => "lineaNumbers",
        }
    }
}

/// The full set of stakes a player places for one round.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Wager {
    /// Straight-up numbers.
    #[serde(rename = "plenoNumbers")]
    pub pleno: Vec<NumberBet>,
    /// Splits, two entries per chip.
    #[serde(rename = "semiPlenoNumbers")]
    pub semi_pleno: Vec<NumberBet>,
    /// Streets, three entries per chip.
    #[serde(rename = "calleNumbers")]
    pub calle: Vec<NumberBet>,
    /// Corners, four entries per chip.
    #[serde(rename = "cuadroNumbers")]
    pub cuadro: Vec<NumberBet>,
    /// Six-lines, six entries per chip.
    #[serde(rename = "lineaNumbers")]
    pub linea: Vec<NumberBet>,
    /// Even / odd.
    #[serde(rename = "even_odd")]
    pub even_odd: Vec<CategoryBet<Parity>>,
    /// Red / black.
    pub color: Vec<CategoryBet<Color>>,
    /// Columns.
    pub columns: Vec<CategoryBet<Third>>,
    /// Dozens.
    pub dozens: Vec<CategoryBet<Third>>,
    /// Low / high.
    #[serde(rename = "chanceSimple")]
    pub chance_simple: Vec<CategoryBet<HalfRange>>,
    /// Three-number specials.
    pub cubre: Vec<CategoryBet<Cubre>>,
    /// Five-number top line.
    #[serde(rename = "specialCalle")]
    pub special_calle: Vec<CategoryBet<SpecialCalle>>,
}

impl Wager {
    /// Entries of a grouped family.
    #[must_use]
    pub fn grouped(&self, family: GroupedFamily) -> &[NumberBet] {
        match family {
            GroupedFamily::SemiPleno => &self.semi_pleno,
            GroupedFamily::Calle => &self.calle,
            GroupedFamily::Cuadro => &self.cuadro,
            GroupedFamily::Linea => &self.linea,
        }
    }

    /// Amounts of every entry charged once per entry (plain and categorical
    /// families).
    pub fn per_entry_amounts(&self) -> impl Iterator<Item = f64> + '_ {
        self.pleno
            .iter()
            .map(|b| b.amount)
            .chain(self.even_odd.iter().map(|b| b.amount))
            .chain(self.color.iter().map(|b| b.amount))
            .chain(self.columns.iter().map(|b| b.amount))
            .chain(self.dozens.iter().map(|b| b.amount))
            .chain(self.chance_simple.iter().map(|b| b.amount))
            .chain(self.cubre.iter().map(|b| b.amount))
            .chain(self.special_calle.iter().map(|b| b.amount))
    }

    /// Every stake amount in the wager, grouped entries included.
    pub fn all_amounts(&self) -> impl Iterator<Item = f64> + '_ {
        GroupedFamily::ALL
            .iter()
            .flat_map(|family| self.grouped(*family).iter().map(|b| b.amount))
            .chain(self.per_entry_amounts())
    }

    /// Returns `true` when no family carries any entry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.all_amounts().next().is_none()
    }
}
