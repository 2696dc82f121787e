//! Date-windowed regimes: which raw identifiers, and which combination
//! rule, make up each standardized category on a given reporting date.
//!
//! Every cutover lives in [`RegimeTable::standard`]; correcting a date or
//! adding a regime is a table edit. Windows are closed on both ends, sorted,
//! and disjoint per category (checked by [`RegimeTable::new`]).

use anyhow::{bail, Result};
use chrono::NaiveDate;
use std::{collections::BTreeSet, fmt};

use super::category::{Category, Component};
use super::resolve::{sum_present, FieldPair};

/// Independently reported total assets, used for row filtering and the
/// reconciliation regardless of regime.
pub const REPORTED_TOTAL: FieldPair = FieldPair::new("RCFD2170", "RCON2170");

const CASH_NONINTEREST: FieldPair = FieldPair::new("RCFD0081", "RCON0081");
const CASH_INTEREST: FieldPair = FieldPair::new("RCFD0071", "RCON0071");
const HTM_AMORTIZED_PRE_2019: FieldPair = FieldPair::new("RCFD1754", "RCON1754");
const HTM_AMORTIZED: FieldPair = FieldPair::new("RCFDJJ34", "RCONJJ34");
const AFS_FAIR_VALUE: FieldPair = FieldPair::new("RCFD1773", "RCON1773");
const EQUITY_FAIR_VALUE: FieldPair = FieldPair::new("RCFDJA22", "RCONJA22");
const FFS_1996: FieldPair = FieldPair::new("RCFD0276", "RCON0276");
const REPO_1996: FieldPair = FieldPair::new("RCFD0277", "RCON0277");
const FFS_AND_REPO: FieldPair = FieldPair::new("RCFD1350", "RCON1350");
const FFS_DOMESTIC: FieldPair = FieldPair::single("RCONB987");
const REPO: FieldPair = FieldPair::new("RCFDB989", "RCONB989");
const LOANS_NET_UNEARNED_PRE_2001: FieldPair = FieldPair::new("RCFD2122", "RCON2122");
const LOANS_NET_UNEARNED: FieldPair = FieldPair::new("RCFDB528", "RCONB528");
const TRANSFER_RISK_RESERVE: FieldPair = FieldPair::new("RCFD3128", "RCON3128");
const ALLOWANCE: FieldPair = FieldPair::new("RCFD3123", "RCON3123");
const LOANS_NET_PRE_2001: FieldPair = FieldPair::new("RCFD2125", "RCON2125");
const LOANS_NET: FieldPair = FieldPair::new("RCFDB529", "RCONB529");
const LOANS_HELD_FOR_SALE: FieldPair = FieldPair::new("RCFD5369", "RCON5369");
const TRADING_ASSETS: FieldPair = FieldPair::new("RCFD3545", "RCON3545");
const FIXED_ASSETS: FieldPair = FieldPair::new("RCFD2145", "RCON2145");
const OTHER_REAL_ESTATE: FieldPair = FieldPair::new("RCFD2150", "RCON2150");
const EQUITY_STAKES: FieldPair = FieldPair::new("RCFD2130", "RCON2130");
const ACCEPTANCES: FieldPair = FieldPair::new("RCFD2155", "RCON2155");
const REAL_ESTATE_VENTURES: FieldPair = FieldPair::new("RCFD3656", "RCON3656");
const INTANGIBLES: FieldPair = FieldPair::new("RCFD2143", "RCON2143");
const GOODWILL: FieldPair = FieldPair::new("RCFD3163", "RCON3163");
const OTHER_INTANGIBLES: FieldPair = FieldPair::new("RCFD0426", "RCON0426");
const OTHER_ASSETS: FieldPair = FieldPair::new("RCFD2160", "RCON2160");

/// Closed date interval; `end == None` means still in force.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: NaiveDate,
    pub end: Option<NaiveDate>,
}

impl Window {
    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start,
            end: Some(end),
        }
    }

    pub fn starting(start: NaiveDate) -> Self {
        Self { start, end: None }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && self.end.map_or(true, |end| date <= end)
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end {
            Some(end) => write!(f, "[{}, {}]", self.start, end),
            None => write!(f, "[{}, ..)", self.start),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Combined into the category value.
    Addend,
    /// Only reported as an intermediate column.
    Memo,
}

/// One resolved input of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Part {
    pub fields: FieldPair,
    pub component: Option<Component>,
    pub role: Role,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combine {
    /// Sum of the addends, skipping "no value"; all missing stays missing.
    Sum,
    /// The single addend as is.
    Passthrough,
    /// Known zero for a window where the concept is not tracked.
    Zero,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub combine: Combine,
    pub parts: Vec<Part>,
}

impl Rule {
    pub fn sum(parts: Vec<Part>) -> Self {
        Self {
            combine: Combine::Sum,
            parts,
        }
    }

    pub fn passthrough(parts: Vec<Part>) -> Self {
        Self {
            combine: Combine::Passthrough,
            parts,
        }
    }

    pub fn zero() -> Self {
        Self {
            combine: Combine::Zero,
            parts: Vec::new(),
        }
    }

    pub fn addends(&self) -> impl Iterator<Item = &Part> {
        self.parts.iter().filter(|p| p.role == Role::Addend)
    }

    /// Raw identifiers this rule reads, memo items included.
    pub fn dependencies(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.parts.iter().flat_map(|p| p.fields.identifiers())
    }

    /// Combine one row's resolved addend values (in `addends()` order).
    pub fn apply(&self, addends: &[Option<f64>]) -> Option<f64> {
        match self.combine {
            Combine::Sum => sum_present(addends.iter().copied()),
            Combine::Passthrough => addends.first().copied().flatten(),
            Combine::Zero => Some(0.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Regime {
    pub window: Window,
    pub rule: Rule,
}

/// What a date covered by no window gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    /// The regime that most recently ended before the date, if any.
    MostRecent,
    NoValue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRegimes {
    pub category: Category,
    pub regimes: Vec<Regime>,
    pub fallback: Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegimeTable {
    categories: Vec<CategoryRegimes>,
}

impl RegimeTable {
    /// Validate and build. One entry per category, in `Category::ALL` order.
    pub fn new(categories: Vec<CategoryRegimes>) -> Result<Self> {
        if categories.len() != Category::COUNT {
            bail!(
                "regime table has {} categories, expected {}",
                categories.len(),
                Category::COUNT
            );
        }
        for (entry, expected) in categories.iter().zip(Category::ALL) {
            if entry.category != expected {
                bail!("regime table out of order: {} where {} belongs", entry.category, expected);
            }
            validate_category(entry)?;
        }
        Ok(Self { categories })
    }

    /// The Schedule RC cutovers, 1976Q1 onward.
    pub fn standard() -> Self {
        Self::new(standard_categories()).expect("standard regime table is well formed")
    }

    /// The standard table with item 9's 2006Q1-2009Q1 gap declared as a
    /// not-tracked window (zero) instead of "no value".
    pub fn with_item9_gap_zero_filled() -> Self {
        let mut categories = standard_categories();
        let item9 = &mut categories[Category::Item9.index()];
        item9.regimes.insert(
            1,
            Regime {
                window: Window::between(ymd(2006, 3, 31), ymd(2009, 3, 31)),
                rule: Rule::zero(),
            },
        );
        Self::new(categories).expect("zero-filled regime table is well formed")
    }

    pub fn regimes(&self, category: Category) -> &CategoryRegimes {
        &self.categories[category.index()]
    }

    /// The rule in force for `category` on `date`; `None` means the category
    /// has no value that quarter.
    pub fn select_formula(&self, category: Category, date: NaiveDate) -> Option<&Rule> {
        let entry = self.regimes(category);
        if let Some(regime) = entry.regimes.iter().find(|r| r.window.contains(date)) {
            return Some(&regime.rule);
        }
        match entry.fallback {
            Fallback::NoValue => None,
            Fallback::MostRecent => entry
                .regimes
                .iter()
                .rev()
                .find(|r| r.window.end.map_or(false, |end| end < date))
                .map(|r| &r.rule),
        }
    }

    /// Every identifier any regime can ask for, plus the reported total.
    pub fn declared_identifiers(&self) -> BTreeSet<&'static str> {
        self.categories
            .iter()
            .flat_map(|c| c.regimes.iter())
            .flat_map(|r| r.rule.dependencies())
            .chain(REPORTED_TOTAL.identifiers())
            .collect()
    }
}

fn validate_category(entry: &CategoryRegimes) -> Result<()> {
    let mut prev: Option<&Window> = None;
    for regime in &entry.regimes {
        let w = &regime.window;
        if let Some(end) = w.end {
            if end < w.start {
                bail!("{}: window {} ends before it starts", entry.category, w);
            }
        }
        if let Some(p) = prev {
            match p.end {
                Some(end) if end < w.start => {}
                _ => bail!("{}: window {} overlaps or precedes {}", entry.category, w, p),
            }
        }

        let addends = regime.rule.addends().count();
        let ok = match regime.rule.combine {
            Combine::Sum => addends >= 1,
            Combine::Passthrough => addends == 1,
            Combine::Zero => addends == 0,
        };
        if !ok {
            bail!(
                "{}: {:?} rule in {} has {} addends",
                entry.category,
                regime.rule.combine,
                w,
                addends
            );
        }
        prev = Some(w);
    }
    Ok(())
}

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("literal cutover date")
}

/// First quarter in the archive.
pub fn coverage_start() -> NaiveDate {
    ymd(1976, 3, 31)
}

fn add(component: Component, fields: FieldPair) -> Part {
    Part {
        fields,
        component: Some(component),
        role: Role::Addend,
    }
}

fn direct(fields: FieldPair) -> Part {
    Part {
        fields,
        component: None,
        role: Role::Addend,
    }
}

fn memo(component: Component, fields: FieldPair) -> Part {
    Part {
        fields,
        component: Some(component),
        role: Role::Memo,
    }
}

fn single(category: Category, fields: FieldPair) -> CategoryRegimes {
    CategoryRegimes {
        category,
        regimes: vec![Regime {
            window: Window::starting(coverage_start()),
            rule: Rule::passthrough(vec![direct(fields)]),
        }],
        fallback: Fallback::MostRecent,
    }
}

fn standard_categories() -> Vec<CategoryRegimes> {
    use Component::*;
    let start = coverage_start();

    vec![
        CategoryRegimes {
            category: Category::Cash,
            regimes: vec![Regime {
                window: Window::starting(start),
                rule: Rule::sum(vec![
                    add(CashNoninterest, CASH_NONINTEREST),
                    add(CashInterest, CASH_INTEREST),
                ]),
            }],
            fallback: Fallback::MostRecent,
        },
        CategoryRegimes {
            category: Category::Securities,
            regimes: vec![
                Regime {
                    window: Window::between(start, ymd(2017, 12, 31)),
                    rule: Rule::sum(vec![
                        add(SecuritiesHeldToMaturity, HTM_AMORTIZED_PRE_2019),
                        add(SecuritiesAvailableForSale, AFS_FAIR_VALUE),
                    ]),
                },
                Regime {
                    window: Window::between(ymd(2018, 3, 31), ymd(2018, 12, 31)),
                    rule: Rule::sum(vec![
                        add(SecuritiesHeldToMaturity, HTM_AMORTIZED_PRE_2019),
                        add(SecuritiesAvailableForSale, AFS_FAIR_VALUE),
                        add(SecuritiesEquity, EQUITY_FAIR_VALUE),
                    ]),
                },
                Regime {
                    window: Window::starting(ymd(2019, 3, 31)),
                    rule: Rule::sum(vec![
                        add(SecuritiesHeldToMaturity, HTM_AMORTIZED),
                        add(SecuritiesAvailableForSale, AFS_FAIR_VALUE),
                        add(SecuritiesEquity, EQUITY_FAIR_VALUE),
                    ]),
                },
            ],
            fallback: Fallback::MostRecent,
        },
        CategoryRegimes {
            category: Category::FedFundsRepo,
            regimes: vec![
                Regime {
                    window: Window::between(start, ymd(1996, 9, 30)),
                    rule: Rule::passthrough(vec![add(FedFundsAndRepos, FFS_AND_REPO)]),
                },
                Regime {
                    window: Window::between(ymd(1996, 12, 31), ymd(1996, 12, 31)),
                    rule: Rule::sum(vec![add(FedFundsSold, FFS_1996), add(Repos, REPO_1996)]),
                },
                Regime {
                    window: Window::between(ymd(1997, 3, 31), ymd(2001, 12, 31)),
                    rule: Rule::passthrough(vec![add(FedFundsAndRepos, FFS_AND_REPO)]),
                },
                Regime {
                    window: Window::starting(ymd(2002, 3, 31)),
                    rule: Rule::sum(vec![add(FedFundsSold, FFS_DOMESTIC), add(Repos, REPO)]),
                },
            ],
            fallback: Fallback::MostRecent,
        },
        CategoryRegimes {
            category: Category::Loans,
            regimes: vec![
                Regime {
                    window: Window::between(start, ymd(2000, 12, 31)),
                    rule: Rule::passthrough(vec![
                        add(LoansNet, LOANS_NET_PRE_2001),
                        memo(LoansNetUnearnedIncome, LOANS_NET_UNEARNED_PRE_2001),
                        memo(LoansTransferRiskReserve, TRANSFER_RISK_RESERVE),
                        memo(LoansAllowance, ALLOWANCE),
                    ]),
                },
                Regime {
                    window: Window::starting(ymd(2001, 3, 31)),
                    rule: Rule::sum(vec![
                        add(LoansNet, LOANS_NET),
                        add(LoansHeldForSale, LOANS_HELD_FOR_SALE),
                        memo(LoansNetUnearnedIncome, LOANS_NET_UNEARNED),
                        memo(LoansAllowance, ALLOWANCE),
                    ]),
                },
            ],
            fallback: Fallback::MostRecent,
        },
        single(Category::TradingAssets, TRADING_ASSETS),
        single(Category::FixedAssets, FIXED_ASSETS),
        single(Category::OtherRealEstate, OTHER_REAL_ESTATE),
        single(Category::EquityStakes, EQUITY_STAKES),
        CategoryRegimes {
            category: Category::Item9,
            regimes: vec![
                Regime {
                    window: Window::between(start, ymd(2005, 12, 31)),
                    rule: Rule::passthrough(vec![add(Acceptances, ACCEPTANCES)]),
                },
                // 2006Q1-2009Q1: item 9 was not a separately reported concept
                Regime {
                    window: Window::starting(ymd(2009, 6, 30)),
                    rule: Rule::passthrough(vec![add(RealEstateVentures, REAL_ESTATE_VENTURES)]),
                },
            ],
            fallback: Fallback::NoValue,
        },
        CategoryRegimes {
            category: Category::Intangibles,
            regimes: vec![
                Regime {
                    window: Window::between(start, ymd(2000, 12, 31)),
                    rule: Rule::passthrough(vec![direct(INTANGIBLES)]),
                },
                Regime {
                    window: Window::between(ymd(2001, 3, 31), ymd(2018, 3, 31)),
                    rule: Rule::sum(vec![
                        add(Goodwill, GOODWILL),
                        add(OtherIntangibles, OTHER_INTANGIBLES),
                    ]),
                },
                Regime {
                    window: Window::starting(ymd(2018, 6, 30)),
                    rule: Rule::passthrough(vec![direct(INTANGIBLES)]),
                },
            ],
            fallback: Fallback::MostRecent,
        },
        single(Category::OtherAssets, OTHER_ASSETS),
        single(Category::TotalAssets, REPORTED_TOTAL),
    ]
}
