use serde::{Deserialize, Serialize};
use std::fmt;

/// The twelve standardized Schedule RC asset categories, in panel column
/// order. `TotalAssets` is the standardized total; the other eleven are the
/// components the reconciliation adds up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Cash,
    Securities,
    FedFundsRepo,
    Loans,
    TradingAssets,
    FixedAssets,
    OtherRealEstate,
    EquityStakes,
    Item9,
    Intangibles,
    OtherAssets,
    TotalAssets,
}

impl Category {
    pub const COUNT: usize = 12;

    pub const ALL: [Category; Category::COUNT] = [
        Category::Cash,
        Category::Securities,
        Category::FedFundsRepo,
        Category::Loans,
        Category::TradingAssets,
        Category::FixedAssets,
        Category::OtherRealEstate,
        Category::EquityStakes,
        Category::Item9,
        Category::Intangibles,
        Category::OtherAssets,
        Category::TotalAssets,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Panel column name.
    pub fn column(self) -> &'static str {
        match self {
            Category::Cash => "cash_tot",
            Category::Securities => "sec_tot",
            Category::FedFundsRepo => "ffsrepo_tot",
            Category::Loans => "loan_tot",
            Category::TradingAssets => "tradingassets",
            Category::FixedAssets => "fixedassets",
            Category::OtherRealEstate => "otherrealestate",
            Category::EquityStakes => "equitystakes",
            Category::Item9 => "item9",
            Category::Intangibles => "intangibles",
            Category::OtherAssets => "otherassets",
            Category::TotalAssets => "assets",
        }
    }

    /// Whether the category is one of the components summed into `assetcheck`.
    pub fn is_component(self) -> bool {
        self != Category::TotalAssets
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// Intermediate sub-components reported next to the categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    CashNoninterest,
    CashInterest,
    SecuritiesHeldToMaturity,
    SecuritiesAvailableForSale,
    SecuritiesEquity,
    FedFundsSold,
    Repos,
    FedFundsAndRepos,
    LoansNetUnearnedIncome,
    LoansTransferRiskReserve,
    LoansAllowance,
    LoansNet,
    LoansHeldForSale,
    Acceptances,
    RealEstateVentures,
    Goodwill,
    OtherIntangibles,
}

impl Component {
    pub const COUNT: usize = 17;

    pub const ALL: [Component; Component::COUNT] = [
        Component::CashNoninterest,
        Component::CashInterest,
        Component::SecuritiesHeldToMaturity,
        Component::SecuritiesAvailableForSale,
        Component::SecuritiesEquity,
        Component::FedFundsSold,
        Component::Repos,
        Component::FedFundsAndRepos,
        Component::LoansNetUnearnedIncome,
        Component::LoansTransferRiskReserve,
        Component::LoansAllowance,
        Component::LoansNet,
        Component::LoansHeldForSale,
        Component::Acceptances,
        Component::RealEstateVentures,
        Component::Goodwill,
        Component::OtherIntangibles,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn column(self) -> &'static str {
        match self {
            Component::CashNoninterest => "cash_nonint",
            Component::CashInterest => "cash_int",
            Component::SecuritiesHeldToMaturity => "securities_htm_ac",
            Component::SecuritiesAvailableForSale => "securities_afs_fv",
            Component::SecuritiesEquity => "securities_equity_fv",
            Component::FedFundsSold => "ffs",
            Component::Repos => "repo",
            Component::FedFundsAndRepos => "ffsrepo",
            Component::LoansNetUnearnedIncome => "loan_netunearnedinc",
            Component::LoansTransferRiskReserve => "loan_transriskreserve",
            Component::LoansAllowance => "loan_alll",
            Component::LoansNet => "loan_net",
            Component::LoansHeldForSale => "loan_afs",
            Component::Acceptances => "receivables",
            Component::RealEstateVentures => "invrealestatefunds",
            Component::Goodwill => "goodwill",
            Component::OtherIntangibles => "other_intangibles",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_arrays_follow_discriminant_order() {
        for (i, c) in Category::ALL.iter().enumerate() {
            assert_eq!(c.index(), i);
        }
        for (i, c) in Component::ALL.iter().enumerate() {
            assert_eq!(c.index(), i);
        }
    }

    #[test]
    fn only_total_assets_is_excluded_from_the_check() {
        let components = Category::ALL.iter().filter(|c| c.is_component()).count();
        assert_eq!(components, 11);
        assert_eq!(Category::TotalAssets.to_string(), "assets");
    }
}
