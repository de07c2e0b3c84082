//! Rule flags attached to each transaction

use crate::types::transaction::Column;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// One heuristic rule outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Flag {
    HighAmount,
    NightTime,
    RapidTransactions,
    Blacklisted,
    RoundedAmount,
    #[serde(rename = "IPChanged")]
    IpChanged,
    DeviceChanged,
}

impl Flag {
    /// All flags in output column order
    pub const ALL: [Flag; 7] = [
        Flag::HighAmount,
        Flag::NightTime,
        Flag::RapidTransactions,
        Flag::Blacklisted,
        Flag::RoundedAmount,
        Flag::IpChanged,
        Flag::DeviceChanged,
    ];

    /// Column name used in output tables and configuration
    pub fn name(&self) -> &'static str {
        match self {
            Flag::HighAmount => "HighAmount",
            Flag::NightTime => "NightTime",
            Flag::RapidTransactions => "RapidTransactions",
            Flag::Blacklisted => "Blacklisted",
            Flag::RoundedAmount => "RoundedAmount",
            Flag::IpChanged => "IPChanged",
            Flag::DeviceChanged => "DeviceChanged",
        }
    }

    /// Input column the flag is derived from
    pub fn source_column(&self) -> Column {
        match self {
            Flag::HighAmount | Flag::RoundedAmount => Column::Amount,
            Flag::NightTime | Flag::RapidTransactions => Column::Timestamp,
            Flag::Blacklisted => Column::Merchant,
            Flag::IpChanged => Column::IpAddress,
            Flag::DeviceChanged => Column::Device,
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown flag {0:?}")]
pub struct UnknownFlag(pub String);

impl FromStr for Flag {
    type Err = UnknownFlag;

    /// Case-insensitive; `_` and `-` are ignored so `ip_changed` names `IPChanged`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();

        Flag::ALL
            .into_iter()
            .find(|flag| flag.name().to_lowercase() == wanted)
            .ok_or_else(|| UnknownFlag(s.to_string()))
    }
}

/// Flag values for one transaction. A flag that was not computed is absent,
/// which is different from `false`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlagSet(BTreeMap<Flag, bool>);

impl FlagSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, flag: Flag, value: bool) {
        self.0.insert(flag, value);
    }

    /// `None` when the flag was not computed
    pub fn get(&self, flag: Flag) -> Option<bool> {
        self.0.get(&flag).copied()
    }

    pub fn is_raised(&self, flag: Flag) -> bool {
        self.get(flag).unwrap_or(false)
    }

    /// Flags that evaluated to true
    pub fn raised(&self) -> impl Iterator<Item = Flag> + '_ {
        self.0.iter().filter(|(_, &v)| v).map(|(&flag, _)| flag)
    }

    /// Flags that were computed, true or false
    pub fn computed(&self) -> impl Iterator<Item = Flag> + '_ {
        self.0.keys().copied()
    }
}

/// Flags that could be computed for a given table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveFlags(BTreeSet<Flag>);

impl ActiveFlags {
    pub fn all() -> Self {
        Self(Flag::ALL.into_iter().collect())
    }

    pub fn from_flags(flags: impl IntoIterator<Item = Flag>) -> Self {
        Self(flags.into_iter().collect())
    }

    pub fn contains(&self, flag: Flag) -> bool {
        self.0.contains(&flag)
    }

    pub fn iter(&self) -> impl Iterator<Item = Flag> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Flags dropped from scoring because their source column was missing or empty
    pub fn omitted(&self) -> Vec<Flag> {
        Flag::ALL
            .into_iter()
            .filter(|flag| !self.0.contains(flag))
            .collect()
    }
}
