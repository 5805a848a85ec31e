use std::fmt;
use std::str::FromStr;

use anyhow::{Result, anyhow};
use clap::ValueEnum;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[clap(name = "iplist")]
    #[serde(alias = "ip-list")]
    IpList,
    Dora,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IpList => write!(f, "iplist"),
            Self::Dora => write!(f, "dora"),
        }
    }
}

impl FromStr for SourceKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "iplist" | "ip-list" => Ok(Self::IpList),
            "dora" => Ok(Self::Dora),
            other => Err(anyhow!("unknown inventory source: {other}")),
        }
    }
}
