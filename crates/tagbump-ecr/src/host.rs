//! ECR registry host names.

use std::fmt;

/// A parsed `<account>.dkr.ecr.<region>.amazonaws.com[.cn]` host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EcrHost {
    pub account: String,
    pub region: String,
    china: bool,
}

impl EcrHost {
    /// Parse a registry host, returning `None` for anything that is not ECR.
    #[must_use]
    pub fn parse(host: &str) -> Option<Self> {
        let host = host.to_ascii_lowercase();
        let (rest, china) = match host.strip_suffix(".amazonaws.com.cn") {
            Some(rest) => (rest, true),
            None => (host.strip_suffix(".amazonaws.com")?, false),
        };

        let (account, region) = rest.split_once(".dkr.ecr.")?;
        if account.len() != 12 || !account.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        if region.is_empty() || region.contains('.') {
            return None;
        }

        Some(Self {
            account: account.to_string(),
            region: region.to_string(),
            china,
        })
    }
}

impl fmt::Display for EcrHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.dkr.ecr.{}.amazonaws.com", self.account, self.region)?;
        if self.china {
            f.write_str(".cn")?;
        }
        Ok(())
    }
}
