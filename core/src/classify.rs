//! Literal-IP vs DNS-name classification.

use std::net::IpAddr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetClass {
    Ip,
    Dns,
}

impl TargetClass {
    pub fn label(self) -> &'static str {
        match self {
            TargetClass::Ip => "IP",
            TargetClass::Dns => "DNS",
        }
    }
}

/// Strict IPv4/IPv6 literal parse. Anything that is not a literal is a DNS name.
pub fn classify(target: &str) -> TargetClass {
    match target.parse::<IpAddr>() {
        Ok(_) => TargetClass::Ip,
        Err(_) => TargetClass::Dns,
    }
}
