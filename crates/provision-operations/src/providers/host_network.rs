use std::net::Ipv4Addr;

use tracing::debug;

use super::command;
use crate::traits::{ExternalResult, NetworkProvider};

/// Host networking through `ip` and `iptables`.
///
/// Global addresses are bound as /32s on one interface; each container gets
/// a DNAT rule for inbound traffic and an SNAT rule for outbound traffic.
#[derive(Debug, Clone)]
pub struct HostNetwork {
    interface: String,
}

impl HostNetwork {
    #[must_use]
    pub fn new(interface: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
        }
    }

    #[must_use]
    pub fn interface(&self) -> &str {
        &self.interface
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleAction {
    Append,
    Delete,
}

impl RuleAction {
    fn flag(self) -> &'static str {
        match self {
            Self::Append => "-A",
            Self::Delete => "-D",
        }
    }
}

fn address_args(action: &'static str, ip: Ipv4Addr, interface: &str) -> Vec<String> {
    vec![
        "addr".to_string(),
        action.to_string(),
        format!("{ip}/32"),
        "dev".to_string(),
        interface.to_string(),
    ]
}

fn nat_rules(action: RuleAction, global: Ipv4Addr, local: Ipv4Addr) -> [Vec<String>; 2] {
    let flag = action.flag().to_string();
    [
        vec![
            "-t".to_string(),
            "nat".to_string(),
            flag.clone(),
            "PREROUTING".to_string(),
            "-d".to_string(),
            global.to_string(),
            "-j".to_string(),
            "DNAT".to_string(),
            "--to-destination".to_string(),
            local.to_string(),
        ],
        vec![
            "-t".to_string(),
            "nat".to_string(),
            flag,
            "POSTROUTING".to_string(),
            "-s".to_string(),
            local.to_string(),
            "-j".to_string(),
            "SNAT".to_string(),
            "--to-source".to_string(),
            global.to_string(),
        ],
    ]
}

fn run_owned(program: &str, args: &[String]) -> ExternalResult<()> {
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    command::run(program, &args, None)?;
    Ok(())
}

impl NetworkProvider for HostNetwork {
    fn add_ip(&self, ip: Ipv4Addr) -> ExternalResult<()> {
        debug!(%ip, interface = %self.interface, "binding address");
        run_owned("ip", &address_args("add", ip, &self.interface))
    }

    fn remove_ip(&self, ip: Ipv4Addr) -> ExternalResult<()> {
        debug!(%ip, interface = %self.interface, "unbinding address");
        run_owned("ip", &address_args("del", ip, &self.interface))
    }

    fn add_nat(&self, global: Ipv4Addr, local: Ipv4Addr) -> ExternalResult<()> {
        let [inbound, outbound] = nat_rules(RuleAction::Append, global, local);
        run_owned("iptables", &inbound)?;
        if let Err(err) = run_owned("iptables", &outbound) {
            let [inbound, _] = nat_rules(RuleAction::Delete, global, local);
            let _ = run_owned("iptables", &inbound);
            return Err(err);
        }
        Ok(())
    }

    fn remove_nat(&self, global: Ipv4Addr, local: Ipv4Addr) -> ExternalResult<()> {
        let [inbound, outbound] = nat_rules(RuleAction::Delete, global, local);
        run_owned("iptables", &inbound)?;
        run_owned("iptables", &outbound)
    }
}
