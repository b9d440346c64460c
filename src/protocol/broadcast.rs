//! Broadcast-address discovery and selection.
//!
//! Candidates are the configured IPv4 broadcast addresses of every
//! non-loopback interface, ranked by how many leading octets they share
//! with the local node's own address. An explicit override, once set,
//! takes precedence until changed.

use std::net::{IpAddr, Ipv4Addr};

/// Picks the broadcast target for outgoing public frames.
#[derive(Debug, Clone)]
pub struct BroadcastSelector {
    local: IpAddr,
    override_addr: Option<IpAddr>,
    candidates: Vec<IpAddr>,
}

impl BroadcastSelector {
    pub fn new(local: IpAddr) -> Self {
        let mut selector = Self {
            local,
            override_addr: None,
            candidates: Vec::new(),
        };
        selector.refresh();
        selector
    }

    /// Re-enumerates interface broadcast addresses, best candidate first.
    pub fn refresh(&mut self) {
        let mut found = Vec::new();
        match if_addrs::get_if_addrs() {
            Ok(interfaces) => {
                for iface in interfaces {
                    if iface.is_loopback() {
                        continue;
                    }
                    if let if_addrs::IfAddr::V4(v4) = &iface.addr {
                        if let Some(broadcast) = v4.broadcast {
                            found.push(broadcast);
                        }
                    }
                }
            }
            Err(err) => log::error!("Failed to enumerate network interfaces: {err}"),
        }
        self.candidates = rank(found, self.local);
    }

    /// All candidates, best first. Empty when no usable interface exists.
    pub fn candidates(&self) -> &[IpAddr] {
        &self.candidates
    }

    /// Forces every future public send to target `addr`.
    pub fn set_override(&mut self, addr: IpAddr) {
        self.override_addr = Some(addr);
    }

    /// The address public frames should be sent to, or `None` when
    /// broadcast is unavailable.
    pub fn best(&self) -> Option<IpAddr> {
        self.override_addr.or_else(|| self.candidates.first().copied())
    }
}

/// Orders candidates by descending score; ties keep discovery order.
fn rank(mut candidates: Vec<Ipv4Addr>, local: IpAddr) -> Vec<IpAddr> {
    candidates.sort_by_key(|candidate| std::cmp::Reverse(score(*candidate, local)));
    candidates.into_iter().map(IpAddr::V4).collect()
}

/// Number of leading octets a candidate shares with the local address.
fn score(candidate: Ipv4Addr, local: IpAddr) -> usize {
    let IpAddr::V4(local) = local else {
        return 0;
    };
    candidate
        .octets()
        .iter()
        .zip(local.octets())
        .take_while(|(a, b)| **a == *b)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_counts_leading_octets_only() {
        let local: IpAddr = "192.168.1.17".parse().unwrap();
        assert_eq!(score("192.168.1.255".parse().unwrap(), local), 3);
        assert_eq!(score("192.168.7.255".parse().unwrap(), local), 2);
        assert_eq!(score("10.168.1.255".parse().unwrap(), local), 0);
        // a matching later octet after a mismatch does not count
        assert_eq!(score("10.168.1.17".parse().unwrap(), local), 0);
    }

    #[test]
    fn rank_puts_closest_candidate_first() {
        let local: IpAddr = "10.1.2.3".parse().unwrap();
        let ranked = rank(
            vec![
                "172.16.0.255".parse().unwrap(),
                "10.1.2.255".parse().unwrap(),
                "10.1.0.255".parse().unwrap(),
            ],
            local,
        );
        assert_eq!(ranked[0], "10.1.2.255".parse::<IpAddr>().unwrap());
        assert_eq!(ranked[1], "10.1.0.255".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn rank_is_stable_for_ties() {
        let local: IpAddr = "10.0.0.1".parse().unwrap();
        let ranked = rank(
            vec!["192.168.0.255".parse().unwrap(), "172.16.0.255".parse().unwrap()],
            local,
        );
        assert_eq!(ranked[0], "192.168.0.255".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn override_takes_precedence() {
        let mut selector = BroadcastSelector {
            local: "10.0.0.1".parse().unwrap(),
            override_addr: None,
            candidates: vec!["10.0.0.255".parse().unwrap()],
        };
        assert_eq!(selector.best(), Some("10.0.0.255".parse().unwrap()));
        selector.set_override("192.168.0.255".parse().unwrap());
        assert_eq!(selector.best(), Some("192.168.0.255".parse().unwrap()));
    }

    #[test]
    fn no_candidates_means_unavailable() {
        let selector = BroadcastSelector {
            local: "10.0.0.1".parse().unwrap(),
            override_addr: None,
            candidates: Vec::new(),
        };
        assert_eq!(selector.best(), None);
    }
}
