//! Synthetic value generators for address-like tokens.

use crate::spec::UrlPart;
use gen_core::CorrelationMap;
use rand::seq::SliceRandom;
use rand::Rng;

const HEX: &[u8] = b"0123456789abcdef";

pub fn ipv4<R: Rng>(rng: &mut R) -> String {
    format!(
        "{}.{}.{}.{}",
        rng.gen_range(1..=254),
        rng.gen_range(0..=255),
        rng.gen_range(0..=255),
        rng.gen_range(1..=254),
    )
}

pub fn ipv6<R: Rng>(rng: &mut R) -> String {
    (0..8)
        .map(|_| hex_digits(rng, 4))
        .collect::<Vec<_>>()
        .join(":")
}

pub fn mac<R: Rng>(rng: &mut R) -> String {
    (0..6)
        .map(|_| hex_digits(rng, 2))
        .collect::<Vec<_>>()
        .join(":")
}

pub fn hex_digits<R: Rng>(rng: &mut R, digits: usize) -> String {
    (0..digits)
        .map(|_| HEX[rng.gen_range(0..HEX.len())] as char)
        .collect()
}

fn word<R: Rng>(rng: &mut R) -> String {
    let len = rng.gen_range(4..=8);
    (0..len)
        .map(|_| rng.gen_range(b'a'..=b'z') as char)
        .collect()
}

pub fn fqdn<R: Rng>(rng: &mut R) -> String {
    format!("{}.{}.com", word(rng), word(rng))
}

/// Assemble a URL from the requested components. `full` implies every
/// component. Host values are cached in the event's correlation map so
/// repeated url tokens in one event point at the same host.
pub fn url<R: Rng>(rng: &mut R, parts: &[UrlPart], correlation: &mut CorrelationMap) -> String {
    let full = parts.contains(&UrlPart::Full);
    let want = |part: UrlPart| full || parts.contains(&part);

    let mut out = String::new();
    if want(UrlPart::Protocol) {
        out.push_str(if rng.gen_bool(0.5) {
            "https://"
        } else {
            "http://"
        });
    }

    let mut hosts = Vec::new();
    if want(UrlPart::IpHost) {
        hosts.push(correlation.host_value_or_insert("url", "ip_host", || ipv4(rng)));
    }
    if want(UrlPart::FqdnHost) {
        hosts.push(correlation.host_value_or_insert("url", "fqdn_host", || fqdn(rng)));
    }
    if let Some(host) = hosts.choose(rng) {
        out.push_str(host);
    }

    if want(UrlPart::Path) {
        for _ in 0..rng.gen_range(1..=2) {
            out.push('/');
            out.push_str(&word(rng));
        }
    }

    if want(UrlPart::Query) {
        out.push('?');
        let pairs = rng.gen_range(1..=4);
        for i in 0..pairs {
            if i > 0 {
                out.push('&');
            }
            out.push_str(&word(rng));
            out.push('=');
            out.push_str(&word(rng));
        }
    }
    out
}
