//! Binary `INET`/`CIDR` and `MACADDR`/`MACADDR8` wire formats (§4.2).

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use ipnetwork::IpNetwork;

use crate::error::err_protocol;
use crate::io::{Buf, BufMut};

const PGSQL_AF_INET: u8 = 2;
const PGSQL_AF_INET6: u8 = 3;

/// Decodes an `INET`/`CIDR` value: `(family, netmask bits, is_cidr, addr length, addr bytes)`.
pub(crate) fn decode_inet(mut buf: &[u8]) -> crate::Result<IpNetwork> {
    let family = buf.get_u8()?;
    let bits = buf.get_u8()?;
    let _is_cidr = buf.get_u8()?;
    let len = buf.get_u8()?;

    let addr = match family {
        PGSQL_AF_INET => {
            if len != 4 {
                return Err(err_protocol!("INET address length {len} invalid for IPv4"));
            }
            let octets = buf.get_bytes(4)?;
            IpAddr::V4(Ipv4Addr::new(octets[0], octets[1], octets[2], octets[3]))
        }
        PGSQL_AF_INET6 => {
            if len != 16 {
                return Err(err_protocol!("INET address length {len} invalid for IPv6"));
            }
            let octets = buf.get_bytes(16)?;
            let mut segments = [0u8; 16];
            segments.copy_from_slice(octets);
            IpAddr::V6(Ipv6Addr::from(segments))
        }
        _ => return Err(err_protocol!("unrecognized INET address family: {family}")),
    };

    IpNetwork::new(addr, bits).map_err(|e| err_protocol!("invalid INET netmask: {e}"))
}

pub(crate) fn encode_inet(value: &IpNetwork, buf: &mut Vec<u8>) {
    match value.ip() {
        IpAddr::V4(addr) => {
            buf.put_u8(PGSQL_AF_INET);
            buf.put_u8(value.prefix());
            buf.put_u8(0);
            buf.put_u8(4);
            buf.put_bytes(&addr.octets());
        }
        IpAddr::V6(addr) => {
            buf.put_u8(PGSQL_AF_INET6);
            buf.put_u8(value.prefix());
            buf.put_u8(0);
            buf.put_u8(16);
            buf.put_bytes(&addr.octets());
        }
    }
}

pub(crate) fn decode_macaddr(buf: &[u8]) -> crate::Result<[u8; 6]> {
    if buf.len() != 6 {
        return Err(err_protocol!("MACADDR payload must be 6 bytes, got {}", buf.len()));
    }
    let mut octets = [0u8; 6];
    octets.copy_from_slice(buf);
    Ok(octets)
}

pub(crate) fn encode_macaddr(value: &[u8; 6], buf: &mut Vec<u8>) {
    buf.put_bytes(value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn it_round_trips_an_ipv4_cidr() {
        let net = IpNetwork::from_str("192.168.1.0/24").unwrap();
        let mut buf = Vec::new();
        encode_inet(&net, &mut buf);
        assert_eq!(decode_inet(&buf).unwrap(), net);
    }

    #[test]
    fn it_round_trips_an_ipv6_address() {
        let net = IpNetwork::from_str("::1/128").unwrap();
        let mut buf = Vec::new();
        encode_inet(&net, &mut buf);
        assert_eq!(decode_inet(&buf).unwrap(), net);
    }

    #[test]
    fn it_round_trips_a_macaddr() {
        let mac = [0x08, 0x00, 0x27, 0xab, 0xcd, 0xef];
        let mut buf = Vec::new();
        encode_macaddr(&mac, &mut buf);
        assert_eq!(decode_macaddr(&buf).unwrap(), mac);
    }
}
