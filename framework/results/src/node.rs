use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Section;

/// The `protocol|server|port` parts of a node's section name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeEndpoint {
    pub protocol: String,
    pub server: String,
    pub port: u16,
}

impl NodeEndpoint {
    /// Split a section name with exactly two `|` separators. Returns [`None`] for any other shape
    /// or when the port is not a valid port number.
    pub fn from_section_name(name: &str) -> Option<Self> {
        let mut parts = name.split('|');
        let (Some(protocol), Some(server), Some(port), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return None;
        };

        match port.trim().parse::<u16>() {
            Ok(port) => Some(Self {
                protocol: protocol.to_string(),
                server: server.to_string(),
                port,
            }),
            Err(e) => {
                log::debug!("Section [{name}] has a non-numeric port: {e}");
                None
            }
        }
    }
}

/// One tested node, read from one section of a result file.
///
/// Every field has a fallback so that a partially written or hand-edited section still produces
/// a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// The raw section name.
    pub section: String,
    /// Set when [`Self::section`] is of the form `protocol|server|port`.
    pub endpoint: Option<NodeEndpoint>,
    pub remarks: String,
    pub avg_ping: String,
    pub pk_loss: String,
    pub site_ping: String,
    pub avg_speed: String,
    pub max_speed: String,
    pub ul_speed: String,
    /// Bytes received during the test. Defaults to `0`.
    pub used_traffic: u64,
    /// Defaults to `0`.
    pub group_id: i32,
    /// Defaults to `-1`.
    pub id: i32,
    pub online: bool,
    pub raw_ping: Vec<u32>,
    pub raw_site_ping: Vec<u32>,
    pub raw_speed: Vec<u64>,
    pub outbound_country_code: String,
}

impl NodeRecord {
    pub fn from_section(section: &Section) -> Self {
        let text = |key: &str| section.get(key).unwrap_or_default().to_string();

        Self {
            section: section.name.clone(),
            endpoint: NodeEndpoint::from_section_name(&section.name),
            remarks: text("Remarks"),
            avg_ping: text("AvgPing"),
            pk_loss: text("PkLoss"),
            site_ping: text("SitePing"),
            avg_speed: text("AvgSpeed"),
            max_speed: text("MaxSpeed"),
            ul_speed: text("ULSpeed"),
            used_traffic: number_or(section.get("UsedTraffic"), 0),
            group_id: number_or(section.get("GroupID"), 0),
            id: number_or(section.get("ID"), -1),
            online: section
                .get("Online")
                .is_some_and(|v| v.eq_ignore_ascii_case("true")),
            raw_ping: number_list(section.get("RawPing")),
            raw_site_ping: number_list(section.get("RawSitePing")),
            raw_speed: number_list(section.get("RawSpeed")),
            outbound_country_code: text("OutboundCountryCode"),
        }
    }

    pub fn protocol(&self) -> Option<&str> {
        self.endpoint.as_ref().map(|e| e.protocol.as_str())
    }

    pub fn server(&self) -> Option<&str> {
        self.endpoint.as_ref().map(|e| e.server.as_str())
    }

    pub fn port(&self) -> Option<u16> {
        self.endpoint.as_ref().map(|e| e.port)
    }
}

fn number_or<T: FromStr>(value: Option<&str>, fallback: T) -> T {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse().ok())
        .unwrap_or(fallback)
}

/// Comma separated unsigned integers. Tokens that are not plain digits, or overflow `T`, are
/// skipped.
fn number_list<T: FromStr>(value: Option<&str>) -> Vec<T> {
    let Some(value) = value else {
        return Vec::new();
    };

    value
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty() && t.bytes().all(|b| b.is_ascii_digit()))
        .filter_map(|t| t.parse().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::Document;

    fn record(text: &str) -> NodeRecord {
        let doc = Document::parse(text).unwrap();
        NodeRecord::from_section(&doc.sections()[0])
    }

    #[test]
    fn test_should_decompose_endpoint() {
        let node = record("[shadowsocks|1.2.3.4|443]\n");
        assert_eq!(node.protocol(), Some("shadowsocks"));
        assert_eq!(node.server(), Some("1.2.3.4"));
        assert_eq!(node.port(), Some(443));
    }

    #[test]
    fn test_should_not_decompose_other_shapes() {
        assert_eq!(NodeEndpoint::from_section_name("Group^Remarks"), None);
        assert_eq!(NodeEndpoint::from_section_name("ss|1.2.3.4"), None);
        assert_eq!(NodeEndpoint::from_section_name("ss|1.2.3.4|443|x"), None);
        assert_eq!(NodeEndpoint::from_section_name("ss|1.2.3.4|https"), None);
        assert_eq!(NodeEndpoint::from_section_name("ss|1.2.3.4|70000"), None);
    }

    #[test]
    fn test_should_keep_empty_endpoint_parts() {
        let endpoint = NodeEndpoint::from_section_name("||8080").unwrap();
        assert_eq!(endpoint.protocol, "");
        assert_eq!(endpoint.server, "");
        assert_eq!(endpoint.port, 8080);
    }

    #[test]
    fn test_should_default_missing_numbers() {
        let node = record("[n]\nRemarks=empty\n");
        assert_eq!(node.used_traffic, 0);
        assert_eq!(node.group_id, 0);
        assert_eq!(node.id, -1);
        assert!(!node.online);
        assert!(node.raw_ping.is_empty());
        assert!(node.raw_site_ping.is_empty());
        assert!(node.raw_speed.is_empty());
        assert_eq!(node.avg_speed, "");
    }

    #[test]
    fn test_should_default_malformed_numbers() {
        let node = record("[n]\nUsedTraffic=lots\nGroupID=\nID=3.5\n");
        assert_eq!(node.used_traffic, 0);
        assert_eq!(node.group_id, 0);
        assert_eq!(node.id, -1);
    }

    #[test]
    fn test_should_parse_numbers() {
        let node = record("[n]\nUsedTraffic=123456789012\nGroupID=2\nID=-7\n");
        assert_eq!(node.used_traffic, 123_456_789_012);
        assert_eq!(node.group_id, 2);
        assert_eq!(node.id, -7);
    }

    #[test]
    fn test_should_drop_non_numeric_list_tokens() {
        let node = record("[n]\nRawPing=10,20,abc,30\nRawSitePing= 5 , -1,,7\nRawSpeed=\n");
        assert_eq!(node.raw_ping, vec![10, 20, 30]);
        assert_eq!(node.raw_site_ping, vec![5, 7]);
        assert_eq!(node.raw_speed, Vec::<u64>::new());
    }

    #[test]
    fn test_should_drop_overflowing_list_tokens() {
        let node = record("[n]\nRawPing=1,99999999999\nRawSpeed=99999999999\n");
        assert_eq!(node.raw_ping, vec![1]);
        assert_eq!(node.raw_speed, vec![99_999_999_999]);
    }

    #[test]
    fn test_should_parse_online_flag() {
        assert!(record("[n]\nOnline=TRUE\n").online);
        assert!(record("[n]\nOnline=true\n").online);
        assert!(!record("[n]\nOnline=no\n").online);
        assert!(!record("[n]\nOnline=1\n").online);
        assert!(!record("[n]\nOnline= truely\n").online);
    }

    #[test]
    fn test_should_read_all_fields() {
        let node = record(
            "[vmess|example.com|8443]\n\
             Remarks=HK 01\n\
             AvgPing=35.20\n\
             PkLoss=0.00%\n\
             SitePing=120.50\n\
             AvgSpeed=5.12MB\n\
             MaxSpeed=7.80MB\n\
             ULSpeed=1.02MB\n\
             UsedTraffic=52428800\n\
             GroupID=1\n\
             ID=4\n\
             Online=true\n\
             RawPing=30,35,40,0,0,0\n\
             RawSitePing=110,131\n\
             RawSpeed=5000000,7800000\n\
             OutboundCountryCode=HK\n",
        );
        assert_eq!(
            node,
            NodeRecord {
                section: "vmess|example.com|8443".to_string(),
                endpoint: Some(NodeEndpoint {
                    protocol: "vmess".to_string(),
                    server: "example.com".to_string(),
                    port: 8443,
                }),
                remarks: "HK 01".to_string(),
                avg_ping: "35.20".to_string(),
                pk_loss: "0.00%".to_string(),
                site_ping: "120.50".to_string(),
                avg_speed: "5.12MB".to_string(),
                max_speed: "7.80MB".to_string(),
                ul_speed: "1.02MB".to_string(),
                used_traffic: 52_428_800,
                group_id: 1,
                id: 4,
                online: true,
                raw_ping: vec![30, 35, 40, 0, 0, 0],
                raw_site_ping: vec![110, 131],
                raw_speed: vec![5_000_000, 7_800_000],
                outbound_country_code: "HK".to_string(),
            }
        );
    }
}
