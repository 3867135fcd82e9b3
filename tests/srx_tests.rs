//! SRX builders against a simulated firewall.

mod common;

use common::*;
use junos::prelude::*;
use junos::srx::{
    Authentication, DhGroup, Encryption, Establish, IkeMode, IpsecProtocol, Phase1, Phase2,
    Protocol,
};
use pretty_assertions::assert_eq;

const ADDRESS_BOOK: &str = r#"<configuration junos:commit-user="admin"><security><address-book>
<name>global</name>
<address><name>web-01</name><ip-prefix>10.20.0.5/32</ip-prefix></address>
<address><name>web-02</name><ip-prefix>10.20.0.6/32</ip-prefix></address>
<address-set><name>web-farm</name><address><name>web-01</name></address><address><name>web-02</name></address></address-set>
</address-book></security></configuration>"#;

const APPLICATIONS: &str = r#"<configuration junos:commit-user="admin"><applications>
<application><name>tcp-8443</name><protocol>tcp</protocol><destination-port>8443</destination-port></application>
<application-set><name>web-apps</name><application><name>junos-https</name></application></application-set>
</applications></configuration>"#;

const ZONES: &str = r#"<configuration junos:commit-user="admin"><security><zones>
<security-zone><name>dmz</name><address-book>
<address><name>web-01</name><ip-prefix>10.20.0.5/32</ip-prefix></address>
<address><name>partners</name><wildcard-address><name>10.30.0.0/255.255.0.255</name></wildcard-address></address>
<address-set><name>web-farm</name><address><name>web-01</name></address></address-set>
</address-book><interfaces><name>ge-0/0/2.0</name></interfaces></security-zone>
<security-zone><name>untrust</name><interfaces><name>ge-0/0/0.0</name></interfaces></security-zone>
</zones></security></configuration>"#;

const ST0: &str = r#"<interface-information junos:style="normal"><physical-interface><name>st0</name>
<logical-interface><name>st0.0</name></logical-interface>
<logical-interface><name>st0.1</name></logical-interface>
</physical-interface></interface-information>"#;

fn peer() -> VpnPeer {
    VpnPeer {
        name: "branch-7".to_string(),
        local_address: "198.51.100.1".to_string(),
        peer_address: "203.0.113.7".to_string(),
        external_interface: "ge-0/0/0.0".to_string(),
        zone: "vpn".to_string(),
        mode: IkeMode::Aggressive,
        pre_shared_key: "branch-secret".to_string(),
        pfs: None,
        establish: Establish::OnTraffic,
    }
}

#[tokio::test]
async fn test_policy_from_firewall_objects() {
    let device = SimulatedDevice::new("fw1")
        .config_xml("security address-book", ADDRESS_BOOK)
        .config_xml("applications", APPLICATIONS);
    let (session, device) = open(device).await;

    let mut policy = session.new_policy().await.unwrap();
    assert_eq!(policy.known_addresses(), ["web-01", "web-02", "web-farm"]);
    assert_eq!(policy.known_applications(), ["tcp-8443", "web-apps"]);

    policy
        .create_application("udp-5000", Protocol::Udp, "5000")
        .add_rule(
            Rule::new("farm", "untrust", "dmz", PolicyAction::Permit)
                .sources(["any"])
                .destinations(["web-farm"])
                .applications(["web-apps", "udp-5000", "junos-ssh"]),
        );
    let statements = policy.build().unwrap();
    session
        .load_configuration(ConfigPayload::lines(&statements), ConfigFormat::Set, true)
        .await
        .unwrap();

    let active = device.active();
    assert!(active
        .contains(&"applications application udp-5000 protocol udp destination-port 5000".to_string()));
    assert!(active.contains(
        &"security policies from-zone untrust to-zone dmz policy farm then permit".to_string()
    ));
}

#[tokio::test]
async fn test_policy_rejects_address_missing_from_firewall() {
    let device = SimulatedDevice::new("fw1").config_xml("security address-book", ADDRESS_BOOK);
    let (session, _device) = open(device).await;

    // No applications configured, predefined ones still resolve
    let mut policy = session.new_policy().await.unwrap();
    assert!(policy.known_applications().is_empty());
    policy.add_rule(
        Rule::new("db", "dmz", "trust", PolicyAction::Reject)
            .sources(["web-01"])
            .destinations(["db-01"])
            .applications(["junos-mysql"]),
    );

    let err = policy.build().unwrap_err();
    assert!(err.is_not_found());
    assert!(err.to_string().contains("db-01"));
}

#[tokio::test]
async fn test_convert_address_book_moves_zone_entries() {
    let device = SimulatedDevice::new("fw1").config_xml("security zones", ZONES);
    let (session, device) = open(device).await;

    let statements = session.convert_address_book().await.unwrap();
    assert_eq!(
        statements,
        vec![
            "set security address-book global address web-01 10.20.0.5/32",
            "set security address-book global address partners wildcard-address 10.30.0.0/255.255.0.255",
            "set security address-book global address-set web-farm address web-01",
            "delete security zones security-zone dmz address-book",
        ]
    );

    assert!(device
        .sent()
        .iter()
        .any(|op| op.contains("<security><zones/></security>")));
}

#[tokio::test]
async fn test_convert_address_book_requires_srx() {
    let device = SimulatedDevice::new("mx1").model("mx480");
    let (session, _device) = open(device).await;

    let err = session.convert_address_book().await.unwrap_err();
    assert!(matches!(err, Error::UnsupportedOnPlatform { ref model, .. } if model == "MX480"));
}

#[tokio::test]
async fn test_convert_address_book_requires_release() {
    let device = SimulatedDevice::new("fw1").version("10.4R3.4");
    let (session, device) = open(device).await;
    let before = device.sent().len();

    let err = session.convert_address_book().await.unwrap_err();
    assert!(matches!(err, Error::UnsupportedRelease { ref minimum, .. } if minimum == "11.2"));
    assert_eq!(device.sent().len(), before);
}

#[tokio::test]
async fn test_convert_address_book_without_zone_books() {
    let (session, _device) = open(SimulatedDevice::new("fw1")).await;
    assert!(session.convert_address_book().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_ipsec_vpn_uses_next_tunnel_unit() {
    let device = SimulatedDevice::new("fw1").command("show interfaces st0", Some(ST0));
    let (session, device) = open(device).await;

    let mut vpn = session.new_ipsec_vpn(peer()).await.unwrap();
    assert_eq!(vpn.tunnel_interface(), "st0.2");
    assert!(device
        .sent()
        .iter()
        .any(|op| op.contains(r#"<command format="xml">show interfaces st0</command>"#)));

    vpn.phase1(Phase1 {
        name: "p1".to_string(),
        dh_group: DhGroup::try_from(5).unwrap(),
        authentication: Authentication::Md5,
        encryption: Encryption::TripleDes,
        lifetime_seconds: 86400,
    })
    .phase2(Phase2 {
        name: "p2".to_string(),
        protocol: IpsecProtocol::Ah,
        authentication: Authentication::Md5,
        encryption: Encryption::Aes128,
        lifetime_seconds: 3600,
    });
    let config = vpn.build().unwrap();

    assert_eq!(config[0], "set interfaces st0.2 family inet");
    assert!(config.contains(&"set security ike policy branch-7 mode aggressive".to_string()));
    assert!(config.contains(&"set security ipsec proposal p2 protocol ah".to_string()));
    assert!(config.contains(
        &"set security ipsec proposal p2 authentication-algorithm hmac-md5-96".to_string()
    ));
    assert!(config.contains(&"set security ipsec vpn branch-7 bind-interface st0.2".to_string()));
    assert!(!config.iter().any(|l| l.contains("perfect-forward-secrecy")));
    assert!(!config.iter().any(|l| l.contains("traffic-selector")));
    assert_eq!(
        config.last().unwrap(),
        "set security ipsec vpn branch-7 establish-tunnels on-traffic"
    );

    session
        .load_configuration(ConfigPayload::lines(&config), ConfigFormat::Set, true)
        .await
        .unwrap();
    assert!(device
        .active()
        .contains(&"security ike gateway branch-7 address 203.0.113.7".to_string()));
}

#[tokio::test]
async fn test_ipsec_vpn_without_tunnel_units() {
    let device = SimulatedDevice::new("fw1").command("show interfaces st0", None);
    let (session, _device) = open(device).await;
    let vpn = session.new_ipsec_vpn(peer()).await.unwrap();
    assert_eq!(vpn.tunnel_interface(), "st0.0");

    let missing = r#"<rpc-error><error-type>protocol</error-type><error-tag>operation-failed</error-tag><error-severity>error</error-severity><error-message>device st0 not found</error-message></rpc-error>"#;
    let device = SimulatedDevice::new("fw2").command("show interfaces st0", Some(missing));
    let (session, _device) = open(device).await;
    let vpn = session.new_ipsec_vpn(peer()).await.unwrap();
    assert_eq!(vpn.tunnel_interface(), "st0.0");
}
