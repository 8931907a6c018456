use cyclone_dns_domain::config::{CliOverrides, Config};
use cyclone_dns_domain::{NetworkFamily, Transport};

#[test]
fn defaults_match_documented_values() {
    let config = Config::default();
    assert_eq!(config.server.udp_port, 53);
    assert_eq!(config.server.tcp_port, 0);
    assert_eq!(config.server.http_port, 0);
    assert_eq!(config.engine.initial_threads, 1);
    assert_eq!(config.engine.max_threads, 1);
    assert_eq!(config.engine.thread_requests, 256);
    assert_eq!(config.engine.resend_delay_ms, 1000);
    assert_eq!(config.engine.max_resend_count, 10);
    assert_eq!(config.logging.level, "info");
}

#[test]
fn load_synthesizes_default_listener() {
    let config = Config::load(None, CliOverrides::default()).unwrap();
    assert_eq!(config.server.listeners.len(), 1);
    let listener = &config.server.listeners[0];
    assert_eq!(listener.family, NetworkFamily::Inet4);
    assert_eq!(listener.transport, Transport::Udp);
    assert_eq!(listener.port, 53);
}

#[test]
fn cli_overrides_take_precedence() {
    let overrides = CliOverrides {
        udp_port: Some(5353),
        bind_address: Some("127.0.0.1".to_string()),
        upstream: Some("udp://9.9.9.9:53".to_string()),
        log_level: Some("debug".to_string()),
    };
    let config = Config::load(None, overrides).unwrap();
    assert_eq!(config.server.udp_port, 5353);
    assert_eq!(config.server.bind_address, "127.0.0.1");
    assert_eq!(config.forward.upstream, "udp://9.9.9.9:53");
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.server.listeners[0].port, 5353);
}

#[test]
fn parse_from_toml_with_partial_sections() {
    let config: Config = toml::from_str(
        r#"
        [server]
        udp_port = 1053

        [engine]
        max_resend_count = 3
        "#,
    )
    .unwrap();
    assert_eq!(config.server.udp_port, 1053);
    assert_eq!(config.engine.max_resend_count, 3);
    assert_eq!(config.engine.resend_delay_ms, 1000);
}

#[test]
fn validate_rejects_zero_port() {
    let mut config = Config::load(None, CliOverrides::default()).unwrap();
    config.server.udp_port = 0;
    assert!(config.validate().is_err());
}

#[test]
fn capacities_scale_with_threads() {
    let mut config = Config::default();
    config.engine.max_threads = 4;
    config.engine.thread_requests = 128;
    config.engine.thread_outgoing_requests = 32;
    assert_eq!(config.engine.cycle_capacity(), 512);
    assert_eq!(config.engine.outgoing_capacity(), 128);
}
