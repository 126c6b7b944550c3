//! Property tests for monitoring and host settings

use proptest::prelude::*;
use vpsmon_core::{AppConfig, MonitoringSettings};

proptest! {
    /// Property: the effective interval is always within 1–60 seconds
    #[test]
    fn interval_always_clamped(interval_secs in any::<u8>()) {
        let settings = MonitoringSettings {
            interval_secs,
            ..MonitoringSettings::default()
        };
        let effective = settings.effective_interval_secs();
        prop_assert!((1..=60).contains(&effective));
        if (1..=60).contains(&interval_secs) {
            prop_assert_eq!(effective, interval_secs);
        }
        prop_assert_eq!(settings.interval().as_secs(), u64::from(effective));
    }

    /// Property: the process limit is never zero
    #[test]
    fn process_limit_never_zero(limit in 0usize..1_000) {
        let settings = MonitoringSettings {
            process_limit: limit,
            ..MonitoringSettings::default()
        };
        prop_assert_eq!(settings.effective_process_limit(), limit.max(1));
    }

    /// Property: host and port from the file survive parsing unchanged
    #[test]
    fn host_section_parsed(
        address in "[a-z][a-z0-9-]{0,20}(\\.[a-z]{2,6}){1,2}",
        username in "[a-z_][a-z0-9_-]{0,15}",
        port in 1u16..,
    ) {
        let text = format!(
            "[host]\naddress = \"{address}\"\nusername = \"{username}\"\nport = {port}\n"
        );
        let config = AppConfig::from_toml_str(&text).unwrap();
        prop_assert_eq!(&config.host.address, &address);
        prop_assert_eq!(&config.host.username, &username);
        prop_assert_eq!(config.host.port, port);
        prop_assert!(config.validate().is_ok());
    }
}
