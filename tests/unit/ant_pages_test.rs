//! Unit tests for ANT+ bicycle power page parsing.

use ridebridge::sensors::ant::profiles::power::{PowerOnlyPage, CADENCE_INVALID};
use ridebridge::sensors::ant::profiles::{AntProfilePage, PowerChannelPage};
use ridebridge::sensors::ant::{AntDeviceType, ChannelConfig};
use ridebridge::sensors::types::Sample;

#[test]
fn test_power_only_page_parse() {
    // 250 W, 90 RPM, balance 52% right
    let data = [0x10, 0xB4, 90, 0x07, 0x10, 0x27, 0xFA, 0x00];
    let page = PowerOnlyPage::parse(&data).unwrap();

    assert_eq!(page.event_count, 7);
    assert_eq!(page.cadence, Some(90));
    assert_eq!(page.accumulated_power, 10000);
    assert_eq!(page.instantaneous_power, 250);
    let balance = page.pedal_balance.unwrap();
    assert_eq!(balance.right_percent, 52);
    assert!(balance.is_valid);

    assert_eq!(page.to_sample(), Sample::new(250, 90));
}

#[test]
fn test_power_only_page_without_cadence() {
    let data = [0x10, 0xFF, CADENCE_INVALID, 0x01, 0x00, 0x00, 0xC8, 0x00];
    let page = PowerOnlyPage::parse(&data).unwrap();

    assert_eq!(page.cadence, None);
    assert_eq!(page.to_sample(), Sample::new(200, 0));
}

#[test]
fn test_short_or_foreign_payload_rejected() {
    assert!(PowerOnlyPage::parse(&[0x10, 0xFF, 90]).is_none());
    assert!(PowerOnlyPage::parse(&[0x11, 0xFF, 90, 0, 0, 0, 0, 0]).is_none());
    assert!(PowerChannelPage::decode(&[0x12, 0, 0, 0, 0, 0, 0, 0]).is_none());
    assert!(PowerChannelPage::decode(&[]).is_none());
}

#[test]
fn test_power_channel_parameters() {
    let config = ChannelConfig::power_meter(12345, 5);
    assert_eq!(config.rf_frequency, 57);
    assert_eq!(config.period, 8182);
    assert_eq!(config.device_type.device_type_number(), 11);
    assert_eq!(AntDeviceType::from_number(11), AntDeviceType::Power);
}
