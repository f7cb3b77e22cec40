//! Channel name parsing

use once_cell::sync::Lazy;
use regex::Regex;

/// `<technology>/<device>-<sequence>` for the GSM channel drivers, where the
/// device token runs up to the next `-`, `/` or `@`
static GSM_CHANNEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:Dongle|DONGLE|Mobile)/(?P<device>[^-/@]+)[-/@]")
        .unwrap_or_else(|e| panic!("invalid GSM channel pattern: {}", e))
});

/// Device token of a GSM modem channel, e.g. `dongle0` in
/// `Dongle/dongle0-0100000000`. None for any other technology.
pub fn device_token(channel: &str) -> Option<&str> {
    GSM_CHANNEL
        .captures(channel)
        .and_then(|caps| caps.name("device"))
        .map(|m| m.as_str())
}
