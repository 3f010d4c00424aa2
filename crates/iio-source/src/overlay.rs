//! Editor overlay for the `deviceId` parameter.
//!
//! Graph editors render the source's device parameter as a drop-down. The
//! overlay lists an empty entry (the unconfigured placeholder) followed by one
//! entry per catalog device, labelled `name (id)`. Option values are JSON
//! string literals, so each value is the quoted identifier.

use iio_core::Catalog;
use serde_json::{json, Value};

/// Parameter key the overlay applies to.
pub const DEVICE_ID_KEY: &str = "deviceId";

/// Build the device drop-down overlay for a catalog.
pub fn device_overlay(catalog: &Catalog) -> Value {
    let mut options = vec![json!({ "name": "", "value": "\"\"" })];
    options.extend(catalog.devices().map(|device| {
        json!({
            "name": device.label(),
            "value": Value::String(device.id.clone()).to_string(),
        })
    }));

    json!({
        "params": [{
            "key": DEVICE_ID_KEY,
            "widgetType": "DropDown",
            "widgetKwargs": { "editable": false },
            "options": options,
        }]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_overlay_lists_devices() {
        let catalog = Catalog::new(Arc::new(iio_sim::demo_backend())).unwrap();
        let overlay = device_overlay(&catalog);

        let param = &overlay["params"][0];
        assert_eq!(param["key"], "deviceId");
        assert_eq!(param["widgetType"], "DropDown");
        assert_eq!(param["widgetKwargs"]["editable"], false);

        let options = param["options"].as_array().unwrap();
        assert_eq!(options.len(), 3);
        assert_eq!(options[0]["name"], "");
        assert_eq!(options[0]["value"], "\"\"");
        assert_eq!(options[1]["name"], "ad9361-phy (iio:device0)");
        assert_eq!(options[1]["value"], "\"iio:device0\"");
        assert_eq!(options[2]["name"], "xadc (iio:device1)");
    }
}
