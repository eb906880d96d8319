//! Canned carrier payloads for integration tests

/// Tracking number used across the UPS fixtures.
pub const UPS_TRACKING_NUMBER: &str = "1Z999AA10123456784";

/// Anti-forgery token the stand-in UPS landing page hands out.
pub const UPS_TOKEN: &str = "tok-4f1c9e";

/// Delivered shipment with milestones in UPS order (newest first).
pub const UPS_DELIVERED_RESPONSE: &str = r#"{
    "statusCode": "200",
    "statusText": "Successful",
    "trackDetails": [
        {
            "errorCode": null,
            "errorText": null,
            "requestedTrackingNumber": "1Z999AA10123456784",
            "packageStatus": "Delivered",
            "milestones": [
                {
                    "date": "03/14/2024",
                    "time": "2:05 P.M.",
                    "location": "Portland, OR, US",
                    "name": "Delivered"
                },
                {
                    "date": "03/14/2024",
                    "time": "7:41 A.M.",
                    "location": "Portland, OR, US",
                    "name": "Out For Delivery Today"
                },
                {
                    "date": "03/12/2024",
                    "time": "11:58 P.M.",
                    "location": "Louisville, KY, US",
                    "name": "Departed from Facility"
                },
                {
                    "date": "",
                    "time": "",
                    "location": "United States",
                    "name": "Shipper created a label, UPS has not received the package yet."
                }
            ]
        }
    ]
}"#;

/// Response for a tracking number UPS has never seen.
pub const UPS_EMPTY_RESPONSE: &str = r#"{
    "statusCode": "200",
    "statusText": "Successful",
    "trackDetails": []
}"#;
