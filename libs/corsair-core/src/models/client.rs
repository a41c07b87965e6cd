use serde::{Deserialize, Serialize};

/// The panel's record of a provisioned account, fetched and written back
/// per call. Zero `expiry_time` or `device_limit` and non-positive
/// `total_bytes` mean "unlimited" on the panel side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientState {
    pub identity: String,
    pub enable: bool,
    pub expiry_time: i64,
    pub device_limit: i64,
    pub total_bytes: i64,
    pub up: i64,
    pub down: i64,
    pub flow: String,
    pub sub_tag: String,
}

/// Read model for the "my subscription" view, with the panel's sentinel
/// values normalized: `-1` stands for unlimited / no expiry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientSummary {
    pub max_devices: i64,
    pub traffic_total: i64,
    pub traffic_remaining: i64,
    pub traffic_used: i64,
    pub traffic_up: i64,
    pub traffic_down: i64,
    pub expiry_time: i64,
}

impl ClientSummary {
    pub fn from_state(client: &ClientState) -> Self {
        let used = client.up + client.down;
        let (traffic_total, traffic_remaining) = if client.total_bytes <= 0 {
            (-1, -1)
        } else {
            (client.total_bytes, client.total_bytes - used)
        };

        Self {
            max_devices: if client.device_limit == 0 {
                -1
            } else {
                client.device_limit
            },
            traffic_total,
            traffic_remaining,
            traffic_used: used,
            traffic_up: client.up,
            traffic_down: client.down,
            expiry_time: if client.expiry_time == 0 {
                -1
            } else {
                client.expiry_time
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(device_limit: i64, total_bytes: i64, up: i64, down: i64, expiry: i64) -> ClientState {
        ClientState {
            identity: "vpn_1".into(),
            enable: true,
            expiry_time: expiry,
            device_limit,
            total_bytes,
            up,
            down,
            flow: "xtls-rprx-vision".into(),
            sub_tag: "sub_1".into(),
        }
    }

    #[test]
    fn unlimited_sentinels_normalize_to_minus_one() {
        let summary = ClientSummary::from_state(&state(0, 0, 10, 20, 0));
        assert_eq!(summary.max_devices, -1);
        assert_eq!(summary.traffic_total, -1);
        assert_eq!(summary.traffic_remaining, -1);
        assert_eq!(summary.traffic_used, 30);
        assert_eq!(summary.expiry_time, -1);
    }

    #[test]
    fn bounded_quota_reports_remaining() {
        let summary = ClientSummary::from_state(&state(3, 1_000, 100, 250, 42));
        assert_eq!(summary.max_devices, 3);
        assert_eq!(summary.traffic_total, 1_000);
        assert_eq!(summary.traffic_remaining, 650);
        assert_eq!(summary.traffic_used, 350);
        assert_eq!(summary.traffic_up, 100);
        assert_eq!(summary.traffic_down, 250);
        assert_eq!(summary.expiry_time, 42);
    }
}
