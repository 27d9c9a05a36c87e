use serde::{Deserialize, Serialize};

/// Serving status reported by the ad platform. Only the external pre-filter
/// looks at it; the engine compares whatever it is given.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AdStatus {
    #[default]
    Enabled,
    Paused,
}

/// Performance counters for one ad over the reporting window.
///
/// `ctr`, `avg_cpc` and `conversion_rate` are taken as reported and are not
/// re-derived from the raw counts; missing values read as zero.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct AdMetrics {
    pub id: String,
    #[serde(default)]
    pub impressions: u64,
    #[serde(default)]
    pub clicks: u64,
    #[serde(default)]
    pub ctr: Option<f64>,
    #[serde(default)]
    pub avg_cpc: Option<f64>,
    #[serde(default)]
    pub conversions: Option<f64>,
    #[serde(default)]
    pub conversion_rate: Option<f64>,
    #[serde(default)]
    pub final_url: Option<String>,
    #[serde(default)]
    pub headline: Option<String>,
    #[serde(default)]
    pub status: AdStatus,
}

impl AdMetrics {
    /// Impressions that did not produce a click. Saturates at zero when the
    /// source reports more clicks than impressions.
    pub fn non_clicks(&self) -> u64 {
        self.impressions.saturating_sub(self.clicks)
    }

    pub fn has_consistent_counts(&self) -> bool {
        self.clicks <= self.impressions
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct AdGroup {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub ads: Vec<AdMetrics>,
}

impl AdGroup {
    /// Returns a copy holding only enabled ads with at least
    /// `min_impressions` impressions. Input order is preserved.
    pub fn qualifying(&self, min_impressions: u64) -> AdGroup {
        AdGroup {
            id: self.id.clone(),
            name: self.name.clone(),
            ads: self
                .ads
                .iter()
                .filter(|ad| ad.status == AdStatus::Enabled && ad.impressions >= min_impressions)
                .cloned()
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ad(id: &str, impressions: u64, status: AdStatus) -> AdMetrics {
        AdMetrics {
            id: id.to_string(),
            impressions,
            status,
            ..Default::default()
        }
    }

    #[test]
    fn non_clicks_saturates_when_clicks_exceed_impressions() {
        let mut a = ad("a", 10, AdStatus::Enabled);
        a.clicks = 12;
        assert_eq!(a.non_clicks(), 0);
        assert!(!a.has_consistent_counts());
    }

    #[test]
    fn qualifying_drops_paused_and_low_volume_ads_in_order() {
        let group = AdGroup {
            id: "g1".to_string(),
            name: "Brand".to_string(),
            ads: vec![
                ad("a", 500, AdStatus::Enabled),
                ad("b", 50, AdStatus::Enabled),
                ad("c", 900, AdStatus::Paused),
                ad("d", 100, AdStatus::Enabled),
            ],
        };
        let q = group.qualifying(100);
        let ids: Vec<&str> = q.ads.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "d"]);
        assert_eq!(q.name, "Brand");
    }

    #[test]
    fn ad_metrics_deserializes_camel_case_with_defaults() {
        let json = r#"{"id":"ad-1","impressions":1000,"clicks":50,"ctr":0.05,"avgCpc":1.2,"finalUrl":"https://x.test/control"}"#;
        let a: AdMetrics = serde_json::from_str(json).unwrap();
        assert_eq!(a.avg_cpc, Some(1.2));
        assert_eq!(a.conversion_rate, None);
        assert_eq!(a.status, AdStatus::Enabled);
        assert_eq!(a.final_url.as_deref(), Some("https://x.test/control"));
    }

    #[test]
    fn ad_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&AdStatus::Paused).unwrap(),
            "\"paused\""
        );
    }
}
