#![allow(dead_code)]

use adverdict::{AdGroup, AdMetrics, ComparisonConfig, ComparisonEngine, ControlMatcher};

pub fn ad(id: &str, impressions: u64, clicks: u64, ctr: f64, cpc: f64, conv_rate: f64) -> AdMetrics {
    AdMetrics {
        id: id.to_string(),
        impressions,
        clicks,
        ctr: Some(ctr),
        avg_cpc: Some(cpc),
        conversion_rate: Some(conv_rate),
        final_url: Some(format!("https://shop.test/{}", id)),
        ..Default::default()
    }
}

pub fn with_url(mut ad: AdMetrics, url: &str) -> AdMetrics {
    ad.final_url = Some(url.to_string());
    ad
}

pub fn group(id: &str, ads: Vec<AdMetrics>) -> AdGroup {
    AdGroup {
        id: id.to_string(),
        name: format!("Ad group {}", id),
        ads,
    }
}

pub fn engine_with_matcher(pattern: &str) -> ComparisonEngine {
    ComparisonEngine::new(ComparisonConfig {
        control_matcher: Some(ControlMatcher::final_url(pattern)),
        ..Default::default()
    })
    .unwrap()
}
