//! Final ordering of live records by measured latency

use crate::proxy::models::ProxyRecord;
use log::warn;

/// Order live records by ascending latency and apply the optional cap.
///
/// Records without a latency are dropped rather than ranked. The sort is
/// stable, so equal latencies keep their input order. A cap of `None` or
/// zero keeps everything.
pub fn rank(records: Vec<ProxyRecord>, max_count: Option<usize>) -> Vec<ProxyRecord> {
    let total = records.len();
    let mut ranked: Vec<ProxyRecord> = records
        .into_iter()
        .filter(ProxyRecord::is_checked)
        .collect();
    if ranked.len() < total {
        warn!("Ignoring {} unchecked records while ranking", total - ranked.len());
    }

    ranked.sort_by_key(|record| record.latency_ms);

    if let Some(max) = max_count.filter(|max| *max > 0) {
        ranked.truncate(max);
    }
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::models::ProxyKind;

    fn record(name: &str, latency_ms: Option<u64>) -> ProxyRecord {
        let mut record = ProxyRecord::new(ProxyKind::Trojan, "example.com", 443).unwrap();
        record.name = name.to_string();
        record.latency_ms = latency_ms;
        record
    }

    fn latencies(records: &[ProxyRecord]) -> Vec<u64> {
        records.iter().filter_map(|r| r.latency_ms).collect()
    }

    #[test]
    fn test_rank_orders_by_latency() {
        let records = vec![record("a", Some(50)), record("b", Some(10)), record("c", Some(30))];
        assert_eq!(latencies(&rank(records.clone(), None)), vec![10, 30, 50]);
        assert_eq!(latencies(&rank(records, Some(2))), vec![10, 30]);
    }

    #[test]
    fn test_rank_is_stable() {
        let records = vec![
            record("first", Some(20)),
            record("fast", Some(5)),
            record("second", Some(20)),
        ];
        let names: Vec<String> = rank(records, None).into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["fast", "first", "second"]);
    }

    #[test]
    fn test_rank_drops_unchecked() {
        let records = vec![record("a", None), record("b", Some(7))];
        let ranked = rank(records, None);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].name, "b");
    }

    #[test]
    fn test_zero_cap_keeps_everything() {
        let records = vec![record("a", Some(3)), record("b", Some(1))];
        assert_eq!(rank(records.clone(), Some(0)).len(), 2);
        assert_eq!(rank(records, Some(10)).len(), 2);
    }
}
