use stairspeed_results::NodeRecord;

use crate::model::{BestNode, RunStats};

pub(crate) fn run_stats(nodes: &[NodeRecord]) -> RunStats {
    RunStats {
        node_count: nodes.len(),
        online_count: nodes.iter().filter(|node| node.online).count(),
        mean_ping_ms: mean_ping(nodes),
        best_node: best_node(nodes),
    }
}

/// Zero samples are failed pings.
fn mean_ping(nodes: &[NodeRecord]) -> Option<f64> {
    let (sum, count) = nodes
        .iter()
        .flat_map(|node| node.raw_ping.iter())
        .filter(|&&ping| ping > 0)
        .fold((0u64, 0u64), |(sum, count), &ping| {
            (sum + u64::from(ping), count + 1)
        });

    (count > 0).then(|| sum as f64 / count as f64)
}

/// The first node with the highest speed sample wins a tie.
fn best_node(nodes: &[NodeRecord]) -> Option<BestNode> {
    nodes
        .iter()
        .filter_map(|node| node.raw_speed.iter().max().map(|peak| (node, *peak)))
        .fold(None, |best: Option<(&NodeRecord, u64)>, (node, peak)| match best {
            Some((_, best_peak)) if best_peak >= peak => best,
            _ => Some((node, peak)),
        })
        .map(|(node, peak_speed)| BestNode {
            section: node.section.clone(),
            remarks: node.remarks.clone(),
            peak_speed,
        })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn node(section: &str, online: bool, raw_ping: Vec<u32>, raw_speed: Vec<u64>) -> NodeRecord {
        NodeRecord {
            section: section.to_string(),
            endpoint: None,
            remarks: format!("{section} remarks"),
            avg_ping: String::new(),
            pk_loss: String::new(),
            site_ping: String::new(),
            avg_speed: String::new(),
            max_speed: String::new(),
            ul_speed: String::new(),
            used_traffic: 0,
            group_id: 0,
            id: -1,
            online,
            raw_ping,
            raw_site_ping: vec![],
            raw_speed,
            outbound_country_code: String::new(),
        }
    }

    #[test]
    fn test_should_compute_run_stats() {
        let nodes = vec![
            node("a", true, vec![10, 0, 20], vec![100, 300]),
            node("b", true, vec![30], vec![500, 200]),
            node("c", false, vec![0, 0], vec![]),
        ];

        let stats = run_stats(&nodes);

        assert_eq!(stats.node_count, 3);
        assert_eq!(stats.online_count, 2);
        assert_eq!(stats.mean_ping_ms, Some(20.0));
        assert_eq!(
            stats.best_node,
            Some(BestNode {
                section: "b".to_string(),
                remarks: "b remarks".to_string(),
                peak_speed: 500,
            })
        );
    }

    #[test]
    fn test_should_prefer_first_node_on_equal_peak() {
        let nodes = vec![node("a", true, vec![], vec![400]), node("b", true, vec![], vec![400])];
        assert_eq!(run_stats(&nodes).best_node.unwrap().section, "a");
    }

    #[test]
    fn test_should_compute_empty_stats_without_nodes() {
        assert_eq!(run_stats(&[]), RunStats::default());
    }

    #[test]
    fn test_should_skip_mean_ping_when_every_ping_failed() {
        let nodes = vec![node("a", false, vec![0, 0, 0], vec![0])];
        let stats = run_stats(&nodes);
        assert_eq!(stats.mean_ping_ms, None);
        assert_eq!(stats.best_node.unwrap().peak_speed, 0);
    }
}
