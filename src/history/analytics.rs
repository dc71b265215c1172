use serde::Serialize;

use crate::exam::result::{TestResult, NOT_APPLICABLE};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct HistorySummary {
    pub(crate) total_tests: usize,
    pub(crate) average_accuracy: u32,
    pub(crate) best_subject: String,
}

pub(crate) fn summarize(history: &[TestResult]) -> HistorySummary {
    if history.is_empty() {
        return HistorySummary {
            total_tests: 0,
            average_accuracy: 0,
            best_subject: NOT_APPLICABLE.to_string(),
        };
    }

    let total = history.len() as u64;
    let sum: u64 = history.iter().map(|result| u64::from(result.accuracy)).sum();
    let average_accuracy = ((sum * 2 + total) / (total * 2)) as u32;

    HistorySummary {
        total_tests: history.len(),
        average_accuracy,
        best_subject: most_frequent_strongest(history).unwrap_or(NOT_APPLICABLE).to_string(),
    }
}

// Most frequent strongest section; the section seen first wins a tie. Entries
// stored without one are not counted.
fn most_frequent_strongest(history: &[TestResult]) -> Option<&str> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for result in history {
        let section = result.strongest_section.as_str();
        if section.is_empty() {
            continue;
        }
        match counts.iter_mut().find(|(name, _)| *name == section) {
            Some((_, count)) => *count += 1,
            None => counts.push((section, 1)),
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for (section, count) in counts {
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((section, count));
        }
    }
    best.map(|(section, _)| section)
}

/// Latest `limit` results, newest first.
pub(crate) fn recent(history: &[TestResult], limit: usize) -> Vec<TestResult> {
    history.iter().rev().take(limit).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_result;

    fn with_strongest(id: &str, accuracy: u32, strongest: &str) -> TestResult {
        TestResult { strongest_section: strongest.to_string(), ..sample_result(id, accuracy) }
    }

    #[test]
    fn empty_history_has_placeholder_summary() {
        let summary = summarize(&[]);
        assert_eq!(summary.total_tests, 0);
        assert_eq!(summary.average_accuracy, 0);
        assert_eq!(summary.best_subject, "N/A");
    }

    #[test]
    fn averages_accuracy_and_picks_most_frequent_subject() {
        let history = vec![
            with_strongest("a", 50, "Physics"),
            with_strongest("b", 75, "Chemistry"),
            with_strongest("c", 80, "Chemistry"),
            with_strongest("d", 0, "Physics"),
            with_strongest("e", 100, "Chemistry"),
        ];

        let summary = summarize(&history);
        assert_eq!(summary.total_tests, 5);
        assert_eq!(summary.average_accuracy, 61);
        assert_eq!(summary.best_subject, "Chemistry");
    }

    #[test]
    fn ties_go_to_first_seen_subject() {
        let history = vec![
            with_strongest("a", 10, "Polity"),
            with_strongest("b", 10, "History"),
            with_strongest("c", 10, "History"),
            with_strongest("d", 10, "Polity"),
        ];
        assert_eq!(summarize(&history).best_subject, "Polity");
    }

    #[test]
    fn results_without_strongest_section_are_not_counted() {
        let history = vec![
            with_strongest("a", 40, ""),
            with_strongest("b", 60, ""),
            with_strongest("c", 80, "Botany"),
        ];
        let summary = summarize(&history);
        assert_eq!(summary.total_tests, 3);
        assert_eq!(summary.best_subject, "Botany");

        assert_eq!(summarize(&[with_strongest("a", 40, "")]).best_subject, "N/A");
    }

    #[test]
    fn recent_lists_newest_first() {
        let history: Vec<TestResult> =
            (0..5).map(|index| sample_result(&format!("r{index}"), 10)).collect();
        let ids: Vec<String> = recent(&history, 3).into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["r4", "r3", "r2"]);
    }
}
