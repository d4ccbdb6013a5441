use crate::api::types::Analytics;

const LABEL_WIDTH: usize = 28;

/// Horizontal bar chart as plain text lines: title, underline, one bar per entry.
pub fn bar_chart(title: &str, entries: &[(String, u64)], width: usize, max_entries: usize) -> Vec<String> {
    let mut lines = vec![title.to_string(), "=".repeat(title.chars().count())];
    if entries.is_empty() {
        lines.push("  (no data)".to_string());
        return lines;
    }

    let shown = &entries[..entries.len().min(max_entries)];
    let max_count = shown.iter().map(|(_, c)| *c).max().unwrap_or(0).max(1);
    let count_width = max_count.to_string().len();
    let label_width = LABEL_WIDTH.min(width / 3).max(1);
    // "  label | bar count"
    let bar_space = width.saturating_sub(label_width + count_width + 6).max(1);

    for (label, count) in shown {
        let bar_len = ((*count as u128 * bar_space as u128) / max_count as u128) as usize;
        let bar_len = if *count > 0 { bar_len.max(1) } else { 0 };
        lines.push(format!(
            "  {:<lw$} | {} {:>cw$}",
            truncate_label(label, label_width),
            "#".repeat(bar_len),
            count,
            lw = label_width,
            cw = count_width
        ));
    }
    lines
}

pub fn sender_entries(analytics: &Analytics) -> Vec<(String, u64)> {
    analytics
        .top_senders
        .iter()
        .map(|s| {
            let label = if s.name.is_empty() {
                s.email.clone().unwrap_or_default()
            } else {
                s.name.clone()
            };
            (label, s.count)
        })
        .collect()
}

pub fn domain_entries(analytics: &Analytics) -> Vec<(String, u64)> {
    analytics
        .top_domains
        .iter()
        .map(|d| (d.domain.clone(), d.count))
        .collect()
}

/// Cut to at most `width` characters, marking the cut with an ellipsis.
pub fn truncate_label(s: &str, width: usize) -> String {
    let len = s.chars().count();
    if len <= width {
        s.to_string()
    } else if width <= 3 {
        s.chars().take(width).collect()
    } else {
        let mut out: String = s.chars().take(width - 3).collect();
        out.push_str("...");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::{DomainStat, SenderStat};

    #[test]
    fn test_bars_scale_to_largest() {
        let entries = vec![("a.com".to_string(), 10), ("b.com".to_string(), 5)];
        let lines = bar_chart("Top Email Domains", &entries, 80, 20);

        assert_eq!(lines[0], "Top Email Domains");
        assert_eq!(lines.len(), 4);
        let bar_a = lines[2].matches('#').count();
        let bar_b = lines[3].matches('#').count();
        assert_eq!(bar_a, 2 * bar_b);
        assert!(lines[2].trim_end().ends_with("10"));
    }

    #[test]
    fn test_entries_are_capped() {
        let entries: Vec<(String, u64)> = (0..30).map(|i| (format!("d{}", i), 30 - i)).collect();
        assert_eq!(bar_chart("T", &entries, 60, 5).len(), 2 + 5);
    }

    #[test]
    fn test_empty_chart() {
        assert_eq!(bar_chart("T", &[], 60, 5)[2], "  (no data)");
    }

    #[test]
    fn test_long_labels_truncated() {
        let entries = vec![("a-very-long-sender-name-that-goes-on@example.com".to_string(), 1)];
        let lines = bar_chart("T", &entries, 90, 5);
        assert!(lines[2].contains("..."));
    }

    #[test]
    fn test_sender_label_falls_back_to_email() {
        let analytics = Analytics {
            top_senders: vec![SenderStat {
                name: String::new(),
                email: Some("x@y.com".to_string()),
                count: 2,
            }],
            top_domains: vec![DomainStat {
                domain: "y.com".to_string(),
                count: 2,
            }],
        };
        assert_eq!(sender_entries(&analytics)[0].0, "x@y.com");
        assert_eq!(domain_entries(&analytics)[0].0, "y.com");
    }
}
