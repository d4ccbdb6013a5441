use super::expansion::{ExpansionSet, GroupKey};
use crate::api::types::{Email, EmailSummary, Group, ResultSet, Results, SortMode};
use regex::Regex;
use std::sync::OnceLock;

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

pub enum Row<'a> {
    Email(&'a Email),
    GroupHeader {
        group: &'a Group,
        key: GroupKey,
        expanded: bool,
    },
    GroupMember {
        group: &'a Group,
        key: GroupKey,
        email: &'a EmailSummary,
    },
}

impl Row<'_> {
    /// Group this row belongs to; None for flat email rows.
    pub fn group_key(&self) -> Option<&GroupKey> {
        match self {
            Row::Email(_) => None,
            Row::GroupHeader { key, .. } | Row::GroupMember { key, .. } => Some(key),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Row::Email(_) => "email",
            Row::GroupHeader { .. } => "group",
            Row::GroupMember { .. } => "member",
        }
    }

    pub fn cells(&self) -> Vec<String> {
        match self {
            Row::Email(email) => {
                let sender = if email.sender_name.is_empty() {
                    email.sender_email.clone()
                } else {
                    format!("{} <{}>", email.sender_name, email.sender_email)
                };
                vec![
                    sender,
                    subject_or_placeholder(email.subject.as_deref()),
                    email.sender_count.to_string(),
                    email.domain_count.to_string(),
                    format_date(email.received_date.as_deref()),
                ]
            }
            Row::GroupHeader {
                group, expanded, ..
            } => {
                let indicator = if *expanded { "▾" } else { "▸" };
                vec![
                    format!("{} {}", indicator, group.display_label()),
                    group.count().to_string(),
                    format_date(group.latest_date()),
                ]
            }
            Row::GroupMember { group, email, .. } => {
                let subject = subject_or_placeholder(email.subject.as_deref());
                // Sender groups already name the sender in their header.
                let text = match (group, email.sender_email.as_deref()) {
                    (Group::Domain { .. }, Some(sender)) => format!("    {} ({})", subject, sender),
                    _ => format!("    {}", subject),
                };
                vec![text, String::new(), format_date(email.received_date.as_deref())]
            }
        }
    }
}

pub struct Table<'a> {
    pub headers: Vec<&'static str>,
    pub rows: Vec<Row<'a>>,
}

pub fn headers(sort: SortMode) -> Vec<&'static str> {
    match sort {
        SortMode::Date => vec!["Sender", "Subject", "From Sender", "From Domain", "Date"],
        SortMode::DomainFrequency => vec!["Domain", "Emails", "Latest"],
        SortMode::SenderFrequency => vec!["Sender", "Emails", "Latest"],
    }
}

/// Turn a result set into display rows. Pure: reads the expansion set, never mutates it.
pub fn render<'a>(sort: SortMode, set: &'a ResultSet, expansion: &ExpansionSet) -> Table<'a> {
    let rows = match (&set.results, sort.is_grouped()) {
        (Results::Emails(emails), false) => emails.iter().map(Row::Email).collect(),
        (Results::Groups(groups), true) => {
            let mut rows = Vec::with_capacity(groups.len());
            for group in groups {
                let key = GroupKey::of(group);
                let expanded = expansion.is_expanded(&key);
                rows.push(Row::GroupHeader {
                    group,
                    key: key.clone(),
                    expanded,
                });
                if expanded {
                    rows.extend(group.emails().iter().map(|email| Row::GroupMember {
                        group,
                        key: key.clone(),
                        email,
                    }));
                }
            }
            rows
        }
        // Payload shape does not match the mode; nothing sensible to show.
        _ => Vec::new(),
    };

    Table {
        headers: headers(sort),
        rows,
    }
}

fn subject_or_placeholder(subject: Option<&str>) -> String {
    match subject {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => "(no subject)".to_string(),
    }
}

fn timestamp_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(\d{4})-(\d{2})-(\d{2})(?:[T ](\d{2}):(\d{2})(?::\d{2}(?:\.\d+)?)?(Z|[+-]\d{2}:?\d{2})?)?",
        )
        .expect("valid timestamp regex")
    })
}

/// `2024-03-01T09:05:00` -> `Mar 1, 2024 09:05`. Times stay in the zone the backend
/// sent them in; an explicit offset is kept as a suffix (`Z` shows as `UTC`).
/// Unrecognised input is shown as-is.
pub fn format_date(date: Option<&str>) -> String {
    let Some(date) = date else {
        return String::new();
    };
    let Some(caps) = timestamp_regex().captures(date) else {
        return date.to_string();
    };

    let month = caps[2].parse::<usize>().ok().filter(|m| (1..=12).contains(m));
    let day = caps[3].parse::<u32>().ok();
    let (Some(month), Some(day)) = (month, day) else {
        return date.to_string();
    };

    match (caps.get(4), caps.get(5)) {
        (Some(h), Some(m)) => {
            let zone = match caps.get(6).map(|z| z.as_str()) {
                Some("Z") => " UTC".to_string(),
                Some(offset) => format!(" {}", offset),
                None => String::new(),
            };
            format!(
                "{} {}, {} {}:{}{}",
                MONTHS[month - 1],
                day,
                &caps[1],
                h.as_str(),
                m.as_str(),
                zone
            )
        }
        _ => format!("{} {}, {}", MONTHS[month - 1], day, &caps[1]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(id: &str, sender: Option<&str>) -> EmailSummary {
        EmailSummary {
            id: id.to_string(),
            subject: Some(format!("subject {}", id)),
            sender_email: sender.map(str::to_string),
            received_date: Some("2024-03-01T09:05:00".to_string()),
        }
    }

    fn domain_group(domain: &str, n: usize) -> Group {
        Group::Domain {
            domain: domain.to_string(),
            count: n as u64,
            latest_date: Some("2024-03-01T09:05:00".to_string()),
            emails: (0..n)
                .map(|i| summary(&format!("{}-{}", domain, i), Some("x@a.com")))
                .collect(),
        }
    }

    fn sender_group(email: &str, n: usize) -> Group {
        Group::Sender {
            name: Some("Ann".to_string()),
            email: email.to_string(),
            count: n as u64,
            latest_date: None,
            emails: (0..n).map(|i| summary(&i.to_string(), None)).collect(),
        }
    }

    fn flat_email(id: &str) -> Email {
        Email {
            id: id.to_string(),
            sender_name: "Billing".to_string(),
            sender_email: "billing@acme.com".to_string(),
            subject: Some("Invoice".to_string()),
            received_date: Some("2024-01-15T14:30:00".to_string()),
            sender_count: 4,
            domain_count: 9,
        }
    }

    #[test]
    fn test_date_mode_renders_flat_rows_in_order() {
        let set = ResultSet {
            total: 3,
            results: Results::Emails(vec![flat_email("b"), flat_email("a"), flat_email("c")]),
        };
        let table = render(SortMode::Date, &set, &ExpansionSet::new());

        assert_eq!(table.rows.len(), 3);
        assert_eq!(
            table.headers,
            vec!["Sender", "Subject", "From Sender", "From Domain", "Date"]
        );
        let ids: Vec<&str> = table
            .rows
            .iter()
            .map(|r| match r {
                Row::Email(e) => e.id.as_str(),
                _ => panic!("expected email row"),
            })
            .collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
        assert_eq!(
            table.rows[0].cells(),
            vec![
                "Billing <billing@acme.com>",
                "Invoice",
                "4",
                "9",
                "Jan 15, 2024 14:30"
            ]
        );
    }

    #[test]
    fn test_grouped_row_count_follows_expansion() {
        let set = ResultSet {
            total: 8,
            results: Results::Groups(vec![domain_group("a.com", 5), domain_group("b.com", 3)]),
        };
        let mut expansion = ExpansionSet::new();

        assert_eq!(render(SortMode::DomainFrequency, &set, &expansion).rows.len(), 2);

        expansion.toggle(&GroupKey::Domain("a.com".to_string()));
        assert_eq!(render(SortMode::DomainFrequency, &set, &expansion).rows.len(), 7);

        expansion.toggle(&GroupKey::Domain("b.com".to_string()));
        let table = render(SortMode::DomainFrequency, &set, &expansion);
        assert_eq!(table.rows.len(), 10);
        assert_eq!(table.headers[0], "Domain");
        assert_eq!(table.rows[6].kind(), "group");
        assert_eq!(
            table.rows[6].group_key(),
            Some(&GroupKey::Domain("b.com".to_string()))
        );
    }

    #[test]
    fn test_expansion_for_absent_key_is_harmless() {
        let set = ResultSet {
            total: 1,
            results: Results::Groups(vec![domain_group("a.com", 2)]),
        };
        let mut expansion = ExpansionSet::new();
        expansion.toggle(&GroupKey::Domain("gone.com".to_string()));
        assert_eq!(render(SortMode::DomainFrequency, &set, &expansion).rows.len(), 1);
    }

    #[test]
    fn test_member_rows_show_sender_only_for_domain_groups() {
        let set = ResultSet {
            total: 2,
            results: Results::Groups(vec![domain_group("a.com", 1), sender_group("ann@a.com", 1)]),
        };
        let mut expansion = ExpansionSet::new();
        expansion.toggle(&GroupKey::Domain("a.com".to_string()));
        expansion.toggle(&GroupKey::Sender("ann@a.com".to_string()));

        let table = render(SortMode::SenderFrequency, &set, &expansion);
        assert_eq!(table.headers[0], "Sender");
        assert_eq!(table.rows[0].cells()[0], "▾ a.com");
        assert!(table.rows[1].cells()[0].contains("(x@a.com)"));
        assert_eq!(table.rows[2].cells()[0], "▾ Ann <ann@a.com>");
        assert_eq!(table.rows[3].cells()[0], "    subject 0");
    }

    #[test]
    fn test_collapsed_indicator() {
        let set = ResultSet {
            total: 5,
            results: Results::Groups(vec![domain_group("a.com", 5)]),
        };
        let table = render(SortMode::DomainFrequency, &set, &ExpansionSet::new());
        assert_eq!(
            table.rows[0].cells(),
            vec!["▸ a.com", "5", "Mar 1, 2024 09:05"]
        );
    }

    #[test]
    fn test_mismatched_payload_renders_nothing() {
        let set = ResultSet {
            total: 1,
            results: Results::Emails(vec![flat_email("a")]),
        };
        assert!(render(SortMode::DomainFrequency, &set, &ExpansionSet::new())
            .rows
            .is_empty());
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date(None), "");
        assert_eq!(format_date(Some("2024-12-05")), "Dec 5, 2024");
        assert_eq!(format_date(Some("2024-12-05 07:08:09")), "Dec 5, 2024 07:08");
        assert_eq!(format_date(Some("yesterday")), "yesterday");
        assert_eq!(format_date(Some("2024-13-05")), "2024-13-05");
    }

    #[test]
    fn test_format_date_keeps_offset() {
        assert_eq!(
            format_date(Some("2024-03-01T23:30:00+02:00")),
            "Mar 1, 2024 23:30 +02:00"
        );
        assert_eq!(
            format_date(Some("2024-03-01T23:30:00.123Z")),
            "Mar 1, 2024 23:30 UTC"
        );
        assert_eq!(format_date(Some("2024-03-01T23:30:00")), "Mar 1, 2024 23:30");
    }
}
