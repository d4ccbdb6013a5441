use serde::{Deserialize, Serialize};

// Analytics summary (GET /analytics)
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Analytics {
    #[serde(default)]
    pub top_senders: Vec<SenderStat>,
    #[serde(default)]
    pub top_domains: Vec<DomainStat>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct SenderStat {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    pub count: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct DomainStat {
    pub domain: String,
    pub count: u64,
}

// POST /sync. The body is opaque; the backend usually reports a message.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct SyncOutcome {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    DomainFrequency,
    SenderFrequency,
    Date,
}

impl SortMode {
    pub fn as_param(self) -> &'static str {
        match self {
            SortMode::DomainFrequency => "domain_frequency",
            SortMode::SenderFrequency => "sender_frequency",
            SortMode::Date => "date",
        }
    }

    pub fn from_param(s: &str) -> Option<Self> {
        match s {
            "domain_frequency" => Some(SortMode::DomainFrequency),
            "sender_frequency" => Some(SortMode::SenderFrequency),
            "date" => Some(SortMode::Date),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SortMode::DomainFrequency => "Domain",
            SortMode::SenderFrequency => "Sender",
            SortMode::Date => "Date",
        }
    }

    /// Next mode in the selector order.
    pub fn cycle(self) -> Self {
        match self {
            SortMode::DomainFrequency => SortMode::SenderFrequency,
            SortMode::SenderFrequency => SortMode::Date,
            SortMode::Date => SortMode::DomainFrequency,
        }
    }

    pub fn is_grouped(self) -> bool {
        !matches!(self, SortMode::Date)
    }
}

impl Default for SortMode {
    fn default() -> Self {
        SortMode::DomainFrequency
    }
}

// Flat email row (sort_by=date)
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Email {
    pub id: String,
    #[serde(default)]
    pub sender_name: String,
    #[serde(default)]
    pub sender_email: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub received_date: Option<String>,
    #[serde(default)]
    pub sender_count: u64,
    #[serde(default)]
    pub domain_count: u64,
}

// Member of a group (sort_by=*_frequency)
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct EmailSummary {
    pub id: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub sender_email: Option<String>,
    #[serde(default)]
    pub received_date: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Group {
    Sender {
        #[serde(default)]
        name: Option<String>,
        email: String,
        count: u64,
        #[serde(default)]
        latest_date: Option<String>,
        #[serde(default)]
        emails: Vec<EmailSummary>,
    },
    Domain {
        domain: String,
        count: u64,
        #[serde(default)]
        latest_date: Option<String>,
        #[serde(default)]
        emails: Vec<EmailSummary>,
    },
}

impl Group {
    pub fn count(&self) -> u64 {
        match self {
            Group::Sender { count, .. } | Group::Domain { count, .. } => *count,
        }
    }

    pub fn latest_date(&self) -> Option<&str> {
        match self {
            Group::Sender { latest_date, .. } | Group::Domain { latest_date, .. } => {
                latest_date.as_deref()
            }
        }
    }

    pub fn emails(&self) -> &[EmailSummary] {
        match self {
            Group::Sender { emails, .. } | Group::Domain { emails, .. } => emails,
        }
    }

    /// Label shown in the group header row.
    pub fn display_label(&self) -> String {
        match self {
            Group::Sender {
                name: Some(name),
                email,
                ..
            } if !name.is_empty() => format!("{} <{}>", name, email),
            Group::Sender { email, .. } => email.clone(),
            Group::Domain { domain, .. } => domain.clone(),
        }
    }
}

/// Raw JSON shape of `GET /emails`; `results` is polymorphic on `sort_by`.
/// Older backends send flat records under `emails` whatever the sort.
#[derive(Debug, Deserialize)]
pub struct EmailsResponse {
    #[serde(default)]
    pub results: serde_json::Value,
    #[serde(default)]
    pub emails: Option<Vec<Email>>,
    #[serde(default)]
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Results {
    Emails(Vec<Email>),
    Groups(Vec<Group>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet {
    pub total: u64,
    pub results: Results,
}

impl ResultSet {
    pub fn empty(sort: SortMode) -> Self {
        let results = if sort.is_grouped() {
            Results::Groups(Vec::new())
        } else {
            Results::Emails(Vec::new())
        };
        ResultSet { total: 0, results }
    }

    pub fn len(&self) -> usize {
        match &self.results {
            Results::Emails(e) => e.len(),
            Results::Groups(g) => g.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decode a raw response according to the sort mode it was requested with.
    pub fn from_response(sort: SortMode, raw: EmailsResponse) -> Result<Self, serde_json::Error> {
        if raw.results.is_null() {
            if let Some(emails) = raw.emails {
                return Ok(Self::from_flat(sort, raw.total, emails));
            }
        }
        let value = if raw.results.is_null() {
            serde_json::Value::Array(Vec::new())
        } else {
            raw.results
        };
        let results = if sort.is_grouped() {
            Results::Groups(serde_json::from_value(value)?)
        } else {
            Results::Emails(serde_json::from_value(value)?)
        };
        Ok(ResultSet {
            total: raw.total,
            results,
        })
    }

    /// Flat records for a grouped mode are grouped here, per page, keeping the
    /// backend's order. `total` still counts emails, not groups.
    fn from_flat(sort: SortMode, total: u64, emails: Vec<Email>) -> Self {
        let results = match sort {
            SortMode::Date => Results::Emails(emails),
            SortMode::SenderFrequency | SortMode::DomainFrequency => {
                let mut groups: Vec<Group> = Vec::new();
                for email in emails {
                    let slot = groups.iter().position(|g| match (sort, g) {
                        (SortMode::SenderFrequency, Group::Sender { email: addr, .. }) => {
                            *addr == email.sender_email
                        }
                        (_, Group::Domain { domain, .. }) => *domain == domain_of(&email.sender_email),
                        _ => false,
                    });
                    let index = match slot {
                        Some(i) => i,
                        None => {
                            groups.push(Group::empty_for(sort, &email));
                            groups.len() - 1
                        }
                    };
                    groups[index].push(email);
                }
                Results::Groups(groups)
            }
        };
        ResultSet { total, results }
    }
}

fn domain_of(address: &str) -> String {
    match address.rsplit_once('@') {
        Some((_, domain)) => domain.to_lowercase(),
        None => address.to_lowercase(),
    }
}

impl Group {
    fn empty_for(sort: SortMode, first: &Email) -> Self {
        match sort {
            SortMode::SenderFrequency => Group::Sender {
                name: Some(first.sender_name.clone()).filter(|n| !n.is_empty()),
                email: first.sender_email.clone(),
                count: 0,
                latest_date: None,
                emails: Vec::new(),
            },
            _ => Group::Domain {
                domain: domain_of(&first.sender_email),
                count: 0,
                latest_date: None,
                emails: Vec::new(),
            },
        }
    }

    fn push(&mut self, email: Email) {
        let (Group::Sender {
            count,
            latest_date,
            emails,
            ..
        }
        | Group::Domain {
            count,
            latest_date,
            emails,
            ..
        }) = self;
        *count += 1;
        if email.received_date.as_deref() > latest_date.as_deref() {
            *latest_date = email.received_date.clone();
        }
        emails.push(EmailSummary {
            id: email.id,
            subject: email.subject,
            sender_email: Some(email.sender_email),
            received_date: email.received_date,
        });
    }
}
