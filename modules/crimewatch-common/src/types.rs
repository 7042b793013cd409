use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// --- Enums ---

/// Incident severity as stored. Wire responses use the display form
/// ("Low" / "Medium" / "High" / "Critical").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }

    pub fn display_str(&self) -> &'static str {
        match self {
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
            Severity::Critical => "Critical",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOW" => Some(Severity::Low),
            "MEDIUM" => Some(Severity::Medium),
            "HIGH" => Some(Severity::High),
            "CRITICAL" => Some(Severity::Critical),
            _ => None,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed crime-category set. Anything the classifier returns outside this
/// set fails validation and falls back to the stub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum CrimeCategory {
    #[serde(rename = "Violent Crime")]
    ViolentCrime,
    #[serde(rename = "Property Crime")]
    PropertyCrime,
    #[serde(rename = "Traffic Incident")]
    TrafficIncident,
    #[serde(rename = "Drug Offense")]
    DrugOffense,
    #[serde(rename = "Sexual Offense")]
    SexualOffense,
    Cybercrime,
    #[serde(rename = "Public Safety")]
    PublicSafety,
    Other,
    Unknown,
}

impl CrimeCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            CrimeCategory::ViolentCrime => "Violent Crime",
            CrimeCategory::PropertyCrime => "Property Crime",
            CrimeCategory::TrafficIncident => "Traffic Incident",
            CrimeCategory::DrugOffense => "Drug Offense",
            CrimeCategory::SexualOffense => "Sexual Offense",
            CrimeCategory::Cybercrime => "Cybercrime",
            CrimeCategory::PublicSafety => "Public Safety",
            CrimeCategory::Other => "Other",
            CrimeCategory::Unknown => "Unknown",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "Violent Crime" => Some(CrimeCategory::ViolentCrime),
            "Property Crime" => Some(CrimeCategory::PropertyCrime),
            "Traffic Incident" => Some(CrimeCategory::TrafficIncident),
            "Drug Offense" => Some(CrimeCategory::DrugOffense),
            "Sexual Offense" => Some(CrimeCategory::SexualOffense),
            "Cybercrime" => Some(CrimeCategory::Cybercrime),
            "Public Safety" => Some(CrimeCategory::PublicSafety),
            "Other" => Some(CrimeCategory::Other),
            "Unknown" => Some(CrimeCategory::Unknown),
            _ => None,
        }
    }
}

impl std::fmt::Display for CrimeCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum EntityType {
    Person,
    Group,
    Location,
}

/// A named entity extracted from a release: `{"type": "Group", "name": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Entity {
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub name: String,
}

// --- Sources ---

/// A configured agency newsroom, as persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub id: i64,
    pub agency_name: String,
    pub jurisdiction: String,
    pub region_label: String,
    pub source_type: String,
    pub base_url: String,
    pub parser_id: String,
    pub active: bool,
    pub use_browser: bool,
    pub last_checked_at: Option<DateTime<Utc>>,
}

// --- Articles ---

/// An article as emitted by a parser, before it has a store identity.
#[derive(Debug, Clone)]
pub struct NewArticle {
    pub source_id: i64,
    pub external_id: String,
    pub url: String,
    pub title_raw: String,
    pub published_at: Option<DateTime<Utc>>,
    pub body_raw: String,
    pub raw_html: Option<String>,
}

/// A persisted article. Fields are never mutated after insertion.
#[derive(Debug, Clone)]
pub struct RawArticle {
    pub id: i64,
    pub source_id: i64,
    pub external_id: String,
    pub url: String,
    pub title_raw: String,
    pub published_at: Option<DateTime<Utc>>,
    pub body_raw: String,
    pub raw_html: Option<String>,
    pub created_at: DateTime<Utc>,
}

// --- Enrichment ---

/// Structured interpretation of one raw article. `id` equals the article id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedIncident {
    pub id: i64,
    pub severity: Severity,
    pub summary_tactical: String,
    pub tags: Vec<String>,
    pub entities: Vec<Entity>,
    pub location_label: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub graph_cluster_key: Option<String>,
    pub crime_category: CrimeCategory,
    pub temporal_context: Option<String>,
    pub weapon_involved: Option<String>,
    pub tactical_advice: Option<String>,
    pub llm_model: String,
    pub prompt_version: String,
    pub processed_at: DateTime<Utc>,
}

// --- Refresh jobs ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(JobStatus::Pending),
            "running" => Some(JobStatus::Running),
            "succeeded" => Some(JobStatus::Succeeded),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted record of one asynchronous refresh request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshJob {
    pub id: i64,
    pub job_id: String,
    pub region: String,
    pub status: JobStatus,
    pub new_articles: Option<i64>,
    pub total_incidents: Option<i64>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Aggregate result of one region refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshOutcome {
    pub region: String,
    pub new_articles: u64,
    pub total_incidents: u64,
}
