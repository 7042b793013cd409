//! Read-side projections: the denormalized incident records, the derived
//! entity graph, and the map markers. All pure — derived per request from the
//! store's incident list and discarded.

use std::collections::HashSet;

use serde::Serialize;

use crimewatch_store::IncidentRecord;

/// Fallback coordinates when enrichment produced none (Fraser Valley
/// centroid, matching the primary deployment region).
const DEFAULT_LAT: f64 = 49.1042;
const DEFAULT_LNG: f64 = -122.6604;

// ---------------------------------------------------------------------------
// Incident list
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// The wire shape the front end consumes. Field names are part of the
/// contract.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentView {
    pub id: String,
    pub timestamp: String,
    pub source: String,
    pub agency_name: String,
    pub location: String,
    pub coordinates: Coordinates,
    pub summary: String,
    pub full_text: String,
    pub severity: String,
    pub tags: Vec<String>,
    pub entities: Vec<String>,
    pub related_incident_ids: Vec<String>,
    pub source_url: String,
    pub crime_category: String,
    pub temporal_context: Option<String>,
    pub weapon_involved: Option<String>,
    pub tactical_advice: Option<String>,
}

/// Display category for a source type code.
fn source_display(source_type: &str) -> &'static str {
    match source_type {
        "STATE_POLICE" => "State Police",
        "SHERIFF" => "Sheriff",
        "OVERSIGHT" => "Oversight",
        _ => "Local Police",
    }
}

pub fn incident_view(record: &IncidentRecord) -> IncidentView {
    let article = &record.article;
    let incident = &record.incident;
    let source = &record.source;

    let timestamp = article
        .published_at
        .unwrap_or(article.created_at)
        .to_rfc3339();

    IncidentView {
        id: article.id.to_string(),
        timestamp,
        source: source_display(&source.source_type).to_string(),
        agency_name: source.agency_name.clone(),
        location: incident
            .location_label
            .clone()
            .unwrap_or_else(|| source.region_label.clone()),
        coordinates: Coordinates {
            lat: incident.lat.unwrap_or(DEFAULT_LAT),
            lng: incident.lng.unwrap_or(DEFAULT_LNG),
        },
        summary: incident.summary_tactical.clone(),
        full_text: article.body_raw.clone(),
        severity: incident.severity.display_str().to_string(),
        tags: incident.tags.clone(),
        entities: incident.entities.iter().map(|e| e.name.clone()).collect(),
        related_incident_ids: Vec::new(),
        source_url: article.url.clone(),
        crime_category: incident.crime_category.to_string(),
        temporal_context: incident.temporal_context.clone(),
        weapon_involved: incident.weapon_involved.clone(),
        tactical_advice: incident.tactical_advice.clone(),
    }
}

pub fn incident_views(records: &[IncidentRecord]) -> Vec<IncidentView> {
    records.iter().map(incident_view).collect()
}

// ---------------------------------------------------------------------------
// Graph
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphLink {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub link_type: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphView {
    pub region: String,
    pub nodes: Vec<GraphNode>,
    pub links: Vec<GraphLink>,
}

/// One node per incident, one per distinct entity name, one per distinct
/// location label; `involved` and `occurred_at` edges from incidents.
pub fn graph_view(region: &str, records: &[IncidentRecord]) -> GraphView {
    let mut nodes = Vec::new();
    let mut links = Vec::new();
    let mut seen_entities: HashSet<String> = HashSet::new();
    let mut seen_locations: HashSet<String> = HashSet::new();

    for record in records {
        let incident_id = format!("incident:{}", record.article.id);
        nodes.push(GraphNode {
            id: incident_id.clone(),
            label: record.incident.summary_tactical.clone(),
            node_type: "incident".to_string(),
            group: record.incident.graph_cluster_key.clone(),
        });

        for entity in &record.incident.entities {
            let entity_id = format!("entity:{}", entity.name);
            if seen_entities.insert(entity.name.clone()) {
                nodes.push(GraphNode {
                    id: entity_id.clone(),
                    label: entity.name.clone(),
                    node_type: "entity".to_string(),
                    group: None,
                });
            }
            links.push(GraphLink {
                source: incident_id.clone(),
                target: entity_id,
                link_type: "involved".to_string(),
            });
        }

        if let Some(location) = &record.incident.location_label {
            let location_id = format!("location:{location}");
            if seen_locations.insert(location.clone()) {
                nodes.push(GraphNode {
                    id: location_id.clone(),
                    label: location.clone(),
                    node_type: "location".to_string(),
                    group: None,
                });
            }
            links.push(GraphLink {
                source: incident_id.clone(),
                target: location_id,
                link_type: "occurred_at".to_string(),
            });
        }
    }

    GraphView {
        region: region.to_string(),
        nodes,
        links,
    }
}

// ---------------------------------------------------------------------------
// Map
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapMarker {
    pub id: String,
    pub lat: f64,
    pub lng: f64,
    pub severity: String,
    pub summary: String,
    pub agency_name: String,
}

/// Markers for incidents that carry real coordinates. No default-coordinate
/// padding here — a marker at a made-up location is worse than no marker.
pub fn map_view(records: &[IncidentRecord]) -> Vec<MapMarker> {
    records
        .iter()
        .filter_map(|record| {
            let lat = record.incident.lat?;
            let lng = record.incident.lng?;
            Some(MapMarker {
                id: record.article.id.to_string(),
                lat,
                lng,
                severity: record.incident.severity.display_str().to_string(),
                summary: record.incident.summary_tactical.clone(),
                agency_name: record.source.agency_name.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use crimewatch_common::{
        CrimeCategory, EnrichedIncident, Entity, EntityType, RawArticle, Severity, Source,
    };

    fn record(id: i64, entities: Vec<Entity>, location: Option<&str>) -> IncidentRecord {
        IncidentRecord {
            source: Source {
                id: 1,
                agency_name: "Langley RCMP".to_string(),
                jurisdiction: "BC".to_string(),
                region_label: "Fraser Valley, BC".to_string(),
                source_type: "RCMP_NEWSROOM".to_string(),
                base_url: "https://rcmp.ca/en/bc/langley/news".to_string(),
                parser_id: "rcmp".to_string(),
                active: true,
                use_browser: true,
                last_checked_at: None,
            },
            article: RawArticle {
                id,
                source_id: 1,
                external_id: format!("ext{id}"),
                url: format!("https://rcmp.ca/news/{id}"),
                title_raw: "Release title".to_string(),
                published_at: Some(Utc.with_ymd_and_hms(2024, 12, 1, 8, 0, 0).unwrap()),
                body_raw: "Full body text".to_string(),
                raw_html: None,
                created_at: Utc.with_ymd_and_hms(2024, 12, 1, 9, 0, 0).unwrap(),
            },
            incident: EnrichedIncident {
                id,
                severity: Severity::High,
                summary_tactical: "Targeted shooting, suspects outstanding".to_string(),
                tags: vec!["Gang Activity".to_string()],
                entities,
                location_label: location.map(String::from),
                lat: location.map(|_| 49.05),
                lng: location.map(|_| -122.3),
                graph_cluster_key: Some("Fraser Valley Gang Conflict".to_string()),
                crime_category: CrimeCategory::ViolentCrime,
                temporal_context: None,
                weapon_involved: Some("Firearm".to_string()),
                tactical_advice: None,
                llm_model: "test".to_string(),
                prompt_version: "v1".to_string(),
                processed_at: Utc::now(),
            },
        }
    }

    fn entity(name: &str) -> Entity {
        Entity {
            entity_type: EntityType::Group,
            name: name.to_string(),
        }
    }

    #[test]
    fn incident_wire_field_names() {
        let view = incident_view(&record(7, vec![entity("Red Scorpions")], Some("Abbotsford")));
        let json = serde_json::to_value(&view).unwrap();

        assert_eq!(json["id"], "7");
        assert_eq!(json["agencyName"], "Langley RCMP");
        assert_eq!(json["severity"], "High");
        assert_eq!(json["crimeCategory"], "Violent Crime");
        assert_eq!(json["sourceUrl"], "https://rcmp.ca/news/7");
        assert_eq!(json["entities"][0], "Red Scorpions");
        assert_eq!(json["coordinates"]["lat"], 49.05);
        assert_eq!(json["fullText"], "Full body text");
        assert!(json["relatedIncidentIds"].as_array().unwrap().is_empty());
        assert!(json.get("weaponInvolved").is_some());
        // Published timestamp wins over insertion time.
        assert!(json["timestamp"].as_str().unwrap().starts_with("2024-12-01T08"));
    }

    #[test]
    fn missing_coordinates_fall_back_to_region_default() {
        let view = incident_view(&record(1, vec![], None));
        assert_eq!(view.coordinates.lat, DEFAULT_LAT);
        assert_eq!(view.coordinates.lng, DEFAULT_LNG);
        assert_eq!(view.location, "Fraser Valley, BC");
    }

    #[test]
    fn graph_nodes_and_links() {
        let records = vec![
            record(1, vec![entity("Red Scorpions")], Some("Abbotsford")),
            record(2, vec![entity("Red Scorpions"), entity("UN Gang")], None),
        ];
        let graph = graph_view("Fraser Valley, BC", &records);

        // 2 incidents + 2 distinct entities + 1 location.
        assert_eq!(graph.nodes.len(), 5);
        let entity_nodes: Vec<_> = graph
            .nodes
            .iter()
            .filter(|n| n.node_type == "entity")
            .collect();
        assert_eq!(entity_nodes.len(), 2);

        // involved: 1 + 2; occurred_at: 1.
        assert_eq!(graph.links.len(), 4);
        assert!(graph
            .links
            .iter()
            .any(|l| l.source == "incident:1"
                && l.target == "location:Abbotsford"
                && l.link_type == "occurred_at"));
        assert!(graph
            .links
            .iter()
            .filter(|l| l.link_type == "involved")
            .all(|l| l.target.starts_with("entity:")));

        // Cluster key rides along as the node group.
        let incident_node = graph.nodes.iter().find(|n| n.id == "incident:1").unwrap();
        assert_eq!(incident_node.group.as_deref(), Some("Fraser Valley Gang Conflict"));
    }

    #[test]
    fn map_skips_unlocated_incidents() {
        let records = vec![
            record(1, vec![], Some("Abbotsford")),
            record(2, vec![], None),
        ];
        let markers = map_view(&records);
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].id, "1");
        assert_eq!(markers[0].severity, "High");
    }
}
