//! Reshapes stored interviews and protocols for the export engine.
//!
//! The engine identifies protocols by the MD5 of their name rather than by
//! database id, so sessions are rewritten to carry that identifier and the
//! protocol set is re-keyed the same way. Everything here is pure.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use tracing::warn;

use fresco_core::constants::APP_VERSION;
use fresco_models::{InterviewWithParticipant, Protocol};

/// Identifier the export engine uses for a protocol: lowercase hex MD5 of its name.
pub fn remote_protocol_id(name: &str) -> String {
    content_hash(name.as_bytes())
}

/// Lowercase hex MD5 of arbitrary content.
pub fn content_hash(bytes: &[u8]) -> String {
    let digest = Md5::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Per-session metadata attached to every exported network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionVariables {
    #[serde(rename = "caseId")]
    pub case_id: String,
    #[serde(rename = "sessionId")]
    pub session_id: String,
    #[serde(rename = "protocolUID")]
    pub protocol_uid: String,
    #[serde(rename = "protocolName")]
    pub protocol_name: String,
    #[serde(rename = "codebookHash")]
    pub codebook_hash: String,
    #[serde(rename = "sessionStart")]
    pub session_start: DateTime<Utc>,
    #[serde(rename = "sessionFinish")]
    pub session_finish: Option<DateTime<Utc>>,
    #[serde(rename = "sessionExported")]
    pub session_exported: Option<DateTime<Utc>>,
    #[serde(rename = "appVersion")]
    pub app_version: String,
}

/// A session in the shape the export engine consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportableSession {
    pub session_id: String,
    pub network: serde_json::Value,
    pub session_variables: SessionVariables,
}

/// Rewrite sessions to reference protocols by remote id.
///
/// Sessions whose protocol is not installed are skipped with a warning.
pub fn format_exportable_sessions(
    sessions: &[InterviewWithParticipant],
    protocols: &[Protocol],
) -> Vec<ExportableSession> {
    let by_id: HashMap<&str, &Protocol> = protocols.iter().map(|p| (p.id.as_str(), p)).collect();

    sessions
        .iter()
        .filter_map(|s| {
            let interview = &s.interview;
            let Some(protocol) = by_id.get(interview.protocol_id.as_str()) else {
                warn!(
                    "skipping session {}: protocol {} is not installed",
                    interview.id, interview.protocol_id
                );
                return None;
            };

            Some(ExportableSession {
                session_id: interview.id.clone(),
                network: interview.network.clone(),
                session_variables: SessionVariables {
                    case_id: s.participant.display_label().to_string(),
                    session_id: interview.id.clone(),
                    protocol_uid: remote_protocol_id(&protocol.name),
                    protocol_name: protocol.name.clone(),
                    codebook_hash: content_hash(protocol.codebook.to_string().as_bytes()),
                    session_start: interview.start_time,
                    session_finish: interview.finish_time,
                    session_exported: interview.export_time,
                    app_version: APP_VERSION.to_string(),
                },
            })
        })
        .collect()
}

/// Key protocols by remote id. On a name collision the later protocol wins.
pub fn reindex_protocols(protocols: &[Protocol]) -> BTreeMap<String, Protocol> {
    let mut indexed = BTreeMap::new();
    for protocol in protocols {
        let key = remote_protocol_id(&protocol.name);
        if let Some(previous) = indexed.insert(key.clone(), protocol.clone()) {
            warn!(
                "protocols {} and {} share remote id {key}; keeping {}",
                previous.id, protocol.id, protocol.id
            );
        }
    }
    indexed
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use fresco_models::{Interview, Participant};

    fn protocol(id: &str, name: &str) -> Protocol {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Protocol {
            id: id.into(),
            hash: format!("hash-{id}"),
            name: name.into(),
            schema_version: 7,
            description: None,
            imported_at: at,
            last_modified: at,
            stages: serde_json::json!([]),
            codebook: serde_json::json!({"node": {}}),
            active: false,
        }
    }

    fn session(id: &str, protocol_id: &str, label: Option<&str>) -> InterviewWithParticipant {
        let at = Utc.with_ymd_and_hms(2024, 2, 1, 10, 0, 0).unwrap();
        InterviewWithParticipant {
            interview: Interview {
                id: id.into(),
                start_time: at,
                finish_time: None,
                export_time: None,
                last_updated: at,
                network: serde_json::json!({"nodes": [], "edges": []}),
                participant_id: "p1".into(),
                protocol_id: protocol_id.into(),
                current_step: 0,
            },
            participant: Participant {
                id: "p1".into(),
                identifier: "P-001".into(),
                label: label.map(String::from),
            },
        }
    }

    #[test]
    fn test_remote_protocol_id_is_md5_hex() {
        assert_eq!(remote_protocol_id(""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(remote_protocol_id("abc"), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn test_empty_inputs() {
        assert!(format_exportable_sessions(&[], &[]).is_empty());
        assert!(reindex_protocols(&[]).is_empty());
    }

    #[test]
    fn test_format_resolves_protocol() {
        let protocols = vec![protocol("db-1", "Study")];
        let sessions = vec![session("s1", "db-1", Some("Alice"))];

        let out = format_exportable_sessions(&sessions, &protocols);
        assert_eq!(out.len(), 1);
        let vars = &out[0].session_variables;
        assert_eq!(vars.protocol_uid, remote_protocol_id("Study"));
        assert_eq!(vars.protocol_name, "Study");
        assert_eq!(vars.case_id, "Alice");
        assert_eq!(out[0].network, sessions[0].interview.network);
    }

    #[test]
    fn test_case_id_falls_back_to_identifier() {
        let protocols = vec![protocol("db-1", "Study")];
        let out = format_exportable_sessions(&[session("s1", "db-1", None)], &protocols);
        assert_eq!(out[0].session_variables.case_id, "P-001");
    }

    #[test]
    fn test_unknown_protocol_skipped() {
        let protocols = vec![protocol("db-1", "Study")];
        let sessions = vec![session("s1", "db-1", None), session("s2", "gone", None)];
        let out = format_exportable_sessions(&sessions, &protocols);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].session_id, "s1");
    }

    #[test]
    fn test_format_is_deterministic_and_leaves_inputs() {
        let protocols = vec![protocol("db-1", "Study")];
        let sessions = vec![session("s1", "db-1", None)];
        let before = (sessions.clone(), protocols.clone());

        let a = format_exportable_sessions(&sessions, &protocols);
        let b = format_exportable_sessions(&sessions, &protocols);
        assert_eq!(a, b);
        assert_eq!((sessions, protocols), before);
    }

    #[test]
    fn test_reindex_collision_last_wins() {
        let protocols = vec![protocol("db-1", "Same"), protocol("db-2", "Same")];
        let indexed = reindex_protocols(&protocols);
        assert_eq!(indexed.len(), 1);
        assert_eq!(indexed[&remote_protocol_id("Same")].id, "db-2");
    }

    #[test]
    fn test_session_variables_wire_names() {
        let protocols = vec![protocol("db-1", "Study")];
        let out = format_exportable_sessions(&[session("s1", "db-1", None)], &protocols);
        let json = serde_json::to_value(&out[0]).unwrap();
        assert!(json["sessionVariables"]["protocolUID"].is_string());
        assert!(json["sessionVariables"]["caseId"].is_string());
        assert!(json["sessionId"].is_string());
    }
}
