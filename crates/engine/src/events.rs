//! Request and stream-event types for the ask surface.
//!
//! Events serialize as single-key JSON objects; the stream is terminated
//! by the `[DONE]` token marker rather than a structural close, so clients
//! can detect end-of-stream without framing support.

use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

/// Marker token emitted as the final event of every stream.
pub const DONE_MARKER: &str = "[DONE]";

/// Analysis mode selecting which system instruction frames the generation
/// request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    #[default]
    Default,
    ProgressAreas,
    KnowledgeGaps,
    ConsensusDisagreement,
}

impl AnalysisMode {
    /// Resolve a request tag to a mode. Unrecognized tags fall back to
    /// `Default` rather than erroring.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "progress_areas" => Self::ProgressAreas,
            "knowledge_gaps" => Self::KnowledgeGaps,
            "consensus_disagreement" => Self::ConsensusDisagreement,
            _ => Self::Default,
        }
    }

    pub fn as_tag(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::ProgressAreas => "progress_areas",
            Self::KnowledgeGaps => "knowledge_gaps",
            Self::ConsensusDisagreement => "consensus_disagreement",
        }
    }
}

/// An incoming question with optional retrieval and framing hints.
#[derive(Debug, Clone, Validate)]
pub struct AskRequest {
    /// The user question. The wire format also accepts the `question`
    /// spelling; `query` wins when both are present.
    #[validate(length(min = 1, max = 2000))]
    pub query: String,

    /// Section tags restricting retrieval; empty means no restriction.
    pub sections: Vec<String>,

    /// Analysis mode tag; absent or unrecognized values use the default mode.
    pub analysis_type: Option<String>,
}

#[derive(Deserialize)]
struct AskRequestWire {
    query: Option<String>,
    question: Option<String>,
    #[serde(default)]
    sections: Vec<String>,
    #[serde(default)]
    analysis_type: Option<String>,
}

impl<'de> Deserialize<'de> for AskRequest {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let wire = AskRequestWire::deserialize(deserializer)?;
        let query = wire
            .query
            .or(wire.question)
            .ok_or_else(|| serde::de::Error::missing_field("query"))?;
        Ok(Self {
            query,
            sections: wire.sections,
            analysis_type: wire.analysis_type,
        })
    }
}

impl AskRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            sections: Vec::new(),
            analysis_type: None,
        }
    }

    pub fn mode(&self) -> AnalysisMode {
        self.analysis_type
            .as_deref()
            .map(AnalysisMode::from_tag)
            .unwrap_or_default()
    }
}

/// One directed concept relationship extracted from a generated answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub relationship: String,
}

/// One event in the response stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A fragment of generated prose.
    Token(String),
    /// Concept relationships parsed from the trailing structured payload.
    Graph(Vec<GraphEdge>),
    /// Distinct source files behind the context window.
    Sources(Vec<String>),
    /// A per-request backend failure; the stream still terminates normally.
    Error(String),
    /// End of stream.
    Done,
}

impl StreamEvent {
    /// Render the event as its wire JSON object. `Done` is encoded as the
    /// `[DONE]` token marker clients key off.
    pub fn wire_json(&self) -> String {
        let value = match self {
            Self::Token(text) => json!({ "token": text }),
            Self::Graph(edges) => json!({ "graph": edges }),
            Self::Sources(files) => json!({ "sources": files }),
            Self::Error(message) => json!({ "error": message }),
            Self::Done => json!({ "token": DONE_MARKER }),
        };
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_tag_round_trip() {
        for mode in [
            AnalysisMode::Default,
            AnalysisMode::ProgressAreas,
            AnalysisMode::KnowledgeGaps,
            AnalysisMode::ConsensusDisagreement,
        ] {
            assert_eq!(AnalysisMode::from_tag(mode.as_tag()), mode);
        }
    }

    #[test]
    fn test_unrecognized_mode_falls_back_to_default() {
        assert_eq!(AnalysisMode::from_tag("deep_dive"), AnalysisMode::Default);
        assert_eq!(AnalysisMode::from_tag(""), AnalysisMode::Default);
    }

    #[test]
    fn test_request_accepts_question_alias() {
        let request: AskRequest =
            serde_json::from_str(r#"{"question": "What is bone loss?"}"#).unwrap();
        assert_eq!(request.query, "What is bone loss?");
        assert!(request.sections.is_empty());
        assert_eq!(request.mode(), AnalysisMode::Default);
    }

    #[test]
    fn test_query_wins_over_question_when_both_present() {
        let request: AskRequest =
            serde_json::from_str(r#"{"query": "from query", "question": "from question"}"#)
                .unwrap();
        assert_eq!(request.query, "from query");
    }

    #[test]
    fn test_request_without_query_or_question_is_rejected() {
        assert!(serde_json::from_str::<AskRequest>(r#"{"sections": ["Results"]}"#).is_err());
    }

    #[test]
    fn test_request_mode_resolution() {
        let request: AskRequest = serde_json::from_str(
            r#"{"query": "q", "analysis_type": "knowledge_gaps", "sections": ["Results"]}"#,
        )
        .unwrap();
        assert_eq!(request.mode(), AnalysisMode::KnowledgeGaps);
        assert_eq!(request.sections, vec!["Results".to_string()]);
    }

    #[test]
    fn test_empty_query_fails_validation() {
        let request = AskRequest::new("");
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_event_wire_shapes() {
        assert_eq!(
            StreamEvent::Token("Hello".to_string()).wire_json(),
            r#"{"token":"Hello"}"#
        );
        assert_eq!(
            StreamEvent::Sources(vec!["paper_1.txt".to_string()]).wire_json(),
            r#"{"sources":["paper_1.txt"]}"#
        );
        assert_eq!(
            StreamEvent::Error("backend unavailable".to_string()).wire_json(),
            r#"{"error":"backend unavailable"}"#
        );
        assert_eq!(StreamEvent::Done.wire_json(), r#"{"token":"[DONE]"}"#);
    }

    #[test]
    fn test_graph_event_wire_shape() {
        let event = StreamEvent::Graph(vec![GraphEdge {
            source: "microgravity".to_string(),
            target: "bone density".to_string(),
            relationship: "decreases".to_string(),
        }]);
        let value: serde_json::Value = serde_json::from_str(&event.wire_json()).unwrap();
        assert_eq!(value["graph"][0]["source"], "microgravity");
        assert_eq!(value["graph"][0]["relationship"], "decreases");
    }
}
