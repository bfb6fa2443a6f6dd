//! Splitting generated answers into prose and a trailing graph payload.
//!
//! The model is asked to append an optional JSON object after its prose
//! answer. The split point is the first `{` in the full text; everything
//! before it is prose, everything from it onward is treated as the
//! candidate payload. A payload that does not parse is dropped silently,
//! never surfaced as an error.

use serde::Deserialize;
use tracing::debug;

use crate::events::GraphEdge;

/// A generated answer split into prose and optional graph edges.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedAnswer {
    pub prose: String,
    pub graph: Option<Vec<GraphEdge>>,
}

#[derive(Deserialize)]
struct GraphPayload {
    graph_data: Vec<GraphEdge>,
}

/// Split `full_text` at the first `{` and try to read the remainder as a
/// graph payload: either `{"graph_data": [...]}` or a bare edge list.
pub fn parse_answer(full_text: &str) -> ParsedAnswer {
    let Some(pos) = full_text.find('{') else {
        return ParsedAnswer {
            prose: full_text.trim().to_string(),
            graph: None,
        };
    };

    let prose = full_text[..pos].trim().to_string();
    let payload = &full_text[pos..];
    let graph = match serde_json::from_str::<GraphPayload>(payload) {
        Ok(parsed) => Some(parsed.graph_data),
        Err(_) => serde_json::from_str::<Vec<GraphEdge>>(payload).ok(),
    };
    if graph.is_none() {
        debug!(
            payload_len = payload.len(),
            "Trailing payload is not a graph; dropping it"
        );
    }

    ParsedAnswer { prose, graph }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_trailing_graph_object() {
        let parsed = parse_answer(
            "Answer.\n{\"graph_data\":[{\"source\":\"A\",\"target\":\"B\",\"relationship\":\"affects\"}]}",
        );
        assert_eq!(parsed.prose, "Answer.");
        let graph = parsed.graph.unwrap();
        assert_eq!(graph.len(), 1);
        assert_eq!(graph[0].source, "A");
        assert_eq!(graph[0].target, "B");
        assert_eq!(graph[0].relationship, "affects");
    }

    #[test]
    fn test_answer_without_graph_passes_through() {
        let parsed = parse_answer("Answer with no graph.");
        assert_eq!(parsed.prose, "Answer with no graph.");
        assert!(parsed.graph.is_none());
    }

    #[test]
    fn test_malformed_payload_is_dropped_silently() {
        let parsed = parse_answer("Answer. {\"graph_data\": [unclosed");
        assert_eq!(parsed.prose, "Answer.");
        assert!(parsed.graph.is_none());
    }

    #[test]
    fn test_trailing_text_after_payload_invalidates_it() {
        let parsed = parse_answer("Answer. {\"graph_data\": []} Hope this helps!");
        assert_eq!(parsed.prose, "Answer.");
        assert!(parsed.graph.is_none());
    }

    #[test]
    fn test_payload_with_extra_keys_still_parses() {
        let parsed = parse_answer(
            "Done. {\"graph_data\":[{\"source\":\"A\",\"target\":\"B\",\"relationship\":\"r\",\"weight\":2}],\"note\":\"x\"}",
        );
        assert_eq!(parsed.graph.unwrap().len(), 1);
    }

    #[test]
    fn test_edge_missing_field_rejects_whole_payload() {
        let parsed = parse_answer("Done. {\"graph_data\":[{\"source\":\"A\",\"target\":\"B\"}]}");
        assert_eq!(parsed.prose, "Done.");
        assert!(parsed.graph.is_none());
    }

    #[test]
    fn test_payload_only_text_yields_empty_prose() {
        let parsed = parse_answer("{\"graph_data\":[]}");
        assert_eq!(parsed.prose, "");
        assert_eq!(parsed.graph, Some(vec![]));
    }

    #[test]
    fn test_prose_is_trimmed() {
        let parsed = parse_answer("  Spaced out.  \n\n{\"graph_data\":[]}");
        assert_eq!(parsed.prose, "Spaced out.");
    }
}
