//! Orchestrator Integration Tests
//!
//! Verifies the bounded tool-calling chain:
//! - at most one corrective nudge per chain
//! - in-order execution and early stop on the first terminal result
//! - the step bound
//! - mode-scoped tool sets

use serde_json::json;
use tokyo_map_agent::services::orchestrator::NUDGE_TEXT;
use tokyo_map_agent::services::taxonomy::Taxonomy;
use tokyo_map_agent::AppError;
use tokyo_map_llm::{MessageContent, MessageRole, ToolCallMode};
use tokyo_map_tools::{Mode, ResultType, ToolName};

use crate::support::*;

fn cafes() -> FakeGeodata {
    FakeGeodata::new().with(CAFE_TAG, nodes_near(SHIBUYA, "Cafe", 6))
}

// ============================================================================
// Nudging
// ============================================================================

#[tokio::test]
async fn test_nudge_then_tool_call_succeeds() {
    let fixture = FixtureBuilder::new()
        .chain(vec![
            text("Which area do you mean?"),
            tool_call(
                "search_osm_tokyo",
                json!({"categories": ["cafe"], "place": "渋谷"}),
            ),
        ])
        .geodata(cafes())
        .build();

    let outcome = fixture
        .state
        .control()
        .orchestrator()
        .run_chain(&Taxonomy::builtin(), "渋谷のカフェ", Mode::Search)
        .await
        .unwrap();

    assert_eq!(outcome.tool, ToolName::SearchOsm);
    assert_eq!(outcome.steps, 2);
    assert_eq!(outcome.output.result_type, ResultType::Search);

    let calls = fixture.chain.calls();
    assert_eq!(calls.len(), 2);
    let second = &calls[1].messages;
    assert_eq!(second.len(), 3);
    assert_eq!(second[1].role, MessageRole::Assistant);
    assert_eq!(second[2].text_content(), NUDGE_TEXT);
}

#[tokio::test]
async fn test_second_toolless_answer_fails() {
    let fixture = FixtureBuilder::new()
        .chain(vec![text("hmm"), text("still no"), text("never reached")])
        .build();

    let err = fixture
        .state
        .control()
        .orchestrator()
        .run_chain(&Taxonomy::builtin(), "カフェ", Mode::Search)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::ParameterExtractionFailure(_)));
    assert_eq!(fixture.chain.call_count(), 2);

    let nudges = fixture
        .chain
        .calls()
        .last()
        .unwrap()
        .messages
        .iter()
        .filter(|m| m.text_content() == NUDGE_TEXT)
        .count();
    assert_eq!(nudges, 1);
}

// ============================================================================
// Tool execution
// ============================================================================

#[tokio::test]
async fn test_terminal_result_stops_the_batch() {
    let fixture = FixtureBuilder::new()
        .chain(vec![tool_calls(&[
            ("search_osm_tokyo", json!({"categories": ["cafe"]})),
            ("search_osm_tokyo", json!({"categories": ["convenience"]})),
        ])])
        .geodata(cafes())
        .build();

    let outcome = fixture
        .state
        .control()
        .orchestrator()
        .run_chain(&Taxonomy::builtin(), "カフェ", Mode::Search)
        .await
        .unwrap();

    assert_eq!(outcome.output.stats["union"], 6);
    assert_eq!(fixture.geodata.queries().len(), 1);
    assert_eq!(fixture.state.store().len(), 1);
}

#[tokio::test]
async fn test_intermediate_results_feed_the_next_turn() {
    let fixture = FixtureBuilder::new()
        .chain(vec![
            tool_call("search_category_tokyo", json!({"category": "cafe", "place": "渋谷"})),
        ])
        .geodata(cafes())
        .build();
    let orchestrator = fixture.state.control().orchestrator();
    let taxonomy = Taxonomy::builtin();

    // The script ends after the category search, so the chain errors out,
    // but the intermediate entry stays in the store.
    let err = orchestrator
        .run_chain(&taxonomy, "カフェ", Mode::Search)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Llm(_)));
    assert_eq!(fixture.state.store().len(), 1);

    let calls = fixture.chain.calls();
    let transcript = &calls[1].messages;
    let tool_result = transcript
        .iter()
        .flat_map(|m| m.content.iter())
        .find_map(|c| match c {
            MessageContent::ToolResult { content, .. } => Some(content.clone()),
            _ => None,
        })
        .unwrap();
    let payload: serde_json::Value = serde_json::from_str(&tool_result).unwrap();
    assert_eq!(payload["result_type"], "category");
    assert_eq!(payload["stats"]["cafe"], 6);
}

#[tokio::test]
async fn test_category_searches_then_merge() {
    let geodata = FakeGeodata::new()
        .with(CAFE_TAG, nodes_near(SHIBUYA, "Cafe", 3))
        .with(CONVENIENCE_TAG, nodes_near(SHIBUYA, "Cafe", 3));
    let fixture = FixtureBuilder::new().geodata(geodata).build();
    let orchestrator = fixture.state.control().orchestrator();
    let taxonomy = Taxonomy::builtin();
    let dispatcher = orchestrator.dispatcher();

    let cafe = dispatcher
        .search_category(
            &taxonomy,
            "cafe".to_string(),
            serde_json::from_value(json!({"category": "cafe", "place": "渋谷"})).unwrap(),
        )
        .await
        .unwrap();
    let conv = dispatcher
        .search_category(
            &taxonomy,
            "convenience".to_string(),
            serde_json::from_value(json!({"category": "convenience", "place": "渋谷"})).unwrap(),
        )
        .await
        .unwrap();

    let merged = dispatcher
        .merge(
            serde_json::from_value(json!({
                "store_ids": [cafe.store_id.unwrap(), conv.store_id.unwrap()],
                "union": true
            }))
            .unwrap(),
        )
        .unwrap();
    assert_eq!(merged.result_type, ResultType::Search);
    // Same coordinates and names in both layers
    assert_eq!(merged.stats["union"], 3);
}

#[tokio::test]
async fn test_step_bound() {
    let script = (0..6)
        .map(|_| tool_call("search_category_tokyo", json!({"category": "cafe"})))
        .collect();
    let fixture = FixtureBuilder::new().chain(script).geodata(cafes()).build();

    let err = fixture
        .state
        .control()
        .orchestrator()
        .run_chain(&Taxonomy::builtin(), "カフェ", Mode::Search)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::ToolStepsExceeded(6)));
    assert_eq!(fixture.chain.call_count(), 6);
    // Intermediate writes are not rolled back
    assert_eq!(fixture.state.store().len(), 6);
}

#[tokio::test]
async fn test_tools_are_scoped_to_mode() {
    let fixture = FixtureBuilder::new()
        .chain(vec![tool_call("plan_trip_tokyo", json!({"place": "上野"}))])
        .build();

    let err = fixture
        .state
        .control()
        .orchestrator()
        .run_chain(&Taxonomy::builtin(), "カフェ", Mode::Search)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::UnknownTool(ref n) if n == "plan_trip_tokyo"));

    let call = &fixture.chain.calls()[0];
    let names: Vec<&str> = call.tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["search_osm_tokyo", "search_category_tokyo", "merge_search_results"]
    );
    assert_eq!(call.options.tool_call_mode, ToolCallMode::Auto);
    assert_eq!(call.options.temperature_override, Some(0.2));
    assert_eq!(call.options.max_tokens_override, Some(300));
}
