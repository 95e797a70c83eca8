//! Integration Tests Module
//!
//! End-to-end tests of the agent driven by a scripted model and in-memory
//! geodata/geocoding backends. Covers the orchestration chain, the
//! dispatcher and result store, the validation-retry and review loops, the
//! HTTP surface, taxonomy hot reload and the Overpass transport.

// Shared mocks and fixtures
mod support;

// Tool-call state machine
mod orchestrator_test;

// Tool execution, merge and itinerary assembly
mod dispatcher_test;


// Router, handlers and error bodies
mod http_test;

// Taxonomy file hot reload
mod taxonomy_test;
