//! Integration test modules.

mod bridge_scenarios_test;
mod supervisor_test;
