/// End-to-end CLI integration tests
#[path = "cli/common.rs"]
mod common;
#[path = "cli/debug_tests.rs"]
mod debug_tests;
#[path = "cli/disasm_tests.rs"]
mod disasm_tests;
#[path = "cli/error_tests.rs"]
mod error_tests;
#[path = "cli/run_tests.rs"]
mod run_tests;
