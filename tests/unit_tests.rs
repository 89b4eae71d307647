// Unit tests for the public library API
// This file acts as the entry point for all unit tests in tests/unit/

mod unit {
    mod config_tests;
    mod storage_tests;
    mod transform_tests;
}
