//! Cross-module tests: concurrent races, end-to-end scenarios and the async facade

mod concurrency_tests;
