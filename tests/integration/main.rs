//! Integration tests: full cycles against in-memory sources.

mod pipeline;
