//! Unit Tests
//!
//! Provider-level tests with HTTP mocking. Pure functions are tested
//! in their own modules; this tree covers the seams that need a fake
//! server.
