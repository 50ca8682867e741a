//! Integration tests for fieldsync-api
//!
//! Uses wiremock to simulate the inspection backend and verifies
//! end-to-end behavior of the ApiClient and the HttpRemoteCatalog
//! port implementation.

mod common;

mod test_assets;
mod test_catalog;
