//! # Observability & Tracing
//!
//! [`setup_tracing`] installs a compact `tracing-subscriber` formatter filtered through
//! `RUST_LOG`.
//!
//! ## What Gets Traced
//!
//! - **Identity cache**: startup, shutdown with bucket sizes, and every lookup/upsert at
//!   `debug` level (`resource_type`, `id`, `found`, `size`).
//! - **Store operations**: `find`, `find_all`, `save`, `update` and `delete` run inside
//!   spans carrying the resource type and id; relationship resolution opens a nested
//!   `resolve` span per entity with its depth.
//! - **Diagnostics**: kind mismatches, undeclared relationships and integrity findings are
//!   `warn!`ed with the field name; adapter failures with `error = %e`.
//!
//! ## Usage Examples
//!
//! ```bash
//! # Store operations only
//! RUST_LOG=info cargo run
//!
//! # Cache traffic and resolution passes
//! RUST_LOG=debug cargo run
//!
//! # Just the resolver
//! RUST_LOG=jsonapi_store::resolver=debug cargo run
//! ```
//!
//! With `RUST_LOG=debug`, a `find` that pulls in one related entity looks like:
//!
//! ```text
//! DEBUG Placeholder resource_type=person id=3 size=1
//! INFO find{resource_type="person" id=3}: Fetched resource_type="person" id=3
//! DEBUG find{..}:resolve{key=person:3 depth=0}: Scheduling fetches pending=1
//! INFO find{..}:resolve{..}:find{resource_type="address" id=9}: Fetched resource_type="address" id=9
//! ```

/// Initializes the global subscriber. Call once, at program start.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
