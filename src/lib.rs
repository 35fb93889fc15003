//! Root crate facade for the ACM Compass server.

pub use compass_server::{
    config, create_app, db, error, handlers, models, resolve_bind_address, serve_router,
    AppError, AppState, Config, Database, ImportStaging, SyncManager,
};
