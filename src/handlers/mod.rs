// handlers/mod.rs
//
// Public:    /, /health
// Protected: /me, /tags, /ingredients, /recipes (bearer token required;
//            the auth middleware is layered on in app.rs)
pub mod resource;
pub mod system;
