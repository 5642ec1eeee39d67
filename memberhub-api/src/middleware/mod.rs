/// Middleware modules for the API server
///
/// Requester resolution lives in `app::principal_layer`; this module holds
/// the tower layers that wrap every response.

pub mod security;
