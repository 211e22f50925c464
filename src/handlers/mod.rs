// Request handlers, grouped by who may reach them.
//
// public:    login, signup, logout (no session needed)
// dashboard: role-scoped pages, gated by the access policy middleware
// root:      landing redirect and health probe
pub mod dashboard;
pub mod public;
pub mod root;
