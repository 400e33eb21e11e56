/// Router Module Index
///
/// Splits the routes by access level so that authentication is applied once, as a
/// layer, instead of per handler.

/// Routes open to everyone. Handlers that show posts apply the visibility policy
/// themselves, using the optional `Viewer` to recognise authors.
pub mod public;

/// Routes behind the `AuthUser` middleware. Anonymous requests get 401.
pub mod authenticated;
