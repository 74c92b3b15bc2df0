/// Router Module Index
///
/// Splits the routing table by access level so each gate is applied once, at the module
/// boundary, instead of inside individual handlers.

/// Routes open to anonymous clients: health, account flows and published-college reads.
pub mod public;

/// Catalogue writes. Wrapped in the `authenticate` and `require_admin` gates.
pub mod admin;
