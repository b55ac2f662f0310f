/// Router Module Index
///
/// Splits the HTTP surface by access level. Identity is resolved per request by the
/// `AuthUser` extractor; the owner-scoping rules themselves live in `TodoService`.

/// Routes accessible without an identity (monitoring).
pub mod public;

/// Routes that act on behalf of the caller. Every handler here goes through the
/// service guard, which answers 401 when no caller could be resolved.
pub mod authenticated;
