/// API version segment used in every versioned route.
pub const API_VERSION: &str = "v0";

/// Versioned route prefix (e.g. `/api/v0`).
pub const API_PREFIX: &str = "/api/v0";

/// Genre recorded when an upload does not provide one.
pub const DEFAULT_GENRE: &str = "Autre";

/// Content type sent to remote providers when none is known.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Description the folder uploader attaches to every item.
pub const CLI_UPLOAD_DESCRIPTION: &str = "Uploaded via CLI";
