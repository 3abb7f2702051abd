/// Maximum number of tenant databases held open at once.
pub const MAX_TENANTS: usize = 1024;

/// Maximum length of a tenant (database) name.
pub const MAX_TENANT_NAME_LEN: usize = 128;

/// Maximum number of products in one availability request.
pub const MAX_REQUESTED_PRODUCTS: usize = 32;

/// Maximum length of a language, product or rating token.
pub const MAX_TOKEN_LEN: usize = 100;

/// Maximum length of a sales manager's display name.
pub const MAX_NAME_LEN: usize = 250;

/// Maximum rows in one `INSERT INTO slots` or ids in one `IN (...)` list.
pub const MAX_BATCH_ROWS: usize = 10_000;
