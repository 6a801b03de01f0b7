/// The max retries for the chain providers.
pub(crate) const PROVIDER_MAX_RETRIES: u32 = 10;

/// The initial backoff for the chain providers.
pub(crate) const PROVIDER_INITIAL_BACKOFF: u64 = 100;

/// The default provider compute units per second.
pub(crate) const PROVIDER_COMPUTE_UNITS_PER_SECOND: u64 = 10000;

/// The default page size of listed history pages.
pub(crate) const DEFAULT_PAGE_SIZE: u64 = 10;

/// The default path of the database file.
pub(crate) const DEFAULT_DATABASE_PATH: &str = "bridge-history.db";
