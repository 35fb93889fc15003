//! Shared constants used across ACM Compass crates.

/// Default API port for ACM Compass.
pub const DEFAULT_PORT: u16 = 7860;

/// Default maximum request body accepted by the API layer.
pub const DEFAULT_MAX_BODY_SIZE: usize = 2 * 1024 * 1024;

/// Default base URL for CLI/API clients.
pub const DEFAULT_CLI_SERVER_URL: &str = "http://127.0.0.1:7860";

/// Contest sites the bookmarklet scrapes; their pages post into the import API.
pub const DEFAULT_IMPORT_ORIGINS: &str = "https://qoj.ac,https://ucup.ac";

/// Collection file holding every tracked problem.
pub const PROBLEMS_FILE_NAME: &str = "problems.json";
/// Collection file holding every tracked contest.
pub const CONTESTS_FILE_NAME: &str = "contests.json";
/// Directory (inside the data dir) holding one Markdown file per problem id.
pub const SOLUTIONS_DIR_NAME: &str = "solutions";
/// Extension used for solution files.
pub const SOLUTION_EXTENSION: &str = "md";

/// Sync settings file stored in the config dir, outside version control.
pub const SYNC_CONFIG_FILE_NAME: &str = "sync.json";
/// Suffix of the owner lock file kept beside the data directory.
pub const OWNER_LOCK_SUFFIX: &str = "owner.lock";

/// Branch used when neither the sync config nor the repository names one.
pub const DEFAULT_SYNC_BRANCH: &str = "main";
/// Remote name used for every pull and push.
pub const DEFAULT_REMOTE_NAME: &str = "origin";

/// Problem letters available to a contest, in positional order.
pub const CONTEST_LETTERS: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
/// Upper bound on `total_problems` (one per letter).
pub const MAX_CONTEST_PROBLEMS: usize = 26;
