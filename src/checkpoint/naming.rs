const CHECKPOINT_PREFIX: &str = "checkpoint_";
const STAGING_SUFFIX: &str = ".partial";

/// `checkpoint_<index>` where `index` is the zero-based epoch index.
pub fn checkpoint_dir_name(index: u64) -> String {
    format!("{CHECKPOINT_PREFIX}{index}")
}

/// Hidden sibling a checkpoint is written into before being renamed.
pub fn staging_dir_name(index: u64) -> String {
    format!(".{CHECKPOINT_PREFIX}{index}{STAGING_SUFFIX}")
}

pub fn is_staging_dir_name(name: &str) -> bool {
    name.starts_with('.') && name.ends_with(STAGING_SUFFIX)
}

/// The last run of ASCII digits in a directory name.
///
/// `checkpoint_12` -> 12, `run3_epoch_7` -> 7, `latest` -> None.
pub fn trailing_index(name: &str) -> Option<u64> {
    name.rsplit(|c: char| !c.is_ascii_digit())
        .find(|token| !token.is_empty())
        .and_then(|token| token.parse().ok())
}
