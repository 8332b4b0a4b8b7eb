//! Listing string formatting for the Plex pre-roll setting.

/// Plex plays every path in order when separated by commas.
pub const PLAY_ALL_SEPARATOR: &str = ",";
/// Plex picks one path at random when separated by semicolons.
pub const RANDOM_SEPARATOR: &str = ";";

/// Join paths into the listing string stored in Plex.
pub fn build_listing<S: AsRef<str>>(paths: &[S], play_all: bool) -> String {
    let separator = if play_all { PLAY_ALL_SEPARATOR } else { RANDOM_SEPARATOR };
    paths
        .iter()
        .map(|p| p.as_ref())
        .collect::<Vec<&str>>()
        .join(separator)
}
