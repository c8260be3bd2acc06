// components/media_downloader/src/utils.rs
use std::path::Path;

/// Keep only alphanumerics, spaces, hyphens and underscores, then trim the end
pub fn sanitize_name(name: &str) -> String {
    let kept: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();
    kept.trim_end().to_string()
}

/// Output template `<dir>/<artist> - <track>.%(ext)s` with sanitized names
pub fn output_template(dir: &Path, artist: &str, track: &str) -> String {
    let file_name = format!(
        "{} - {}.%(ext)s",
        sanitize_name(artist),
        sanitize_name(track)
    );
    dir.join(file_name).to_string_lossy().into_owned()
}
