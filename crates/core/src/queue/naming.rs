//! Output naming and content types.

/// Derives the artifact name for a source file.
///
/// A final extension listed in `source_extensions` (case-insensitive) is
/// replaced by `target_extension`; anything else gets the target extension
/// appended to the full name.
pub fn derive_output_name(
    source_name: &str,
    target_extension: &str,
    source_extensions: &[String],
) -> String {
    let target = target_extension.trim_start_matches('.');

    if let Some((stem, extension)) = source_name.rsplit_once('.') {
        let recognized = source_extensions
            .iter()
            .any(|known| known.trim_start_matches('.').eq_ignore_ascii_case(extension));
        if recognized && !stem.is_empty() {
            return format!("{}.{}", stem, target);
        }
    }

    format!("{}.{}", source_name, target)
}

/// MIME type for a container, picked by file extension.
pub fn content_type_for(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "mkv" => "video/x-matroska",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "ts" => "video/mp2t",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sources() -> Vec<String> {
        vec!["mkv".to_string(), "webm".to_string()]
    }

    #[test]
    fn test_replaces_recognized_extension() {
        assert_eq!(derive_output_name("movie.mkv", "mp4", &sources()), "movie.mp4");
        assert_eq!(derive_output_name("clip.webm", "mp4", &sources()), "clip.mp4");
    }

    #[test]
    fn test_replaces_only_final_extension() {
        assert_eq!(
            derive_output_name("archive.tar.mkv", "mp4", &sources()),
            "archive.tar.mp4"
        );
        assert_eq!(
            derive_output_name("my.mkv.collection.mkv", "mp4", &sources()),
            "my.mkv.collection.mp4"
        );
    }

    #[test]
    fn test_appends_without_extension() {
        assert_eq!(derive_output_name("noext", "mp4", &sources()), "noext.mp4");
    }

    #[test]
    fn test_appends_for_unrecognized_extension() {
        assert_eq!(derive_output_name("notes.txt", "mp4", &sources()), "notes.txt.mp4");
        assert_eq!(derive_output_name("trailing.", "mp4", &sources()), "trailing..mp4");
    }

    #[test]
    fn test_dotfile_keeps_name() {
        assert_eq!(derive_output_name(".mkv", "mp4", &sources()), ".mkv.mp4");
    }

    #[test]
    fn test_case_insensitive_and_dotted_config() {
        let sources = vec![".MKV".to_string()];
        assert_eq!(derive_output_name("Movie.MkV", ".mp4", &sources), "Movie.mp4");
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("movie.mp4"), "video/mp4");
        assert_eq!(content_type_for("movie.MKV"), "video/x-matroska");
        assert_eq!(content_type_for("movie.webm"), "video/webm");
        assert_eq!(content_type_for("movie.mov"), "video/quicktime");
        assert_eq!(content_type_for("noext"), "application/octet-stream");
    }
}
