
/// Proposes where a template at `source_path` (relative, `/`-separated) should
/// live in the new layout.
pub fn suggest_template_path(source_path: &str) -> String {
    let (dir, file_name) = match source_path.rsplit_once('/') {
        Some((dir, file_name)) => (dir, file_name),
        None => ("", source_path),
    };

    let stem = file_name.rsplit_once('.').map_or(file_name, |(stem, _)| stem);
    let lowercase = source_path.to_lowercase();

    if dir.is_empty() && stem != "base" {
        format!("pages/{}", source_path)
    } else if lowercase.contains("admin") {
        format!("admin/{}", file_name)
    } else if lowercase.contains("user") {
        format!("user/{}", file_name)
    } else {
        source_path.to_string()
    }
}
