/// Turns a client display name into a form that is safe to embed in artifact filenames.
/// `"Hope Foundation"` becomes `"hope_foundation"`.
pub fn safe_file_name(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}
