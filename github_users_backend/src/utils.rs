pub const APP_NAME: &str = "github_users_backend";

/// Trims trailing slashes and defaults to https when no scheme is given.
pub fn sanitize_base_url(raw: &str) -> String {
    let mut base = raw.trim().to_string();
    if !base.starts_with("http://") && !base.starts_with("https://") {
        base = format!("https://{base}");
    }
    while base.ends_with('/') {
        base.pop();
    }
    base
}
