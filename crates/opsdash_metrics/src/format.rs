/// Megabytes as `"x.xx MB"`, or `"x.xx GB"` from 1024 MB up.
pub fn format_size(mb: f64) -> String {
    if mb >= 1024.0 {
        format!("{:.2} GB", mb / 1024.0)
    } else {
        format!("{mb:.2} MB")
    }
}

pub fn format_percentage(value: f64) -> String {
    format!("{value:.1}%")
}
