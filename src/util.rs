use std::time::Duration;

pub fn format_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    let b = bytes as f64;
    if b >= GB {
        format!("{:.2} GB", b / GB)
    } else if b >= MB {
        format!("{:.2} MB", b / MB)
    } else if b >= KB {
        format!("{:.2} KB", b / KB)
    } else {
        format!("{bytes} B")
    }
}

/// Coarse age like "3h 12m". Only the two most significant units are kept.
pub fn format_age(age: Duration) -> String {
    let secs = age.as_secs();
    let rounded = match secs {
        0..=59 => secs,
        60..=86_399 => secs - secs % 60,
        _ => secs - secs % 3_600,
    };
    let text = humantime::format_duration(Duration::from_secs(rounded)).to_string();
    text.split(' ').take(2).collect::<Vec<_>>().join(" ")
}
