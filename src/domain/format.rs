use chrono::{DateTime, Utc};

pub fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Cuts `value` to `length` characters, marking the cut with `...`.
pub fn truncate(value: &str, length: usize) -> String {
    if value.chars().count() > length {
        let kept = value.chars().take(length).collect::<String>();
        format!("{kept}...")
    } else {
        value.to_string()
    }
}

pub fn date_time(value: &DateTime<Utc>) -> String {
    value.format("%b %-d, %Y, %I:%M %p").to_string()
}

pub fn mask_secret(value: Option<&str>) -> String {
    match value {
        Some(secret) if secret.chars().count() > 6 => {
            let chars = secret.chars().collect::<Vec<_>>();
            let prefix = chars[..3].iter().collect::<String>();
            let suffix = chars[chars.len() - 3..].iter().collect::<String>();
            format!("{prefix}***{suffix}")
        }
        Some(secret) if !secret.is_empty() => "***".to_string(),
        _ => "<not set>".to_string(),
    }
}
