pub fn format_count(count: u64) -> String {
    if count < 1_000 {
        return count.to_string();
    }

    let mut digits = count.to_string();
    let mut cursor = digits.len();
    while cursor > 3 {
        cursor -= 3;
        digits.insert(cursor, ' ');
    }
    digits
}

pub fn truncate_label(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let kept = text
        .chars()
        .take(max_chars.saturating_sub(3))
        .collect::<String>();
    format!("{}...", kept.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_count_groups_thousands() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(8532), "8 532");
        assert_eq!(format_count(1_234_567), "1 234 567");
    }

    #[test]
    fn truncate_label_keeps_short_text() {
        assert_eq!(truncate_label("closures", 25), "closures");
    }

    #[test]
    fn truncate_label_shortens_long_text() {
        let long = "What is the difference between var, let and const?";
        let short = truncate_label(long, 25);
        assert!(short.chars().count() <= 25);
        assert!(short.ends_with("..."));
    }
}
