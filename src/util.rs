/// Render a number so it can follow an operator without ambiguity: `-3` becomes `(-3)`.
pub fn with_parens_if_negative(n: i64) -> String {
    if n < 0 {
        format!("({n})")
    } else {
        n.to_string()
    }
}

/// Rounded percentage of `part` in `whole`, 0 when `whole` is 0.
pub fn percent(part: u32, whole: u32) -> u32 {
    match whole {
        0 => 0,
        _ => ((part as f64 / whole as f64) * 100.0).round() as u32,
    }
}

/// `"3 min 07 sec"` style rendering of a millisecond duration.
pub fn format_elapsed(ms: u64) -> String {
    let total_secs = ms / 1000;
    format!("{} min {:02} sec", total_secs / 60, total_secs % 60)
}
