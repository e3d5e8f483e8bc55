//! Plain-text rendering of result statistics.

use crate::generator::find_builtin;
use crate::stats::ResultStats;
use crate::util::format_elapsed;

/// Human name for a persisted game key. Built-in games use their label;
/// anything else (assignments, retired games) shows the raw key.
pub fn game_label(key: &str) -> String {
    find_builtin(key)
        .map(|g| g.label().to_string())
        .unwrap_or_else(|| key.to_string())
}

pub fn summary_lines(stats: &ResultStats) -> Vec<String> {
    vec![
        format!("Game: {}", game_label(&stats.game_type_key)),
        format!("Time: {}", format_elapsed(stats.time_elapsed_ms)),
        format!(
            "Correct on first try: {}%",
            stats.percent_correct_on_first_try
        ),
        format!(
            "Points: {} (best during session: {})",
            stats.points_toward_win, stats.max_reached_points_toward_win
        ),
        format!("Problems attempted: {}", stats.problems_attempted),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_describe_the_session() {
        let stats = ResultStats {
            game_type_key: "multiplication.v1".to_string(),
            time_elapsed_ms: 125_000,
            percent_correct_on_first_try: 90,
            points_toward_win: 20,
            problems_attempted: 24,
            max_reached_points_toward_win: 21,
        };
        let lines = summary_lines(&stats);
        assert_eq!(lines[0], "Game: Multiplication");
        assert_eq!(lines[1], "Time: 2 min 05 sec");
        assert_eq!(lines[2], "Correct on first try: 90%");
        assert_eq!(lines[3], "Points: 20 (best during session: 21)");
        assert_eq!(lines[4], "Problems attempted: 24");
    }

    #[test]
    fn unknown_keys_fall_back_to_the_key() {
        assert_eq!(game_label("assignment:abc"), "assignment:abc");
    }
}
