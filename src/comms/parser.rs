use tracing::debug;

/// One completed game as reported by the match runner: which two
/// contenders played and the signed outcome from the first one's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameLine {
    pub first: usize,
    pub second: usize,
    /// +1 first contender won, -1 second won, 0 draw.
    pub outcome: i32,
}

/// Parse one line of cutechess-cli output, e.g.
///
/// `Finished game 3 (tuner-0 vs tuner-1): 1-0 {White mates}`
///
/// Returns `None` for every other line: unrelated output, unterminated
/// games (`*`), or result lines too mangled to trust. Callers treat
/// `None` as "not a game", never as an error.
pub fn parse_game_line(line: &str) -> Option<GameLine> {
    let line = line.trim();
    let rest = line.strip_prefix("Finished game ")?;

    let open = rest.find('(')?;
    let close = rest[open..].find(')')? + open;
    let (first_name, second_name) = rest[open + 1..close].split_once(" vs ")?;

    let first = contender_index(first_name)?;
    let second = contender_index(second_name)?;

    let after = rest[close + 1..].trim_start_matches(':').trim_start();
    let token = after.split_whitespace().next()?;
    let outcome = match token {
        "1-0" => 1,
        "0-1" => -1,
        "1/2-1/2" => 0,
        other => {
            debug!("Ignoring game with result token '{other}'");
            return None;
        }
    };

    Some(GameLine {
        first,
        second,
        outcome,
    })
}

/// Contender index from the numeric suffix of an engine name
/// ("tuner-0" -> 0).
fn contender_index(name: &str) -> Option<usize> {
    name.trim().rsplit('-').next()?.parse().ok()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_documented_line_shape() {
        let line = "Finished game 3 (tuner-0 vs tuner-1): 1-0 {White mates}";
        assert_eq!(
            parse_game_line(line),
            Some(GameLine {
                first: 0,
                second: 1,
                outcome: 1,
            })
        );
    }

    #[test]
    fn maps_all_outcome_tokens() {
        let win = "Finished game 1 (tuner-0 vs tuner-1): 1-0 {White mates}";
        let loss = "Finished game 2 (tuner-1 vs tuner-0): 0-1 {Black mates}";
        let draw = "Finished game 3 (tuner-0 vs tuner-1): 1/2-1/2 {Draw by repetition}";

        assert_eq!(parse_game_line(win).unwrap().outcome, 1);
        let reversed = parse_game_line(loss).unwrap();
        assert_eq!((reversed.first, reversed.second), (1, 0));
        assert_eq!(reversed.outcome, -1);
        assert_eq!(parse_game_line(draw).unwrap().outcome, 0);
    }

    #[test]
    fn ignores_unrelated_lines() {
        assert_eq!(parse_game_line("Started game 1 of 16 (tuner-0 vs tuner-1)"), None);
        assert_eq!(parse_game_line("Score of tuner-0 vs tuner-1: 3 - 1 - 2 [0.667] 6"), None);
        assert_eq!(parse_game_line(""), None);
        assert_eq!(parse_game_line("Elo difference: 120.4 +/- 88.2"), None);
    }

    #[test]
    fn unterminated_game_is_not_a_result() {
        let line = "Finished game 4 (tuner-0 vs tuner-1): * {Stalled connection}";
        assert_eq!(parse_game_line(line), None);
    }

    #[test]
    fn mangled_lines_are_skipped() {
        assert_eq!(parse_game_line("Finished game 5"), None);
        assert_eq!(parse_game_line("Finished game 5 (tuner-0 vs): 1-0"), None);
        assert_eq!(parse_game_line("Finished game 5 (alpha vs beta): 1-0"), None);
    }

    #[test]
    fn multi_dash_names_use_numeric_suffix() {
        let line = "Finished game 9 (my-cool-tuner-2 vs my-cool-tuner-0): 0-1 {}";
        let game = parse_game_line(line).unwrap();
        assert_eq!((game.first, game.second), (2, 0));
        assert_eq!(game.outcome, -1);
    }
}
