use serde::{Deserialize, Serialize};

/// Saturated evaluation reported for forced mates, in centipawns.
pub const MATE_SCORE: i32 = 10_000;

/// 1.00x payout, the lowest odds the ledger accepts.
pub const ODDS_FLOOR: u32 = 10_000;
/// 10.00x payout, the highest odds the ledger accepts.
pub const ODDS_CAP: u32 = 100_000;

/// Probabilities below this are not worth dividing by; they map straight
/// to the cap.
const MIN_PROBABILITY: f64 = 0.01;

/// Three-way odds in basis points (10000 = 1.00x payout).
///
/// Each value is clamped to [ODDS_FLOOR, ODDS_CAP] independently, so the
/// triple does not back out to probabilities that sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OddsTriple {
    pub white_win: u32,
    pub black_win: u32,
    pub draw: u32,
}

/// Convert a centipawn evaluation (positive favors White) into three-way
/// betting odds. Total over all finite inputs, including the ±MATE_SCORE
/// saturation values.
pub fn compute_odds(centipawns: i32) -> OddsTriple {
    let (white_prob, draw_prob, black_prob) = normalized_probabilities(centipawns);

    OddsTriple {
        white_win: probability_to_odds(white_prob),
        black_win: probability_to_odds(black_prob),
        draw: probability_to_odds(draw_prob),
    }
}

/// Win/draw/loss probabilities for the given evaluation, normalized so the
/// three sum to 1.0. The black share can come out negative for extreme
/// evaluations; `probability_to_odds` maps anything below the floor to the
/// odds cap.
fn normalized_probabilities(centipawns: i32) -> (f64, f64, f64) {
    let pawns = centipawns as f64 / 100.0;

    // White win probability on a logistic curve, one pawn ≈ 5.7% swing
    // around equality.
    let white_prob = 1.0 / (1.0 + 10f64.powf(-pawns / 4.0));

    // Draws start at 25% and decay as the position becomes decisive.
    let draw_prob = 0.25 * (-pawns.abs() / 5.0).exp();

    let black_prob = 1.0 - white_prob - draw_prob;

    let total = white_prob + draw_prob + black_prob;
    (white_prob / total, draw_prob / total, black_prob / total)
}

fn probability_to_odds(probability: f64) -> u32 {
    if probability < MIN_PROBABILITY {
        return ODDS_CAP;
    }

    let odds = (10_000.0 / probability).round() as u32;
    odds.clamp(ODDS_FLOOR, ODDS_CAP)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probabilities_sum_to_one_across_range() {
        let mut cp = -MATE_SCORE;
        while cp <= MATE_SCORE {
            let (w, d, b) = normalized_probabilities(cp);
            assert!(
                (w + d + b - 1.0).abs() < 1e-9,
                "probabilities for {} cp sum to {}",
                cp,
                w + d + b
            );
            cp += 37;
        }
    }

    #[test]
    fn odds_stay_in_ledger_range_across_range() {
        let mut cp = -MATE_SCORE;
        while cp <= MATE_SCORE {
            let odds = compute_odds(cp);
            for value in [odds.white_win, odds.black_win, odds.draw] {
                assert!(
                    (ODDS_FLOOR..=ODDS_CAP).contains(&value),
                    "odds {} out of range for {} cp",
                    value,
                    cp
                );
            }
            cp += 37;
        }
    }

    #[test]
    fn equal_position_has_maximum_draw_share() {
        let (w, d, b) = normalized_probabilities(0);
        assert!((d - 0.25).abs() < 1e-9, "draw share at equality was {}", d);
        assert!((w - 0.5).abs() < 1e-9, "white share at equality was {}", w);
        assert!((b - 0.25).abs() < 1e-9, "black share at equality was {}", b);

        // The curve is centered on the white logistic, so the remainder
        // splits 2:1:1 at equality rather than symmetrically.
        let odds = compute_odds(0);
        assert_eq!(odds.white_win, 20_000);
        assert_eq!(odds.black_win, 40_000);
        assert_eq!(odds.draw, 40_000);
    }

    #[test]
    fn mate_for_white_caps_black_and_draw() {
        let odds = compute_odds(MATE_SCORE);
        assert_eq!(odds.black_win, ODDS_CAP);
        assert_eq!(odds.draw, ODDS_CAP);
        assert_eq!(odds.white_win, ODDS_FLOOR);
    }

    #[test]
    fn mate_for_black_mirrors_mate_for_white() {
        let odds = compute_odds(-MATE_SCORE);
        assert_eq!(odds.white_win, ODDS_CAP);
        assert_eq!(odds.draw, ODDS_CAP);
        assert_eq!(odds.black_win, ODDS_FLOOR);
    }

    #[test]
    fn one_pawn_advantage_shortens_white() {
        let odds = compute_odds(100);
        assert!(odds.white_win < odds.black_win);
        assert!(odds.white_win >= ODDS_FLOOR);
    }

    #[test]
    fn tiny_probability_skips_division() {
        assert_eq!(probability_to_odds(0.0), ODDS_CAP);
        assert_eq!(probability_to_odds(-0.3), ODDS_CAP);
        assert_eq!(probability_to_odds(0.009), ODDS_CAP);
    }

    #[test]
    fn whole_probability_hits_floor() {
        assert_eq!(probability_to_odds(1.0), ODDS_FLOOR);
    }
}
