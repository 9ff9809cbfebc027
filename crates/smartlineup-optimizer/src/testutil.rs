// Player pool fixtures shared by the optimizer unit tests.

use std::collections::{BTreeMap, BTreeSet};

use smartlineup_core::{Availability, Factor, PlayerFactor, PlayerScore, Position};

pub fn player(key: &str, position: Position, team: &str, salary: u32, projection: f64) -> PlayerFactor {
    PlayerFactor {
        player_key: key.into(),
        name: key.to_uppercase(),
        position,
        team: team.into(),
        opponent: Some(if team == "KC" { "BUF" } else { "KC" }.into()),
        availability: Availability::Active,
        week: 6,
        projection,
        ceiling: projection * 1.35,
        floor: projection * 0.65,
        ownership_pct: 5.0 + projection / 2.0,
        salary: Some(salary),
        trend_adjustment: 0.0,
        regression_flag: false,
        vegas_itt_ratio: 1.0,
        matchup_adjustment: 0.0,
        missing_flags: BTreeSet::new(),
    }
}

/// 17 players over two teams. The cheapest legal classic roster costs
/// $40,000; the most expensive about $58,500.
pub fn classic_pool() -> Vec<PlayerFactor> {
    use Position::*;
    vec![
        player("kc-qb", Quarterback, "KC", 7500, 22.0),
        player("buf-qb", Quarterback, "BUF", 7000, 21.0),
        player("kc-rb1", RunningBack, "KC", 8000, 19.0),
        player("buf-rb1", RunningBack, "BUF", 6500, 15.0),
        player("kc-rb2", RunningBack, "KC", 5500, 13.0),
        player("buf-rb2", RunningBack, "BUF", 4500, 10.0),
        player("kc-wr1", WideReceiver, "KC", 8500, 20.0),
        player("buf-wr1", WideReceiver, "BUF", 7000, 17.0),
        player("kc-wr2", WideReceiver, "KC", 6000, 15.0),
        player("buf-wr2", WideReceiver, "BUF", 5000, 12.0),
        player("kc-wr3", WideReceiver, "KC", 4000, 9.0),
        player("buf-wr3", WideReceiver, "BUF", 3500, 8.0),
        player("kc-te", TightEnd, "KC", 6000, 13.0),
        player("buf-te", TightEnd, "BUF", 4500, 10.0),
        player("kc-te2", TightEnd, "KC", 3000, 6.0),
        player("kc-dst", Defense, "KC", 3500, 8.0),
        player("buf-dst", Defense, "BUF", 3000, 7.0),
    ]
}

/// Six players per side of a single game.
pub fn showdown_pool() -> Vec<PlayerFactor> {
    use Position::*;
    vec![
        player("kc-qb", Quarterback, "KC", 11000, 23.0),
        player("kc-rb", RunningBack, "KC", 9000, 17.0),
        player("kc-wr1", WideReceiver, "KC", 9500, 19.0),
        player("kc-wr2", WideReceiver, "KC", 6000, 11.0),
        player("kc-te", TightEnd, "KC", 5000, 9.0),
        player("kc-dst", Defense, "KC", 4000, 7.0),
        player("buf-qb", Quarterback, "BUF", 10500, 22.0),
        player("buf-rb", RunningBack, "BUF", 8000, 15.0),
        player("buf-wr1", WideReceiver, "BUF", 8500, 16.0),
        player("buf-wr2", WideReceiver, "BUF", 5500, 10.0),
        player("buf-te", TightEnd, "BUF", 4500, 8.0),
        player("buf-dst", Defense, "BUF", 3800, 6.0),
    ]
}

/// Scores equal to projection, so expectations are easy to hand-check.
pub fn projection_scores(pool: &[PlayerFactor]) -> Vec<PlayerScore> {
    pool.iter()
        .map(|p| PlayerScore {
            player_key: p.player_key.clone(),
            profile: "test".into(),
            smart_score: p.projection,
            breakdown: BTreeMap::from([(Factor::Projection, p.projection)]),
            missing_flags: p.missing_flags.clone(),
        })
        .collect()
}
