// Constraint builder: contest rules + player pool -> a binary program over
// (player, slot kind) assignment variables.

use std::collections::{BTreeMap, BTreeSet};

use smartlineup_core::config::ContestRules;
use smartlineup_core::roster::CAPTAIN_MULTIPLIER;
use smartlineup_core::{PlayerFactor, Position, RosterTemplate, SlotKind};
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// A rosterable player as seen by the optimizer.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub player_key: String,
    pub name: String,
    pub position: Position,
    pub team: String,
    pub salary: u32,
    pub ownership_pct: f64,
}

/// One binary decision variable: `candidate` fills a `slot` of this kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecisionVar {
    pub candidate: usize,
    pub slot: SlotKind,
    /// Salary and score multiplier of the slot (1.5 on CPT).
    pub multiplier: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    LessEqual,
    GreaterEqual,
    Equal,
}

/// What a constraint row enforces. Used for logging and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstraintKind {
    SlotFill(SlotKind),
    PlayerOnce(String),
    SalaryCap,
    SalaryFloor,
    TotalOwnership,
    Stack(String),
    TeamLimit(String),
    Locked(String),
    LockedCaptain(String),
    Diversity { lineup: usize },
    ExposureBan(String),
    ExposurePin(String),
}

/// Sparse linear row: `sum(coef * x[var]) <sense> rhs`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearConstraint {
    pub kind: ConstraintKind,
    pub terms: Vec<(usize, f64)>,
    pub sense: Sense,
    pub rhs: f64,
}

impl LinearConstraint {
    pub fn new(kind: ConstraintKind, terms: Vec<(usize, f64)>, sense: Sense, rhs: f64) -> Self {
        Self {
            kind,
            terms,
            sense,
            rhs,
        }
    }

    pub fn lhs(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|(i, c)| c * values.get(*i).copied().unwrap_or(0.0))
            .sum()
    }

    pub fn is_satisfied(&self, values: &[f64], tolerance: f64) -> bool {
        let lhs = self.lhs(values);
        match self.sense {
            Sense::LessEqual => lhs <= self.rhs + tolerance,
            Sense::GreaterEqual => lhs >= self.rhs - tolerance,
            Sense::Equal => (lhs - self.rhs).abs() <= tolerance,
        }
    }
}

/// Rule-derived options for one build.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildOptions {
    pub stacking: bool,
    pub min_stack: usize,
    pub max_total_ownership: Option<f64>,
    pub max_player_ownership: Option<f64>,
    pub min_salary: Option<u32>,
    pub max_players_per_team: Option<usize>,
    /// Players forced into every lineup.
    pub locked: BTreeSet<String>,
    /// Players removed from the pool.
    pub excluded: BTreeSet<String>,
    /// Showdown only: player forced into the captain slot.
    pub locked_captain: Option<String>,
}

impl BuildOptions {
    /// Options from contest rules, with the team cap in effect for `template`.
    pub fn from_rules(rules: &ContestRules, template: &str) -> Self {
        Self {
            stacking: rules.stacking,
            min_stack: rules.min_stack,
            max_total_ownership: rules.max_total_ownership,
            max_player_ownership: rules.max_player_ownership,
            min_salary: rules.min_salary,
            max_players_per_team: rules.team_cap_for(template),
            ..Self::default()
        }
    }
}

/// A complete, solver-independent formulation.
#[derive(Debug, Clone)]
pub struct ConstraintSet {
    pub template: RosterTemplate,
    pub candidates: Vec<Candidate>,
    pub vars: Vec<DecisionVar>,
    pub constraints: Vec<LinearConstraint>,
    pub locked: BTreeSet<String>,
    pub locked_captain: Option<String>,
    /// Players left out of the formulation, with the reason.
    pub dropped: Vec<(String, String)>,
}

impl ConstraintSet {
    pub fn roster_size(&self) -> usize {
        self.template.roster_size()
    }

    pub fn candidate_index(&self, player_key: &str) -> Option<usize> {
        self.candidates.iter().position(|c| c.player_key == player_key)
    }

    /// Variable indices belonging to one candidate.
    pub fn vars_for_candidate(&self, candidate: usize) -> Vec<usize> {
        self.vars
            .iter()
            .enumerate()
            .filter(|(_, v)| v.candidate == candidate)
            .map(|(i, _)| i)
            .collect()
    }

    /// Unit-coefficient terms covering every variable of the given players.
    pub fn player_terms<'a, I>(&self, player_keys: I) -> Vec<(usize, f64)>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let wanted: BTreeSet<&str> = player_keys.into_iter().collect();
        self.vars
            .iter()
            .enumerate()
            .filter(|(_, v)| wanted.contains(self.candidates[v.candidate].player_key.as_str()))
            .map(|(i, _)| (i, 1.0))
            .collect()
    }

    pub fn count_kind(&self, pred: impl Fn(&ConstraintKind) -> bool) -> usize {
        self.constraints.iter().filter(|c| pred(&c.kind)).count()
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum BuildError {
    #[error("unknown contest template `{0}`")]
    UnknownTemplate(String),

    #[error("locked captain {player_key} costs {salary} at 1.5x, over the {cap} salary cap")]
    LockedCaptainOverCap {
        player_key: String,
        salary: f64,
        cap: u32,
    },

    #[error("template `{0}` has no captain slot to lock")]
    NoCaptainSlot(String),

    #[error("locked player {0} is not in the player pool")]
    UnknownLockedPlayer(String),

    #[error("locked player {player_key} cannot be rostered: {reason}")]
    LockedPlayerUnavailable { player_key: String, reason: String },
}

// ---------------------------------------------------------------------------
// Build
// ---------------------------------------------------------------------------

/// Build the constraint set for the named template.
pub fn build(
    template_name: &str,
    templates: &BTreeMap<String, RosterTemplate>,
    pool: &[PlayerFactor],
    options: &BuildOptions,
) -> Result<ConstraintSet, BuildError> {
    let template = templates
        .get(template_name)
        .ok_or_else(|| BuildError::UnknownTemplate(template_name.to_string()))?;
    build_for_template(template, pool, options)
}

/// Build against an already-resolved template.
pub fn build_for_template(
    template: &RosterTemplate,
    pool: &[PlayerFactor],
    options: &BuildOptions,
) -> Result<ConstraintSet, BuildError> {
    let is_locked = |key: &str| {
        options.locked.contains(key) || options.locked_captain.as_deref() == Some(key)
    };

    let mut candidates: Vec<Candidate> = Vec::new();
    let mut dropped: Vec<(String, String)> = Vec::new();
    let mut seen: BTreeSet<&str> = BTreeSet::new();

    for player in pool {
        let key = player.player_key.as_str();
        if !seen.insert(key) {
            continue;
        }
        let locked = is_locked(key);
        let reason = if options.excluded.contains(key) {
            Some("excluded")
        } else if player.salary.map_or(true, |s| s == 0) {
            Some("no salary")
        } else if !template.is_eligible(player.position) {
            Some("no eligible slot")
        } else if player.availability.is_out() && !locked {
            Some("ruled out")
        } else if options
            .max_player_ownership
            .is_some_and(|max| player.ownership_pct > max)
            && !locked
        {
            Some("ownership above limit")
        } else {
            None
        };

        match (reason, player.salary) {
            (None, Some(salary)) => candidates.push(Candidate {
                player_key: key.to_string(),
                name: player.name.clone(),
                position: player.position,
                team: player.team.clone(),
                salary,
                ownership_pct: player.ownership_pct,
            }),
            (Some(reason), _) if locked => {
                return Err(BuildError::LockedPlayerUnavailable {
                    player_key: key.to_string(),
                    reason: reason.to_string(),
                });
            }
            (reason, _) => {
                dropped.push((key.to_string(), reason.unwrap_or("no salary").to_string()));
            }
        }
    }

    for key in options.locked.iter().chain(options.locked_captain.iter()) {
        if !candidates.iter().any(|c| &c.player_key == key) {
            return Err(BuildError::UnknownLockedPlayer(key.clone()));
        }
    }

    if let Some(captain) = &options.locked_captain {
        if !template.has_captain() {
            return Err(BuildError::NoCaptainSlot(template.name.clone()));
        }
        if let Some(c) = candidates.iter().find(|c| &c.player_key == captain) {
            let salary = c.salary as f64 * CAPTAIN_MULTIPLIER;
            if salary > template.salary_cap as f64 {
                return Err(BuildError::LockedCaptainOverCap {
                    player_key: captain.clone(),
                    salary,
                    cap: template.salary_cap,
                });
            }
        }
    }

    // -- Variables --
    let mut vars = Vec::new();
    for (ci, c) in candidates.iter().enumerate() {
        for slot in &template.slots {
            if slot.kind.accepts(c.position, template.captain_mode) {
                vars.push(DecisionVar {
                    candidate: ci,
                    slot: slot.kind,
                    multiplier: template.salary_multiplier(slot.kind),
                });
            }
        }
    }

    let mut set = ConstraintSet {
        template: template.clone(),
        candidates,
        vars,
        constraints: Vec::new(),
        locked: options.locked.clone(),
        locked_captain: options.locked_captain.clone(),
        dropped,
    };
    set.constraints = formulate(&set, options);

    if !set.dropped.is_empty() {
        warn!(
            "{} players left out of the {} pool",
            set.dropped.len(),
            template.name
        );
    }
    info!(
        "built {} template: {} candidates, {} variables, {} constraints",
        template.name,
        set.candidates.len(),
        set.vars.len(),
        set.constraints.len()
    );
    Ok(set)
}

fn formulate(set: &ConstraintSet, options: &BuildOptions) -> Vec<LinearConstraint> {
    let template = &set.template;
    let mut rows = Vec::new();

    // Slot fill
    for slot in &template.slots {
        let terms = set
            .vars
            .iter()
            .enumerate()
            .filter(|(_, v)| v.slot == slot.kind)
            .map(|(i, _)| (i, 1.0))
            .collect();
        rows.push(LinearConstraint::new(
            ConstraintKind::SlotFill(slot.kind),
            terms,
            Sense::Equal,
            slot.count as f64,
        ));
    }

    // Each player at most once (exactly once when locked)
    for (ci, c) in set.candidates.iter().enumerate() {
        let terms: Vec<(usize, f64)> = set
            .vars_for_candidate(ci)
            .into_iter()
            .map(|i| (i, 1.0))
            .collect();
        if set.locked.contains(&c.player_key) {
            rows.push(LinearConstraint::new(
                ConstraintKind::Locked(c.player_key.clone()),
                terms,
                Sense::Equal,
                1.0,
            ));
        } else if terms.len() > 1 {
            rows.push(LinearConstraint::new(
                ConstraintKind::PlayerOnce(c.player_key.clone()),
                terms,
                Sense::LessEqual,
                1.0,
            ));
        }
    }

    // Salary
    let salary_terms: Vec<(usize, f64)> = set
        .vars
        .iter()
        .enumerate()
        .map(|(i, v)| (i, set.candidates[v.candidate].salary as f64 * v.multiplier))
        .collect();
    rows.push(LinearConstraint::new(
        ConstraintKind::SalaryCap,
        salary_terms.clone(),
        Sense::LessEqual,
        template.salary_cap as f64,
    ));
    if let Some(floor) = options.min_salary {
        rows.push(LinearConstraint::new(
            ConstraintKind::SalaryFloor,
            salary_terms,
            Sense::GreaterEqual,
            floor as f64,
        ));
    }

    // Ownership ceiling
    if let Some(max) = options.max_total_ownership {
        let terms = set
            .vars
            .iter()
            .enumerate()
            .map(|(i, v)| (i, set.candidates[v.candidate].ownership_pct))
            .collect();
        rows.push(LinearConstraint::new(
            ConstraintKind::TotalOwnership,
            terms,
            Sense::LessEqual,
            max,
        ));
    }

    // Locked captain
    if let Some(captain) = &set.locked_captain {
        let terms: Vec<(usize, f64)> = set
            .vars
            .iter()
            .enumerate()
            .filter(|(_, v)| {
                v.slot == SlotKind::Cpt && &set.candidates[v.candidate].player_key == captain
            })
            .map(|(i, _)| (i, 1.0))
            .collect();
        rows.push(LinearConstraint::new(
            ConstraintKind::LockedCaptain(captain.clone()),
            terms,
            Sense::Equal,
            1.0,
        ));
    }

    let teams: BTreeSet<&str> = set.candidates.iter().map(|c| c.team.as_str()).collect();

    // QB stacking: min_stack * QBs(team) <= pass catchers(team)
    if options.stacking && options.min_stack > 0 && !template.captain_mode {
        for team in &teams {
            let mut terms = Vec::new();
            let mut has_qb = false;
            for (i, v) in set.vars.iter().enumerate() {
                let c = &set.candidates[v.candidate];
                if c.team != *team {
                    continue;
                }
                if c.position == Position::Quarterback {
                    has_qb = true;
                    terms.push((i, options.min_stack as f64));
                } else if c.position.is_pass_catcher() {
                    terms.push((i, -1.0));
                }
            }
            if has_qb {
                rows.push(LinearConstraint::new(
                    ConstraintKind::Stack(team.to_string()),
                    terms,
                    Sense::LessEqual,
                    0.0,
                ));
            }
        }
    }

    // Team cap
    if let Some(cap) = options.max_players_per_team {
        for team in &teams {
            let terms: Vec<(usize, f64)> = set
                .vars
                .iter()
                .enumerate()
                .filter(|(_, v)| set.candidates[v.candidate].team == *team)
                .map(|(i, _)| (i, 1.0))
                .collect();
            let players = set.candidates.iter().filter(|c| c.team == *team).count();
            if players > cap {
                rows.push(LinearConstraint::new(
                    ConstraintKind::TeamLimit(team.to_string()),
                    terms,
                    Sense::LessEqual,
                    cap as f64,
                ));
            }
        }
    }

    rows
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
