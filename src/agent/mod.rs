use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::map::grid::{AgentId, AreaId, AvoidGridId};

// ----------------------------------------------
// Movement constants
// ----------------------------------------------

pub const TICKS_PER_SECOND: f32 = 60.0;

pub const MIN_MOVE_TICKS: i32 = 1;
pub const MAX_MOVE_TICKS: i32 = 450;

// Move ticks used when no agent is supplied to a search
// (4.6 cells per second, the baseline walking speed).
pub const DEFAULT_MOVE_TICKS_CARDINAL: i32 = 13;
pub const DEFAULT_MOVE_TICKS_DIAGONAL: i32 = 18;

// Sentinel tick cost for agents that cannot move at all on a given
// terrain (zero effective speed). Deliberately far above the normal
// clamp so "unable to move" is distinguishable from "very slow".
pub const UNABLE_TO_MOVE_TICKS: i32 = 100_000_000;

const RESTRAINED_SPEED_FACTOR: f32 = 0.35;
const CARRIED_HUMANLIKE_SPEED_FACTOR: f32 = 0.6;

// ----------------------------------------------
// AgentKind
// ----------------------------------------------

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum AgentKind {
    #[default]
    Humanlike,
    Animal,
}

// ----------------------------------------------
// WaterNeeds
// ----------------------------------------------

// Constrains which liquid terrain an agent may swim in.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum WaterNeeds {
    #[default]
    Any,
    FreshOnly,
    SaltOnly,
}

// ----------------------------------------------
// Job / LocomotionUrgency
// ----------------------------------------------

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum LocomotionUrgency {
    Slow,
    Walk,
    #[default]
    Normal,
    Sprint,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct Job {
    pub name: String,
    pub urgency: LocomotionUrgency,
    pub can_bash: bool,
}

impl Job {
    pub fn new(name: &str, urgency: LocomotionUrgency) -> Self {
        Self {
            name: name.to_string(),
            urgency,
            can_bash: false,
        }
    }

    pub fn with_bashing(mut self) -> Self {
        self.can_bash = true;
        self
    }
}

// ----------------------------------------------
// AgentProfile
// ----------------------------------------------

// Read-only view of a mover as the pathfinder sees it. Owned by the
// MapGrid the agent is registered on; searches may not mix agents and
// grids from different maps.
#[derive(Clone, Serialize, Deserialize)]
pub struct AgentProfile {
    pub name: String,
    pub kind: AgentKind,

    // Cells per second.
    pub land_speed: f32,
    pub swim_speed: f32,

    // Swim-only agents never leave liquid terrain.
    pub aquatic: bool,
    pub water_needs: WaterNeeds,

    pub restrained: bool,
    pub carrying_humanlike: bool,

    // Player-commanded movement; uses the commanded perceived-cost
    // variant and ignores area restrictions.
    pub commanded: bool,

    // Priority agents get a much higher node budget before the search
    // falls back to the region heuristic.
    pub priority: bool,

    pub avoids_crowds: bool,

    pub job: Option<Job>,

    // Match the pace of another agent on the same map (one level deep).
    pub follow_pace_of: Option<AgentId>,

    pub allowed_area: Option<AreaId>,
    pub avoid_grid: Option<AvoidGridId>,

    #[serde(skip)]
    pub(crate) map_id: u32,
}

impl AgentProfile {
    pub fn new(name: &str, kind: AgentKind, land_speed: f32) -> Self {
        Self {
            name: name.to_string(),
            kind,
            land_speed,
            swim_speed: 0.0,
            aquatic: false,
            water_needs: WaterNeeds::Any,
            restrained: false,
            carrying_humanlike: false,
            commanded: false,
            priority: false,
            avoids_crowds: true,
            job: None,
            follow_pace_of: None,
            allowed_area: None,
            avoid_grid: None,
            map_id: 0,
        }
    }

    pub fn humanlike(name: &str) -> Self {
        Self::new(name, AgentKind::Humanlike, 4.6)
    }

    pub fn animal(name: &str) -> Self {
        Self::new(name, AgentKind::Animal, 4.6)
    }

    pub fn with_swim_speed(mut self, swim_speed: f32) -> Self {
        self.swim_speed = swim_speed;
        self
    }

    pub fn with_job(mut self, job: Job) -> Self {
        self.job = Some(job);
        self
    }

    #[inline]
    pub fn can_swim(&self) -> bool {
        self.swim_speed > 0.0
    }

    #[inline]
    pub fn can_bash(&self) -> bool {
        self.job.as_ref().is_some_and(|job| job.can_bash)
    }

    #[inline]
    pub fn map_id(&self) -> u32 {
        self.map_id
    }

    // Effective movement speed on a cell. Swim speed replaces land speed
    // on liquid terrain for capable swimmers; restraints, carried
    // passengers and outdoor weather all slow the agent down.
    pub fn effective_speed(&self, liquid: bool, outdoor_factor: f32) -> f32 {
        let mut speed = if liquid && self.can_swim() {
            self.swim_speed
        } else {
            self.land_speed
        };

        if self.restrained {
            speed *= RESTRAINED_SPEED_FACTOR;
        }
        if self.carrying_humanlike {
            speed *= CARRIED_HUMANLIKE_SPEED_FACTOR;
        }

        speed * outdoor_factor
    }

    pub fn ticks_per_move_cardinal(&self, liquid: bool, outdoor_factor: f32) -> i32 {
        let speed = self.effective_speed(liquid, outdoor_factor);
        if speed <= 0.0 {
            return UNABLE_TO_MOVE_TICKS;
        }
        let ticks = (TICKS_PER_SECOND / speed).round() as i32;
        ticks.clamp(MIN_MOVE_TICKS, MAX_MOVE_TICKS)
    }

    pub fn ticks_per_move_diagonal(&self, liquid: bool, outdoor_factor: f32) -> i32 {
        let cardinal = self.ticks_per_move_cardinal(liquid, outdoor_factor);
        if cardinal >= UNABLE_TO_MOVE_TICKS {
            return UNABLE_TO_MOVE_TICKS;
        }
        let ticks = (cardinal as f32 * std::f32::consts::SQRT_2).round() as i32;
        ticks.clamp(MIN_MOVE_TICKS, MAX_MOVE_TICKS)
    }
}
